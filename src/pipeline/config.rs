//! Pipeline configuration: endpoints, search window and working-directory layout

use chrono::{DateTime, TimeZone, Utc};
use std::path::{Path, PathBuf};

use super::{PipelineError, PipelineResult};

/// ESMA FIRDS file register search endpoint
pub const FIRDS_SEARCH_URL: &str =
    "https://registers.esma.europa.eu/solr/esma_registers_firds_files/select";

/// File type marker of the delta instrument file
pub const DLTINS_FILE_TYPE: &str = "DLTINS";

/// Archive download chunk size in bytes
pub const DOWNLOAD_CHUNK_SIZE: usize = 128;

/// Default working directory for intermediate files
pub const DEFAULT_WORK_DIR: &str = "tmp";

/// Default CSV output file
pub const DEFAULT_OUTPUT_FILE: &str = "output.csv";

const SEARCH_RESPONSE_FILE: &str = "esma.firds.response.xml";
const ARCHIVE_FILE: &str = "DLTINS_one.zip";
const EXTRACT_DIR: &str = "dltins_one";

/// Inclusive publication-date window for the register search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    /// Window start (UTC)
    pub from: DateTime<Utc>,
    /// Window end (UTC, inclusive)
    pub to: DateTime<Utc>,
}

impl SearchWindow {
    /// Create a window; `from` must not be after `to`
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> PipelineResult<Self> {
        if from > to {
            return Err(PipelineError::ConfigurationError(format!(
                "search window start {from} is after end {to}"
            )));
        }
        Ok(Self { from, to })
    }

    /// Solr filter query selecting this publication-date range
    ///
    /// `publication_date:[2021-01-17T00:00:00Z TO 2021-01-19T23:59:59Z]`
    pub fn filter_query(&self) -> String {
        format!(
            "publication_date:[{} TO {}]",
            self.from.format("%Y-%m-%dT%H:%M:%SZ"),
            self.to.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }
}

impl Default for SearchWindow {
    fn default() -> Self {
        // 2021-01-17T00:00:00Z ..= 2021-01-19T23:59:59Z
        Self {
            from: Utc
                .with_ymd_and_hms(2021, 1, 17, 0, 0, 0)
                .single()
                .expect("hardcoded timestamp is valid"),
            to: Utc
                .with_ymd_and_hms(2021, 1, 19, 23, 59, 59)
                .single()
                .expect("hardcoded timestamp is valid"),
        }
    }
}

/// Fixed relative paths under the working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    work_dir: PathBuf,
    output_path: PathBuf,
}

impl WorkspaceLayout {
    /// Layout rooted at `work_dir`, writing the CSV to `output_path`
    pub fn new(work_dir: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            output_path: output_path.into(),
        }
    }

    /// Working directory
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Stored search response
    pub fn search_response_path(&self) -> PathBuf {
        self.work_dir.join(SEARCH_RESPONSE_FILE)
    }

    /// Downloaded archive
    pub fn archive_path(&self) -> PathBuf {
        self.work_dir.join(ARCHIVE_FILE)
    }

    /// Archive extraction directory
    pub fn extract_dir(&self) -> PathBuf {
        self.work_dir.join(EXTRACT_DIR)
    }

    /// CSV output
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

impl Default for WorkspaceLayout {
    fn default() -> Self {
        Self::new(DEFAULT_WORK_DIR, DEFAULT_OUTPUT_FILE)
    }
}

/// Configuration for a full pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Register search endpoint
    pub search_url: String,
    /// Publication-date window
    pub window: SearchWindow,
    /// Target file type marker
    pub file_type: String,
    /// Local file layout
    pub layout: WorkspaceLayout,
}

impl PipelineConfig {
    /// Override the search endpoint
    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = url.into();
        self
    }

    /// Override the publication-date window
    pub fn with_window(mut self, window: SearchWindow) -> Self {
        self.window = window;
        self
    }

    /// Override the file layout
    pub fn with_layout(mut self, layout: WorkspaceLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Read overrides from the process environment
    ///
    /// `FIRDS_SEARCH_URL`, `FIRDS_FROM`, `FIRDS_TO` (RFC3339)
    pub fn from_env() -> PipelineResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    ///
    /// Unset or blank variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> PipelineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = non_empty("FIRDS_SEARCH_URL") {
            config.search_url = url;
        }

        let from = non_empty("FIRDS_FROM")
            .map(|v| parse_timestamp("FIRDS_FROM", &v))
            .transpose()?
            .unwrap_or(config.window.from);
        let to = non_empty("FIRDS_TO")
            .map(|v| parse_timestamp("FIRDS_TO", &v))
            .transpose()?
            .unwrap_or(config.window.to);
        config.window = SearchWindow::new(from, to)?;

        Ok(config)
    }
}

fn parse_timestamp(name: &str, value: &str) -> PipelineResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PipelineError::ConfigurationError(format!("invalid {name} '{value}': {e}")))
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            search_url: FIRDS_SEARCH_URL.to_string(),
            window: SearchWindow::default(),
            file_type: DLTINS_FILE_TYPE.to_string(),
            layout: WorkspaceLayout::default(),
        }
    }
}
