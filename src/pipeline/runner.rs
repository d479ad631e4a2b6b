//! Sequential pipeline runner

use reqwest::Client;
use std::fmt;
use std::path::PathBuf;
use tracing::info;

use super::{PipelineConfig, PipelineResult};
use crate::fetcher::archive::{extract_archive, ArchiveDownloader};
use crate::fetcher::resolver::resolve_download_link;
use crate::fetcher::search::SearchClient;
use crate::fetcher::FetcherError;
use crate::projector::project_extracted;
use crate::publisher::Publisher;

/// Progress event emitted after each stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Search response stored
    Queried(PathBuf),
    /// Download link resolved
    Found(String),
    /// Archive saved, with its size in bytes
    Saved(u64),
    /// Archive extracted, with the number of files
    Unzipped(usize),
    /// CSV written, with the number of rows
    RowsWritten(u64),
    /// Upload starting
    Uploading,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Queried(path) => write!(f, "QUERIED {}", path.display()),
            Stage::Found(link) => write!(f, "FOUND {link}"),
            Stage::Saved(bytes) => write!(f, "SAVED {bytes} bytes"),
            Stage::Unzipped(files) => write!(f, "UNZIPPED {files} file(s)"),
            Stage::RowsWritten(rows) => write!(f, "{rows} CSV ROWS WRITTEN"),
            Stage::Uploading => write!(f, "UPLOADING"),
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Resolved archive URL
    pub download_link: String,
    /// Archive size in bytes
    pub archive_bytes: u64,
    /// Number of files extracted
    pub files_extracted: usize,
    /// Number of CSV rows written
    pub rows_written: u64,
    /// CSV location
    pub output_path: PathBuf,
    /// Whether the publisher reported success
    pub published: bool,
}

/// FIRDS DLTINS extraction pipeline
pub struct Pipeline {
    config: PipelineConfig,
    client: Client,
    publisher: Publisher,
}

impl Pipeline {
    /// Create a pipeline with a default HTTP client
    pub fn new(config: PipelineConfig, publisher: Publisher) -> Self {
        Self::with_client(config, publisher, Client::new())
    }

    /// Create a pipeline sharing an existing HTTP client
    pub fn with_client(config: PipelineConfig, publisher: Publisher, client: Client) -> Self {
        Self {
            config,
            client,
            publisher,
        }
    }

    /// Pipeline configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage, projecting at most `limit` records
    pub async fn run(&self, limit: Option<usize>) -> PipelineResult<RunSummary> {
        self.run_with(limit, |_| {}).await
    }

    /// Run every stage, calling `report` after each one
    pub async fn run_with<F>(&self, limit: Option<usize>, mut report: F) -> PipelineResult<RunSummary>
    where
        F: FnMut(&Stage),
    {
        let layout = &self.config.layout;
        std::fs::create_dir_all(layout.work_dir()).map_err(|e| {
            FetcherError::IoError(format!(
                "Failed to create {}: {e}",
                layout.work_dir().display()
            ))
        })?;

        let search = SearchClient::new(self.client.clone(), self.config.search_url.clone());
        let response_path = search
            .search_to_file(&self.config.window, &layout.search_response_path())
            .await?;
        report(&Stage::Queried(response_path.clone()));

        let download_link = resolve_download_link(&response_path, &self.config.file_type)?;
        report(&Stage::Found(download_link.clone()));

        let archive_path = layout.archive_path();
        let archive_bytes = ArchiveDownloader::new(self.client.clone())
            .download(&download_link, &archive_path)
            .await?;
        report(&Stage::Saved(archive_bytes));

        let extract_dir = layout.extract_dir();
        let files = extract_archive(&archive_path, &extract_dir)?;
        report(&Stage::Unzipped(files.len()));

        let output_path = layout.output_path().to_path_buf();
        let rows_written = project_extracted(&extract_dir, &files, &output_path, limit)?;
        report(&Stage::RowsWritten(rows_written));

        report(&Stage::Uploading);
        let published = self.publisher.publish(&output_path).await?;

        info!(
            "Run finished: {} rows from {} (published: {})",
            rows_written, download_link, published
        );

        Ok(RunSummary {
            download_link,
            archive_bytes,
            files_extracted: files.len(),
            rows_written,
            output_path,
            published,
        })
    }
}
