//! DLTINS document projection
//!
//! Selects the extracted DLTINS XML file, streams its instrument records through
//! [`document::RecordReader`] and writes one CSV row per record.
//!
//! # Document selection
//!
//! The extraction directory is expected to hold a single XML document. Only
//! regular `.xml` files directly inside the directory are candidates; none is
//! [`ProjectError::NotFound`] and more than one is
//! [`ProjectError::AmbiguousDocument`], so the result never depends on
//! directory-listing order. The pipeline restricts candidates to the files its
//! own extraction produced, so documents left by earlier runs are ignored.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::output::csv::CsvRowsWriter;
use crate::output::{OutputError, OutputWriter, RowsWriter};

pub mod document;

pub use document::RecordReader;

/// Read buffer for the document stream
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Projection errors
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    /// Document does not match the expected positional shape
    #[error("parse error: {0}")]
    ParseError(String),

    /// No candidate document
    #[error("not found: {0}")]
    NotFound(String),

    /// More than one candidate document
    #[error("ambiguous document selection: {0:?}")]
    AmbiguousDocument(Vec<PathBuf>),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Output error
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),
}

/// Result type for projection operations
pub type ProjectResult<T> = Result<T, ProjectError>;

/// Pick the single `.xml` document in `dir`
pub fn select_document(dir: &Path) -> ProjectResult<PathBuf> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| ProjectError::IoError(format!("Failed to read {}: {e}", dir.display())))?;

    let mut listed = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| ProjectError::IoError(format!("Failed to read entry: {e}")))?;
        listed.push(entry.path());
    }
    pick_document(dir, listed)
}

/// Pick the single `.xml` document among `files` extracted into `dir`
///
/// Files nested below `dir` are not candidates.
pub fn select_extracted(dir: &Path, files: &[PathBuf]) -> ProjectResult<PathBuf> {
    let direct = files
        .iter()
        .filter(|path| path.parent() == Some(dir))
        .cloned()
        .collect();
    pick_document(dir, direct)
}

fn pick_document(dir: &Path, paths: Vec<PathBuf>) -> ProjectResult<PathBuf> {
    let mut candidates: Vec<PathBuf> = paths
        .into_iter()
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        })
        .collect();
    candidates.sort();
    candidates.dedup();

    match candidates.len() {
        0 => Err(ProjectError::NotFound(format!(
            "no XML document in {}",
            dir.display()
        ))),
        1 => Ok(candidates.remove(0)),
        _ => Err(ProjectError::AmbiguousDocument(candidates)),
    }
}

/// Project the document at `document` into a CSV at `output`
///
/// `limit` keeps only the first N records; parsing stops once they are
/// written. Returns the number of rows written.
///
/// With a limit, the document past the last projected record is never read,
/// so malformed XML there goes unreported.
pub fn project_to_csv(document: &Path, output: &Path, limit: Option<usize>) -> ProjectResult<u64> {
    let file = File::open(document).map_err(|e| {
        ProjectError::IoError(format!("Failed to open {}: {e}", document.display()))
    })?;
    info!("Parsing {} (this may take a while)", document.display());

    let records = RecordReader::new(BufReader::with_capacity(READ_BUFFER_SIZE, file));
    let mut writer = CsvRowsWriter::new(output)?;

    if let Some(limit) = limit {
        debug!("Limiting projection to {} records", limit);
    }

    for row in records.take(limit.unwrap_or(usize::MAX)) {
        writer.write_row(&row?)?;
    }

    let written = writer.rows_written();
    writer.close()?;
    info!("{} CSV rows written to {}", written, output.display());
    Ok(written)
}

/// Select the document in `dir` and project it into `output`
pub fn project_directory(dir: &Path, output: &Path, limit: Option<usize>) -> ProjectResult<u64> {
    let document = select_document(dir)?;
    project_to_csv(&document, output, limit)
}

/// Select the document among freshly extracted `files` and project it into `output`
pub fn project_extracted(
    dir: &Path,
    files: &[PathBuf],
    output: &Path,
    limit: Option<usize>,
) -> ProjectResult<u64> {
    let document = select_extracted(dir, files)?;
    project_to_csv(&document, output, limit)
}
