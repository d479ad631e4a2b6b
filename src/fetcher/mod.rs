//! Register search, download-link resolution and archive handling

pub mod archive;
pub mod resolver;
pub mod search;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Transport failure or non-success HTTP status
    #[error("network error: {0}")]
    NetworkError(String),

    /// No qualifying search entry
    #[error("not found: {0}")]
    NotFound(String),

    /// Corrupt or non-ZIP archive
    #[error("archive error: {0}")]
    ArchiveError(String),

    /// Search response parse error
    #[error("parse error: {0}")]
    ParseError(String),

    /// Local file I/O error
    #[error("IO error: {0}")]
    IoError(String),
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;
