//! Stage orchestration
//!
//! [`Pipeline`] runs the six stages in order, each consuming the file the
//! previous one wrote:
//!
//! 1. search the FIRDS register and store the XML response
//! 2. resolve the first `DLTINS` download link
//! 3. stream the archive to disk
//! 4. extract the archive
//! 5. project the DLTINS document to CSV
//! 6. publish the CSV
//!
//! # Error Handling
//!
//! Stages 1-5 propagate every failure and abort the run; intermediate files
//! are left in place. Stage 6 reports missing files and missing credentials
//! as an unsuccessful publish rather than an error. Nothing is retried.
//!
//! # Components
//!
//! - [`config`] - endpoints, search window and file layout
//! - [`runner`] - the [`Pipeline`] itself and its [`Stage`] progress events

pub mod config;
pub mod runner;

pub use config::{PipelineConfig, SearchWindow, WorkspaceLayout};
pub use runner::{Pipeline, RunSummary, Stage};

use crate::fetcher::FetcherError;
use crate::projector::ProjectError;
use crate::publisher::PublishError;

/// Pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Search, resolution, download or extraction failure
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Projection failure
    #[error("projection error: {0}")]
    ProjectError(#[from] ProjectError),

    /// Upload failure not handled by the publisher
    #[error("publish error: {0}")]
    PublishError(#[from] PublishError),

    /// Invalid endpoint or search window settings
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
