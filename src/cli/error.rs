//! CLI error types and conversions

use crate::pipeline::PipelineError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Pipeline error
    #[error("pipeline error: {0}")]
    PipelineError(#[from] PipelineError),
}
