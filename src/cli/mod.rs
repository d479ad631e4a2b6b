//! CLI command implementation

pub mod error;
pub mod run;

pub use error::CliError;
pub use run::Cli;
