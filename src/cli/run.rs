//! Pipeline command

use clap::Parser;
use tracing::info;

use super::CliError;
use crate::pipeline::{Pipeline, PipelineConfig, RunSummary};
use crate::publisher::{Publisher, PublisherConfig};

/// FIRDS DLTINS extract, project and publish
#[derive(Debug, Parser)]
#[command(name = "firds-etl")]
#[command(
    about = "Extract ESMA FIRDS DLTINS instrument records to CSV and publish them",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Maximum number of instrument records to project (default: all)
    pub limit: Option<usize>,
}

impl Cli {
    /// Run the pipeline, printing a marker line per stage
    pub async fn execute(
        &self,
        config: PipelineConfig,
        publisher: PublisherConfig,
    ) -> Result<RunSummary, CliError> {
        if let Some(limit) = self.limit {
            println!("LIMIT {limit}");
        }
        info!(
            "Publishing to bucket {} as {}",
            publisher.bucket, publisher.object_key
        );

        let pipeline = Pipeline::new(config, Publisher::new(publisher));
        let summary = pipeline
            .run_with(self.limit, |stage| println!("{stage}"))
            .await?;
        Ok(summary)
    }
}
