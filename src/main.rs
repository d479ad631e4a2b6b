//! Main entry point for the firds-etl CLI

use clap::Parser;
use firds_etl::cli::Cli;
use firds_etl::pipeline::PipelineConfig;
use firds_etl::publisher::PublisherConfig;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("firds_etl=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    println!("STARTED");

    // Environment is read once here and passed down explicitly
    let result = match PipelineConfig::from_env() {
        Ok(config) => cli
            .execute(config, PublisherConfig::from_env())
            .await
            .map_err(|e| anyhow::anyhow!(e)),
        Err(e) => Err(anyhow::anyhow!(e)),
    };

    match result {
        Ok(summary) => {
            info!(
                "{} rows written to {} (published: {})",
                summary.rows_written,
                summary.output_path.display(),
                summary.published
            );
            println!("COMPLETED");
        }
        Err(e) => {
            error!("Pipeline failed: {}", e);
            std::process::exit(1);
        }
    }
}
