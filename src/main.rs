use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use community_map::catalog::FieldCatalog;
use community_map::config::{AppConfig, PublishConfig};
use community_map::error::MapError;
use community_map::pipeline;
use community_map::publish::GitHubStore;
use community_map::server;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the map document from the resource table
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Resource table to use instead of `input.data_csv`
        #[arg(short, long, value_name = "CSV")]
        input: Option<PathBuf>,
        /// Publish the document after a successful build
        #[arg(long)]
        publish: bool,
    },
    /// Serve the generated map for preview
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Publish the already generated map document
    Publish {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate { config, input, publish } => {
            println!("Generating map with config: {:?}", config);
            let app_config = AppConfig::load_from_file(config)?;
            let catalog = FieldCatalog::from_config(app_config.catalog.as_ref());

            let report = pipeline::run(&app_config, &catalog, input.as_deref())
                .await
                .map_err(report_error)?;

            println!(
                "Wrote {:?}: {} markers, {} boundary layers ({})",
                report.document,
                report.markers,
                report.boundary_layers.len(),
                report.boundary_layers.join(", ")
            );
            if !report.skipped.is_empty() {
                println!("Skipped {} rows:", report.skipped.len());
                for row in &report.skipped {
                    println!("  line {}: {}", row.line, row.reason);
                }
            }

            if *publish {
                publish_generated(&app_config, &report.document).await?;
            }
            println!("Generation complete!");
        }
        Commands::Serve { config } => {
            let app_config = AppConfig::load_from_file(config)?;
            server::start_server(&app_config).await?;
        }
        Commands::Publish { config } => {
            let app_config = AppConfig::load_from_file(config)?;
            publish_generated(&app_config, &app_config.output.document).await?;
        }
    }

    Ok(())
}

async fn publish_generated(config: &AppConfig, document: &Path) -> anyhow::Result<()> {
    let publish: &PublishConfig = config
        .publish
        .as_ref()
        .ok_or_else(|| anyhow!("No [publish] section in config"))?;
    let store = GitHubStore::from_config(publish).map_err(report_error)?;

    let outcome = pipeline::publish(&store, document, &publish.path, &publish.message)
        .await
        .map_err(report_error)
        .with_context(|| format!("Publishing {} to {} failed", publish.path, publish.repository))?;

    println!("Publish {}: {:?}", publish.path, outcome);
    Ok(())
}

fn report_error(err: MapError) -> anyhow::Error {
    tracing::error!(kind = %err.kind(), "{}", err);
    anyhow::Error::new(err)
}
