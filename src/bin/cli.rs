//! tracksync CLI
//!
//! Local execution entry point for the reconciliation pipeline.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracksync::{
    error::{AppError, Result},
    models::{Config, Credentials},
    pipeline::{CarrierMap, RunOptions, run_pipeline},
    services::{LogPublisher, SheetsPublisher, TrackingClient},
    storage::{LocalStorage, StateStore},
};

/// tracksync - Delivery-Status Reconciliation Pipeline
#[derive(Parser, Debug)]
#[command(
    name = "tracksync",
    version,
    about = "Reconciles delivery-tracking events and republishes the full snapshot"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline: fetch, reconcile, publish
    Run {
        /// Skip publishing; reconcile and persist only
        #[arg(long)]
        no_publish: bool,

        /// Override the cold-start lookback in days
        #[arg(long)]
        lookback: Option<i64>,
    },

    /// Validate configuration and the carrier mapping table
    Validate,

    /// Show persisted base and run-marker status
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("tracksync starting...");

    let config = Config::load_or_default(&cli.config);
    let storage = LocalStorage::new(&config.paths.state_dir);

    match cli.command {
        Command::Run {
            no_publish,
            lookback,
        } => {
            config.validate()?;
            let credentials = Credentials::from_env()?;

            let source = TrackingClient::connect(&config.api, &credentials).await?;
            let options = RunOptions {
                lookback_override: lookback,
            };

            let report = if no_publish {
                run_pipeline(&config, &storage, &source, &LogPublisher, &options).await?
            } else {
                let token = credentials
                    .sheets_token
                    .as_deref()
                    .ok_or_else(|| AppError::config("TRACKSYNC_SHEETS_TOKEN is not set"))?;
                let publisher = SheetsPublisher::new(&config.sheets, token)?;
                run_pipeline(&config, &storage, &source, &publisher, &options).await?
            };

            if !report.unmapped_carriers.is_empty() {
                log::warn!(
                    "Unmapped carrier(s): {}",
                    report.unmapped_carriers.join(", ")
                );
            }
            log::info!("Reconciliation complete!");
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");

            let mapping = CarrierMap::load(&config.paths.mapping_path)?;
            log::info!("✓ Carrier mapping OK ({} entries)", mapping.len());

            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("State directory: {}", config.paths.state_dir.display());

            match storage.load_marker().await? {
                Some(marker) => log::info!("Last successful window ended at {}", marker),
                None => log::info!("No run marker found."),
            }

            match storage.load_base().await? {
                Some(base) => log::info!("Historical base holds {} record(s)", base.len()),
                None => log::info!("No historical base found yet."),
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
