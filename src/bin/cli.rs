//! kbsync CLI
//!
//! Runs one forward sync from the configured source into the destination.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use kbsync::{error::Result, models::Config, pipeline::Engine};

/// kbsync - Knowledge Base Migration
#[derive(Parser, Debug)]
#[command(
    name = "kbsync",
    version,
    about = "Migrate knowledge bases, categories and articles by external ID"
)]
struct Cli {
    /// Path to the JSON or TOML configuration file
    #[arg(short, long, default_value = "kbsync.json")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every phase: knowledge bases → categories → articles → translations
    Sync {
        /// Read and transform only; send nothing to the destination
        #[arg(long)]
        dry_run: bool,

        /// Skip the retry pass for categories whose parent is missing
        #[arg(long)]
        no_retry: bool,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Exit code on success: nonzero when records were rejected.
async fn run(cli: Cli, config: Config) -> Result<i32> {
    match cli.command {
        Command::Sync { dry_run, no_retry } => {
            config.validate()?;
            let mut config = config;
            if no_retry {
                config.sync.retry_categories = false;
            }

            let mut engine = Engine::from_config(&config)?.with_dry_run(dry_run);
            let report = engine.run().await?;

            if report.failed() > 0 {
                log::warn!(
                    "Sync finished with {} rejected records",
                    report.failed()
                );
            } else {
                log::info!("Sync complete!");
            }
            return Ok(report.exit_code());
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK ({})", cli.config.display());
        }
    }
    Ok(0)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            init_logging(cli.verbose, "info");
            log::error!("{}", e);
            std::process::exit(e.exit_code());
        }
    };
    init_logging(cli.verbose, &config.logging.level);
    log::info!("Loaded configuration from {}", cli.config.display());

    match run(cli, config).await {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(e.exit_code());
        }
    }
}
