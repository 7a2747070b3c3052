//! cloud-helpers - entry point
//!
//! Loads `.env` and configuration, runs one command, and maps its result to
//! the process exit code. Every failure exits non-zero.

use clap::Parser;
use cloud_helpers::cli::{load_configuration, run, Cli, DEFAULT_CONFIG_FILE};
use cloud_helpers::config::ProcessSecrets;
use cloud_helpers::observability::init_default_logging;
use cloud_helpers::report::Reporter;
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, error};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Must precede parsing: clap reads CLOUD_HELPERS_CONFIG from the environment.
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    init_default_logging(cli.verbose);
    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => debug!("No .env file found"),
        Err(e) => {
            error!("Failed to load .env: {}", e);
            eprintln!("Error: failed to load .env: {e}");
            return ExitCode::FAILURE;
        }
    }

    let config = match load_configuration(cli.config.as_deref(), Path::new(DEFAULT_CONFIG_FILE)) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut reporter = Reporter::stdio();
    match run(cli.command, config, &ProcessSecrets, &mut reporter).await {
        Ok(status) => status.into(),
        Err(e) => {
            error!("Command failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
