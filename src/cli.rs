//! Command-line surface: arguments, configuration lookup and dispatch
//!
//! The binary only wires process state (environment, stdio) into
//! [`run`]; everything here is reachable from tests.

use crate::commands;
use crate::config::{AppConfig, ConfigError, SecretSource};
use crate::report::{ExitStatus, Reporter};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, Instrument};

/// Looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "cloud-helpers.toml";
pub const DEFAULT_MESSAGE: &str = "hello from rust";
pub const DEFAULT_PROMPT: &str = "Describe the purpose of a 'hello world' program in one line.";

/// One-shot MQTT publish and text generation
#[derive(Debug, Parser)]
#[command(name = "cloud-helpers")]
#[command(about = "Publish one MQTT message or request one completion")]
#[command(version)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "CLOUD_HELPERS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Commands {
    /// Publish one message to the broker at at-least-once delivery
    Publish {
        /// Message text placed in the JSON document
        #[arg(short, long, default_value = DEFAULT_MESSAGE)]
        message: String,
        /// Override the configured topic
        #[arg(long)]
        topic: Option<String>,
    },
    /// Send one prompt to the model and print the generated text
    Generate {
        /// Prompt text
        #[arg(short, long, default_value = DEFAULT_PROMPT)]
        prompt: String,
        /// Override the configured model id
        #[arg(long)]
        model: Option<String>,
    },
    /// Print the effective configuration
    Config,
}

/// Load `path` if given, else `fallback` if it exists, else built-in defaults
pub fn load_configuration(path: Option<&Path>, fallback: &Path) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            AppConfig::load_from_file(path)
        }
        None if fallback.exists() => {
            info!("Loading configuration from: {}", fallback.display());
            AppConfig::load_from_file(fallback)
        }
        None => {
            debug!("No configuration file, using built-in defaults");
            Ok(AppConfig::default())
        }
    }
}

/// Apply `--topic` / `--model` to the loaded configuration
pub fn apply_overrides(command: &Commands, config: &mut AppConfig) {
    match command {
        Commands::Publish {
            topic: Some(topic), ..
        } => config.mqtt.topic = topic.clone(),
        Commands::Generate {
            model: Some(model), ..
        } => config.inference.model = model.clone(),
        _ => {}
    }
}

/// Run one command and report its result
///
/// The returned status is the process exit status; `Err` is reserved for
/// failures of the reporter itself.
pub async fn run<O: Write, E: Write>(
    command: Commands,
    mut config: AppConfig,
    secrets: &dyn SecretSource,
    reporter: &mut Reporter<O, E>,
) -> Result<ExitStatus, Box<dyn std::error::Error>> {
    apply_overrides(&command, &mut config);

    match command {
        Commands::Publish { message, .. } => {
            let span = crate::command_span!(command = "publish");
            let result = commands::publish(&config.mqtt, secrets, &message)
                .instrument(span)
                .await;
            Ok(reporter.report(&config.mqtt.topic, &result)?)
        }
        Commands::Generate { prompt, .. } => {
            let span = crate::command_span!(command = "generate");
            let result = commands::generate(&config.inference, secrets, &prompt)
                .instrument(span)
                .await;
            Ok(reporter.report(&config.inference.model, &result)?)
        }
        Commands::Config => {
            reporter.print(&toml::to_string_pretty(&config)?)?;
            Ok(ExitStatus::Success)
        }
    }
}
