//! MedPort CLI - healthcare portal client

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use medport_http::ClientError;
use medport_session::SessionError;
use std::path::PathBuf;
use tracing::{Level, error, info};

#[derive(Parser)]
#[command(name = "medport")]
#[command(about = "Patients, doctors and appointments from the terminal")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Data directory for session tokens and logs
    #[arg(short = 'd', long, global = true)]
    data_dir: Option<PathBuf>,

    /// Configuration file (TOML or YAML)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the portal API
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Request timeout in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true)]
    timeout: Option<u64>,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn overrides(&self) -> config::Overrides {
        config::Overrides {
            config_file: self.config.clone(),
            data_dir: self.data_dir.clone(),
            base_url: self.base_url.clone(),
            timeout_secs: self.timeout,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::resolve(&cli.overrides())?;
    logging::init_logging(cli.log_level.into(), &config.data_dir, cli.no_file_log)?;

    info!("Starting MedPort CLI against {}", config.base_url);

    match cli.command.execute(config, cli.json).await {
        Ok(()) => {
            info!("Command completed successfully");
        }
        Err(e) if session_expired(&e) => {
            error!("Command failed: {e}");
            eprintln!("session expired, run `medport login`");
            std::process::exit(1);
        }
        Err(e) => {
            error!("Command failed: {e}");
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Whether a command failed because the refresh token was rejected
fn session_expired(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause
            .downcast_ref::<ClientError>()
            .is_some_and(ClientError::is_auth_expired)
            || cause
                .downcast_ref::<SessionError>()
                .is_some_and(SessionError::is_auth_expired)
    })
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}
