//! File logging. Stdout is reserved for command output.

use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

/// Environment variable that overrides the configured filter.
pub const LOG_ENV: &str = "NETREG_LOG";

const LOG_FILE: &str = "netreg.log";

/// Install the global subscriber. Keep the guard alive until exit so
/// buffered lines are flushed.
pub fn init(config: &LogConfig) -> Result<WorkerGuard> {
  let directory = log_directory(config)?;
  std::fs::create_dir_all(&directory)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", directory.display(), e))?;

  let appender = tracing_appender::rolling::never(&directory, LOG_FILE);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::registry()
    .with(filter(config)?)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .try_init()
    .map_err(|e| eyre!("Failed to install logger: {}", e))?;

  Ok(guard)
}

fn filter(config: &LogConfig) -> Result<EnvFilter> {
  match std::env::var(LOG_ENV) {
    Ok(directives) if !directives.is_empty() => EnvFilter::try_new(&directives)
      .map_err(|e| eyre!("Invalid {} value {:?}: {}", LOG_ENV, directives, e)),
    _ => EnvFilter::try_new(&config.level)
      .map_err(|e| eyre!("Invalid log level {:?}: {}", config.level, e)),
  }
}

fn log_directory(config: &LogConfig) -> Result<PathBuf> {
  if let Some(directory) = &config.directory {
    return Ok(directory.clone());
  }
  dirs::data_dir()
    .map(|dir| dir.join("netreg"))
    .ok_or_else(|| eyre!("Could not determine data directory for logs"))
}
