use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::project_dirs;

/// Directory for `fastsearch.log.*`. Falls back to the temp dir on platforms without a data dir.
pub fn log_dir() -> PathBuf {
  project_dirs().map(|dirs| dirs.data_local_dir().to_path_buf()).unwrap_or_else(std::env::temp_dir)
}

/// Route tracing to a daily-rolled file; stdout belongs to the interactive prompt.
///
/// `RUST_LOG` wins over `level`. Keep the returned guard alive until exit so buffered lines
/// are flushed.
pub fn init(level: &str) -> Result<WorkerGuard> {
  let dir = log_dir();
  std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create log directory {}", dir.display()))?;

  let appender = tracing_appender::rolling::daily(&dir, "fastsearch.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);
  let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level)).context("Invalid log level")?;

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(false))
    .try_init()
    .context("Failed to install tracing subscriber")?;

  Ok(guard)
}
