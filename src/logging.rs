//! tracing subscriber setup for the binary.

use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Filter directive when `RUST_LOG` is not set.
///
/// `-v` flags win over the configured filter; without either, only warnings
/// from this crate are shown.
fn directive(config: &LoggingConfig, verbosity: u8) -> String {
  match verbosity {
    0 => config
      .filter
      .clone()
      .unwrap_or_else(|| "placeholder=warn".to_string()),
    1 => "placeholder=info".to_string(),
    2 => "placeholder=debug".to_string(),
    _ => "placeholder=trace,reqwest=debug".to_string(),
  }
}

/// Install the global subscriber: stderr always, plus a log file if
/// configured. Keep the returned guard alive to flush the file on exit.
pub fn init(config: &LoggingConfig, verbosity: u8) -> Result<Option<WorkerGuard>> {
  let filter = match EnvFilter::try_from_default_env() {
    Ok(filter) => filter,
    Err(_) => EnvFilter::try_new(directive(config, verbosity))
      .map_err(|e| eyre!("Invalid log filter: {}", e))?,
  };

  let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

  let (file_layer, guard) = match &config.file {
    Some(path) => {
      let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
      let name = path
        .file_name()
        .ok_or_else(|| eyre!("Log file path has no file name: {}", path.display()))?;

      std::fs::create_dir_all(dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

      let appender = tracing_appender::rolling::never(dir, name);
      let (writer, guard) = tracing_appender::non_blocking(appender);
      (
        Some(fmt::layer().with_writer(writer).with_ansi(false)),
        Some(guard),
      )
    }
    None => (None, None),
  };

  tracing_subscriber::registry()
    .with(filter)
    .with(stderr_layer)
    .with(file_layer)
    .try_init()
    .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

  Ok(guard)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_directive_precedence() {
    let configured = LoggingConfig {
      filter: Some("placeholder=debug".to_string()),
      file: None,
    };
    assert_eq!(directive(&configured, 0), "placeholder=debug");
    assert_eq!(directive(&configured, 1), "placeholder=info");
    assert_eq!(directive(&LoggingConfig::default(), 0), "placeholder=warn");
    assert!(directive(&LoggingConfig::default(), 5).starts_with("placeholder=trace"));
  }
}
