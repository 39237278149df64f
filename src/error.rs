//! Error types surfaced through [`Pending`](crate::Pending) results.
//!
//! Every failure a load can produce is a [`LoadError`]. It is `Clone` because
//! one fetch result is delivered to every subscriber attached to it.

use crate::decode::DecodeError;

/// Terminal failure of a load.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
  /// The route could not be resolved. Not retried.
  #[error(transparent)]
  Configuration(#[from] ConfigError),
  /// Transport failure or non-success status. Safe to retry with a new load.
  #[error(transparent)]
  Network(#[from] NetworkError),
  /// The payload arrived but did not satisfy the decode contract.
  #[error(transparent)]
  Decode(#[from] DecodeError),
}

impl LoadError {
  pub fn is_configuration(&self) -> bool {
    matches!(self, LoadError::Configuration(_))
  }

  pub fn is_network(&self) -> bool {
    matches!(self, LoadError::Network(_))
  }

  pub fn is_decode(&self) -> bool {
    matches!(self, LoadError::Decode(_))
  }
}

/// Misconfiguration detected before any network work happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
  #[error("no URL provider configured; call `configure` before loading relative routes")]
  ProviderUnset,
  #[error("URL provider is already configured")]
  AlreadyConfigured,
  #[error("invalid URL provider `{input}`: {reason}")]
  InvalidProvider { input: String, reason: String },
  #[error("invalid absolute URL `{input}`: {reason}")]
  InvalidUrl { input: String, reason: String },
  #[error("no tokio runtime available to run fetches")]
  NoRuntime,
}

/// Failure at the network boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
  #[error("request to {url} failed: {message}")]
  Transport { url: String, message: String },
  #[error("request to {url} timed out")]
  Timeout { url: String },
  #[error("request to {url} returned HTTP {status}")]
  Status { url: String, status: u16 },
  /// The fetch task ended without producing a result.
  #[error("fetch for {url} was aborted before completing")]
  Aborted { url: String },
}

impl NetworkError {
  pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
    if err.is_timeout() {
      NetworkError::Timeout {
        url: url.to_string(),
      }
    } else if let Some(status) = err.status() {
      NetworkError::Status {
        url: url.to_string(),
        status: status.as_u16(),
      }
    } else {
      NetworkError::Transport {
        url: url.to_string(),
        message: err.to_string(),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_load_error_classification() {
    let config: LoadError = ConfigError::ProviderUnset.into();
    assert!(config.is_configuration());
    assert!(!config.is_network());

    let network: LoadError = NetworkError::Status {
      url: "https://example.com/users".to_string(),
      status: 503,
    }
    .into();
    assert!(network.is_network());
    assert_eq!(
      network.to_string(),
      "request to https://example.com/users returned HTTP 503"
    );
  }
}
