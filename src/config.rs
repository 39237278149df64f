use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CachePolicy;
use crate::error::ConfigError;
use crate::route::UrlProvider;
use crate::webservice::{WebserviceBuilder, DEFAULT_USER_AGENT};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  /// Where relative routes resolve. Loads fail until this is set, either
  /// here or through `--host` / `PLACEHOLDER_HOST`.
  pub provider: Option<ProviderConfig>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub http: HttpConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
  /// Bare host, e.g. `jsonplaceholder.typicode.com`
  pub host: Option<String>,
  /// Scheme used with `host` (defaults to https)
  pub scheme: Option<String>,
  /// Full base URL; takes precedence over `host`
  pub base_url: Option<String>,
}

impl ProviderConfig {
  pub fn to_provider(&self) -> Result<UrlProvider, ConfigError> {
    if let Some(base) = &self.base_url {
      return UrlProvider::from_base_url(base);
    }
    match &self.host {
      Some(host) => UrlProvider::with_scheme(self.scheme.as_deref().unwrap_or("https"), host),
      None => Err(ConfigError::InvalidProvider {
        input: String::new(),
        reason: "provider needs either `host` or `base_url`".to_string(),
      }),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
  /// Seconds an entry stays valid; omit to keep entries until invalidated
  pub ttl_secs: Option<u64>,
  /// Maximum number of entries; omit or 0 for no limit
  pub max_entries: Option<usize>,
}

impl CacheConfig {
  pub fn policy(&self) -> CachePolicy {
    let mut policy = CachePolicy::unbounded();
    if let Some(ttl) = self.ttl_secs {
      policy = policy.with_ttl(Duration::from_secs(ttl));
    }
    if let Some(max) = self.max_entries.and_then(NonZeroUsize::new) {
      policy = policy.with_max_entries(max);
    }
    policy
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  #[serde(default = "default_user_agent")]
  pub user_agent: String,
}

impl Default for HttpConfig {
  fn default() -> Self {
    Self {
      timeout_secs: default_timeout_secs(),
      user_agent: default_user_agent(),
    }
  }
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_user_agent() -> String {
  DEFAULT_USER_AGENT.to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
  /// `tracing` filter directive, e.g. `placeholder=debug`
  pub filter: Option<String>,
  /// Also write logs to this file
  pub file: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./placeholder.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/placeholder/config.yaml
  ///
  /// With no file found the defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("placeholder.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("placeholder").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Override the provider with a host or base URL given on the command line.
  pub fn with_host(self, host: &str) -> Self {
    let provider = if host.contains("://") {
      ProviderConfig {
        base_url: Some(host.to_string()),
        ..Default::default()
      }
    } else {
      ProviderConfig {
        host: Some(host.to_string()),
        ..Default::default()
      }
    };

    Config {
      provider: Some(provider),
      ..self
    }
  }

  /// Webservice builder carrying this configuration.
  pub fn webservice(&self) -> Result<WebserviceBuilder> {
    let mut builder = crate::Webservice::builder()
      .cache_policy(self.cache.policy())
      .timeout(Duration::from_secs(self.http.timeout_secs))
      .user_agent(self.http.user_agent.clone());

    if let Some(provider) = &self.provider {
      let provider = provider
        .to_provider()
        .map_err(|e| eyre!("Invalid provider configuration: {}", e))?;
      builder = builder.provider(provider);
    }

    Ok(builder)
  }
}
