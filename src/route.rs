//! Mapping from logical resource requests to concrete network addresses.

use reqwest::Method;
use std::collections::BTreeMap;
use url::Url;

use crate::error::ConfigError;

/// The base address every provider-relative route resolves against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlProvider {
  base: Url,
}

impl UrlProvider {
  /// Provider for a bare host (optionally with port), served over https.
  pub fn new(host: &str) -> Result<Self, ConfigError> {
    Self::with_scheme("https", host)
  }

  pub fn with_scheme(scheme: &str, host: &str) -> Result<Self, ConfigError> {
    let host = host.trim();
    if host.is_empty() || host.contains('/') {
      return Err(ConfigError::InvalidProvider {
        input: host.to_string(),
        reason: "expected a host name without scheme or path".to_string(),
      });
    }
    Self::from_base_url(&format!("{}://{}", scheme, host))
  }

  /// Provider from a full base URL such as `http://127.0.0.1:8080/api`.
  pub fn from_base_url(base: &str) -> Result<Self, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidProvider {
      input: base.to_string(),
      reason,
    };

    let url = Url::parse(base.trim()).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
      return Err(invalid("URL has no host".to_string()));
    }
    if url.query().is_some() || url.fragment().is_some() {
      return Err(invalid("base URL must not carry a query or fragment".to_string()));
    }

    Ok(Self { base: url })
  }

  pub fn base(&self) -> &Url {
    &self.base
  }

  pub fn host(&self) -> &str {
    self.base.host_str().unwrap_or_default()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Target {
  /// `{base}/{kind}[/{id}]`
  Relative { kind: String, id: Option<u64> },
  /// A fully qualified address taken from a payload, e.g. an image URL.
  Absolute(String),
}

/// A logical request: what to address, with which method and filters.
///
/// Filters are kept sorted so two routes built from the same parameters, in
/// any order, render the same address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
  target: Target,
  method: Method,
  filters: BTreeMap<String, String>,
}

impl Route {
  /// All records of a kind, e.g. `users`.
  pub fn collection(kind: impl Into<String>) -> Self {
    Self::new(Target::Relative {
      kind: kind.into(),
      id: None,
    })
  }

  /// A single record of a kind, e.g. `users/7`.
  pub fn item(kind: impl Into<String>, id: u64) -> Self {
    Self::new(Target::Relative {
      kind: kind.into(),
      id: Some(id),
    })
  }

  /// A fully qualified address that does not depend on the provider.
  pub fn absolute(url: impl Into<String>) -> Self {
    Self::new(Target::Absolute(url.into()))
  }

  fn new(target: Target) -> Self {
    Self {
      target,
      method: Method::GET,
      filters: BTreeMap::new(),
    }
  }

  /// Add a query filter such as `userId=7`. A repeated key replaces the value.
  pub fn filter(mut self, key: impl Into<String>, value: impl ToString) -> Self {
    self.filters.insert(key.into(), value.to_string());
    self
  }

  pub fn with_method(mut self, method: Method) -> Self {
    self.method = method;
    self
  }

  pub fn method(&self) -> &Method {
    &self.method
  }

  pub fn filters(&self) -> &BTreeMap<String, String> {
    &self.filters
  }

  pub fn is_absolute(&self) -> bool {
    matches!(self.target, Target::Absolute(_))
  }

  /// Render the concrete address.
  ///
  /// Relative routes fail with [`ConfigError::ProviderUnset`] when no
  /// provider is given; they never fall back to a default host.
  pub fn resolve(&self, provider: Option<&UrlProvider>) -> Result<Url, ConfigError> {
    let mut url = match &self.target {
      Target::Relative { kind, id } => {
        let provider = provider.ok_or(ConfigError::ProviderUnset)?;
        let mut url = provider.base.clone();
        {
          let mut segments = url
            .path_segments_mut()
            .map_err(|_| ConfigError::InvalidProvider {
              input: provider.base.to_string(),
              reason: "URL cannot be a base".to_string(),
            })?;
          segments.pop_if_empty().push(kind);
          if let Some(id) = id {
            segments.push(&id.to_string());
          }
        }
        url
      }
      Target::Absolute(raw) => Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        input: raw.clone(),
        reason: e.to_string(),
      })?,
    };

    if !self.filters.is_empty() {
      url.query_pairs_mut().extend_pairs(self.filters.iter());
    }

    Ok(url)
  }
}
