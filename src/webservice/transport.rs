//! The network boundary.

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Method;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::NetworkError;

/// One request to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
  pub method: Method,
  pub url: Url,
}

/// Executes requests and returns raw response bodies.
///
/// Implementations report non-success status codes as
/// [`NetworkError::Status`]; only 2xx bodies are handed on to decoding.
pub trait Transport: Send + Sync + 'static {
  fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<Bytes, NetworkError>>;
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
}

impl HttpTransport {
  pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, NetworkError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .user_agent(user_agent)
      .build()
      .map_err(|e| NetworkError::Transport {
        url: String::new(),
        message: format!("failed to build HTTP client: {}", e),
      })?;

    Ok(Self { client })
  }

  /// Wrap an already configured client.
  pub fn with_client(client: reqwest::Client) -> Self {
    Self { client }
  }
}

impl Transport for HttpTransport {
  fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<Bytes, NetworkError>> {
    let client = self.client.clone();

    async move {
      let url = request.url.to_string();
      debug!(method = %request.method, %url, "sending request");

      let response = client
        .request(request.method, request.url)
        .send()
        .await
        .map_err(|e| NetworkError::from_reqwest(&url, e))?;

      let status = response.status();
      if !status.is_success() {
        return Err(NetworkError::Status {
          url,
          status: status.as_u16(),
        });
      }

      let body = response
        .bytes()
        .await
        .map_err(|e| NetworkError::from_reqwest(&url, e))?;

      debug!(%url, status = status.as_u16(), bytes = body.len(), "received response");
      Ok(body)
    }
    .boxed()
  }
}
