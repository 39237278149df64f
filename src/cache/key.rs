//! Cache keys: canonical address plus decode target.

use reqwest::Method;
use sha2::{Digest, Sha256};
use std::any::TypeId;
use std::fmt;
use url::Url;

/// Identity of a cached result and of an in-flight fetch.
///
/// The same address decoded as two different types yields two keys, so a
/// `Vec<Album>` and a raw `Image` fetched from one URL never collide.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  method: Method,
  address: String,
  target: TypeId,
  target_name: &'static str,
}

impl CacheKey {
  pub fn new<T: 'static>(method: &Method, url: &Url) -> Self {
    Self {
      method: method.clone(),
      address: url.as_str().to_string(),
      target: TypeId::of::<T>(),
      target_name: std::any::type_name::<T>(),
    }
  }

  pub fn address(&self) -> &str {
    &self.address
  }

  pub fn method(&self) -> &Method {
    &self.method
  }

  /// Short, stable hash of the key for log correlation.
  pub fn fingerprint(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.method.as_str().as_bytes());
    hasher.update(b" ");
    hasher.update(self.address.as_bytes());
    hasher.update(b" ");
    hasher.update(self.target_name.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..12].to_string()
  }
}

impl fmt::Debug for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {} as {}", self.method, self.address, self.target_name)
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.method, self.address)
  }
}
