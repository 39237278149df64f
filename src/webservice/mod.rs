//! Caching webservice: resolves, fetches, decodes, caches, and delivers.
//!
//! The webservice is an explicitly constructed handle. Clones share one cache
//! and one in-flight table, so a single instance can be passed to every
//! consumer that should see the same cached results.
//!
//! For a given cache key:
//! 1. a valid cache entry is delivered immediately, with no network access;
//! 2. a fetch already in flight is joined, never duplicated;
//! 3. otherwise one fetch is spawned on the runtime and its result is cached
//!    (on success only) and delivered to every subscriber.
//!
//! The cache and the in-flight table sit behind one mutex. Storing a value
//! and retiring its in-flight entry happen in the same critical section, so a
//! concurrent load always sees one or the other. Callbacks never run while
//! the mutex is held.

mod transport;

pub use transport::{FetchRequest, HttpTransport, Transport};

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::cache::{CacheKey, CachePolicy, MemoryStorage};
use crate::error::{ConfigError, LoadError, NetworkError};
use crate::pending::{LoadResult, Pending};
use crate::resource::Resource;
use crate::route::UrlProvider;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_USER_AGENT: &str = concat!("placeholder/", env!("CARGO_PKG_VERSION"));

/// Whether a load may be answered from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
  CacheFirst,
  Network,
}

struct State {
  cache: MemoryStorage,
  /// Key to the `Pending<T>` of the fetch that owns it.
  in_flight: HashMap<CacheKey, Box<dyn Any + Send>>,
}

struct Shared {
  provider: OnceLock<UrlProvider>,
  transport: Arc<dyn Transport>,
  runtime: Handle,
  state: Mutex<State>,
}

impl Shared {
  fn lock_state(&self) -> MutexGuard<'_, State> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Record the outcome of the fetch owning `key`, then notify subscribers.
  fn settle<T>(&self, key: &CacheKey, pending: &Pending<T>, result: LoadResult<T>)
  where
    T: Clone + Send + Sync + 'static,
  {
    {
      let mut state = self.lock_state();
      if let Ok(value) = &result {
        state.cache.insert(key.clone(), value.clone());
      }
      state.in_flight.remove(key);
    }
    pending.complete(result);
  }
}

/// Builder for [`Webservice`].
pub struct WebserviceBuilder {
  provider: Option<UrlProvider>,
  policy: CachePolicy,
  transport: Option<Arc<dyn Transport>>,
  runtime: Option<Handle>,
  timeout: Duration,
  user_agent: String,
}

impl WebserviceBuilder {
  fn new() -> Self {
    Self {
      provider: None,
      policy: CachePolicy::default(),
      transport: None,
      runtime: None,
      timeout: DEFAULT_TIMEOUT,
      user_agent: DEFAULT_USER_AGENT.to_string(),
    }
  }

  /// Configure the provider up front instead of calling
  /// [`Webservice::configure`] later.
  pub fn provider(mut self, provider: UrlProvider) -> Self {
    self.provider = Some(provider);
    self
  }

  pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
    self.policy = policy;
    self
  }

  /// Replace the default reqwest transport.
  pub fn transport(mut self, transport: impl Transport) -> Self {
    self.transport = Some(Arc::new(transport));
    self
  }

  pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
    self.transport = Some(transport);
    self
  }

  /// Runtime that executes fetches. Defaults to the current runtime.
  pub fn runtime(mut self, runtime: Handle) -> Self {
    self.runtime = Some(runtime);
    self
  }

  /// Request timeout for the default transport.
  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// User agent for the default transport.
  pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
    self.user_agent = user_agent.into();
    self
  }

  pub fn build(self) -> Result<Webservice, LoadError> {
    let runtime = match self.runtime {
      Some(handle) => handle,
      None => Handle::try_current().map_err(|_| ConfigError::NoRuntime)?,
    };

    let transport: Arc<dyn Transport> = match self.transport {
      Some(transport) => transport,
      None => Arc::new(HttpTransport::new(self.timeout, &self.user_agent)?),
    };

    let provider = OnceLock::new();
    if let Some(p) = self.provider {
      info!(host = p.host(), "URL provider configured");
      let _ = provider.set(p);
    }

    debug!(policy = ?self.policy, "webservice created");

    Ok(Webservice {
      shared: Arc::new(Shared {
        provider,
        transport,
        runtime,
        state: Mutex::new(State {
          cache: MemoryStorage::new(self.policy),
          in_flight: HashMap::new(),
        }),
      }),
    })
  }
}

/// Loads [`Resource`]s with caching and in-flight deduplication.
#[derive(Clone)]
pub struct Webservice {
  shared: Arc<Shared>,
}

impl Webservice {
  pub fn builder() -> WebserviceBuilder {
    WebserviceBuilder::new()
  }

  /// Set the URL provider. May be done once; relative routes fail with
  /// [`ConfigError::ProviderUnset`] until it is.
  pub fn configure(&self, provider: UrlProvider) -> Result<(), ConfigError> {
    let host = provider.host().to_string();
    self
      .shared
      .provider
      .set(provider)
      .map_err(|_| ConfigError::AlreadyConfigured)?;
    info!(%host, "URL provider configured");
    Ok(())
  }

  pub fn provider(&self) -> Option<&UrlProvider> {
    self.shared.provider.get()
  }

  /// Load a resource, from cache when valid.
  ///
  /// Never blocks. A cache hit or a configuration failure returns a handle
  /// that is already complete.
  pub fn load<T>(&self, resource: &Resource<T>) -> Pending<T>
  where
    T: Clone + Send + Sync + 'static,
  {
    self.start(resource, Lookup::CacheFirst)
  }

  /// Load a resource from the network even if it is cached, replacing the
  /// entry on success. Joins a fetch already in flight for the same key.
  pub fn reload<T>(&self, resource: &Resource<T>) -> Pending<T>
  where
    T: Clone + Send + Sync + 'static,
  {
    self.start(resource, Lookup::Network)
  }

  /// Drop the cached entry for a resource. Returns whether one existed.
  pub fn invalidate<T: 'static>(&self, resource: &Resource<T>) -> bool {
    let Some(key) = self.key_for(resource) else {
      return false;
    };
    let removed = self.shared.lock_state().cache.remove(&key);
    if removed {
      debug!(key = %key, "cache entry invalidated");
    }
    removed
  }

  /// Whether a valid cache entry exists for a resource.
  ///
  /// Does not count as a use of the entry for LRU eviction.
  pub fn is_cached<T: 'static>(&self, resource: &Resource<T>) -> bool {
    self
      .key_for(resource)
      .map(|key| self.shared.lock_state().cache.is_valid(&key))
      .unwrap_or(false)
  }

  /// Drop every cached entry. Fetches in flight are unaffected.
  pub fn clear(&self) {
    self.shared.lock_state().cache.clear();
    debug!("cache cleared");
  }

  /// Drop expired entries eagerly. Returns how many were dropped.
  pub fn purge_expired(&self) -> usize {
    self.shared.lock_state().cache.purge_expired()
  }

  pub fn cached_len(&self) -> usize {
    self.shared.lock_state().cache.len()
  }

  pub fn in_flight_len(&self) -> usize {
    self.shared.lock_state().in_flight.len()
  }

  fn key_for<T: 'static>(&self, resource: &Resource<T>) -> Option<CacheKey> {
    let route = resource.route();
    let url = route.resolve(self.provider()).ok()?;
    Some(CacheKey::new::<T>(route.method(), &url))
  }

  fn start<T>(&self, resource: &Resource<T>, lookup: Lookup) -> Pending<T>
  where
    T: Clone + Send + Sync + 'static,
  {
    let route = resource.route();
    let url = match route.resolve(self.provider()) {
      Ok(url) => url,
      Err(e) => {
        warn!(error = %e, ?route, "cannot resolve route");
        return Pending::ready(format!("{:?}", route), Err(e.into()));
      }
    };
    let key = CacheKey::new::<T>(route.method(), &url);

    let pending = {
      let mut state = self.shared.lock_state();

      if lookup == Lookup::CacheFirst {
        if let Some(value) = state.cache.get::<T>(&key) {
          debug!(key = %key, fingerprint = %key.fingerprint(), "cache hit");
          return Pending::ready(url.as_str(), Ok(value));
        }
      }

      if let Some(existing) = state
        .in_flight
        .get(&key)
        .and_then(|entry| entry.downcast_ref::<Pending<T>>())
      {
        debug!(key = %key, fingerprint = %key.fingerprint(), "joining in-flight fetch");
        return existing.clone();
      }

      let pending = Pending::new(url.as_str());
      state.in_flight.insert(key.clone(), Box::new(pending.clone()));
      pending
    };

    debug!(key = %key, fingerprint = %key.fingerprint(), ?lookup, "starting fetch");
    self.spawn_fetch(key, url, resource.clone(), pending.clone());
    pending
  }

  fn spawn_fetch<T>(&self, key: CacheKey, url: url::Url, resource: Resource<T>, pending: Pending<T>)
  where
    T: Clone + Send + Sync + 'static,
  {
    let span = info_span!("fetch", fingerprint = %key.fingerprint(), url = %url);
    let request = FetchRequest {
      method: resource.route().method().clone(),
      url,
    };
    let transport = Arc::clone(&self.shared.transport);
    let guard = FetchGuard {
      shared: Arc::clone(&self.shared),
      key,
      pending: Some(pending),
    };

    self.shared.runtime.spawn(
      async move {
        let started = Instant::now();
        let result = match transport.fetch(request).await {
          Ok(body) => resource.decode(&body).map_err(LoadError::from),
          Err(e) => Err(LoadError::from(e)),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
          Ok(_) => info!(elapsed_ms, "fetch succeeded"),
          Err(e) => warn!(elapsed_ms, error = %e, "fetch failed"),
        }

        guard.finish(result);
      }
      .instrument(span),
    );
  }
}

impl fmt::Debug for Webservice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.shared.lock_state();
    f.debug_struct("Webservice")
      .field("provider", &self.provider().map(|p| p.base().as_str()))
      .field("policy", state.cache.policy())
      .field("cached", &state.cache.len())
      .field("in_flight", &state.in_flight.len())
      .finish()
  }
}

/// Owns the in-flight entry for a key until the fetch settles.
///
/// If the fetch task is dropped or panics before producing a result, the
/// subscribers are released with [`NetworkError::Aborted`].
struct FetchGuard<T>
where
  T: Clone + Send + Sync + 'static,
{
  shared: Arc<Shared>,
  key: CacheKey,
  pending: Option<Pending<T>>,
}

impl<T> FetchGuard<T>
where
  T: Clone + Send + Sync + 'static,
{
  fn finish(mut self, result: LoadResult<T>) {
    if let Some(pending) = self.pending.take() {
      self.shared.settle(&self.key, &pending, result);
    }
  }
}

impl<T> Drop for FetchGuard<T>
where
  T: Clone + Send + Sync + 'static,
{
  fn drop(&mut self) {
    if let Some(pending) = self.pending.take() {
      warn!(key = %self.key, "fetch ended without a result");
      let err = NetworkError::Aborted {
        url: self.key.address().to_string(),
      };
      self.shared.settle(&self.key, &pending, Err(err.into()));
    }
  }
}
