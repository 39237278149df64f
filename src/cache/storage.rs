//! In-memory storage of decoded results.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

use super::key::CacheKey;
use super::policy::CachePolicy;

/// A single stored value. Entries are replaced whole, never merged.
struct CachedEntry {
  value: Arc<dyn Any + Send + Sync>,
  stored_at: Instant,
  last_used: Instant,
}

/// Map from [`CacheKey`] to decoded value, governed by a [`CachePolicy`].
///
/// Not synchronized; the webservice keeps it behind the same lock as its
/// in-flight table.
pub struct MemoryStorage {
  policy: CachePolicy,
  entries: HashMap<CacheKey, CachedEntry>,
}

impl MemoryStorage {
  pub fn new(policy: CachePolicy) -> Self {
    Self {
      policy,
      entries: HashMap::new(),
    }
  }

  pub fn policy(&self) -> &CachePolicy {
    &self.policy
  }

  /// Look up a valid entry. Expired entries are dropped on access.
  pub fn get<T: Clone + 'static>(&mut self, key: &CacheKey) -> Option<T> {
    let now = Instant::now();
    let entry = self.entries.get_mut(key)?;

    if self.policy.is_expired(entry.stored_at, now) {
      debug!(key = %key, "cache entry expired");
      self.entries.remove(key);
      return None;
    }

    entry.last_used = now;
    entry.value.downcast_ref::<T>().cloned()
  }

  /// Store a value, replacing any previous entry for the key.
  ///
  /// Returns the key evicted to respect `max_entries`, if any.
  pub fn insert<T: Send + Sync + 'static>(&mut self, key: CacheKey, value: T) -> Option<CacheKey> {
    let now = Instant::now();
    self.entries.insert(
      key.clone(),
      CachedEntry {
        value: Arc::new(value),
        stored_at: now,
        last_used: now,
      },
    );

    let limit = self.policy.max_entries?.get();
    if self.entries.len() <= limit {
      return None;
    }

    let victim = self
      .entries
      .iter()
      .filter(|(k, _)| **k != key)
      .min_by_key(|(_, entry)| entry.last_used)
      .map(|(k, _)| k.clone())?;
    self.entries.remove(&victim);
    debug!(key = %victim, limit, "evicted least recently used entry");
    Some(victim)
  }

  /// Whether a valid entry exists. Does not count as a use, so LRU order
  /// and expired entries are left as they are.
  pub fn is_valid(&self, key: &CacheKey) -> bool {
    let now = Instant::now();
    self
      .entries
      .get(key)
      .is_some_and(|entry| !self.policy.is_expired(entry.stored_at, now))
  }

  pub fn contains(&self, key: &CacheKey) -> bool {
    self.entries.contains_key(key)
  }

  pub fn remove(&mut self, key: &CacheKey) -> bool {
    self.entries.remove(key).is_some()
  }

  /// Drop every expired entry. Returns how many were dropped.
  pub fn purge_expired(&mut self) -> usize {
    let now = Instant::now();
    let policy = self.policy;
    let before = self.entries.len();
    self
      .entries
      .retain(|_, entry| !policy.is_expired(entry.stored_at, now));
    before - self.entries.len()
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use reqwest::Method;
  use std::num::NonZeroUsize;
  use std::time::Duration;
  use url::Url;

  fn key<T: 'static>(path: &str) -> CacheKey {
    let url = Url::parse(&format!("https://example.com/{}", path)).unwrap();
    CacheKey::new::<T>(&Method::GET, &url)
  }

  #[test]
  fn test_insert_then_get() {
    let mut storage = MemoryStorage::new(CachePolicy::unbounded());
    storage.insert(key::<Vec<u32>>("albums"), vec![1, 2]);
    assert_eq!(storage.get::<Vec<u32>>(&key::<Vec<u32>>("albums")), Some(vec![1, 2]));
    assert_eq!(storage.len(), 1);
  }

  #[test]
  fn test_insert_replaces_not_merges() {
    let mut storage = MemoryStorage::new(CachePolicy::unbounded());
    storage.insert(key::<Vec<u32>>("albums"), vec![1, 2]);
    storage.insert(key::<Vec<u32>>("albums"), vec![3]);
    assert_eq!(storage.get::<Vec<u32>>(&key::<Vec<u32>>("albums")), Some(vec![3]));
    assert_eq!(storage.len(), 1);
  }

  #[test]
  fn test_types_do_not_collide() {
    let mut storage = MemoryStorage::new(CachePolicy::unbounded());
    storage.insert(key::<u32>("users/1"), 1u32);
    assert_eq!(storage.get::<String>(&key::<String>("users/1")), None);
  }

  #[tokio::test(start_paused = true)]
  async fn test_ttl_expiry() {
    let policy = CachePolicy::default().with_ttl(Duration::from_secs(30));
    let mut storage = MemoryStorage::new(policy);
    storage.insert(key::<u32>("todos"), 5u32);

    tokio::time::advance(Duration::from_secs(29)).await;
    assert_eq!(storage.get::<u32>(&key::<u32>("todos")), Some(5));

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(storage.get::<u32>(&key::<u32>("todos")), None);
    assert!(storage.is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn test_purge_expired() {
    let policy = CachePolicy::default().with_ttl(Duration::from_secs(10));
    let mut storage = MemoryStorage::new(policy);
    storage.insert(key::<u32>("a"), 1u32);
    tokio::time::advance(Duration::from_secs(5)).await;
    storage.insert(key::<u32>("b"), 2u32);
    tokio::time::advance(Duration::from_secs(5)).await;

    assert_eq!(storage.purge_expired(), 1);
    assert!(storage.contains(&key::<u32>("b")));
  }

  #[tokio::test(start_paused = true)]
  async fn test_lru_eviction() {
    let policy = CachePolicy::default().with_max_entries(NonZeroUsize::new(2).unwrap());
    let mut storage = MemoryStorage::new(policy);

    storage.insert(key::<u32>("a"), 1u32);
    tokio::time::advance(Duration::from_millis(1)).await;
    storage.insert(key::<u32>("b"), 2u32);
    tokio::time::advance(Duration::from_millis(1)).await;

    // Touch "a" so "b" becomes least recently used.
    assert_eq!(storage.get::<u32>(&key::<u32>("a")), Some(1));
    tokio::time::advance(Duration::from_millis(1)).await;

    let evicted = storage.insert(key::<u32>("c"), 3u32);
    assert_eq!(evicted, Some(key::<u32>("b")));
    assert!(storage.contains(&key::<u32>("a")));
    assert!(storage.contains(&key::<u32>("c")));
    assert_eq!(storage.len(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_is_valid_leaves_lru_order() {
    let policy = CachePolicy::default()
      .with_ttl(Duration::from_secs(60))
      .with_max_entries(NonZeroUsize::new(2).unwrap());
    let mut storage = MemoryStorage::new(policy);

    storage.insert(key::<u32>("a"), 1u32);
    tokio::time::advance(Duration::from_millis(1)).await;
    storage.insert(key::<u32>("b"), 2u32);
    tokio::time::advance(Duration::from_millis(1)).await;

    // Checking "a" must not make "b" the eviction victim.
    assert!(storage.is_valid(&key::<u32>("a")));
    let evicted = storage.insert(key::<u32>("c"), 3u32);
    assert_eq!(evicted, Some(key::<u32>("a")));

    tokio::time::advance(Duration::from_secs(60)).await;
    assert!(!storage.is_valid(&key::<u32>("b")));
    assert!(storage.contains(&key::<u32>("b")));
  }
}
