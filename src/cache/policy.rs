//! Validity and capacity rules for cached entries.

use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::Instant;

/// How long an entry stays valid after it is stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Expiry {
  /// Valid until replaced, invalidated, or evicted.
  #[default]
  Never,
  /// Valid for a fixed time after being stored.
  After(Duration),
}

/// Cache configuration. The default keeps every entry forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicy {
  pub expiry: Expiry,
  /// Upper bound on entries; the least recently used entry is evicted first.
  pub max_entries: Option<NonZeroUsize>,
}

impl CachePolicy {
  pub fn unbounded() -> Self {
    Self::default()
  }

  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.expiry = Expiry::After(ttl);
    self
  }

  pub fn with_max_entries(mut self, max_entries: NonZeroUsize) -> Self {
    self.max_entries = Some(max_entries);
    self
  }

  /// Whether an entry stored at `stored_at` is no longer valid at `now`.
  pub fn is_expired(&self, stored_at: Instant, now: Instant) -> bool {
    match self.expiry {
      Expiry::Never => false,
      Expiry::After(ttl) => now.saturating_duration_since(stored_at) >= ttl,
    }
  }
}
