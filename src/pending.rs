//! One-shot, multi-subscriber delivery of a load result.
//!
//! A [`Pending<T>`] is handed out by [`Webservice::load`](crate::Webservice::load).
//! Consumers react to the terminal result in whichever style suits them:
//!
//! ```ignore
//! // Callback: runs once, when the fetch resolves.
//! webservice.load(&User::all()).on_result(|result| match result {
//!     Ok(users) => show(users),
//!     Err(e) => report(e),
//! });
//!
//! // Async: await the result.
//! let users = webservice.load(&User::all()).wait().await?;
//!
//! // Polling: check in an event loop tick.
//! if let Some(result) = pending.try_result() { /* ... */ }
//! ```
//!
//! Delivery rules:
//! - every registered callback fires at most once, and exactly once if it is
//!   not cancelled before the result arrives;
//! - registering after the result is known runs the callback synchronously,
//!   on the registering thread, before `on_result` returns;
//! - registering before runs the callback on the thread that completes the
//!   load (a runtime worker for network fetches).

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::warn;

use crate::error::{LoadError, NetworkError};

/// Terminal outcome of a load.
pub type LoadResult<T> = Result<T, LoadError>;

type Callback<T> = Box<dyn FnOnce(LoadResult<T>) + Send>;

/// Handle to one registered callback, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

enum Slot<T> {
  Waiting {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, Callback<T>)>,
  },
  Done(LoadResult<T>),
}

struct Inner<T> {
  /// Address of the load, for diagnostics.
  label: String,
  slot: Mutex<Slot<T>>,
}

/// A cloneable handle on a result that is produced exactly once.
pub struct Pending<T> {
  inner: Arc<Inner<T>>,
}

impl<T: Clone + Send + 'static> Pending<T> {
  pub(crate) fn new(label: impl Into<String>) -> Self {
    Self::with_slot(
      label,
      Slot::Waiting {
        next_id: 0,
        callbacks: Vec::new(),
      },
    )
  }

  /// A handle whose result is already known.
  pub fn ready(label: impl Into<String>, result: LoadResult<T>) -> Self {
    Self::with_slot(label, Slot::Done(result))
  }

  fn with_slot(label: impl Into<String>, slot: Slot<T>) -> Self {
    Self {
      inner: Arc::new(Inner {
        label: label.into(),
        slot: Mutex::new(slot),
      }),
    }
  }

  fn lock(&self) -> MutexGuard<'_, Slot<T>> {
    self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn label(&self) -> &str {
    &self.inner.label
  }

  /// Register interest in the result.
  ///
  /// Returns `None` when the result was already available, in which case the
  /// callback has already run by the time this returns.
  pub fn on_result<F>(&self, callback: F) -> Option<SubscriptionId>
  where
    F: FnOnce(LoadResult<T>) + Send + 'static,
  {
    let result = {
      let mut slot = self.lock();
      match &mut *slot {
        Slot::Waiting { next_id, callbacks } => {
          let id = SubscriptionId(*next_id);
          *next_id += 1;
          callbacks.push((id, Box::new(callback)));
          return Some(id);
        }
        Slot::Done(result) => result.clone(),
      }
    };

    callback(result);
    None
  }

  /// Drop one subscriber. The load itself and other subscribers are
  /// unaffected. Returns `false` if the callback already ran or was unknown.
  pub fn cancel(&self, id: SubscriptionId) -> bool {
    match &mut *self.lock() {
      Slot::Waiting { callbacks, .. } => {
        let before = callbacks.len();
        callbacks.retain(|(registered, _)| *registered != id);
        callbacks.len() != before
      }
      Slot::Done(_) => false,
    }
  }

  /// Non-blocking check for the result.
  pub fn try_result(&self) -> Option<LoadResult<T>> {
    match &*self.lock() {
      Slot::Done(result) => Some(result.clone()),
      Slot::Waiting { .. } => None,
    }
  }

  pub fn is_complete(&self) -> bool {
    matches!(&*self.lock(), Slot::Done(_))
  }

  /// Number of callbacks still waiting for delivery.
  pub fn subscriber_count(&self) -> usize {
    match &*self.lock() {
      Slot::Waiting { callbacks, .. } => callbacks.len(),
      Slot::Done(_) => 0,
    }
  }

  /// Wait for the result without blocking the executor.
  pub async fn wait(&self) -> LoadResult<T> {
    let (tx, rx) = oneshot::channel();
    self.on_result(move |result| {
      // Receiver is only gone if the waiting future was dropped.
      let _ = tx.send(result);
    });

    rx.await.unwrap_or_else(|_| {
      Err(
        NetworkError::Aborted {
          url: self.label().to_string(),
        }
        .into(),
      )
    })
  }

  /// Store the result and notify every subscriber.
  ///
  /// Only the first call has any effect; later calls return `false`.
  pub(crate) fn complete(&self, result: LoadResult<T>) -> bool {
    let callbacks = {
      let mut slot = self.lock();
      if matches!(&*slot, Slot::Done(_)) {
        return false;
      }
      match std::mem::replace(&mut *slot, Slot::Done(result.clone())) {
        Slot::Waiting { callbacks, .. } => callbacks,
        Slot::Done(_) => Vec::new(),
      }
    };

    // Callbacks run outside the lock so they may register or poll freely.
    // A panicking callback must not cost later subscribers their delivery.
    for (id, callback) in callbacks {
      let delivery = result.clone();
      if panic::catch_unwind(AssertUnwindSafe(move || callback(delivery))).is_err() {
        warn!(label = %self.inner.label, subscription = id.0, "result callback panicked");
      }
    }
    true
  }
}

impl<T> Clone for Pending<T> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<T> fmt::Debug for Pending<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let complete = matches!(
      &*self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner),
      Slot::Done(_)
    );
    f.debug_struct("Pending")
      .field("label", &self.inner.label)
      .field("complete", &complete)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::time::Duration;

  fn counter() -> Arc<AtomicU32> {
    Arc::new(AtomicU32::new(0))
  }

  #[test]
  fn test_ready_result_fires_synchronously() {
    let pending = Pending::ready("users", Ok(7));
    let seen = counter();
    let seen_clone = seen.clone();

    let id = pending.on_result(move |result| {
      seen_clone.store(result.unwrap(), Ordering::SeqCst);
    });

    assert!(id.is_none());
    assert_eq!(seen.load(Ordering::SeqCst), 7);
  }

  #[test]
  fn test_every_subscriber_notified_once() {
    let pending: Pending<u32> = Pending::new("users");
    let calls = counter();

    for _ in 0..3 {
      let calls = calls.clone();
      pending.on_result(move |result| {
        assert_eq!(result, Ok(1));
        calls.fetch_add(1, Ordering::SeqCst);
      });
    }
    assert_eq!(pending.subscriber_count(), 3);

    assert!(pending.complete(Ok(1)));
    assert!(!pending.complete(Ok(2)));

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(pending.try_result(), Some(Ok(1)));
  }

  #[test]
  fn test_cancel_leaves_other_subscribers() {
    let pending: Pending<u32> = Pending::new("albums");
    let cancelled = counter();
    let kept = counter();

    let cancelled_clone = cancelled.clone();
    let id = pending
      .on_result(move |_| {
        cancelled_clone.fetch_add(1, Ordering::SeqCst);
      })
      .unwrap();
    let kept_clone = kept.clone();
    pending.on_result(move |_| {
      kept_clone.fetch_add(1, Ordering::SeqCst);
    });

    assert!(pending.cancel(id));
    assert!(!pending.cancel(id));
    pending.complete(Ok(3));

    assert_eq!(cancelled.load(Ordering::SeqCst), 0);
    assert_eq!(kept.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_panicking_callback_does_not_skip_later_ones() {
    let pending: Pending<u32> = Pending::new("comments");
    let calls = counter();

    pending.on_result(|_| panic!("subscriber failed"));
    let calls_clone = calls.clone();
    pending.on_result(move |result| {
      assert_eq!(result, Ok(4));
      calls_clone.fetch_add(1, Ordering::SeqCst);
    });

    assert!(pending.complete(Ok(4)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(pending.try_result(), Some(Ok(4)));
  }

  #[test]
  fn test_try_result_polls() {
    let pending: Pending<&'static str> = Pending::new("todos");
    assert!(pending.try_result().is_none());
    assert!(!pending.is_complete());

    pending.complete(Err(NetworkError::Timeout { url: "todos".to_string() }.into()));

    assert!(pending.is_complete());
    assert!(pending.try_result().unwrap().unwrap_err().is_network());
  }

  #[tokio::test]
  async fn test_wait_resolves_from_another_task() {
    let pending: Pending<Vec<u32>> = Pending::new("photos");
    let completer = pending.clone();

    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(10)).await;
      completer.complete(Ok(vec![1, 2, 3]));
    });

    assert_eq!(pending.wait().await, Ok(vec![1, 2, 3]));
    // A late waiter sees the same result.
    assert_eq!(pending.wait().await, Ok(vec![1, 2, 3]));
  }
}
