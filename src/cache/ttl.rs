//! In-memory key/value cache with per-entry expiry.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::trace;

use crate::clock::Clock;

/// A cached value together with the moment it was stored.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
  value: V,
  stored_at: Instant,
  ttl: Duration,
}

impl<V> CacheEntry<V> {
  fn is_expired(&self, now: Instant) -> bool {
    now.saturating_duration_since(self.stored_at) > self.ttl
  }
}

/// Scheduled eviction for one key.
struct EvictionTimer {
  generation: u64,
  handle: AbortHandle,
}

struct Entries<K, V> {
  data: HashMap<K, CacheEntry<V>>,
  timers: HashMap<K, EvictionTimer>,
  next_generation: u64,
}

impl<K: Eq + Hash, V> Entries<K, V> {
  fn cancel_timer(&mut self, key: &K) {
    if let Some(timer) = self.timers.remove(key) {
      timer.handle.abort();
    }
  }
}

/// Cache whose entries disappear `ttl` after they were stored.
///
/// Expiry is enforced twice: a background timer removes each entry when its
/// ttl elapses, and [`get`](Self::get) refuses (and removes) any entry that is
/// past its ttl even if that timer has not fired yet.
///
/// `set` spawns the eviction timer on the current tokio runtime.
pub struct TtlCache<K, V> {
  entries: Arc<Mutex<Entries<K, V>>>,
  clock: Arc<dyn Clock>,
  default_ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
  K: Eq + Hash + Clone + Send + 'static,
  V: Clone + Send + 'static,
{
  pub fn new(clock: Arc<dyn Clock>, default_ttl: Duration) -> Self {
    Self {
      entries: Arc::new(Mutex::new(Entries {
        data: HashMap::new(),
        timers: HashMap::new(),
        next_generation: 0,
      })),
      clock,
      default_ttl,
    }
  }

  /// Store `value` under `key` with the default ttl.
  pub fn set(&self, key: K, value: V) {
    self.set_with_ttl(key, value, self.default_ttl);
  }

  /// Store `value` under `key`, replacing any previous entry and its timer.
  pub fn set_with_ttl(&self, key: K, value: V, ttl: Duration) {
    let mut entries = self.lock();

    entries.cancel_timer(&key);
    entries.data.insert(
      key.clone(),
      CacheEntry {
        value,
        stored_at: self.clock.now(),
        ttl,
      },
    );

    let generation = entries.next_generation;
    entries.next_generation += 1;

    let sleep = self.clock.sleep(ttl);
    let weak = Arc::downgrade(&self.entries);
    let timer_key = key.clone();
    let task = tokio::spawn(async move {
      sleep.await;
      evict_if_current(&weak, &timer_key, generation);
    });

    entries.timers.insert(
      key,
      EvictionTimer {
        generation,
        handle: task.abort_handle(),
      },
    );
  }

  /// Look up `key`. Returns `None` when absent or expired.
  pub fn get(&self, key: &K) -> Option<V> {
    let mut entries = self.lock();
    let now = self.clock.now();

    let expired = match entries.data.get(key) {
      None => return None,
      Some(entry) => entry.is_expired(now),
    };

    if expired {
      trace!("evicting expired cache entry on read");
      entries.data.remove(key);
      entries.cancel_timer(key);
      return None;
    }

    entries.data.get(key).map(|entry| entry.value.clone())
  }

  /// Drop every entry and cancel every pending eviction.
  pub fn clear(&self) {
    let mut entries = self.lock();
    entries.data.clear();
    for (_, timer) in entries.timers.drain() {
      timer.handle.abort();
    }
  }

  /// Number of stored entries, including expired ones not yet evicted.
  pub fn len(&self) -> usize {
    self.lock().data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn lock(&self) -> MutexGuard<'_, Entries<K, V>> {
    // Every critical section leaves the maps consistent, so a poisoned lock is still usable.
    self
      .entries
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

impl<K, V> Drop for TtlCache<K, V> {
  fn drop(&mut self) {
    let mut entries = self
      .entries
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    for (_, timer) in entries.timers.drain() {
      timer.handle.abort();
    }
  }
}

/// Body of an eviction timer: remove `key` unless it was overwritten since.
fn evict_if_current<K: Eq + Hash, V>(
  entries: &Weak<Mutex<Entries<K, V>>>,
  key: &K,
  generation: u64,
) {
  let Some(entries) = entries.upgrade() else {
    return;
  };
  let mut entries = entries
    .lock()
    .unwrap_or_else(|poisoned| poisoned.into_inner());

  let current = entries
    .timers
    .get(key)
    .is_some_and(|timer| timer.generation == generation);
  if current {
    entries.timers.remove(key);
    entries.data.remove(key);
  }
}
