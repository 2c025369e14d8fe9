//! Time source used by the cache and the request queue.
//!
//! Everything that waits or reads the current time goes through a [`Clock`],
//! so tests can run against tokio's paused clock instead of sleeping.

use futures::future::BoxFuture;
use std::time::Duration;
use tokio::time::Instant;

/// Source of the current instant and of timed suspensions.
pub trait Clock: Send + Sync + 'static {
  /// The current instant.
  fn now(&self) -> Instant;

  /// A future that completes after `duration` has elapsed.
  fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Clock backed by `tokio::time`.
///
/// Honors `tokio::time::pause`, which is what the tests rely on.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
  fn now(&self) -> Instant {
    Instant::now()
  }

  fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
    Box::pin(tokio::time::sleep(duration))
  }
}
