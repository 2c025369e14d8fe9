//! Dispatch spacing and server-signaled cool-downs.

use std::time::Duration;
use tokio::time::Instant;

/// Cool-down applied when a 429 carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Longest cool-down a single 429 can impose.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(60 * 60);

/// Spacing state for one client.
///
/// Only successful dispatches move the spacing window; a failed attempt does
/// not earn a fresh window.
#[derive(Debug, Clone)]
pub struct RateLimiter {
  min_spacing: Duration,
  last_dispatch: Option<Instant>,
  cooldown_until: Option<Instant>,
}

impl RateLimiter {
  pub fn new(min_spacing: Duration) -> Self {
    Self {
      min_spacing,
      last_dispatch: None,
      cooldown_until: None,
    }
  }

  /// How long the dispatch loop must wait before sending the next request.
  ///
  /// An active cool-down takes precedence over the spacing rule.
  pub fn delay_before_dispatch(&mut self, now: Instant) -> Duration {
    let spacing = match self.last_dispatch {
      Some(last) => self
        .min_spacing
        .saturating_sub(now.saturating_duration_since(last)),
      None => Duration::ZERO,
    };

    let cooldown = match self.cooldown_until {
      Some(until) if until > now => until - now,
      Some(_) => {
        self.cooldown_until = None;
        Duration::ZERO
      }
      None => Duration::ZERO,
    };

    spacing.max(cooldown)
  }

  /// Commit a successful dispatch that was sent at `dispatched_at`.
  pub fn record_success(&mut self, dispatched_at: Instant) {
    self.last_dispatch = Some(dispatched_at);
  }

  /// Hold all dispatches until `retry_after` past `now`.
  pub fn throttle(&mut self, now: Instant, retry_after: Duration) {
    let until = now
      .checked_add(retry_after)
      .or_else(|| now.checked_add(MAX_RETRY_AFTER))
      .unwrap_or(now);
    // never shorten a longer cool-down already in force
    if self.cooldown_until.map_or(true, |current| until > current) {
      self.cooldown_until = Some(until);
    }
  }

  pub fn cooldown_until(&self) -> Option<Instant> {
    self.cooldown_until
  }

  pub fn last_dispatch(&self) -> Option<Instant> {
    self.last_dispatch
  }
}

/// Parse a `Retry-After` header value given in (possibly fractional) seconds.
///
/// Absent, negative or unparsable values fall back to [`DEFAULT_RETRY_AFTER`].
/// Anything longer than [`MAX_RETRY_AFTER`] is capped.
pub fn parse_retry_after(value: Option<&str>) -> Duration {
  value
    .and_then(|v| v.trim().parse::<f64>().ok())
    .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    .map(|delay| delay.min(MAX_RETRY_AFTER))
    .unwrap_or(DEFAULT_RETRY_AFTER)
}

#[cfg(test)]
mod tests {
  use super::*;

  const SPACING: Duration = Duration::from_millis(500);

  #[test]
  fn test_first_dispatch_is_immediate() {
    let mut limiter = RateLimiter::new(SPACING);
    assert_eq!(limiter.delay_before_dispatch(Instant::now()), Duration::ZERO);
  }

  #[test]
  fn test_spacing_after_success() {
    let mut limiter = RateLimiter::new(SPACING);
    let t0 = Instant::now();
    limiter.record_success(t0);

    assert_eq!(limiter.delay_before_dispatch(t0), SPACING);
    assert_eq!(
      limiter.delay_before_dispatch(t0 + Duration::from_millis(200)),
      Duration::from_millis(300)
    );
    assert_eq!(
      limiter.delay_before_dispatch(t0 + Duration::from_secs(2)),
      Duration::ZERO
    );
  }

  #[test]
  fn test_failures_do_not_move_window() {
    let mut limiter = RateLimiter::new(SPACING);
    let t0 = Instant::now();
    limiter.record_success(t0);

    // A failed attempt at t0+400 is never recorded, so only 100ms remain.
    let now = t0 + Duration::from_millis(400);
    assert_eq!(limiter.delay_before_dispatch(now), Duration::from_millis(100));
    assert_eq!(limiter.last_dispatch(), Some(t0));
  }

  #[test]
  fn test_cooldown_overrides_spacing() {
    let mut limiter = RateLimiter::new(SPACING);
    let t0 = Instant::now();
    limiter.record_success(t0);
    limiter.throttle(t0, Duration::from_secs(2));

    assert_eq!(limiter.delay_before_dispatch(t0), Duration::from_secs(2));
    assert_eq!(
      limiter.delay_before_dispatch(t0 + Duration::from_millis(1500)),
      Duration::from_millis(500)
    );

    // Elapsed cool-downs are forgotten.
    assert_eq!(
      limiter.delay_before_dispatch(t0 + Duration::from_secs(3)),
      Duration::ZERO
    );
    assert_eq!(limiter.cooldown_until(), None);
  }

  #[test]
  fn test_shorter_throttle_keeps_longer_cooldown() {
    let mut limiter = RateLimiter::new(SPACING);
    let t0 = Instant::now();
    limiter.throttle(t0, Duration::from_secs(5));
    limiter.throttle(t0, Duration::from_secs(1));

    assert_eq!(limiter.cooldown_until(), Some(t0 + Duration::from_secs(5)));
  }

  #[test]
  fn test_parse_retry_after() {
    assert_eq!(parse_retry_after(Some("2")), Duration::from_secs(2));
    assert_eq!(parse_retry_after(Some(" 0.25 ")), Duration::from_millis(250));
    assert_eq!(parse_retry_after(None), DEFAULT_RETRY_AFTER);
    assert_eq!(parse_retry_after(Some("soon")), DEFAULT_RETRY_AFTER);
    assert_eq!(parse_retry_after(Some("-3")), DEFAULT_RETRY_AFTER);
    assert_eq!(parse_retry_after(Some("NaN")), DEFAULT_RETRY_AFTER);
    assert_eq!(parse_retry_after(Some("inf")), DEFAULT_RETRY_AFTER);
  }

  #[test]
  fn test_huge_retry_after_is_capped() {
    assert_eq!(parse_retry_after(Some("7200")), MAX_RETRY_AFTER);
    assert_eq!(parse_retry_after(Some("1e19")), MAX_RETRY_AFTER);
    assert_eq!(parse_retry_after(Some("1e20")), MAX_RETRY_AFTER);
  }

  #[test]
  fn test_throttle_saturates_on_overflow() {
    let mut limiter = RateLimiter::new(SPACING);
    let t0 = Instant::now();
    limiter.throttle(t0, Duration::MAX);

    assert_eq!(limiter.cooldown_until(), Some(t0 + MAX_RETRY_AFTER));
    assert_eq!(limiter.delay_before_dispatch(t0), MAX_RETRY_AFTER);
  }
}
