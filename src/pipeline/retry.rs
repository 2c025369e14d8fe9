//! Retry budget and classification of attempt results.

use serde_json::Value;
use std::time::Duration;

use super::limiter::parse_retry_after;
use crate::discord::HttpResponse;
use crate::error::{RequestError, TransportError};

/// Linear backoff with a bounded number of failed attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  max_retries: u32,
  base_delay: Duration,
}

impl RetryPolicy {
  pub fn new(max_retries: u32, base_delay: Duration) -> Self {
    Self {
      max_retries,
      base_delay,
    }
  }

  /// Delay before the next attempt, given how many attempts have failed so far.
  ///
  /// Returns `None` once `failures` reaches the budget: the request is rejected.
  /// Retry `n` waits `base_delay * n`.
  pub fn next_delay(&self, failures: u32) -> Option<Duration> {
    if failures >= self.max_retries {
      return None;
    }
    Some(self.base_delay * failures)
  }
}

/// What a single dispatch produced.
#[derive(Debug)]
pub enum AttemptOutcome {
  /// 2xx with a decodable body.
  Success(Value),
  /// 429: wait this long, then try again without spending the budget.
  Throttled(Duration),
  /// Network error or non-2xx status; spends one unit of the budget.
  Retryable(RequestError),
  /// Settles the request immediately.
  Fatal(RequestError),
}

impl AttemptOutcome {
  /// Classify the transport's answer to one attempt.
  pub fn classify(result: Result<HttpResponse, TransportError>) -> Self {
    let response = match result {
      Ok(response) => response,
      Err(err) => return Self::Retryable(err.into()),
    };

    match response.status {
      429 => Self::Throttled(parse_retry_after(response.header("retry-after"))),
      200..=299 => {
        // Empty bodies (e.g. 204 No Content) decode to null
        if response.body.trim().is_empty() {
          return Self::Success(Value::Null);
        }
        match serde_json::from_str(&response.body) {
          Ok(value) => Self::Success(value),
          Err(err) => Self::Fatal(RequestError::Decode(err)),
        }
      }
      status => Self::Retryable(RequestError::Http {
        status,
        body: response.body,
      }),
    }
  }
}
