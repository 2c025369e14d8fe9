//! The outbound request pipeline.
//!
//! - [`RateLimiter`] spaces dispatches and tracks server cool-downs
//! - [`RetryPolicy`] bounds and paces retries of failed attempts
//! - the request queue runs one request at a time through both

mod limiter;
mod queue;
mod retry;

pub use limiter::{parse_retry_after, RateLimiter, DEFAULT_RETRY_AFTER, MAX_RETRY_AFTER};
pub(crate) use queue::{Dispatcher, RequestQueue};
pub use retry::{AttemptOutcome, RetryPolicy};
