//! Single-flight request queue and its dispatch loop.

use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::{debug, warn};
use url::Url;

use super::limiter::RateLimiter;
use super::retry::{AttemptOutcome, RetryPolicy};
use crate::cache::{CacheKey, TtlCache};
use crate::clock::Clock;
use crate::discord::{EndpointDescriptor, HttpRequest, Transport};
use crate::error::RequestError;

type Responder = oneshot::Sender<Result<Value, RequestError>>;

/// A request waiting for (or undergoing) dispatch.
struct QueuedJob {
  endpoint: EndpointDescriptor,
  url: Url,
  key: CacheKey,
  /// Failed attempts so far; 429s are not counted
  failures: u32,
  responder: Responder,
}

impl QueuedJob {
  fn settle(self, result: Result<Value, RequestError>) {
    // The caller may have stopped waiting
    let _ = self.responder.send(result);
  }
}

struct QueueState {
  jobs: VecDeque<QueuedJob>,
  processing: bool,
  limiter: RateLimiter,
}

/// Everything the dispatch loop needs besides the queue itself.
pub(crate) struct Dispatcher {
  pub(crate) transport: Arc<dyn Transport>,
  pub(crate) clock: Arc<dyn Clock>,
  pub(crate) cache: Arc<TtlCache<CacheKey, Value>>,
  pub(crate) retry: RetryPolicy,
  pub(crate) token: String,
}

/// FIFO of pending requests, drained by at most one dispatch loop.
///
/// Retried and throttled requests go back to the front, so they are attempted
/// before anything that arrived after them.
#[derive(Clone)]
pub(crate) struct RequestQueue {
  state: Arc<Mutex<QueueState>>,
  dispatcher: Arc<Dispatcher>,
}

impl RequestQueue {
  pub(crate) fn new(dispatcher: Dispatcher, limiter: RateLimiter) -> Self {
    Self {
      state: Arc::new(Mutex::new(QueueState {
        jobs: VecDeque::new(),
        processing: false,
        limiter,
      })),
      dispatcher: Arc::new(dispatcher),
    }
  }

  /// Enqueue a request and wait until it succeeds or fails for good.
  pub(crate) async fn submit(
    &self,
    endpoint: EndpointDescriptor,
    url: Url,
    key: CacheKey,
  ) -> Result<Value, RequestError> {
    let (tx, rx) = oneshot::channel();

    let start_loop = {
      let mut state = self.lock();
      debug!(
        method = %endpoint.method(),
        path = endpoint.path(),
        queued = state.jobs.len(),
        "enqueue request"
      );
      state.jobs.push_back(QueuedJob {
        endpoint,
        url,
        key,
        failures: 0,
        responder: tx,
      });
      !std::mem::replace(&mut state.processing, true)
    };

    if start_loop {
      let queue = self.clone();
      tokio::spawn(async move { queue.run().await });
    }

    rx.await.map_err(|_| RequestError::QueueClosed)?
  }

  /// Number of requests waiting for dispatch.
  pub(crate) fn pending(&self) -> usize {
    self.lock().jobs.len()
  }

  #[cfg(test)]
  pub(crate) fn is_processing(&self) -> bool {
    self.lock().processing
  }

  /// The dispatch loop. Runs until the queue is empty.
  async fn run(self) {
    let mut guard = ProcessingGuard {
      state: &self.state,
      armed: true,
    };
    let dispatcher = &self.dispatcher;

    loop {
      let delay = {
        let mut state = self.lock();
        if state.jobs.is_empty() {
          state.processing = false;
          guard.armed = false;
          return;
        }
        let now = dispatcher.clock.now();
        state.limiter.delay_before_dispatch(now)
      };
      if !delay.is_zero() {
        dispatcher.clock.sleep(delay).await;
      }

      let next = self.lock().jobs.pop_front();
      let Some(mut job) = next else {
        continue;
      };

      let dispatched_at = dispatcher.clock.now();
      debug!(
        method = %job.endpoint.method(),
        path = job.endpoint.path(),
        failures = job.failures,
        "dispatching request"
      );
      let result = dispatcher.transport.send(dispatcher.http_request(&job)).await;

      match AttemptOutcome::classify(result) {
        AttemptOutcome::Success(value) => {
          // An empty body has nothing worth serving from the cache
          if !value.is_null() {
            dispatcher.cache.set(job.key.clone(), value.clone());
          }
          self.lock().limiter.record_success(dispatched_at);
          job.settle(Ok(value));
        }
        AttemptOutcome::Throttled(retry_after) => {
          warn!(
            path = job.endpoint.path(),
            retry_after_ms = retry_after.as_millis() as u64,
            "rate limited by server, cooling down"
          );
          let mut state = self.lock();
          let now = dispatcher.clock.now();
          state.limiter.throttle(now, retry_after);
          state.jobs.push_front(job);
        }
        AttemptOutcome::Retryable(err) => {
          job.failures += 1;
          match dispatcher.retry.next_delay(job.failures) {
            Some(delay) => {
              warn!(
                path = job.endpoint.path(),
                failures = job.failures,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "request failed, retrying"
              );
              dispatcher.clock.sleep(delay).await;
              self.lock().jobs.push_front(job);
            }
            None => {
              debug!(path = job.endpoint.path(), error = %err, "retry budget exhausted");
              job.settle(Err(err));
            }
          }
        }
        AttemptOutcome::Fatal(err) => {
          debug!(path = job.endpoint.path(), error = %err, "request failed without retry");
          job.settle(Err(err));
        }
      }
    }
  }

  fn lock(&self) -> MutexGuard<'_, QueueState> {
    lock_state(&self.state)
  }
}

impl Dispatcher {
  /// Wire shape of a job: default headers first, caller headers override them.
  fn http_request(&self, job: &QueuedJob) -> HttpRequest {
    let mut headers = BTreeMap::new();
    headers.insert("authorization".to_string(), self.token.clone());
    headers.insert("content-type".to_string(), "application/json".to_string());
    for (name, value) in job.endpoint.headers() {
      headers.insert(name.clone(), value.clone());
    }

    HttpRequest {
      method: job.endpoint.method().clone(),
      url: job.url.clone(),
      headers: headers.into_iter().collect(),
      body: job.endpoint.body().map(String::from),
    }
  }
}

fn lock_state(state: &Mutex<QueueState>) -> MutexGuard<'_, QueueState> {
  // Critical sections never leave the queue half-updated
  state
    .lock()
    .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Resets the queue if the dispatch loop dies (panic or runtime shutdown).
///
/// Dropping the pending jobs closes their channels, so waiting callers get
/// [`RequestError::QueueClosed`] instead of hanging.
struct ProcessingGuard<'a> {
  state: &'a Mutex<QueueState>,
  armed: bool,
}

impl Drop for ProcessingGuard<'_> {
  fn drop(&mut self) {
    if self.armed {
      let mut state = lock_state(self.state);
      state.processing = false;
      state.jobs.clear();
    }
  }
}
