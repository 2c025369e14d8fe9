/// Errors surfaced to callers of the request pipeline.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
  /// The transport failed before producing a response.
  #[error("transport error: {0}")]
  Transport(String),

  /// The server answered with a non-2xx status other than 429 on the final attempt.
  #[error("HTTP {status}: {body}")]
  Http {
    /// Status code of the last response.
    status: u16,
    /// Body text of the last response.
    body: String,
  },

  /// A successful response body could not be decoded.
  #[error("failed to decode response: {0}")]
  Decode(#[from] serde_json::Error),

  /// The base URL and endpoint path do not form a valid URL.
  #[error("invalid request URL: {0}")]
  InvalidUrl(#[from] url::ParseError),

  /// The dispatch loop went away without settling the request.
  #[error("request queue closed before the request settled")]
  QueueClosed,
}

/// Failure reported by a [`Transport`](crate::discord::Transport).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<TransportError> for RequestError {
  fn from(err: TransportError) -> Self {
    Self::Transport(err.0)
  }
}
