//! The HTTP boundary of the pipeline.

use futures::future::BoxFuture;
use reqwest::Method;
use std::collections::HashMap;
use url::Url;

use crate::error::TransportError;

/// One outbound HTTP call.
#[derive(Debug, Clone)]
pub struct HttpRequest {
  pub method: Method,
  pub url: Url,
  /// Header names are lowercase
  pub headers: Vec<(String, String)>,
  pub body: Option<String>,
}

impl HttpRequest {
  /// Case-insensitive header lookup; the last value wins.
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .rev()
      .find(|(n, _)| n.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }
}

/// What the server answered.
#[derive(Debug, Clone)]
pub struct HttpResponse {
  pub status: u16,
  /// Header names are lowercase
  pub headers: HashMap<String, String>,
  pub body: String,
}

impl HttpResponse {
  /// Case-insensitive header lookup.
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .get(&name.to_ascii_lowercase())
      .map(String::as_str)
  }
}

/// Sends requests on behalf of the dispatch loop.
///
/// Timeouts are the transport's business; the queue never aborts a call.
pub trait Transport: Send + Sync + 'static {
  fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>>;
}

/// Production transport backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
  client: reqwest::Client,
}

impl ReqwestTransport {
  pub fn new() -> Result<Self, TransportError> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("cordq/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| TransportError(format!("Failed to build HTTP client: {}", e)))?;

    Ok(Self { client })
  }
}

impl Transport for ReqwestTransport {
  fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
    Box::pin(async move {
      let mut builder = self.client.request(request.method, request.url);
      for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
      }
      if let Some(body) = request.body {
        builder = builder.body(body);
      }

      let response = builder
        .send()
        .await
        .map_err(|e| TransportError(e.to_string()))?;

      let status = response.status().as_u16();
      let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
          value
            .to_str()
            .ok()
            .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
      let body = response
        .text()
        .await
        .map_err(|e| TransportError(format!("Failed to read response body: {}", e)))?;

      Ok(HttpResponse {
        status,
        headers,
        body,
      })
    })
  }
}
