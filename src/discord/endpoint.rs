//! Endpoint descriptors and per-request options.

use reqwest::Method;
use serde_json::Value;
use std::collections::BTreeMap;

/// Immutable description of one API call.
///
/// Two descriptors are the same request, and share a cache entry, when path,
/// method, body and headers are all equal. Header names are stored lowercased
/// so that equality ignores their case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
  path: String,
  method: Method,
  body: Option<String>,
  headers: BTreeMap<String, String>,
}

impl EndpointDescriptor {
  /// Build a descriptor for `path` from caller options.
  pub fn from_options(path: impl Into<String>, options: &RequestOptions) -> Self {
    Self {
      path: path.into(),
      method: options.method.clone().unwrap_or(Method::GET),
      body: options.body.as_ref().map(Value::to_string),
      headers: options
        .headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
        .collect(),
    }
  }

  pub fn path(&self) -> &str {
    &self.path
  }

  pub fn method(&self) -> &Method {
    &self.method
  }

  /// Serialized JSON body, if any.
  pub fn body(&self) -> Option<&str> {
    self.body.as_deref()
  }

  pub fn headers(&self) -> &BTreeMap<String, String> {
    &self.headers
  }
}

/// Options accepted by [`ApiClient::request`](super::ApiClient::request).
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
  /// HTTP method, `GET` when unset.
  pub method: Option<Method>,
  /// JSON body sent with the request.
  pub body: Option<Value>,
  /// Extra headers; these override the client's defaults.
  pub headers: BTreeMap<String, String>,
  /// Skip the cache lookup. A successful response is still cached.
  pub force: bool,
}

impl RequestOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn method(mut self, method: Method) -> Self {
    self.method = Some(method);
    self
  }

  pub fn json(mut self, body: Value) -> Self {
    self.body = Some(body);
    self
  }

  pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
    self.headers.insert(name.to_ascii_lowercase(), value.into());
    self
  }

  pub fn force(mut self, force: bool) -> Self {
    self.force = force;
    self
  }
}
