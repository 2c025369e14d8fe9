//! Cache keys for API requests.

use sha2::{Digest, Sha256};
use std::fmt;

use crate::discord::EndpointDescriptor;

/// Stable, fixed-length identity of a request in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
  /// Derive the key for an endpoint descriptor.
  ///
  /// Identical method, path, body and headers always produce the same key.
  pub fn for_endpoint(endpoint: &EndpointDescriptor) -> Self {
    let mut input = format!(
      "{} {}\n{}\n",
      endpoint.method(),
      endpoint.path(),
      endpoint.body().unwrap_or_default()
    );
    // BTreeMap iteration is already sorted by name
    for (name, value) in endpoint.headers() {
      input.push_str(name);
      input.push(':');
      input.push_str(value);
      input.push('\n');
    }

    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    Self(hex::encode(hasher.finalize()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}
