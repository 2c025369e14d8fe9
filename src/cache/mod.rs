//! In-memory response cache.
//!
//! Entries expire after a ttl and are keyed by a digest of the request that
//! produced them. Nothing is persisted.

mod key;
mod ttl;

pub use key::CacheKey;
pub use ttl::TtlCache;
