//! Rate-limited, cached, retrying request pipeline for the Discord REST API.
//!
//! ```ignore
//! let client = ApiClient::new(&Settings::default(), token)?;
//! let guilds = client.get_guilds().await?;
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod discord;
pub mod error;
pub mod pipeline;

pub use config::{Config, Settings};
pub use discord::{ApiClient, RequestOptions};
pub use error::{RequestError, TransportError};
