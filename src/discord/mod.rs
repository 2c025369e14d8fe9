//! Discord REST API: endpoints, transport and the client facade.

mod client;
mod endpoint;
mod transport;
pub mod types;

pub use client::{ApiClient, MAX_MESSAGE_LIMIT};
pub use endpoint::{EndpointDescriptor, RequestOptions};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
