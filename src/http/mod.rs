//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! caller path + RequestOptions
//!     → request.rs (descriptor, cache key, URL resolution)
//!     → transport.rs (one network attempt: auth header, JSON, request ID)
//!     → response.rs (parse 2xx body or normalize the error body)
//!     → back to the attempt loop in client/
//! ```

pub mod request;
pub mod response;
pub mod transport;

pub use request::{cache_key, RequestDescriptor, RequestOptions};
pub use transport::{HttpTransport, OutgoingRequest, RawResponse, Transport, TransportError};
pub use reqwest::Method;
