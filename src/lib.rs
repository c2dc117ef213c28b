//! Resilient HTTP request client for the portal API.

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod observability;
pub mod resilience;

pub use auth::{AuthEvent, CredentialPair, CredentialStore};
pub use auth::{FileCredentialStore, MemoryCredentialStore};
pub use cache::CacheStats;
pub use client::{BuildError, ClientBuilder, RequestClient};
pub use config::schema::ClientConfig;
pub use error::{ApiError, ApiResult};
pub use http::{Method, RequestOptions};
