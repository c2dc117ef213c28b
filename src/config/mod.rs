//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → handed to RequestClient at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once a client is built
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::ClientConfig;
pub use schema::{AuthConfig, CacheConfig, LogFormat, ObservabilityConfig};
pub use schema::{RetryConfig, TimeoutConfig};
pub use schema::{TtlClass, TtlRule};
