//! Credential handling subsystem.
//!
//! # Data Flow
//! ```text
//! attempt loop needs a token
//!     → credentials.rs (CredentialStore::access_token)
//!
//! attempt answered with 401
//!     → refresh.rs (join or start the single exchange)
//!     → POST {base}/api/auth/refresh { refreshToken }
//!     → credentials.rs (store new pair, invalidate derived state)
//!     → AuthEvent::Refreshed to subscribers
//!
//! refresh failed
//!     → credentials.rs (clear) → AuthEvent::Cleared
//! ```

pub mod credentials;
pub mod refresh;

pub use credentials::{CredentialPair, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use refresh::{AuthEvent, RefreshCoordinator};
