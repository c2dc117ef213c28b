//! Response caching and request deduplication.
//!
//! # Data Flow
//! ```text
//! request(path, options)
//!     → policy.rs (cacheable? which TTL class?)
//!     → store.rs (live entry → return without network)
//!     → pending.rs (in-flight entry → share its result)
//!     → network attempt loop
//!     → store.rs (cache successful GET with routed TTL)
//!     → pending.rs (entry removed on settle)
//! ```
//!
//! # Design Decisions
//! - Both maps are owned by one client instance, never global
//! - Expired entries are logically absent and evicted lazily
//! - Dedup applies to every method; caching only to non-excluded GETs

pub mod pending;
pub mod policy;
pub mod store;

pub use pending::{Pending, PendingRegistry, PendingResult};
pub use policy::TtlPolicy;
pub use store::{CacheStats, CachedEntry, ResponseCache};
