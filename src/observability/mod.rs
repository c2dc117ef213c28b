//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Client internals produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, gauges, histograms via the `metrics` facade)
//!
//! Consumers:
//!     → whatever subscriber / recorder the embedding application installs
//! ```
//!
//! # Design Decisions
//! - The library never installs a subscriber or recorder itself
//! - Request ID is attached to every attempt's log lines
//! - Recording a metric or a log line can never fail a request

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
