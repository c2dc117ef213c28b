//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt against the API:
//!     → timeouts.rs (bound the attempt)
//!     → retries.rs (classify status, spend retry budget)
//!     → state.rs (pick the next state: refresh, back off, succeed, fail)
//!     → backoff.rs (delay before the next attempt)
//! ```
//!
//! # Design Decisions
//! - Every network attempt has a deadline
//! - Backoff is exponential and capped; jitter is opt-in
//! - The 401 re-issue and transient retries share one budget
//! - The retry flow is an explicit state machine, not recursion

pub mod backoff;
pub mod retries;
pub mod state;
pub mod timeouts;

pub use backoff::{calculate_backoff, Backoff};
pub use retries::{classify_status, is_retryable, RetryBudget, StatusClass};
pub use state::{next_state, AttemptOutcome, AttemptState};
pub use timeouts::with_timeout;
