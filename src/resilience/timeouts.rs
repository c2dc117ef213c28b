//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound every network attempt (requests and refresh exchanges)
//! - Report timeouts as a distinct transport failure
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - The deadline covers one attempt; backoff waits are not included

use std::future::Future;
use std::time::Duration;

use crate::http::transport::TransportError;

/// Run one attempt under `deadline`.
pub async fn with_timeout<F, T>(deadline: Duration, attempt: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match tokio::time::timeout(deadline, attempt).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(deadline)),
    }
}
