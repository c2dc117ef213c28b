//! Metrics collection.
//!
//! # Metrics
//! - `portal_client_requests_total` (counter): network attempts by method, status
//! - `portal_client_request_duration_seconds` (histogram): attempt latency
//! - `portal_client_cache_hits_total` (counter)
//! - `portal_client_dedup_hits_total` (counter)
//! - `portal_client_retries_total` (counter): by reason
//! - `portal_client_refresh_total` (counter): by outcome
//! - `portal_client_failures_total` (counter): terminal errors by kind
//! - `portal_client_cache_entries` (gauge)

use std::time::Instant;

/// Record one network attempt. `status` is `None` for transport failures.
pub fn record_request(method: &str, status: Option<u16>, start: Instant) {
    let status = status.map(|s| s.to_string()).unwrap_or_else(|| "error".to_string());
    ::metrics::counter!(
        "portal_client_requests_total",
        "method" => method.to_string(),
        "status" => status
    )
    .increment(1);
    ::metrics::histogram!("portal_client_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_hit() {
    ::metrics::counter!("portal_client_cache_hits_total").increment(1);
}

pub fn record_dedup_hit() {
    ::metrics::counter!("portal_client_dedup_hits_total").increment(1);
}

pub fn record_retry(reason: &'static str) {
    ::metrics::counter!("portal_client_retries_total", "reason" => reason).increment(1);
}

pub fn record_refresh(outcome: &'static str) {
    ::metrics::counter!("portal_client_refresh_total", "outcome" => outcome).increment(1);
}

pub fn record_failure(kind: &'static str) {
    ::metrics::counter!("portal_client_failures_total", "kind" => kind).increment(1);
}

pub fn record_cache_size(entries: usize) {
    ::metrics::gauge!("portal_client_cache_entries").set(entries as f64);
}
