//! Attempt loop for one logical request.

use std::time::Instant;

use serde_json::Value;
use tracing::Instrument;

use crate::client::ClientInner;
use crate::error::{ApiError, ApiResult};
use crate::http::request::{resolve_url, RequestDescriptor};
use crate::http::response::{normalize_error, parse_success};
use crate::http::transport::{OutgoingRequest, TransportError};
use crate::observability::metrics;
use crate::resilience::{classify_status, is_retryable, next_state, with_timeout};
use crate::resilience::{AttemptOutcome, AttemptState, StatusClass};

impl ClientInner {
    /// Drive `descriptor` through the attempt state machine until it settles.
    pub(crate) async fn execute(&self, descriptor: RequestDescriptor) -> ApiResult<Value> {
        let span = tracing::debug_span!(
            "request",
            request_id = %descriptor.request_id,
            method = %descriptor.method,
            path = %descriptor.path,
        );
        self.run_attempts(descriptor).instrument(span).await
    }

    async fn run_attempts(&self, mut descriptor: RequestDescriptor) -> ApiResult<Value> {
        let mut state = AttemptState::Attempting;
        let mut refreshed = false;
        let mut refreshed_token: Option<String> = None;
        let mut last_token: Option<String> = None;

        loop {
            state = match state {
                AttemptState::Attempting => {
                    let token = refreshed_token
                        .clone()
                        .or_else(|| self.credentials.access_token());
                    let outcome = self.attempt(&descriptor, token.clone()).await;
                    last_token = token;

                    let (next, next_descriptor) =
                        next_state(outcome, &descriptor, refreshed, &self.backoff);
                    descriptor = next_descriptor;
                    next
                }
                AttemptState::AwaitingRefresh => {
                    refreshed = true;
                    metrics::record_retry("unauthorized");
                    match self
                        .refresher
                        .refresh_after_rejection(last_token.as_deref())
                        .await
                    {
                        Some(token) => {
                            tracing::info!("Re-issuing request with refreshed credential");
                            refreshed_token = Some(token);
                            AttemptState::Attempting
                        }
                        None => {
                            self.refresher.clear_credentials();
                            AttemptState::Failed(ApiError::unauthenticated(
                                "Session expired, please sign in again",
                            ))
                        }
                    }
                }
                AttemptState::Backoff { attempt, delay } => {
                    tracing::info!(
                        attempt,
                        delay = ?delay,
                        remaining = descriptor.remaining_retries(),
                        "Retrying request"
                    );
                    metrics::record_retry("transient");
                    tokio::time::sleep(delay).await;
                    AttemptState::Attempting
                }
                AttemptState::Succeeded(value) => return Ok(value),
                AttemptState::Failed(err) => {
                    // A refreshed token that is rejected again ends the session.
                    if refreshed && err.is_unauthenticated() {
                        self.refresher.clear_credentials();
                    }
                    tracing::warn!(error = %err, kind = err.kind(), "Request failed");
                    metrics::record_failure(err.kind());
                    return Err(err);
                }
            };
        }
    }

    /// Issue one network attempt and classify its result.
    async fn attempt(
        &self,
        descriptor: &RequestDescriptor,
        token: Option<String>,
    ) -> AttemptOutcome {
        let url = match resolve_url(&self.base_url, &descriptor.path) {
            Ok(url) => url,
            Err(e) => return AttemptOutcome::Fatal(e),
        };

        let request = OutgoingRequest {
            method: descriptor.method.clone(),
            url,
            headers: descriptor.headers.clone(),
            body: descriptor.body.clone(),
            bearer: token,
            request_id: descriptor.request_id,
        };

        let start = Instant::now();
        let method = descriptor.method.as_str();

        match with_timeout(self.attempt_timeout, self.transport.send(request)).await {
            Ok(response) => {
                metrics::record_request(method, Some(response.status), start);
                tracing::debug!(status = response.status, "Attempt completed");

                match classify_status(response.status) {
                    StatusClass::Success => match parse_success(&response) {
                        Ok(value) => AttemptOutcome::Success(value),
                        Err(e) => AttemptOutcome::Fatal(e),
                    },
                    StatusClass::Unauthorized => {
                        AttemptOutcome::Unauthorized(normalize_error(&response))
                    }
                    StatusClass::Retryable => AttemptOutcome::Retryable(normalize_error(&response)),
                    StatusClass::Terminal => AttemptOutcome::Fatal(normalize_error(&response)),
                }
            }
            Err(TransportError::InvalidRequest(message)) => {
                metrics::record_request(method, None, start);
                AttemptOutcome::Fatal(ApiError::invalid_request(message))
            }
            Err(e) => {
                metrics::record_request(method, None, start);
                tracing::warn!(error = %e, "Network attempt failed");

                let err = ApiError::Transient {
                    status: None,
                    message: e.to_string(),
                };
                if is_retryable(None, e.is_network(), self.retry_on_network_error) {
                    AttemptOutcome::Retryable(err)
                } else {
                    AttemptOutcome::Fatal(err)
                }
            }
        }
    }
}
