//! Attempt state machine.
//!
//! # State Transitions
//! ```text
//! Attempting → Succeeded:       2xx
//! Attempting → AwaitingRefresh: 401, budget left, no refresh yet
//! Attempting → Backoff:         429/5xx/network, budget left
//! Attempting → Failed:          anything else, or budget exhausted
//! AwaitingRefresh → Attempting: refresh produced a token
//! AwaitingRefresh → Failed:     refresh produced nothing
//! Backoff → Attempting:         after the delay
//! ```

use std::time::Duration;

use serde_json::Value;

use crate::error::ApiError;
use crate::http::request::RequestDescriptor;
use crate::resilience::backoff::Backoff;

/// Result of one network attempt, already classified.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success(Value),
    Unauthorized(ApiError),
    Retryable(ApiError),
    Fatal(ApiError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptState {
    Attempting,
    AwaitingRefresh,
    Backoff { attempt: u32, delay: Duration },
    Succeeded(Value),
    Failed(ApiError),
}

impl AttemptState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptState::Succeeded(_) | AttemptState::Failed(_))
    }
}

/// Pick the state after an attempt, deriving the descriptor for the next attempt.
///
/// `refreshed` is true once this request has already gone through a refresh;
/// a second 401 is then terminal.
pub fn next_state(
    outcome: AttemptOutcome,
    descriptor: &RequestDescriptor,
    refreshed: bool,
    backoff: &Backoff,
) -> (AttemptState, RequestDescriptor) {
    match outcome {
        AttemptOutcome::Success(value) => (AttemptState::Succeeded(value), descriptor.clone()),
        AttemptOutcome::Unauthorized(err) => {
            if refreshed {
                return (AttemptState::Failed(err), descriptor.clone());
            }
            match descriptor.next_attempt() {
                Some((_, next)) => (AttemptState::AwaitingRefresh, next),
                None => (AttemptState::Failed(err), descriptor.clone()),
            }
        }
        AttemptOutcome::Retryable(err) => match descriptor.next_attempt() {
            Some((attempt, next)) => (
                AttemptState::Backoff {
                    attempt,
                    delay: backoff.delay(attempt),
                },
                next,
            ),
            None => (AttemptState::Failed(err), descriptor.clone()),
        },
        AttemptOutcome::Fatal(err) => (AttemptState::Failed(err), descriptor.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::RequestOptions;
    use serde_json::json;

    fn transient(status: u16) -> ApiError {
        ApiError::Transient {
            status: Some(status),
            message: format!("HTTP {}", status),
        }
    }

    #[test]
    fn test_retryable_walks_backoff_schedule() {
        let backoff = Backoff::new(300, 3000);
        let mut descriptor =
            RequestDescriptor::new("/api/bids", RequestOptions::post(json!({})), 3);
        let mut delays = Vec::new();

        loop {
            let (state, next) = next_state(
                AttemptOutcome::Retryable(transient(503)),
                &descriptor,
                false,
                &backoff,
            );
            descriptor = next;
            match state {
                AttemptState::Backoff { delay, .. } => delays.push(delay.as_millis()),
                AttemptState::Failed(err) => {
                    assert_eq!(err, transient(503));
                    break;
                }
                other => panic!("unexpected state: {:?}", other),
            }
        }
        assert_eq!(delays, vec![300, 600, 1200]);
    }

    #[test]
    fn test_unauthorized_refreshes_once() {
        let backoff = Backoff::default();
        let descriptor = RequestDescriptor::new("/api/me", RequestOptions::get(), 1);
        let unauthorized = AttemptOutcome::Unauthorized(ApiError::unauthenticated("expired"));

        let (state, next) = next_state(unauthorized.clone(), &descriptor, false, &backoff);
        assert_eq!(state, AttemptState::AwaitingRefresh);
        assert_eq!(next.remaining_retries(), 0);

        let (state, _) = next_state(unauthorized, &next, true, &backoff);
        assert!(matches!(state, AttemptState::Failed(ApiError::Unauthenticated { .. })));
    }

    #[test]
    fn test_unauthorized_without_budget_fails() {
        let descriptor = RequestDescriptor::new("/api/me", RequestOptions::get(), 0);
        let (state, _) = next_state(
            AttemptOutcome::Unauthorized(ApiError::unauthenticated("expired")),
            &descriptor,
            false,
            &Backoff::default(),
        );
        assert!(state.is_terminal());
    }

    #[test]
    fn test_fatal_and_success_are_terminal() {
        let descriptor = RequestDescriptor::new("/api/x", RequestOptions::get(), 5);
        let (state, next) = next_state(
            AttemptOutcome::Fatal(ApiError::parse("eof")),
            &descriptor,
            false,
            &Backoff::default(),
        );
        assert_eq!(state, AttemptState::Failed(ApiError::parse("eof")));
        assert_eq!(next.remaining_retries(), 5);

        let backoff = Backoff::default();
        let outcome = AttemptOutcome::Success(json!(1));
        let (state, _) = next_state(outcome, &descriptor, false, &backoff);
        assert_eq!(state, AttemptState::Succeeded(json!(1)));
    }
}
