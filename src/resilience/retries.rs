//! Retry classification.
//!
//! # Responsibilities
//! - Decide which statuses and transport failures are worth retrying
//! - Track the per-request retry budget
//!
//! # Design Decisions
//! - 429 and every 5xx are transient; 401 is handled by the refresh path
//! - Connection errors and timeouts follow the 5xx policy unless disabled
//! - Retries apply to every method; the dedup registry keeps a burst of
//!   identical calls from multiplying side effects

/// How a single attempt's HTTP status should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Unauthorized,
    Retryable,
    Terminal,
}

/// Classify an HTTP status code.
pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        401 => StatusClass::Unauthorized,
        429 | 500..=599 => StatusClass::Retryable,
        _ => StatusClass::Terminal,
    }
}

/// Check if a response status or transport failure is retryable.
pub fn is_retryable(
    status: Option<u16>,
    network_error: bool,
    retry_on_network_error: bool,
) -> bool {
    if network_error {
        return retry_on_network_error;
    }
    matches!(status.map(classify_status), Some(StatusClass::Retryable))
}

/// Retry budget for one logical request.
///
/// The budget is shared by transient retries and the post-refresh re-issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    remaining: u32,
    consumed: u32,
}

impl RetryBudget {
    pub fn new(max_retries: u32) -> Self {
        Self {
            remaining: max_retries,
            consumed: 0,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn consumed(&self) -> u32 {
        self.consumed
    }

    pub fn has_remaining(&self) -> bool {
        self.remaining > 0
    }

    /// Spend one unit, returning the 1-based retry attempt number.
    pub fn consume(self) -> Option<(u32, Self)> {
        if self.remaining == 0 {
            return None;
        }
        let next = Self {
            remaining: self.remaining - 1,
            consumed: self.consumed + 1,
        };
        Some((next.consumed, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(200), StatusClass::Success);
        assert_eq!(classify_status(201), StatusClass::Success);
        assert_eq!(classify_status(401), StatusClass::Unauthorized);
        assert_eq!(classify_status(429), StatusClass::Retryable);
        assert_eq!(classify_status(503), StatusClass::Retryable);
        assert_eq!(classify_status(400), StatusClass::Terminal);
        assert_eq!(classify_status(403), StatusClass::Terminal);
        assert_eq!(classify_status(404), StatusClass::Terminal);
    }

    #[test]
    fn test_network_errors_follow_flag() {
        assert!(is_retryable(None, true, true));
        assert!(!is_retryable(None, true, false));
        assert!(is_retryable(Some(502), false, false));
        assert!(!is_retryable(Some(422), false, true));
    }

    #[test]
    fn test_budget_consumption() {
        let budget = RetryBudget::new(2);
        let (attempt, budget) = budget.consume().unwrap();
        assert_eq!(attempt, 1);
        let (attempt, budget) = budget.consume().unwrap();
        assert_eq!(attempt, 2);
        assert!(!budget.has_remaining());
        assert!(budget.consume().is_none());
    }
}
