//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, delays ordered, ratios bounded)
//! - Check the base URL and refresh path are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;
use url::Url;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("base_url '{0}' is not a valid absolute http(s) URL")]
    InvalidBaseUrl(String),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("retries.base_delay_ms ({base}) exceeds retries.max_delay_ms ({max})")]
    DelayOrder { base: u64, max: u64 },

    #[error("retries.jitter_ratio must be within 0.0..=1.0, got {0}")]
    JitterRatio(String),

    #[error("auth.refresh_path '{0}' must start with '/'")]
    RefreshPath(String),

    #[error("cache rule #{0} has an empty pattern")]
    EmptyRulePattern(usize),
}

/// Render a list of validation errors on one line.
pub fn describe_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
        _ => errors.push(ValidationError::InvalidBaseUrl(config.base_url.clone())),
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.request_secs"));
    }

    let retries = &config.retries;
    if retries.base_delay_ms > retries.max_delay_ms {
        errors.push(ValidationError::DelayOrder {
            base: retries.base_delay_ms,
            max: retries.max_delay_ms,
        });
    }
    if !(0.0..=1.0).contains(&retries.jitter_ratio) {
        errors.push(ValidationError::JitterRatio(retries.jitter_ratio.to_string()));
    }

    if config.cache.enabled {
        if config.cache.short_ttl_secs == 0 {
            errors.push(ValidationError::ZeroValue("cache.short_ttl_secs"));
        }
        if config.cache.medium_ttl_secs == 0 {
            errors.push(ValidationError::ZeroValue("cache.medium_ttl_secs"));
        }
    }
    for (i, rule) in config.cache.rules.iter().enumerate() {
        if rule.pattern.is_empty() {
            errors.push(ValidationError::EmptyRulePattern(i));
        }
    }

    if !config.auth.refresh_path.starts_with('/') {
        errors.push(ValidationError::RefreshPath(config.auth.refresh_path.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
