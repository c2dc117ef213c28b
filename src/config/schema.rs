//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the request client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every request path is resolved against (e.g., "https://api.example.com").
    pub base_url: String,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Response cache configuration.
    pub cache: CacheConfig,

    /// Credential refresh settings.
    pub auth: AuthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeouts: TimeoutConfig::default(),
            retries: RetryConfig::default(),
            cache: CacheConfig::default(),
            auth: AuthConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// TCP connect timeout in seconds.
    pub connect_secs: u64,

    /// Deadline for a single network attempt in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retry budget used by the convenience verbs (`get`, `post`, ...).
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Fraction of the delay added as random jitter (0.0 disables jitter).
    pub jitter_ratio: f64,

    /// Retry connection failures and timeouts with the same policy as 5xx.
    pub retry_on_network_error: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay_ms: 300,
            max_delay_ms: 3000,
            jitter_ratio: 0.0,
            retry_on_network_error: true,
        }
    }
}

/// Lifetime class assigned to a cached response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TtlClass {
    /// Tens of seconds; fast-moving data.
    Short,
    /// Minutes; slow-moving data such as profiles.
    Medium,
}

/// Maps a path substring to a TTL class. First matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TtlRule {
    pub pattern: String,
    pub class: TtlClass,
}

impl TtlRule {
    pub fn new(pattern: impl Into<String>, class: TtlClass) -> Self {
        Self {
            pattern: pattern.into(),
            class,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the GET response cache.
    pub enabled: bool,

    /// Lifetime of `short` entries in seconds.
    pub short_ttl_secs: u64,

    /// Lifetime of `medium` entries in seconds.
    pub medium_ttl_secs: u64,

    /// Class used when no rule matches.
    pub default_class: TtlClass,

    /// Path routing table for TTL selection.
    pub rules: Vec<TtlRule>,

    /// Paths containing any of these substrings are never cached.
    pub excluded_patterns: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            short_ttl_secs: 30,
            medium_ttl_secs: 300,
            default_class: TtlClass::Short,
            rules: vec![
                TtlRule::new("profile", TtlClass::Medium),
                TtlRule::new("channel", TtlClass::Medium),
                TtlRule::new("analytics", TtlClass::Short),
                TtlRule::new("campaigns", TtlClass::Short),
            ],
            excluded_patterns: vec![
                "/auth/".to_string(),
                "callback".to_string(),
                "oauth".to_string(),
            ],
        }
    }
}

/// Credential refresh configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Path of the refresh endpoint, relative to the base URL.
    pub refresh_path: String,

    /// Optional file where the credential pair is persisted.
    pub credentials_file: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            refresh_path: "/api/auth/refresh".to_string(),
            credentials_file: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Output format for the subscriber installed by binaries.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
