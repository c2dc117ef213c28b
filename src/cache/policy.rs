//! TTL routing table.
//!
//! Decides whether a request may be served from / stored into the response
//! cache, and for how long.

use std::time::Duration;

use reqwest::Method;

use crate::config::{CacheConfig, TtlClass, TtlRule};

#[derive(Debug, Clone)]
pub struct TtlPolicy {
    enabled: bool,
    short: Duration,
    medium: Duration,
    default_class: TtlClass,
    rules: Vec<TtlRule>,
    excluded_patterns: Vec<String>,
}

impl TtlPolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            short: Duration::from_secs(config.short_ttl_secs),
            medium: Duration::from_secs(config.medium_ttl_secs),
            default_class: config.default_class,
            rules: config.rules.clone(),
            excluded_patterns: config.excluded_patterns.clone(),
        }
    }

    /// Only non-excluded GETs are cacheable.
    pub fn is_cacheable(&self, method: &Method, path: &str) -> bool {
        self.enabled
            && *method == Method::GET
            && !self.excluded_patterns.iter().any(|p| path.contains(p.as_str()))
    }

    /// TTL class of the first matching rule, or the default class.
    pub fn class_for(&self, path: &str) -> TtlClass {
        self.rules
            .iter()
            .find(|rule| path.contains(rule.pattern.as_str()))
            .map(|rule| rule.class)
            .unwrap_or(self.default_class)
    }

    pub fn ttl_for(&self, path: &str) -> Duration {
        match self.class_for(path) {
            TtlClass::Short => self.short,
            TtlClass::Medium => self.medium,
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
