//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ClientConfig;
use crate::config::validation::{describe_errors, validate_config, ValidationError};

/// Environment variable overriding `base_url`.
pub const BASE_URL_ENV: &str = "PORTAL_API_BASE_URL";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", describe_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// Load and validate configuration from a TOML file.
///
/// Environment overrides are applied before validation.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: ClientConfig = toml::from_str(&content)?;
    apply_env_overrides(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    tracing::debug!(path = ?path, base_url = %config.base_url, "Configuration loaded");
    Ok(config)
}

/// Build a validated configuration from defaults plus environment overrides.
pub fn from_env() -> Result<ClientConfig, ConfigError> {
    let mut config = ClientConfig::default();
    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply environment variable overrides in place.
pub fn apply_env_overrides(config: &mut ClientConfig) {
    if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
        if !base_url.trim().is_empty() {
            config.base_url = base_url.trim().to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("portal-client-{}.toml", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_load_config_file() {
        let path = temp_config_path();
        fs::write(
            &path,
            r#"
            base_url = "https://api.example.com"

            [retries]
            max_retries = 3
            "#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.retries.max_retries, 3);

        fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_invalid_file_reports_validation() {
        let path = temp_config_path();
        fs::write(&path, "[timeouts]\nrequest_secs = 0\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("timeouts.request_secs"));

        fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/portal-client.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
