//! Client construction.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::auth::{CredentialStore, FileCredentialStore, MemoryCredentialStore, RefreshCoordinator};
use crate::cache::{PendingRegistry, ResponseCache, TtlPolicy};
use crate::client::{ClientInner, RequestClient};
use crate::config::validation::{describe_errors, validate_config, ValidationError};
use crate::config::ClientConfig;
use crate::http::request::resolve_url;
use crate::http::transport::{HttpTransport, Transport, TransportError};
use crate::resilience::Backoff;

/// Errors that can occur while building a client.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid configuration: {}", describe_errors(.0))]
    Config(Vec<ValidationError>),

    #[error("failed to build transport: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to load credentials: {0}")]
    Credentials(#[from] std::io::Error),

    #[error("invalid refresh URL: {0}")]
    RefreshUrl(String),
}

/// Builder for [`RequestClient`].
///
/// Defaults to the reqwest transport and, unless `auth.credentials_file` is
/// set, an in-memory credential store.
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    credentials: Option<Arc<dyn CredentialStore>>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            credentials: None,
        }
    }

    /// Use a custom transport instead of the reqwest one.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom credential store.
    pub fn credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn build(self) -> Result<RequestClient, BuildError> {
        let config = self.config;
        validate_config(&config).map_err(BuildError::Config)?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&config.timeouts)?),
        };

        let credentials: Arc<dyn CredentialStore> = match self.credentials {
            Some(credentials) => credentials,
            None => match &config.auth.credentials_file {
                Some(path) => Arc::new(FileCredentialStore::open(path)?),
                None => Arc::new(MemoryCredentialStore::new()),
            },
        };

        let attempt_timeout = Duration::from_secs(config.timeouts.request_secs);
        let refresh_url = resolve_url(&config.base_url, &config.auth.refresh_path)
            .map_err(|e| BuildError::RefreshUrl(e.to_string()))?;
        let refresher = RefreshCoordinator::new(
            transport.clone(),
            credentials.clone(),
            refresh_url,
            attempt_timeout,
        );

        tracing::debug!(
            base_url = %config.base_url,
            max_retries = config.retries.max_retries,
            cache_enabled = config.cache.enabled,
            "Request client initialized"
        );

        Ok(RequestClient {
            inner: Arc::new(ClientInner {
                base_url: config.base_url.clone(),
                transport,
                credentials,
                refresher,
                cache: ResponseCache::new(),
                pending: PendingRegistry::new(),
                policy: TtlPolicy::from_config(&config.cache),
                backoff: Backoff::from_config(&config.retries),
                attempt_timeout,
                default_retries: config.retries.max_retries,
                retry_on_network_error: config.retries.retry_on_network_error,
            }),
        })
    }
}
