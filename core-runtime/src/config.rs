//! # Client Configuration Module
//!
//! Provides configuration management for the session core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `ClientConfig` holding the API location, the timing knobs of the refresh
//! and navigation protocols, and the host capabilities the core depends on.
//! Validation is fail-fast: `build()` refuses to produce a config the core
//! could not run with.
//!
//! ## Required
//!
//! - `base_url` - Absolute http(s) URL of the remote API
//!
//! ## Capabilities (with platform defaults)
//!
//! - `HttpClient` - Transport (desktop default: reqwest with a cookie jar)
//! - `KeyValueStore` - Profile snapshot storage (desktop default: in-memory)
//! - `Clock` - Time source (default: system clock)
//!
//! When the `desktop-shims` feature is disabled every capability except the
//! clock must be injected.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ClientConfig;
//! use std::time::Duration;
//!
//! let config = ClientConfig::builder()
//!     .base_url("https://api.example.com/api/")
//!     .refresh_cooldown(Duration::from_secs(5))
//!     .http_client(Arc::new(MyHttpClient))
//!     .key_value_store(Arc::new(MyStore))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, HttpClient, KeyValueStore, SystemClock};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Environment variable read by [`ClientConfigBuilder::from_env`].
pub const SERVER_URL_ENV: &str = "CONNECT_SERVER_URL";

/// Minimum spacing between two credential renewal attempts.
pub const DEFAULT_REFRESH_COOLDOWN: Duration = Duration::from_secs(5);

/// Window within which navigation events are coalesced into one session check.
pub const DEFAULT_NAVIGATION_DEBOUNCE: Duration = Duration::from_millis(100);

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_LOGIN_PATH: &str = "/login";

const MAX_REFRESH_COOLDOWN: Duration = Duration::from_secs(600);
const MAX_NAVIGATION_DEBOUNCE: Duration = Duration::from_secs(5);

/// Configuration for the session core.
///
/// Use [`ClientConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct ClientConfig {
    /// Root of the remote API; always ends with `/`
    pub base_url: Url,

    /// Minimum interval between renewal attempts, regardless of outcome
    pub refresh_cooldown: Duration,

    /// Debounce window for navigation-triggered session checks
    pub navigation_debounce: Duration,

    /// Per-request timeout applied by the default transport
    pub request_timeout: Duration,

    /// Route the guard and the controller redirect to when unauthenticated
    pub login_path: String,

    /// Event bus buffer size
    pub event_buffer: usize,

    pub http_client: Arc<dyn HttpClient>,

    pub key_value_store: Arc<dyn KeyValueStore>,

    pub clock: Arc<dyn Clock>,
}

impl ClientConfig {
    /// Creates a new builder for constructing a `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The API URL is http(s) with a host
    /// - The cooldown is non-zero and at most ten minutes
    /// - The debounce window is at most five seconds
    /// - The request timeout is non-zero
    /// - The login path is absolute
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Base URL must use http or https, got '{}'",
                self.base_url.scheme()
            )));
        }

        if self.base_url.host_str().is_none() {
            return Err(Error::Config("Base URL must include a host".to_string()));
        }

        if self.refresh_cooldown.is_zero() {
            return Err(Error::Config(
                "Refresh cooldown must be greater than zero".to_string(),
            ));
        }

        if self.refresh_cooldown > MAX_REFRESH_COOLDOWN {
            return Err(Error::Config(
                "Refresh cooldown exceeds maximum of 600 seconds".to_string(),
            ));
        }

        if self.navigation_debounce > MAX_NAVIGATION_DEBOUNCE {
            return Err(Error::Config(
                "Navigation debounce exceeds maximum of 5 seconds".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if !self.login_path.starts_with('/') {
            return Err(Error::Config(format!(
                "Login path must start with '/', got '{}'",
                self.login_path
            )));
        }

        if self.event_buffer == 0 {
            return Err(Error::Config(
                "Event buffer must hold at least one event".to_string(),
            ));
        }

        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("refresh_cooldown", &self.refresh_cooldown)
            .field("navigation_debounce", &self.navigation_debounce)
            .field("request_timeout", &self.request_timeout)
            .field("login_path", &self.login_path)
            .field("event_buffer", &self.event_buffer)
            .finish_non_exhaustive()
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "An HttpClient implementation is required to reach the API. \
                 Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                 Web: inject a fetch-based client that sends credentials."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeout(timeout)
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_key_value_store() -> Result<Arc<dyn KeyValueStore>> {
    Err(Error::CapabilityMissing {
        capability: "KeyValueStore".to_string(),
        message: "A KeyValueStore implementation is required for the profile snapshot. \
                 Desktop: enable the 'desktop-shims' feature or inject SqliteKeyValueStore. \
                 Web: inject a localStorage-backed store."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_key_value_store() -> Result<Arc<dyn KeyValueStore>> {
    use bridge_desktop::MemoryKeyValueStore;

    tracing::debug!("No KeyValueStore injected, profile snapshot will not survive restarts");
    Ok(Arc::new(MemoryKeyValueStore::new()))
}

/// Builder for constructing [`ClientConfig`] instances.
#[derive(Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    refresh_cooldown: Option<Duration>,
    navigation_debounce: Option<Duration>,
    request_timeout: Option<Duration>,
    login_path: Option<String>,
    event_buffer: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
    key_value_store: Option<Arc<dyn KeyValueStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl ClientConfigBuilder {
    /// Seeds the builder from the environment (`CONNECT_SERVER_URL`).
    pub fn from_env() -> Self {
        let mut builder = Self::default();
        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            builder.base_url = Some(url);
        }
        builder
    }

    /// Sets the API root, e.g. `https://api.example.com/api/`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.refresh_cooldown = Some(cooldown);
        self
    }

    pub fn navigation_debounce(mut self, window: Duration) -> Self {
        self.navigation_debounce = Some(window);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = Some(path.into());
        self
    }

    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = Some(capacity);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn key_value_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.key_value_store = Some(store);
        self
    }

    /// Sets the store only when none has been injected yet.
    pub fn key_value_store_if_absent(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.key_value_store.get_or_insert(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - `Error::Config` when the base URL is missing or malformed, or a
    ///   timing value is out of range
    /// - `Error::CapabilityMissing` when a capability has neither been
    ///   injected nor has a platform default
    pub fn build(self) -> Result<ClientConfig> {
        let raw_url = self.base_url.ok_or_else(|| {
            Error::Config(format!(
                "Base URL is required. Use .base_url() or set {}.",
                SERVER_URL_ENV
            ))
        })?;

        let mut base_url = Url::parse(raw_url.trim())
            .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", raw_url, e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout)?,
        };

        let key_value_store = match self.key_value_store {
            Some(store) => store,
            None => provide_default_key_value_store()?,
        };

        let config = ClientConfig {
            base_url,
            refresh_cooldown: self.refresh_cooldown.unwrap_or(DEFAULT_REFRESH_COOLDOWN),
            navigation_debounce: self
                .navigation_debounce
                .unwrap_or(DEFAULT_NAVIGATION_DEBOUNCE),
            request_timeout,
            login_path: self
                .login_path
                .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string()),
            event_buffer: self
                .event_buffer
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
            http_client,
            key_value_store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{HttpRequest, HttpResponse};

    struct MockHttpClient;

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Ok(HttpResponse::new(200, ""))
        }
    }

    struct MockStore;

    #[async_trait]
    impl KeyValueStore for MockStore {
        async fn set_string(&self, _key: &str, _value: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_string(&self, _key: &str) -> BridgeResult<Option<String>> {
            Ok(None)
        }

        async fn delete(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn clear_all(&self) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn builder() -> ClientConfigBuilder {
        ClientConfig::builder()
            .http_client(Arc::new(MockHttpClient))
            .key_value_store(Arc::new(MockStore))
    }

    #[test]
    fn test_builder_requires_base_url() {
        let result = builder().build();
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("Base URL is required")));
    }

    #[test]
    fn test_defaults() {
        let config = builder().base_url("https://api.example.com").build().unwrap();

        assert_eq!(config.base_url.as_str(), "https://api.example.com/");
        assert_eq!(config.refresh_cooldown, Duration::from_secs(5));
        assert_eq!(config.navigation_debounce, Duration::from_millis(100));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.login_path, "/login");
        assert_eq!(config.event_buffer, 100);
    }

    #[test]
    fn test_injected_store_wins_over_fallback() {
        let injected: Arc<dyn KeyValueStore> = Arc::new(MockStore);
        let config = builder()
            .key_value_store(injected.clone())
            .key_value_store_if_absent(Arc::new(MockStore))
            .base_url("https://api.example.com")
            .build()
            .unwrap();

        assert!(Arc::ptr_eq(&config.key_value_store, &injected));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = builder()
            .base_url("http://localhost:8000/api")
            .build()
            .unwrap();

        assert_eq!(config.base_url.as_str(), "http://localhost:8000/api/");
        assert_eq!(
            config.base_url.join("token/refresh/").unwrap().as_str(),
            "http://localhost:8000/api/token/refresh/"
        );
    }

    #[test]
    fn test_rejects_non_http_url() {
        let result = builder().base_url("ftp://files.example.com/").build();
        assert!(matches!(result, Err(Error::Config(_))));

        let result = builder().base_url("not a url").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_out_of_range_timings() {
        let zero_cooldown = builder()
            .base_url("https://api.example.com/")
            .refresh_cooldown(Duration::ZERO)
            .build();
        assert!(zero_cooldown.is_err());

        let long_debounce = builder()
            .base_url("https://api.example.com/")
            .navigation_debounce(Duration::from_secs(30))
            .build();
        assert!(long_debounce.is_err());

        let zero_timeout = builder()
            .base_url("https://api.example.com/")
            .request_timeout(Duration::ZERO)
            .build();
        assert!(zero_timeout.is_err());
    }

    #[test]
    fn test_rejects_relative_login_path() {
        let result = builder()
            .base_url("https://api.example.com/")
            .login_path("login")
            .build();

        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("Login path")));
    }

    #[test]
    fn test_zero_debounce_is_allowed() {
        let config = builder()
            .base_url("https://api.example.com/")
            .navigation_debounce(Duration::ZERO)
            .build()
            .unwrap();
        assert!(config.navigation_debounce.is_zero());
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_http_client_is_capability_error() {
        let result = ClientConfig::builder()
            .base_url("https://api.example.com/")
            .key_value_store(Arc::new(MockStore))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "HttpClient")
            }
            other => panic!("expected CapabilityMissing, got {:?}", other.map(|_| ())),
        }
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_desktop_defaults_fill_capabilities() {
        let config = ClientConfig::builder()
            .base_url("https://api.example.com/")
            .build()
            .expect("desktop defaults should succeed");

        assert_eq!(config.base_url.host_str(), Some("api.example.com"));
    }
}
