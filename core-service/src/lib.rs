//! Session service façade and bootstrap helpers.
//!
//! This crate wires the host-provided bridges carried by a
//! [`ClientConfig`] (HTTP transport, key-value storage, clock) into the
//! session core. Desktop apps typically enable the `desktop-shims` feature
//! (which depends on `bridge-desktop`) and can use [`bootstrap_desktop`] to
//! get a durable SQLite-backed profile snapshot.

pub mod error;

pub use error::{Result, ServiceError};

use std::sync::Arc;

use core_auth::api::{endpoint_url, paths};
use core_auth::{
    ApiClient, AuthController, HttpSessionApi, NavigationWatcher, ProfileStore,
    RefreshCoordinator, RequestInterceptor, RouteGuard, SessionState, SessionStatus,
};
use core_runtime::config::ClientConfig;
use core_runtime::events::{CoreEvent, EventBus, Receiver};
use tracing::{info, instrument};

/// Primary façade exposed to host applications.
///
/// Owns one of each session component, all sharing the same transport,
/// event bus and session state.
#[derive(Clone)]
pub struct SessionService {
    config: Arc<ClientConfig>,
    event_bus: EventBus,
    coordinator: Arc<RefreshCoordinator>,
    api: ApiClient,
    controller: AuthController,
    navigation: Arc<NavigationWatcher>,
    guard: RouteGuard,
}

impl SessionService {
    /// Wire the session components from a validated configuration.
    ///
    /// Nothing touches the network here; call [`SessionService::start`] to
    /// run the first session check.
    pub fn bootstrap(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer);
        let state = Arc::new(SessionState::new(
            ProfileStore::new(config.key_value_store.clone()),
            event_bus.clone(),
            config.login_path.clone(),
        ));

        let refresh_url = endpoint_url(&config.base_url, paths::REFRESH)?;
        let coordinator = Arc::new(RefreshCoordinator::new(
            config.http_client.clone(),
            refresh_url,
            config.clock.clone(),
            config.refresh_cooldown,
            event_bus.clone(),
            state.clone(),
        ));

        let interceptor = Arc::new(RequestInterceptor::new(
            config.http_client.clone(),
            coordinator.clone(),
        ));
        let api = ApiClient::new(config.base_url.clone(), interceptor)
            .with_timeout(config.request_timeout);
        let controller = AuthController::new(Arc::new(HttpSessionApi::new(api.clone())), state);
        let navigation = Arc::new(NavigationWatcher::new(
            controller.clone(),
            config.navigation_debounce,
        ));
        let guard = RouteGuard::new(config.login_path.clone());

        info!(base_url = %config.base_url, "Session service wired");

        Ok(Self {
            config: Arc::new(config),
            event_bus,
            coordinator,
            api,
            controller,
            navigation,
            guard,
        })
    }

    /// Restore the persisted profile snapshot and run the first session
    /// check, leaving the session in a definite state.
    #[instrument(skip(self))]
    pub async fn start(&self) -> SessionStatus {
        self.controller.hydrate().await;
        self.controller.check_session().await
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn controller(&self) -> &AuthController {
        &self.controller
    }

    /// Client for application calls; 401s go through refresh-and-replay.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    pub fn navigation(&self) -> &NavigationWatcher {
        &self.navigation
    }

    /// Forward a router path change to the debounced session check.
    pub fn route_changed(&self, path: impl Into<String>) -> bool {
        self.navigation.route_changed(path)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn subscribe_events(&self) -> Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    /// Cancel pending background checks.
    pub fn shutdown(&self) {
        self.navigation.shutdown();
    }
}

/// Bootstrap with the desktop transport and a SQLite snapshot store under
/// `data_dir`.
///
/// A key-value store already injected into the builder wins over the SQLite
/// default.
#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub async fn bootstrap_desktop(
    builder: core_runtime::config::ClientConfigBuilder,
    data_dir: impl AsRef<std::path::Path>,
) -> Result<SessionService> {
    let db_path = data_dir.as_ref().join("session.db");
    let store = bridge_desktop::SqliteKeyValueStore::new(db_path).await?;
    let config = builder.key_value_store_if_absent(Arc::new(store)).build()?;
    SessionService::bootstrap(config)
}
