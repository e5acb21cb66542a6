//! # Session Authentication Core
//!
//! Client-side coordination around a short-lived session credential.
//!
//! ## Overview
//!
//! - [`RefreshCoordinator`] - single-flight, cooldown-limited credential renewal
//! - [`RequestInterceptor`] - refresh-and-replay-once handling of 401 responses
//! - [`ApiClient`] / [`HttpSessionApi`] - typed calls against the remote API
//! - [`AuthController`] - the `Unknown` / `Authenticated` / `Unauthenticated`
//!   state machine with login, logout, registration and session checks
//! - [`NavigationWatcher`] - debounced re-validation on route changes
//! - [`RouteGuard`] - pure gate deciding between loading, render and redirect
//! - [`ProfileStore`] - persisted, non-sensitive profile snapshot
//!
//! ## Wiring
//!
//! Build bottom-up: [`SessionState`] first, then the coordinator with the
//! state as its [`SessionExpiryHandler`], the interceptor, the API client,
//! and finally the controller over the same state. `core-service` does this
//! from a `ClientConfig`.

pub mod api;
pub mod controller;
pub mod coordinator;
pub mod error;
pub mod guard;
pub mod interceptor;
pub mod navigation;
pub mod profile_store;
pub mod session;
pub mod types;

#[cfg(test)]
mod test_support;

pub use api::{ApiClient, HttpSessionApi, SessionApi};
pub use controller::AuthController;
pub use coordinator::{RefreshCoordinator, SessionExpiryHandler};
pub use error::{AuthError, Result};
pub use guard::{GuardDecision, RouteGuard};
pub use interceptor::{PendingRequest, RequestInterceptor};
pub use navigation::NavigationWatcher;
pub use profile_store::ProfileStore;
pub use session::SessionState;
pub use types::{
    Credentials, DenialReason, RefreshOutcome, RegistrationRequest, Renewed,
    Session, SessionStatus, UserProfile,
};
