//! # Auth State Controller
//!
//! Single source of truth for "is the user signed in".
//!
//! ## Overview
//!
//! `AuthController` drives the session state machine:
//!
//! ```text
//! Unknown ──check/login──▶ Authenticated ◀──login── Unauthenticated
//!    │                          │                        ▲
//!    └──────check failed────────┼──logout / expiry───────┘
//! ```
//!
//! Only an explicit logout or an unrecoverable refresh moves the session away
//! from `Authenticated`. A failed login, a rate-limited refresh or a network
//! error never does.
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::{AuthController, Credentials};
//! # async fn example(controller: AuthController) -> core_auth::Result<()> {
//! controller.hydrate().await;
//! controller.check_session().await;
//!
//! let profile = controller.login(Credentials::new("ada", "s3cret!")).await?;
//! println!("signed in as {}", profile.display_name());
//!
//! controller.logout().await?;
//! # Ok(())
//! # }
//! ```

use crate::api::SessionApi;
use crate::error::{AuthError, Result};
use crate::session::SessionState;
use crate::types::{Credentials, RegistrationRequest, Session, SessionStatus, UserProfile};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus, Notice};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

const INVALID_LOGIN_NOTICE: &str = "invalid username or password";
const PASSWORD_MISMATCH_NOTICE: &str = "passwords do not match";
const REGISTERED_NOTICE: &str = "account created, please sign in";

/// Session state machine. Cloning shares the same state.
#[derive(Clone)]
pub struct AuthController {
    api: Arc<dyn SessionApi>,
    state: Arc<SessionState>,
}

impl AuthController {
    pub fn new(api: Arc<dyn SessionApi>, state: Arc<SessionState>) -> Self {
        Self { api, state }
    }

    pub fn session(&self) -> Session {
        self.state.current()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status()
    }

    pub fn is_authenticated(&self) -> bool {
        self.status() == SessionStatus::Authenticated
    }

    /// Observe every session change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        self.state.event_bus()
    }

    pub fn login_path(&self) -> &str {
        self.state.login_path()
    }

    /// Load the persisted snapshot for optimistic display.
    ///
    /// Does not touch the session status.
    #[instrument(skip(self))]
    pub async fn hydrate(&self) -> Option<UserProfile> {
        let snapshot = match self.state.profiles().load().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Profile snapshot unavailable");
                None
            }
        };
        debug!(found = snapshot.is_some(), "Hydrated profile snapshot");
        self.state.set_hydrated(snapshot.clone()).await;
        snapshot
    }

    /// The profile to show: the live one when authenticated, otherwise the
    /// hydrated snapshot while the first check is pending.
    pub async fn cached_profile(&self) -> Option<UserProfile> {
        let session = self.state.current();
        match session.status() {
            SessionStatus::Authenticated => match session.profile() {
                Some(profile) => Some(profile.clone()),
                None => self.state.hydrated().await,
            },
            SessionStatus::Unknown => self.state.hydrated().await,
            SessionStatus::Unauthenticated => None,
        }
    }

    /// Ask the server and settle the session.
    ///
    /// Idempotent. A failed check leaves an authenticated session alone unless
    /// the failure was an unrecoverable refresh, which has already ended it.
    /// A check overtaken by a login or logout is discarded.
    #[instrument(skip(self))]
    pub async fn check_session(&self) -> SessionStatus {
        let generation = self.state.current_generation();
        let reply = self.api.whoami().await;

        if self.state.current_generation() != generation {
            debug!("Session changed during check, discarding stale check");
            return self.status();
        }

        match reply {
            Ok(profile) => {
                let profile = match profile {
                    Some(profile) => Some(profile),
                    None => self.known_profile().await,
                };
                if self
                    .state
                    .replace_if_current(generation, Session::authenticated(profile))
                {
                    self.state.emit(CoreEvent::Auth(AuthEvent::SessionChecked {
                        authenticated: true,
                    }));
                } else {
                    debug!("Session changed during check, discarding stale check");
                }
            }
            Err(e) if e.is_session_fatal() => {
                debug!("Session ended by refresh failure during check");
            }
            Err(e) if self.is_authenticated() => {
                warn!(error = %e, "Session check failed, keeping session");
                self.state.emit(CoreEvent::Auth(AuthEvent::AuthError {
                    message: e.to_string(),
                    recoverable: true,
                }));
            }
            Err(e) => {
                if self
                    .state
                    .replace_if_current(generation, Session::unauthenticated())
                {
                    debug!(error = %e, "No valid session");
                    self.state.emit(CoreEvent::Auth(AuthEvent::SessionChecked {
                        authenticated: false,
                    }));
                } else {
                    debug!(error = %e, "Session changed during check, discarding stale check");
                }
            }
        }

        self.status()
    }

    /// Sign in and navigate to the user's home view.
    ///
    /// On failure the session is left exactly as it was and a notice is
    /// emitted.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(&self, credentials: Credentials) -> Result<UserProfile> {
        let profile = match self.api.authenticate(&credentials).await {
            Ok(profile) => profile,
            Err(AuthError::InvalidCredentials) => {
                info!("Login rejected");
                self.state.notify(Notice::error(INVALID_LOGIN_NOTICE));
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.state
                    .notify(Notice::error(format!("login failed: {}", e)));
                return Err(e);
            }
        };

        if let Err(e) = self.state.profiles().save(&profile).await {
            warn!(error = %e, "Signed in without persisting profile snapshot");
        }
        self.state.set_hydrated(Some(profile.clone())).await;
        self.state.advance_generation();
        self.state
            .replace(Session::authenticated(Some(profile.clone())));

        self.state.emit(CoreEvent::Auth(AuthEvent::SignedIn {
            username: profile.username.clone(),
        }));
        self.state.redirect(profile.home_path());

        info!("Signed in");
        Ok(profile)
    }

    /// Sign out and navigate to the login view.
    ///
    /// The local session is torn down even when the server cannot be reached;
    /// the server error is still returned.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let result = self.api.terminate().await;

        self.state.tear_down().await;
        self.state.emit(CoreEvent::Auth(AuthEvent::SignedOut));
        self.state.redirect(self.login_path().to_string());

        if let Err(e) = &result {
            warn!(error = %e, "Server-side logout failed");
            self.state.notify(Notice::error(format!(
                "signed out locally, server logout failed: {}",
                e
            )));
        } else {
            info!("Signed out");
        }

        result
    }

    /// Create an account and send the user to the login view.
    ///
    /// Never changes the session status.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: RegistrationRequest) -> Result<UserProfile> {
        if !request.passwords_match() {
            self.state.notify(Notice::error(PASSWORD_MISMATCH_NOTICE));
            return Err(AuthError::Validation(PASSWORD_MISMATCH_NOTICE.to_string()));
        }

        match self.api.register(&request).await {
            Ok(profile) => {
                info!("Account registered");
                self.state.notify(Notice::info(REGISTERED_NOTICE));
                self.state.redirect(self.login_path().to_string());
                Ok(profile)
            }
            Err(e) => {
                warn!(error = %e, "Registration failed");
                self.state
                    .notify(Notice::error(format!("registration failed: {}", e)));
                Err(e)
            }
        }
    }

    /// Replace the profile snapshot after the user edited their settings.
    #[instrument(skip(self, profile), fields(username = %profile.username))]
    pub async fn update_profile_snapshot(&self, profile: UserProfile) -> Result<()> {
        if !self.is_authenticated() {
            return Err(AuthError::NotAuthenticated);
        }

        self.state.profiles().save(&profile).await?;
        self.state.set_hydrated(Some(profile.clone())).await;
        self.state.replace(Session::authenticated(Some(profile)));
        Ok(())
    }

    async fn known_profile(&self) -> Option<UserProfile> {
        if let Some(profile) = self.state.current().profile() {
            return Some(profile.clone());
        }
        if let Some(profile) = self.state.hydrated().await {
            return Some(profile);
        }
        self.state.profiles().load().await.ok().flatten()
    }
}
