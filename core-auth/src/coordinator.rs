//! # Refresh Coordinator
//!
//! Arbitrates credential renewal among concurrently failing requests.
//!
//! ## Overview
//!
//! At most one renewal call is in flight process-wide. A caller arriving
//! while one is running is denied with [`DenialReason::AlreadyInProgress`]
//! instead of queuing; a caller arriving within the cooldown window of the
//! previous attempt is denied with [`DenialReason::Cooldown`] without any
//! network traffic. The cooldown is measured from the start of the previous
//! attempt regardless of its outcome.
//!
//! A renewal that fails for any reason other than server-side rate limiting
//! ends the session: the registered [`SessionExpiryHandler`] is invoked
//! before the denial is returned.

use crate::types::{DenialReason, RefreshOutcome, Renewed};
use async_trait::async_trait;
use bridge_traits::{Clock, HttpClient, HttpMethod, HttpRequest};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Receives the "session is gone" signal from the coordinator.
#[async_trait]
pub trait SessionExpiryHandler: Send + Sync {
    /// Marker of the current session; changes on every sign-in and sign-out.
    fn generation(&self) -> u64 {
        0
    }

    /// `generation` is the marker read when the failed renewal started, so a
    /// session established meanwhile can be left alone.
    async fn session_expired(&self, generation: u64);
}

/// Phase of the renewal protocol. Internal to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RefreshPhase {
    Idle,
    /// Exactly one renewal call is in flight.
    Refreshing,
    /// `Idle`, but the previous attempt started less than one cooldown
    /// window ago. Never stored, only reported by `phase()`.
    Cooling,
}

#[derive(Debug)]
struct RefreshState {
    phase: RefreshPhase,
    last_attempt_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct RefreshReply {
    #[serde(default)]
    success: bool,
}

/// Returns to `Idle` even if the owning future is dropped mid-call.
struct InFlight<'a> {
    state: &'a Mutex<RefreshState>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        state.phase = RefreshPhase::Idle;
    }
}

fn lock(state: &Mutex<RefreshState>) -> MutexGuard<'_, RefreshState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Single-flight, rate-limited credential renewal.
pub struct RefreshCoordinator {
    http_client: Arc<dyn HttpClient>,
    refresh_url: String,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
    state: Mutex<RefreshState>,
    event_bus: EventBus,
    expiry_handler: Arc<dyn SessionExpiryHandler>,
}

impl RefreshCoordinator {
    /// Creates a coordinator.
    ///
    /// The renewal call goes straight to `http_client`, never through the
    /// request interceptor, so a 401 from the refresh endpoint cannot recurse.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        refresh_url: impl Into<String>,
        clock: Arc<dyn Clock>,
        cooldown: Duration,
        event_bus: EventBus,
        expiry_handler: Arc<dyn SessionExpiryHandler>,
    ) -> Self {
        Self {
            http_client,
            refresh_url: refresh_url.into(),
            clock,
            cooldown,
            state: Mutex::new(RefreshState {
                phase: RefreshPhase::Idle,
                last_attempt_at: None,
            }),
            event_bus,
            expiry_handler,
        }
    }

    /// Ask for the session credential to be renewed.
    ///
    /// Safe to call from any number of concurrent tasks: exactly one of them
    /// performs the renewal call, the others are denied immediately.
    #[instrument(skip(self))]
    pub async fn request_refresh(&self) -> RefreshOutcome {
        let in_flight = match self.begin_attempt() {
            Ok(guard) => guard,
            Err(reason) => {
                debug!(reason = reason.as_str(), "Refresh denied");
                self.emit_denied(reason);
                return Err(reason);
            }
        };

        let generation = self.expiry_handler.generation();
        info!("Refreshing session credential");
        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::TokenRefreshing));

        let outcome = self.renew().await;
        drop(in_flight);

        match outcome {
            Ok(Renewed) => {
                info!("Session credential refreshed");
                let _ = self
                    .event_bus
                    .emit(CoreEvent::Auth(AuthEvent::TokenRefreshed));
            }
            Err(DenialReason::Unrecoverable) => {
                warn!("Session credential cannot be renewed, ending session");
                self.emit_denied(DenialReason::Unrecoverable);
                self.expiry_handler.session_expired(generation).await;
            }
            Err(reason) => {
                warn!(reason = reason.as_str(), "Refresh refused by server");
                self.emit_denied(reason);
            }
        }

        outcome
    }

    /// Current phase, reporting `Cooling` while an idle coordinator would
    /// still deny with [`DenialReason::Cooldown`].
    pub(crate) fn phase(&self) -> RefreshPhase {
        let now = self.clock.now();
        let state = lock(&self.state);
        match (state.phase, state.last_attempt_at) {
            (RefreshPhase::Idle, Some(last)) if self.within_cooldown(last, now) => {
                RefreshPhase::Cooling
            }
            (phase, _) => phase,
        }
    }

    /// Whether a renewal call is in flight right now.
    pub fn is_refreshing(&self) -> bool {
        self.phase() == RefreshPhase::Refreshing
    }

    pub fn last_attempt_at(&self) -> Option<DateTime<Utc>> {
        lock(&self.state).last_attempt_at
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Atomically test-and-set the refresh state.
    fn begin_attempt(&self) -> Result<InFlight<'_>, DenialReason> {
        let now = self.clock.now();
        let mut state = lock(&self.state);

        if state.phase == RefreshPhase::Refreshing {
            return Err(DenialReason::AlreadyInProgress);
        }

        if let Some(last) = state.last_attempt_at {
            if self.within_cooldown(last, now) {
                return Err(DenialReason::Cooldown);
            }
        }

        state.phase = RefreshPhase::Refreshing;
        state.last_attempt_at = Some(now);

        Ok(InFlight { state: &self.state })
    }

    fn within_cooldown(&self, last: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        // A clock that moved backwards does not extend the window
        match (now - last).to_std() {
            Ok(elapsed) => elapsed < self.cooldown,
            Err(_) => false,
        }
    }

    async fn renew(&self) -> RefreshOutcome {
        let request = HttpRequest::new(HttpMethod::Post, self.refresh_url.clone())
            .header("Content-Type", "application/json")
            .body(Bytes::from_static(b"{}"));

        let response = match self.http_client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Refresh call failed without a response");
                return Err(DenialReason::Unrecoverable);
            }
        };

        if response.is_rate_limited() {
            return Err(DenialReason::RateLimited);
        }

        if !response.is_success() {
            warn!(status = response.status, "Refresh endpoint rejected the session");
            return Err(DenialReason::Unrecoverable);
        }

        match response.json::<RefreshReply>() {
            Ok(RefreshReply { success: true }) => Ok(Renewed),
            Ok(_) => {
                warn!("Refresh endpoint reported failure");
                Err(DenialReason::Unrecoverable)
            }
            Err(e) => {
                warn!(error = %e, "Undecodable refresh reply");
                Err(DenialReason::Unrecoverable)
            }
        }
    }

    fn emit_denied(&self, reason: DenialReason) {
        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::RefreshDenied {
                reason: reason.as_str().to_string(),
            }));
    }
}
