//! Process-wide session state.
//!
//! [`SessionState`] owns the one writable copy of [`Session`]. Observers get
//! `watch` receivers; only this crate mutates it (the controller for
//! check/login/logout, the refresh coordinator through
//! [`SessionExpiryHandler`]).
//!
//! Every sign-in and sign-out advances a generation counter. Work that
//! started under an older generation (a session check or a renewal still on
//! the wire) must not overwrite the newer state.

use crate::coordinator::SessionExpiryHandler;
use crate::profile_store::ProfileStore;
use crate::types::{Session, SessionStatus, UserProfile};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus, NavigationEvent, Notice};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

pub struct SessionState {
    sender: watch::Sender<Session>,
    generation: AtomicU64,
    profiles: ProfileStore,
    /// Snapshot read at start-up, shown before the first session check.
    hydrated: RwLock<Option<UserProfile>>,
    event_bus: EventBus,
    login_path: String,
}

impl SessionState {
    pub fn new(profiles: ProfileStore, event_bus: EventBus, login_path: impl Into<String>) -> Self {
        let (sender, _) = watch::channel(Session::unknown());
        Self {
            sender,
            generation: AtomicU64::new(0),
            profiles,
            hydrated: RwLock::new(None),
            event_bus,
            login_path: login_path.into(),
        }
    }

    pub fn current(&self) -> Session {
        self.sender.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.sender.borrow().status()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.sender.subscribe()
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub(crate) fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub(crate) fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub(crate) async fn hydrated(&self) -> Option<UserProfile> {
        self.hydrated.read().await.clone()
    }

    pub(crate) async fn set_hydrated(&self, profile: Option<UserProfile>) {
        *self.hydrated.write().await = profile;
    }

    pub(crate) fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Start a new generation; pending work from older ones becomes stale.
    pub(crate) fn advance_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Replace the session only if no sign-in or sign-out happened since
    /// `generation` was read. Returns `false` when the update was stale.
    pub(crate) fn replace_if_current(&self, generation: u64, next: Session) -> bool {
        let mut current = true;
        let changed = self.sender.send_if_modified(|session| {
            if self.generation.load(Ordering::SeqCst) != generation {
                current = false;
                return false;
            }
            if *session == next {
                false
            } else {
                *session = next;
                true
            }
        });
        if changed {
            debug!(status = %self.status(), "Session changed");
        }
        current
    }

    /// Replace the session, notifying observers only on an actual change.
    pub(crate) fn replace(&self, next: Session) {
        let changed = self.sender.send_if_modified(|session| {
            if *session == next {
                false
            } else {
                *session = next;
                true
            }
        });
        if changed {
            debug!(status = %self.status(), "Session changed");
        }
    }

    pub(crate) fn emit(&self, event: CoreEvent) {
        let _ = self.event_bus.emit(event);
    }

    pub(crate) fn notify(&self, notice: Notice) {
        self.emit(CoreEvent::Notice(notice));
    }

    pub(crate) fn redirect(&self, to: impl Into<String>) {
        let to = to.into();
        info!(to = %to, "Requesting navigation");
        self.emit(CoreEvent::Navigation(NavigationEvent::Redirect { to }));
    }

    /// Drop every trace of the signed-in user and settle on `Unauthenticated`.
    pub(crate) async fn tear_down(&self) {
        self.advance_generation();
        if let Err(e) = self.profiles.clear().await {
            warn!(error = %e, "Failed to clear profile snapshot");
        }
        self.set_hydrated(None).await;
        self.replace(Session::unauthenticated());
    }
}

#[async_trait]
impl SessionExpiryHandler for SessionState {
    fn generation(&self) -> u64 {
        self.current_generation()
    }

    async fn session_expired(&self, generation: u64) {
        if generation != self.current_generation() {
            debug!("Session changed while the renewal was in flight, keeping it");
            return;
        }
        let was_unauthenticated = self.status() == SessionStatus::Unauthenticated;

        self.tear_down().await;
        self.emit(CoreEvent::Auth(AuthEvent::SessionExpired));

        // Several callers can learn of the same expiry; redirect once
        if !was_unauthenticated {
            self.redirect(self.login_path.clone());
        }
    }
}
