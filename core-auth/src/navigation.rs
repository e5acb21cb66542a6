//! Navigation-triggered session re-validation.
//!
//! The host router reports every route change to [`NavigationWatcher`]. A
//! change to a new path cancels any pending check and schedules a fresh one
//! after the debounce window, so a burst of navigations produces a single
//! check. Reporting the current path again is ignored.

use crate::controller::AuthController;
use core_runtime::events::{CoreEvent, NavigationEvent};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

#[derive(Default)]
struct WatcherState {
    last_path: Option<String>,
    pending: Option<CancellationToken>,
}

pub struct NavigationWatcher {
    controller: AuthController,
    debounce: Duration,
    state: Mutex<WatcherState>,
}

impl NavigationWatcher {
    pub fn new(controller: AuthController, debounce: Duration) -> Self {
        Self {
            controller,
            debounce,
            state: Mutex::new(WatcherState::default()),
        }
    }

    /// Record the router's current path.
    ///
    /// Returns `true` when a session check was (re)scheduled. Must be called
    /// from within a Tokio runtime.
    pub fn route_changed(&self, path: impl Into<String>) -> bool {
        let path = path.into();
        let token = {
            let mut state = self.lock();
            if state.last_path.as_deref() == Some(path.as_str()) {
                trace!(path = %path, "Same path, no check scheduled");
                return false;
            }
            state.last_path = Some(path.clone());

            if let Some(previous) = state.pending.take() {
                previous.cancel();
            }
            let token = CancellationToken::new();
            state.pending = Some(token.clone());
            token
        };

        debug!(path = %path, "Route changed, scheduling session check");
        let _ = self
            .controller
            .event_bus()
            .emit(CoreEvent::Navigation(NavigationEvent::RouteChanged { path }));

        let controller = self.controller.clone();
        let debounce = self.debounce;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    trace!("Superseded session check dropped");
                }
                _ = tokio::time::sleep(debounce) => {
                    controller.check_session().await;
                }
            }
        });

        true
    }

    /// Whether a check is scheduled and not yet cancelled.
    pub fn has_pending_check(&self) -> bool {
        self.lock()
            .pending
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    pub fn last_path(&self) -> Option<String> {
        self.lock().last_path.clone()
    }

    /// Cancel any pending check, e.g. when the view tree is torn down.
    pub fn shutdown(&self) {
        if let Some(token) = self.lock().pending.take() {
            token.cancel();
        }
    }

    fn lock(&self) -> MutexGuard<'_, WatcherState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for NavigationWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
