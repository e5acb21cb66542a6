//! # Request Interceptor
//!
//! Wraps every outbound call so that an expired credential is handled in one
//! place instead of at each call site.
//!
//! ## Behavior
//!
//! - A response other than 401 is returned unchanged, whatever its status.
//! - A 401 on a request not yet retried marks it retried, asks the
//!   [`RefreshCoordinator`] for a renewal and, if granted, replays the
//!   original request exactly once.
//! - A 401 on an already retried request is terminal.
//! - A denied renewal fails the request with the error matching the denial;
//!   the interceptor never navigates and never queues the request.

use crate::coordinator::RefreshCoordinator;
use crate::error::{AuthError, Result};
use bridge_traits::{HttpClient, HttpRequest, HttpResponse};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// One logical request and its retry marker.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub id: Uuid,
    pub request: HttpRequest,
    retried: bool,
}

impl PendingRequest {
    pub fn new(request: HttpRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            retried: false,
        }
    }

    /// Mark the request as already retried so a 401 is never followed by a
    /// refresh. Used for calls whose 401 means "wrong credentials".
    pub fn mark_retried(mut self) -> Self {
        self.retried = true;
        self
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }
}

pub struct RequestInterceptor {
    http_client: Arc<dyn HttpClient>,
    coordinator: Arc<RefreshCoordinator>,
}

impl RequestInterceptor {
    pub fn new(http_client: Arc<dyn HttpClient>, coordinator: Arc<RefreshCoordinator>) -> Self {
        Self {
            http_client,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// Send a request, renewing the credential and replaying once on 401.
    ///
    /// # Errors
    ///
    /// - `AuthError::Network` when no response was received
    /// - `AuthError::AuthExpired` when the request was rejected and could not
    ///   be replayed, or its replay was rejected again
    /// - `AuthError::RefreshRateLimited` / `AuthError::RefreshUnrecoverable`
    ///   when the renewal was refused for those reasons
    #[instrument(skip(self, pending), fields(id = %pending.id, method = %pending.request.method))]
    pub async fn send(&self, mut pending: PendingRequest) -> Result<HttpResponse> {
        let response = self.http_client.execute(pending.request.clone()).await?;

        if !response.is_unauthorized() {
            return Ok(response);
        }

        if pending.retried {
            debug!("Rejected after retry, giving up");
            return Err(AuthError::AuthExpired);
        }
        pending.retried = true;

        self.coordinator.request_refresh().await?;

        debug!("Replaying request after refresh");
        let replay = self.http_client.execute(pending.request).await?;
        if replay.is_unauthorized() {
            return Err(AuthError::AuthExpired);
        }

        Ok(replay)
    }
}
