//! Profile Snapshot Storage
//!
//! Persists the non-sensitive identity snapshot (username, names, email, bio)
//! through the host's durable [`KeyValueStore`].
//!
//! ## Notes
//!
//! - The snapshot is written on login and read at start-up for optimistic UI
//! - It is never treated as proof of authentication
//! - A corrupted snapshot is discarded rather than surfaced as an error
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{ProfileStore, UserProfile};
//! use std::sync::Arc;
//! # use bridge_traits::KeyValueStore;
//! # async fn example(store: Arc<dyn KeyValueStore>) -> core_auth::Result<()> {
//! let profiles = ProfileStore::new(store);
//!
//! profiles.save(&UserProfile::new("ada")).await?;
//! let snapshot = profiles.load().await?;
//! profiles.clear().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::UserProfile;
use bridge_traits::KeyValueStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage key of the snapshot; shared with the web client's `localStorage`.
pub const PROFILE_SNAPSHOT_KEY: &str = "userData";

/// Durable storage for the [`UserProfile`] snapshot.
#[derive(Clone)]
pub struct ProfileStore {
    store: Arc<dyn KeyValueStore>,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Overwrite the snapshot.
    pub async fn save(&self, profile: &UserProfile) -> Result<()> {
        let json = serde_json::to_string(profile)
            .map_err(|e| AuthError::Storage(format!("Failed to encode profile: {}", e)))?;

        self.store
            .set_string(PROFILE_SNAPSHOT_KEY, &json)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to persist profile snapshot");
                AuthError::from(e)
            })?;

        debug!(username = %profile.username, "Profile snapshot saved");
        Ok(())
    }

    /// Read the snapshot.
    ///
    /// Returns `Ok(None)` when nothing is stored or the stored value no
    /// longer decodes; in the latter case the value is deleted.
    pub async fn load(&self) -> Result<Option<UserProfile>> {
        let Some(raw) = self.store.get_string(PROFILE_SNAPSHOT_KEY).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<UserProfile>(&raw) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                warn!(error = %e, "Discarding corrupted profile snapshot");
                if let Err(delete_err) = self.store.delete(PROFILE_SNAPSHOT_KEY).await {
                    warn!(error = %delete_err, "Failed to delete corrupted profile snapshot");
                }
                Ok(None)
            }
        }
    }

    /// Remove the snapshot. Idempotent.
    pub async fn clear(&self) -> Result<()> {
        self.store.delete(PROFILE_SNAPSHOT_KEY).await?;
        debug!("Profile snapshot cleared");
        Ok(())
    }
}
