//! Durable Client-Side Storage
//!
//! A string key-value store for non-sensitive client state (the cached profile
//! snapshot). Browser hosts back it with `localStorage`, desktop hosts with a
//! small SQLite table.

use async_trait::async_trait;

use crate::error::Result;

/// Key-value storage trait
///
/// Abstracts platform-specific durable storage:
/// - Web: localStorage / IndexedDB
/// - Desktop: SQLite file in the application data directory
/// - Tests: in-memory map
///
/// Values written here must never be treated as proof of authentication and
/// must never contain credentials.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::KeyValueStore;
///
/// async fn remember_user(store: &dyn KeyValueStore, json: &str) -> Result<()> {
///     store.set_string("userData", json).await
/// }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Store a string value, replacing any previous value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Delete a value; deleting a missing key is not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a key exists
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }

    /// List all keys
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Remove every stored value
    async fn clear_all(&self) -> Result<()>;
}
