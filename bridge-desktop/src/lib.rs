//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for native hosts
//! (macOS, Windows, Linux) and for tests.
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` with a cookie jar, so the http-only session
//!   cookies set by the server ride along on every call
//! - `KeyValueStore` using a SQLite-backed table
//! - `KeyValueStore` kept in memory, for tests and ephemeral sessions
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, SqliteKeyValueStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let store = SqliteKeyValueStore::new("/tmp/connect/client.db".into()).await?;
//!
//!     // Use in client configuration
//! }
//! ```

mod http;
mod kv_store;
mod memory;

pub use http::ReqwestHttpClient;
pub use kv_store::SqliteKeyValueStore;
pub use memory::MemoryKeyValueStore;
