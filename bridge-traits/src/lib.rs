//! # Host Bridge Traits
//!
//! Platform abstraction traits that the session core needs from its host.
//!
//! ## Overview
//!
//! This crate defines the contract between the session core and
//! platform-specific implementations. Each trait represents a capability that
//! the core requires but that is implemented differently per host (desktop
//! shell, browser, test harness).
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Transport: performs HTTP calls and
//!   carries the session credential (cookie jar or bearer header)
//! - [`KeyValueStore`](storage::KeyValueStore) - Durable client-side key-value
//!   storage used for the non-sensitive profile snapshot
//! - [`Clock`](time::Clock) - Time source; [`ManualClock`](time::ManualClock)
//!   makes cooldown windows deterministic in tests
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Implementations should convert platform errors into the closest variant so
//! the core can tell a timeout or refused connection apart from a storage
//! failure.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared behind `Arc`
//! across async tasks.
//!
//! ## Examples
//!
//! ### Implementing HttpClient
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct MyHttpClient {
//!     client: reqwest::Client,
//! }
//!
//! #[async_trait]
//! impl HttpClient for MyHttpClient {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use storage::KeyValueStore;
pub use time::{Clock, ManualClock, SystemClock};
