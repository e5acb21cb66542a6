//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the session core:
//! - Logging and tracing infrastructure
//! - Client configuration
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the auth crates depend on.
//! It establishes the logging conventions, the configuration builder and the
//! event broadcasting mechanism that views and the route guard listen to.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
