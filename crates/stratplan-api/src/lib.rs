//! Async client for the planning backend's REST API.
//!
//! [`ApiClient`] owns the HTTP connection, the cookie jar and the session
//! context. The [`queries`] modules wrap one resource family each and run
//! the local checks from `stratplan-core` before any mutation is sent.

pub mod client;
pub mod config;
pub mod cookies;
pub mod error;
pub mod models;
pub mod queries;
pub mod session;

pub use client::ApiClient;
pub use config::ApiConfig;
pub use error::ApiError;
