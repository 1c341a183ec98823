//! REST client for the Nelson API.
//!
//! `ApiClient` is the request augmenter: every outbound call carries the
//! session cookie (only to the configured host), a JSON content type and the
//! CLI user agent, and runs under a timeout with bounded retries on 500/502.
//! Redirects keep the cookie only while they stay on the same host and port.

pub mod client;
pub mod error;
pub mod models;

pub use client::{ApiClient, RetryPolicy};
pub use error::{ApiError, RequestErrors};
pub use models::{BuildInfo, BuildInfoResponse, CleanupPolicy, SessionResponse, User};
