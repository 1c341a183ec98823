//! Core library for the nelson CLI.
//!
//! This crate owns everything with real state behind the command line:
//!
//! - `config`: the persisted `~/.nelson/config.yml` file and expiry validation
//! - `auth`: the identity-token exchange and the session cookie
//! - `session`: load, validate, refresh and persist before every command
//! - `api`: the request augmenter (cookie, headers, timeout, retries, redirects)
//! - `report`: printing accumulated errors before exit
//!
//! Process-wide settings live in a `ClientContext` built once by the binary.

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod report;
pub mod session;

pub use context::ClientContext;

#[cfg(test)]
pub(crate) mod test_support;
