//! Session lifecycle run before every command that talks to Nelson.
//!
//! `SessionManager::resolve` loads `~/.nelson/config.yml`, validates the
//! credential and, when the only problem is an expired token on a known
//! endpoint, logs in again against that same host. Anything else ends in a
//! `Bailout` carrying every error found, oldest first.

pub mod manager;

pub use manager::{Bailout, Ready, SessionError, SessionManager, SessionState, REFRESH_NOTICE};
