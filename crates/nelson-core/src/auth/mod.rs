//! Authentication against the Nelson identity exchange.
//!
//! This module provides:
//! - `Authenticator`: trade a long-lived GitHub token for a session credential
//! - `Session`, `SessionCookie`: the issued credential and how it rides on requests
//! - `TokenSource`: where the GitHub token is read from during a refresh
//! - `login`: exchange and persist in one step
//!
//! Sessions carry a server-issued expiry in epoch milliseconds. The cookie
//! attached to requests has its own fixed 24 hour max-age; the two are
//! tracked independently.

pub mod authenticator;
pub mod credentials;
pub mod login;
pub mod session;

pub use authenticator::{AuthError, Authenticator, GithubAuthenticator};
pub use credentials::TokenSource;
pub use login::{create_endpoint_url, host_from_uri, login};
pub use session::{CreateSessionRequest, Session, SessionCookie};
