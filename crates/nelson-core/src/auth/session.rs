use std::fmt;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Cookie name the Nelson server reads the session from.
pub const SESSION_COOKIE_NAME: &str = "nelson.session";

/// Client-side cookie retention. Fixed at 24 hours and unrelated to the
/// server-issued `expires_at`, which alone decides when to refresh.
pub const SESSION_COOKIE_MAX_AGE_SECS: u64 = 86_400;

/// Body of `POST /auth/github`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionRequest {
    pub access_token: String,
}

/// Session issued by the identity exchange.
///
/// `{ "session_token": "xxx", "expires_at": 12345 }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_token: String,
    /// Epoch milliseconds, exclusive.
    pub expires_at: i64,
}

/// The session credential as it is attached to outbound requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub path: String,
    /// Host of the configured endpoint.
    pub domain: String,
    /// Port of the configured endpoint, explicit or the scheme's default.
    pub port: Option<u16>,
    /// Scheme of the configured endpoint.
    pub scheme: String,
    pub max_age: Duration,
    pub secure: bool,
    pub http_only: bool,
}

impl SessionCookie {
    /// Build the cookie for a loaded config. `None` if the endpoint has no host.
    pub fn for_config(config: &Config) -> Option<Self> {
        let endpoint = Url::parse(&config.endpoint).ok()?;
        let domain = endpoint.host_str()?.to_string();
        Some(Self {
            name: SESSION_COOKIE_NAME.to_string(),
            value: config.session.token.clone(),
            path: "/".to_string(),
            domain,
            port: endpoint.port_or_known_default(),
            scheme: endpoint.scheme().to_string(),
            max_age: Duration::from_secs(SESSION_COOKIE_MAX_AGE_SECS),
            secure: true,
            http_only: false,
        })
    }

    /// Whether a request to `url` may carry this cookie.
    ///
    /// A `Secure` cookie still goes over plain http when the endpoint itself
    /// is plain http, as after `login --disable-tls`.
    pub fn matches(&self, url: &Url) -> bool {
        let same_host = url.host_str() == Some(self.domain.as_str())
            && url.port_or_known_default() == self.port;
        let in_path = url.path().starts_with(&self.path);
        let transport_ok = !self.secure || url.scheme() == "https" || url.scheme() == self.scheme;
        same_host && in_path && transport_ok
    }

    /// Value for the `Cookie` request header.
    pub fn header_value(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

// Set-Cookie form with the value redacted, for logs.
impl fmt::Display for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}=<redacted>; Path={}; Domain={}; Max-Age={}",
            self.name,
            self.path,
            self.domain,
            self.max_age.as_secs()
        )?;
        if self.secure {
            write!(f, "; Secure")?;
        }
        if self.http_only {
            write!(f, "; HttpOnly")?;
        }
        Ok(())
    }
}
