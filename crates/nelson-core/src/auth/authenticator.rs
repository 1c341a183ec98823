use std::future::Future;

use reqwest::{header, Client};
use thiserror::Error;
use tracing::debug;

use crate::api::error::truncate_body;
use crate::config::ConfigError;
use crate::context::ClientContext;

use super::session::{CreateSessionRequest, Session};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Failed to reach identity exchange at {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Identity exchange at {url} was rejected [{status}]: {body}")]
    Rejected {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Unable to decode session returned by {url}: {source}")]
    InvalidResponse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No GitHub token available. Set $GITHUB_TOKEN or pass --token")]
    MissingIdentityToken,

    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Unable to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error(transparent)]
    Persist(#[from] ConfigError),
}

/// Exchanges a long-lived identity token for a Nelson session.
///
/// Implementations make exactly one attempt; callers never retry a failed
/// exchange.
pub trait Authenticator {
    fn exchange(
        &self,
        identity_token: &str,
        base_url: &str,
    ) -> impl Future<Output = Result<Session, AuthError>> + Send;
}

/// `POST {base_url}/auth/github` against a Nelson server.
#[derive(Clone)]
pub struct GithubAuthenticator {
    client: Client,
    user_agent: String,
}

impl GithubAuthenticator {
    pub fn new(ctx: &ClientContext) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(ctx.timeout)
            .connection_verbose(ctx.debug)
            .build()
            .map_err(AuthError::Client)?;

        Ok(Self {
            client,
            user_agent: ctx.user_agent(),
        })
    }
}

impl Authenticator for GithubAuthenticator {
    async fn exchange(&self, identity_token: &str, base_url: &str) -> Result<Session, AuthError> {
        let url = format!("{}/auth/github", base_url.trim_end_matches('/'));
        debug!(url = %url, "Exchanging identity token");

        let body = CreateSessionRequest {
            access_token: identity_token.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .header(header::USER_AGENT, &self.user_agent)
            .json(&body)
            .send()
            .await
            .map_err(|source| AuthError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| AuthError::Transport {
                url: url.clone(),
                source,
            })?;

        if !status.is_success() {
            return Err(AuthError::Rejected {
                url,
                status: status.as_u16(),
                body: truncate_body(&text),
            });
        }

        serde_json::from_str(&text).map_err(|source| AuthError::InvalidResponse { url, source })
    }
}
