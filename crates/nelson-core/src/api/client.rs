//! Request augmentation for calls to the Nelson API.
//!
//! `ApiClient` wraps a `reqwest::Client` built with the configured timeout
//! and a limit of 10 redirects. Each request gets:
//!
//! - the `nelson.session` cookie, only when the URL's host is the endpoint's
//! - `Content-Type: application/json` and `User-Agent: NelsonCLI/<v> (<os>)`
//! - up to 3 attempts with a 1 second pause, on 500 and 502 only
//!
//! reqwest keeps the `Cookie` header across a redirect only while host and
//! port stay the same, and drops it for good once a hop leaves them.
//!
//! Failures come back as `RequestErrors`. A failed request never touches
//! the persisted session; only `SessionManager` decides a session is stale.

use std::time::Duration;

use reqwest::{header, redirect, Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::SessionCookie;
use crate::config::Config;
use crate::context::ClientContext;

use super::error::{ApiError, RequestErrors};
use super::models::{BuildInfoResponse, CleanupPolicy, SessionResponse};

// ============================================================================
// Constants
// ============================================================================

/// Total attempts per request, including the first.
const MAX_ATTEMPTS: u32 = 3;

/// Pause between attempts in milliseconds.
const RETRY_BACKOFF_MS: u64 = 1000;

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 10;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Which responses are retried and how often.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
    pub retry_on: Vec<StatusCode>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            backoff: Duration::from_millis(RETRY_BACKOFF_MS),
            retry_on: vec![StatusCode::BAD_GATEWAY, StatusCode::INTERNAL_SERVER_ERROR],
        }
    }
}

impl RetryPolicy {
    /// `attempt` is 1-based: the attempt that just produced `status`.
    pub fn should_retry(&self, status: StatusCode, attempt: u32) -> bool {
        attempt < self.max_attempts && self.retry_on.contains(&status)
    }
}

/// API client for Nelson.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    endpoint: String,
    cookie: Option<SessionCookie>,
    user_agent: String,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Create a client for the endpoint and credential in `config`.
    pub fn new(ctx: &ClientContext, config: &Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(ctx.timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .connection_verbose(ctx.debug)
            .build()?;

        let cookie = SessionCookie::for_config(config);
        if let Some(ref cookie) = cookie {
            debug!(cookie = %cookie, "Session cookie");
        }

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            cookie,
            user_agent: ctx.user_agent(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Absolute URL for an API path such as `/v1/build-info`.
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        let raw = format!("{}{}", self.endpoint, path);
        Url::parse(&raw).map_err(|e| ApiError::InvalidUrl {
            url: raw,
            reason: e.to_string(),
        })
    }

    /// Decorate a request with headers and, when allowed, the session cookie.
    fn augment(
        &self,
        method: &Method,
        url: &Url,
        with_credential: bool,
    ) -> Result<RequestBuilder, ApiError> {
        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(header::USER_AGENT, &self.user_agent);

        if with_credential {
            if let Some(ref cookie) = self.cookie {
                request = request.header(
                    header::COOKIE,
                    header::HeaderValue::from_str(&cookie.header_value())?,
                );
            }
        }

        Ok(request)
    }

    /// Run a request, retrying retryable statuses.
    ///
    /// Returns the final 2xx response, or every error met along the way:
    /// one per retried attempt plus the one that ended the request.
    pub async fn execute(&self, method: Method, url: Url) -> Result<Response, RequestErrors> {
        let with_credential = self
            .cookie
            .as_ref()
            .map(|c| c.matches(&url))
            .unwrap_or(false);

        let mut errors = Vec::new();
        let mut attempt = 1;

        loop {
            debug!(method = %method, url = %url, attempt, with_credential, "Sending request");
            let sent = match self.augment(&method, &url, with_credential) {
                Ok(request) => request.send().await.map_err(ApiError::from),
                Err(e) => Err(e),
            };
            let response = match sent {
                Ok(response) => response,
                Err(e) => {
                    errors.push(e);
                    return Err(RequestErrors(errors));
                }
            };

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            // reqwest hands back a redirect it could not follow
            if status.is_redirection() {
                errors.push(ApiError::BadRedirect {
                    status: status.as_u16(),
                    url: response.url().to_string(),
                });
                return Err(RequestErrors(errors));
            }

            let retry = self.retry.should_retry(status, attempt);
            let text = response.text().await.unwrap_or_default();
            errors.push(ApiError::from_status(status, &text));
            if !retry {
                return Err(RequestErrors(errors));
            }

            warn!(
                url = %url,
                status = status.as_u16(),
                attempt,
                backoff_ms = self.retry.backoff.as_millis() as u64,
                "Retryable response, backing off"
            );
            tokio::time::sleep(self.retry.backoff).await;
            attempt += 1;
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RequestErrors> {
        let url = response.url().to_string();
        let bytes = response.bytes().await.map_err(ApiError::Transport)?;
        serde_json::from_slice(&bytes)
            .map_err(|source| ApiError::Decode { url, source }.into())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, RequestErrors> {
        let url = self.url(path)?;
        let response = self.execute(Method::GET, url).await?;
        Self::decode(response).await
    }

    // ===== Session-level endpoints =====

    /// `GET /session`
    pub async fn whoami(&self) -> Result<SessionResponse, RequestErrors> {
        self.get("/session").await
    }

    /// `GET /v1/build-info`
    pub async fn build_info(&self) -> Result<BuildInfoResponse, RequestErrors> {
        self.get("/v1/build-info").await
    }

    /// `GET /v1/cleanup-policies`
    pub async fn cleanup_policies(&self) -> Result<Vec<CleanupPolicy>, RequestErrors> {
        self.get("/v1/cleanup-policies").await
    }
}
