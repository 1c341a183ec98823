use std::path::Path;

use reqwest::Url;
use tracing::info;

use crate::config::{write_config_file, Config};

use super::authenticator::{AuthError, Authenticator};

/// `https://host` or `http://host`.
pub fn create_endpoint_url(host: &str, use_tls: bool) -> String {
    let host = host.trim().trim_end_matches('/');
    if use_tls {
        format!("https://{}", host)
    } else {
        format!("http://{}", host)
    }
}

/// Host (with any explicit port) of an endpoint URL.
pub fn host_from_uri(endpoint: &str) -> Result<String, AuthError> {
    let invalid = |reason: String| AuthError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| invalid("no host in URL".to_string()))?;

    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Exchange `identity_token` for a session on `host` and persist it to `path`.
pub async fn login<A: Authenticator>(
    authenticator: &A,
    identity_token: &str,
    host: &str,
    disable_tls: bool,
    path: &Path,
) -> Result<Config, AuthError> {
    let base_url = create_endpoint_url(host, !disable_tls);
    let session = authenticator.exchange(identity_token, &base_url).await?;

    write_config_file(&session, &base_url, path)?;
    info!(endpoint = %base_url, path = %path.display(), "Session persisted");

    Ok(Config::from_session(&session, &base_url))
}
