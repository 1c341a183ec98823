use std::io::{self, Write};
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use crate::auth::{host_from_uri, login, AuthError, Authenticator};
use crate::config::{read_config_file, Config, ConfigError, ValidationError};
use crate::context::ClientContext;

/// Printed before an automatic refresh, whatever the log level.
pub const REFRESH_NOTICE: &str = "Attempting token refresh...";

/// Stages of `SessionManager::resolve`, logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Start,
    FileMissing,
    FileUnreadable,
    Loaded,
    Expired,
    Refreshing,
    RefreshFailed,
    Ready,
    Fatal,
}

/// One problem found while resolving the session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No config file existed at {}. You need to `nelson login` before running other commands.", .path.display())]
    Missing { path: PathBuf },

    #[error("Unable to read configuration file at '{}'. Reported error was: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Attempted token refresh failed: {0}")]
    Refresh(#[from] AuthError),

    #[error("Unable to load refreshed configuration: {0}")]
    Reload(#[source] ConfigError),
}

/// Fatal outcome: every error found, in the order it was found.
#[derive(Error, Debug)]
#[error("Encountered {} problem(s) loading the configuration file", .errors.len())]
pub struct Bailout {
    pub errors: Vec<SessionError>,
}

/// A configuration that is safe to make requests with.
#[derive(Debug, Clone)]
pub struct Ready {
    pub config: Config,
    /// Whether an automatic refresh produced this config.
    pub refreshed: bool,
}

pub struct SessionManager<'a, A> {
    ctx: &'a ClientContext,
    authenticator: &'a A,
}

impl<'a, A: Authenticator> SessionManager<'a, A> {
    pub fn new(ctx: &'a ClientContext, authenticator: &'a A) -> Self {
        Self { ctx, authenticator }
    }

    /// Produce a usable configuration or every reason there isn't one.
    ///
    /// Errors accumulate instead of returning early so the refresh can be
    /// attempted. Only an expired token on a config that loaded cleanly is
    /// refreshed; a missing or unreadable file gives no trustworthy host, so
    /// no network call is made for it.
    pub async fn resolve(&self) -> Result<Ready, Bailout> {
        self.resolve_with_notices(&mut io::stderr()).await
    }

    /// `resolve`, writing the refresh notice to `notices`.
    pub async fn resolve_with_notices<W: Write>(&self, notices: &mut W) -> Result<Ready, Bailout> {
        let path = &self.ctx.config_path;
        let mut errors = Vec::new();
        enter(SessionState::Start);

        // An inaccessible path is left for read_config_file to report.
        let exists = path.try_exists().unwrap_or(true);
        if !exists {
            enter(SessionState::FileMissing);
            errors.push(SessionError::Missing { path: path.clone() });
        }

        let config = if exists {
            match read_config_file(path) {
                Ok(config) => {
                    enter(SessionState::Loaded);
                    config
                }
                Err(source) => {
                    enter(SessionState::FileUnreadable);
                    errors.push(SessionError::Unreadable {
                        path: path.clone(),
                        source,
                    });
                    Config::default()
                }
            }
        } else {
            Config::default()
        };

        let invalid = config.validate();
        if !invalid.is_empty() {
            enter(SessionState::Expired);
        }
        errors.extend(invalid.into_iter().map(SessionError::Invalid));

        if errors.is_empty() {
            enter(SessionState::Ready);
            return Ok(Ready {
                config,
                refreshed: false,
            });
        }

        let only_expired = errors.iter().all(|e| matches!(e, SessionError::Invalid(_)));
        if !only_expired {
            enter(SessionState::Fatal);
            return Err(Bailout { errors });
        }

        enter(SessionState::Refreshing);
        let _ = writeln!(notices, "{}", REFRESH_NOTICE);
        match self.refresh(&config).await {
            Ok(config) => {
                enter(SessionState::Ready);
                Ok(Ready {
                    config,
                    refreshed: true,
                })
            }
            Err(e) => {
                enter(SessionState::RefreshFailed);
                errors.push(e);
                enter(SessionState::Fatal);
                Err(Bailout { errors })
            }
        }
    }

    /// Log in again against the host of the existing endpoint, always over TLS.
    async fn refresh(&self, existing: &Config) -> Result<Config, SessionError> {
        let host = host_from_uri(&existing.endpoint)?;
        let token = self
            .ctx
            .token_source
            .fetch()
            .ok_or(AuthError::MissingIdentityToken)?;

        login(self.authenticator, &token, &host, false, &self.ctx.config_path).await?;

        let config = read_config_file(&self.ctx.config_path).map_err(SessionError::Reload)?;
        if let Some(err) = config.validate().into_iter().next() {
            return Err(err.into());
        }

        info!(endpoint = %config.endpoint, "Session refreshed");
        Ok(config)
    }
}

fn enter(state: SessionState) {
    debug!(state = ?state, "Session state");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Session, TokenSource};
    use crate::config::{now_millis, write_config_file};
    use crate::test_support::StubAuthenticator;
    use std::path::Path;
    use tempfile::TempDir;

    const HOUR_MS: i64 = 3_600_000;

    fn context(dir: &TempDir) -> ClientContext {
        ClientContext::new(dir.path().join(".nelson").join("config.yml"))
            .with_token_source(TokenSource::Fixed("ghp_test".to_string()))
    }

    fn persist(path: &Path, endpoint: &str, token: &str, expires_at: i64) {
        let session = Session {
            session_token: token.to_string(),
            expires_at,
        };
        write_config_file(&session, endpoint, path).unwrap();
    }

    fn fresh_session() -> Session {
        Session {
            session_token: "fresh".to_string(),
            expires_at: now_millis() + HOUR_MS,
        }
    }

    #[tokio::test]
    async fn test_valid_session_is_ready() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        persist(&ctx.config_path, "https://nelson.example.com", "abc", now_millis() + HOUR_MS);
        let stub = StubAuthenticator::succeeding(fresh_session());

        let mut notices = Vec::new();
        let ready = SessionManager::new(&ctx, &stub)
            .resolve_with_notices(&mut notices)
            .await
            .unwrap();

        assert!(!ready.refreshed);
        assert_eq!(ready.config.session.token, "abc");
        assert!(stub.calls().is_empty());
        assert!(notices.is_empty());
    }

    #[tokio::test]
    async fn test_expired_session_is_refreshed() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        persist(&ctx.config_path, "http://nelson.example.com", "stale", now_millis() - 60_000);
        let stub = StubAuthenticator::succeeding(fresh_session());

        let mut notices = Vec::new();
        let ready = SessionManager::new(&ctx, &stub)
            .resolve_with_notices(&mut notices)
            .await
            .unwrap();

        assert_eq!(String::from_utf8(notices).unwrap(), "Attempting token refresh...\n");
        assert!(ready.refreshed);
        assert_eq!(ready.config.session.token, "fresh");
        assert!(ready.config.session.expires_at > now_millis());
        // Same host, never downgraded to plain http
        assert_eq!(
            stub.calls(),
            vec![("ghp_test".to_string(), "https://nelson.example.com".to_string())]
        );

        let on_disk = read_config_file(&ctx.config_path).unwrap();
        assert_eq!(on_disk.endpoint, "https://nelson.example.com");
        assert_eq!(on_disk.session.token, "fresh");
        assert!(on_disk.session.expires_at > now_millis());
    }

    #[tokio::test]
    async fn test_refresh_keeps_explicit_port() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        persist(&ctx.config_path, "https://localhost:9000", "stale", 0);
        let stub = StubAuthenticator::succeeding(fresh_session());

        SessionManager::new(&ctx, &stub).resolve().await.unwrap();

        assert_eq!(stub.calls()[0].1, "https://localhost:9000");
    }

    #[tokio::test]
    async fn test_empty_expiry_is_refreshed() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        std::fs::create_dir_all(ctx.config_path.parent().unwrap()).unwrap();
        std::fs::write(
            &ctx.config_path,
            "---\nendpoint: https://nelson.example.com\nsession:\n  token: abc\n  expires_at:\n",
        )
        .unwrap();
        let stub = StubAuthenticator::succeeding(fresh_session());

        let ready = SessionManager::new(&ctx, &stub).resolve().await.unwrap();

        assert!(ready.refreshed);
        assert_eq!(
            stub.calls(),
            vec![("ghp_test".to_string(), "https://nelson.example.com".to_string())]
        );
        assert_eq!(read_config_file(&ctx.config_path).unwrap().session.token, "fresh");
    }

    #[tokio::test]
    async fn test_missing_file_is_fatal_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        let stub = StubAuthenticator::succeeding(fresh_session());

        let bailout = SessionManager::new(&ctx, &stub).resolve().await.unwrap_err();

        assert!(stub.calls().is_empty());
        assert!(!ctx.config_path.exists());
        assert_eq!(bailout.errors.len(), 2);
        assert!(matches!(bailout.errors[0], SessionError::Missing { .. }));
        assert!(matches!(bailout.errors[1], SessionError::Invalid(_)));
        assert!(bailout.errors[0].to_string().contains("nelson login"));
    }

    #[tokio::test]
    async fn test_unreadable_file_is_fatal_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        std::fs::create_dir_all(ctx.config_path.parent().unwrap()).unwrap();
        std::fs::write(&ctx.config_path, "endpoint: [unclosed\n").unwrap();
        let stub = StubAuthenticator::succeeding(fresh_session());

        let bailout = SessionManager::new(&ctx, &stub).resolve().await.unwrap_err();

        assert!(stub.calls().is_empty());
        assert!(matches!(
            bailout.errors[0],
            SessionError::Unreadable {
                source: ConfigError::Parse { .. },
                ..
            }
        ));
        assert!(bailout.errors[0].to_string().contains("Reported error was"));
        // Left in place for the user to inspect
        assert!(ctx.config_path.exists());
    }

    #[tokio::test]
    async fn test_failed_refresh_is_fatal_and_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        persist(&ctx.config_path, "https://nelson.example.com", "stale", 1234);
        let stub = StubAuthenticator::failing();

        let bailout = SessionManager::new(&ctx, &stub).resolve().await.unwrap_err();

        // One attempt, no retry
        assert_eq!(stub.calls().len(), 1);
        assert_eq!(bailout.errors.len(), 2);
        assert!(matches!(bailout.errors[0], SessionError::Invalid(_)));
        assert!(matches!(
            bailout.errors[1],
            SessionError::Refresh(AuthError::Rejected { status: 401, .. })
        ));

        let on_disk = read_config_file(&ctx.config_path).unwrap();
        assert_eq!(on_disk.session.token, "stale");
    }

    #[tokio::test]
    async fn test_refresh_without_identity_token() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir).with_token_source(TokenSource::Env(
            "NELSON_TEST_TOKEN_THAT_IS_NEVER_SET".to_string(),
        ));
        persist(&ctx.config_path, "https://nelson.example.com", "stale", 1234);
        let stub = StubAuthenticator::succeeding(fresh_session());

        let bailout = SessionManager::new(&ctx, &stub).resolve().await.unwrap_err();

        assert!(stub.calls().is_empty());
        assert!(matches!(
            bailout.errors.last(),
            Some(SessionError::Refresh(AuthError::MissingIdentityToken))
        ));
    }

    #[tokio::test]
    async fn test_expired_config_without_host_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        std::fs::create_dir_all(ctx.config_path.parent().unwrap()).unwrap();
        std::fs::write(&ctx.config_path, "---\nsession:\n  token: abc\n").unwrap();
        let stub = StubAuthenticator::succeeding(fresh_session());

        let bailout = SessionManager::new(&ctx, &stub).resolve().await.unwrap_err();

        assert!(stub.calls().is_empty());
        assert!(matches!(
            bailout.errors.last(),
            Some(SessionError::Refresh(AuthError::InvalidEndpoint { .. }))
        ));
    }

    #[tokio::test]
    async fn test_refresh_returning_expired_session_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        persist(&ctx.config_path, "https://nelson.example.com", "stale", 1234);
        let stub = StubAuthenticator::succeeding(Session {
            session_token: "also-stale".to_string(),
            expires_at: 1,
        });

        let bailout = SessionManager::new(&ctx, &stub).resolve().await.unwrap_err();

        assert_eq!(bailout.errors.len(), 2);
        assert!(matches!(bailout.errors[1], SessionError::Invalid(_)));
    }
}
