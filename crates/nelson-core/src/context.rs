//! Process-wide settings for one CLI invocation.
//!
//! Built once in `main` and handed to the request client and the session
//! manager, so nothing reads build or debug state from globals.

use std::path::PathBuf;
use std::time::Duration;

use crate::auth::TokenSource;

/// Product name used in the user agent.
pub const PRODUCT_NAME: &str = "NelsonCLI";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct ClientContext {
    /// Build version stamped at compile time, `None` for local builds.
    pub build_version: Option<String>,
    /// Verbose request logging.
    pub debug: bool,
    pub timeout: Duration,
    /// Location of the persisted session file.
    pub config_path: PathBuf,
    /// Where the identity token comes from during an automatic refresh.
    pub token_source: TokenSource,
}

impl ClientContext {
    pub fn new(config_path: PathBuf) -> Self {
        Self {
            build_version: None,
            debug: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            config_path,
            token_source: TokenSource::default(),
        }
    }

    pub fn with_build_version(mut self, version: Option<&str>) -> Self {
        self.build_version = version.filter(|v| !v.is_empty()).map(str::to_string);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// A timeout of zero seconds falls back to the default.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        let secs = if secs == 0 { DEFAULT_TIMEOUT_SECS } else { secs };
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_token_source(mut self, source: TokenSource) -> Self {
        self.token_source = source;
        self
    }

    /// Version as shown to users: `v1.2.3`, or `dev` when unset.
    pub fn current_version(&self) -> String {
        match self.build_version {
            Some(ref v) => format!("v{}", v),
            None => "dev".to_string(),
        }
    }

    /// `NelsonCLI/<version> (<os>)`
    pub fn user_agent(&self) -> String {
        let version = self.build_version.as_deref().unwrap_or("dev");
        format!("{}/{} ({})", PRODUCT_NAME, version, std::env::consts::OS)
    }
}
