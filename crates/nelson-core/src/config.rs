//! Persisted session configuration.
//!
//! The endpoint and session credential live in a small YAML file at
//! `~/.nelson/config.yml`:
//!
//! ```text
//! ---
//! endpoint: https://nelson.example.com
//! session:
//!   token: <token>
//!   expires_at: <epoch millis>
//! ```
//!
//! The file is overwritten wholesale on every login or refresh and is never
//! deleted by the CLI. No locking is performed: two processes refreshing at
//! once simply race, and the last writer wins.

use std::fs::DirBuilder;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::auth::Session;

/// Directory under the home directory holding the config file
const CONFIG_DIR: &str = ".nelson";

/// Config file name
const CONFIG_FILE: &str = "config.yml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No config file at {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Unable to serialize config: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("Could not find home directory")]
    NoHomeDir,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Your session has expired. Please 'nelson login' again to reactivate your session.")]
    Expired { expires_at: i64 },
}

/// Missing or empty keys deserialize to zero values; a zero `expires_at`
/// reads as already expired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(deserialize_with = "null_as_default")]
    pub endpoint: String,
    #[serde(deserialize_with = "null_as_default")]
    pub session: ConfigSession,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigSession {
    #[serde(deserialize_with = "null_as_default")]
    pub token: String,
    /// Epoch milliseconds, same convention as the server.
    #[serde(deserialize_with = "null_as_default")]
    pub expires_at: i64,
}

// `expires_at:` and `session: ~` parse as YAML null.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Config {
    pub fn from_session(session: &Session, endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            session: ConfigSession {
                token: session.session_token.clone(),
                expires_at: session.expires_at,
            },
        }
    }

    /// Check that the token has not expired.
    pub fn validate(&self) -> Vec<ValidationError> {
        self.validate_at(now_millis())
    }

    pub fn validate_at(&self, now_millis: i64) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.session.expires_at <= now_millis {
            errors.push(ValidationError::Expired {
                expires_at: self.session.expires_at,
            });
        }
        errors
    }

    /// Session expiry as a timestamp, for display.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.session.expires_at).single()
    }
}

/// Milliseconds since the Unix epoch, matching what the server issues.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// `~/.nelson/config.yml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(CONFIG_DIR).join(CONFIG_FILE))
}

pub fn generate_config_yaml(session: &Session, endpoint: &str) -> Result<String, ConfigError> {
    let config = Config::from_session(session, endpoint);
    let body = serde_yaml::to_string(&config).map_err(ConfigError::Serialize)?;
    Ok(format!("---\n{}", body))
}

/// Parse config text. Blank documents yield the default config.
pub fn parse_config_yaml(contents: &str) -> Result<Config, serde_yaml::Error> {
    let stripped = contents.trim().trim_start_matches("---").trim();
    if stripped.is_empty() {
        return Ok(Config::default());
    }
    let parsed: Option<Config> = serde_yaml::from_str(contents)?;
    Ok(parsed.unwrap_or_default())
}

/// Write the config atomically: a temp file in the target directory is
/// renamed over `path`.
pub fn write_config_file(session: &Session, endpoint: &str, path: &Path) -> Result<(), ConfigError> {
    let yaml = generate_config_yaml(session, endpoint)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_err = |source: io::Error| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    create_config_dir(dir).map_err(|source| ConfigError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(yaml.as_bytes()).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    Ok(())
}

pub fn read_config_file(path: &Path) -> Result<Config, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    parse_config_yaml(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// Owner-only on unix. An existing directory keeps its permissions.
fn create_config_dir(dir: &Path) -> io::Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}
