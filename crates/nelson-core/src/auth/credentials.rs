use std::fmt;

/// Environment variable holding the GitHub personal access token.
pub const GITHUB_TOKEN_VAR: &str = "GITHUB_TOKEN";

/// Source of the long-lived identity token used for an automatic refresh.
///
/// The token is only read when a refresh actually happens, never up front.
#[derive(Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// Read from the named environment variable.
    Env(String),
    /// A token supplied directly, e.g. from `--token`.
    Fixed(String),
}

impl Default for TokenSource {
    fn default() -> Self {
        TokenSource::Env(GITHUB_TOKEN_VAR.to_string())
    }
}

// Never print the token itself.
impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::Env(var) => f.debug_tuple("Env").field(var).finish(),
            TokenSource::Fixed(_) => f.write_str("Fixed(<redacted>)"),
        }
    }
}

impl TokenSource {
    /// Fetch the token, treating blank values as absent.
    pub fn fetch(&self) -> Option<String> {
        let raw = match self {
            TokenSource::Env(var) => std::env::var(var).ok()?,
            TokenSource::Fixed(token) => token.clone(),
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}
