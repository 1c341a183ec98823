//! Response payloads for the session-level endpoints the CLI calls directly.

use serde::Deserialize;

/// `GET /session`
#[derive(Debug, Clone, Deserialize)]
pub struct SessionResponse {
    pub user: User,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct User {
    pub login: String,
    pub name: String,
    pub avatar: String,
}

/// `GET /v1/build-info`
#[derive(Debug, Clone, Deserialize)]
pub struct BuildInfoResponse {
    pub build_info: BuildInfo,
    #[serde(default)]
    pub banner: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BuildInfo {
    pub name: String,
    pub version: String,
    pub scala_version: String,
    pub sbt_version: String,
    pub git_revision: String,
    pub build_date: String,
}

/// One entry of `GET /v1/cleanup-policies`
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupPolicy {
    pub policy: String,
    #[serde(default)]
    pub description: String,
}
