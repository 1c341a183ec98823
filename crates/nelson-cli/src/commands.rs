//! Command implementations.

use std::process;

use anyhow::{anyhow, Context, Result};

use nelson_core::api::{ApiClient, CleanupPolicy};
use nelson_core::auth::{self, GithubAuthenticator};
use nelson_core::config::Config;
use nelson_core::report::report_to_stderr;
use nelson_core::session::{Bailout, SessionManager};
use nelson_core::ClientContext;

/// Resolve a usable session, refreshing it if needed, or bail out.
pub async fn load_config_or_exit(ctx: &ClientContext) -> Result<Config> {
    let authenticator = GithubAuthenticator::new(ctx)?;
    match SessionManager::new(ctx, &authenticator).resolve().await {
        Ok(ready) => Ok(ready.config),
        Err(bailout) => bail_out(bailout),
    }
}

fn bail_out(bailout: Bailout) -> ! {
    eprintln!("🚫");
    eprintln!("Encountered an unexpected problem(s) loading the configuration file: ");
    report_to_stderr(&bailout.errors);
    process::exit(1);
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn login(
    ctx: &ClientContext,
    host: Option<String>,
    token: Option<String>,
    disable_tls: bool,
) -> Result<()> {
    let host = non_blank(host)
        .ok_or_else(|| anyhow!("Either supply a host explicitly, or set $NELSON_ADDR"))?;
    let token = non_blank(token).ok_or_else(|| {
        anyhow!("You must set your GITHUB_TOKEN environment variable or specify a token using -t")
    })?;

    let authenticator = GithubAuthenticator::new(ctx)?;
    auth::login(&authenticator, &token, &host, disable_tls, &ctx.config_path)
        .await
        .with_context(|| format!("Unable to login to {}", host))?;

    println!("Successfully logged in to {}", host);
    Ok(())
}

pub async fn whoami(ctx: &ClientContext) -> Result<()> {
    let config = load_config_or_exit(ctx).await?;
    let api = ApiClient::new(ctx, &config)?;

    let session = api
        .whoami()
        .await
        .context("Unable to determine who is currently logged in")?;

    let who = if session.user.name.is_empty() {
        &session.user.login
    } else {
        &session.user.name
    };
    println!("===>> Currently logged in as {} @ {}", who, config.endpoint);
    if let Some(expiry) = config.expires_at() {
        println!("===>> Session valid until {}", expiry.to_rfc3339());
    }
    Ok(())
}

pub async fn system_version(ctx: &ClientContext) -> Result<()> {
    println!("===>> Nelson CLI version: {}", ctx.current_version());

    let config = load_config_or_exit(ctx).await?;
    let api = ApiClient::new(ctx, &config)?;
    let info = api
        .build_info()
        .await
        .context("Unable to fetch build info from the Nelson server")?;

    println!(
        "===>> Nelson server {} @ {}: version {} (revision {}, built {})",
        info.build_info.name,
        config.endpoint,
        info.build_info.version,
        info.build_info.git_revision,
        info.build_info.build_date
    );
    Ok(())
}

pub async fn cleanup_policies(ctx: &ClientContext) -> Result<()> {
    let config = load_config_or_exit(ctx).await?;
    let api = ApiClient::new(ctx, &config)?;
    let policies = api
        .cleanup_policies()
        .await
        .context("Unable to list cleanup policies")?;

    print!("{}", render_policies(&policies));
    Ok(())
}

fn render_policies(policies: &[CleanupPolicy]) -> String {
    let width = policies
        .iter()
        .map(|p| p.policy.len())
        .chain(std::iter::once("POLICY".len()))
        .max()
        .unwrap_or(0);

    let mut out = format!("{:<width$}  DESCRIPTION\n", "POLICY", width = width);
    for p in policies {
        out.push_str(&format!("{:<width$}  {}\n", p.policy, p.description, width = width));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  host ".to_string())).as_deref(), Some("host"));
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_render_policies() {
        let policies = vec![
            CleanupPolicy {
                policy: "retain-latest".to_string(),
                description: "retains the latest version".to_string(),
            },
            CleanupPolicy {
                policy: "retain-always".to_string(),
                description: "retains all versions".to_string(),
            },
        ];

        assert_eq!(
            render_policies(&policies),
            "POLICY         DESCRIPTION\n\
             retain-latest  retains the latest version\n\
             retain-always  retains all versions\n"
        );
    }
}
