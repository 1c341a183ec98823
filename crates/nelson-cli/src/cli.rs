//! CLI argument definitions for nelson.

use clap::{Parser, Subcommand};

/// Build stamp injected by release builds; local builds report `dev`.
pub const BUILD_VERSION: Option<&str> = option_env!("NELSON_BUILD_VERSION");

// Same stamp `system version` and the User-Agent report.
const CLI_VERSION: &str = match BUILD_VERSION {
    Some(v) if !v.is_empty() => v,
    _ => "dev",
};

/// Remote control for the Nelson deployment system.
#[derive(Parser, Debug)]
#[command(name = "nelson")]
#[command(author, version = CLI_VERSION, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging of network requests
    #[arg(long, global = true)]
    pub debug: bool,

    /// Request timeout in seconds (0 uses the default of 60)
    #[arg(long, global = true, env = "NELSON_TIMEOUT", default_value_t = 60)]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Login to nelson
    Login {
        /// Nelson host, e.g. nelson.example.com
        #[arg(env = "NELSON_ADDR")]
        host: Option<String>,

        /// Your GitHub personal access token
        #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Talk to the host over plain http
        #[arg(long)]
        disable_tls: bool,
    },

    /// Show the user the current session belongs to
    Whoami,

    /// Set of commands for the Nelson system itself
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum SystemCommands {
    /// Show client and server versions
    Version,

    /// List the available cleanup policies
    CleanupPolicies,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login() {
        let cli = Cli::try_parse_from([
            "nelson",
            "login",
            "nelson.example.com",
            "-t",
            "ghp_abc",
            "--disable-tls",
        ])
        .unwrap();

        match cli.command {
            Commands::Login {
                host,
                token,
                disable_tls,
            } => {
                assert_eq!(host.as_deref(), Some("nelson.example.com"));
                assert_eq!(token.as_deref(), Some("ghp_abc"));
                assert!(disable_tls);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from(["nelson", "system", "version", "--debug", "--timeout", "5"])
            .unwrap();
        assert!(cli.debug);
        assert_eq!(cli.timeout, 5);
        assert!(matches!(
            cli.command,
            Commands::System {
                command: SystemCommands::Version
            }
        ));
    }

    #[test]
    fn test_version_matches_build_stamp() {
        use clap::CommandFactory;
        use nelson_core::ClientContext;
        use std::path::PathBuf;

        let ctx = ClientContext::new(PathBuf::from("config.yml")).with_build_version(BUILD_VERSION);
        let expected = ctx.current_version();
        assert_eq!(
            Cli::command().get_version(),
            Some(expected.strip_prefix('v').unwrap_or(&expected))
        );
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
