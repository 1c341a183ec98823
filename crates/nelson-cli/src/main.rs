//! nelson - remote control for the Nelson deployment system.
//!
//! Every command except `login` resolves the persisted session first,
//! refreshing an expired token when it can, then talks to the configured
//! Nelson endpoint.

mod cli;
mod commands;

use std::io;
use std::process;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nelson_core::api::RequestErrors;
use nelson_core::config::default_config_path;
use nelson_core::report::report_to_stderr;
use nelson_core::ClientContext;

use cli::{Cli, Commands, SystemCommands, BUILD_VERSION};

/// Initialize the tracing subscriber for logging
fn init_tracing(debug: bool) {
    // RUST_LOG wins over --debug when both are set
    let default_level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(e) = run(cli).await {
        exit_with(e);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let ctx = ClientContext::new(default_config_path()?)
        .with_build_version(BUILD_VERSION)
        .with_debug(cli.debug)
        .with_timeout_secs(cli.timeout);
    debug!(version = %ctx.current_version(), config = %ctx.config_path.display(), "nelson starting");

    match cli.command {
        Commands::Login {
            host,
            token,
            disable_tls,
        } => commands::login(&ctx, host, token, disable_tls).await,
        Commands::Whoami => commands::whoami(&ctx).await,
        Commands::System { command } => match command {
            SystemCommands::Version => commands::system_version(&ctx).await,
            SystemCommands::CleanupPolicies => commands::cleanup_policies(&ctx).await,
        },
    }
}

/// Print a failed command's diagnostics and exit non-zero.
fn exit_with(err: anyhow::Error) -> ! {
    eprintln!("Error: {}", err);
    if let Some(errors) = err.downcast_ref::<RequestErrors>() {
        report_to_stderr(&errors.0);
    } else {
        for cause in err.chain().skip(1) {
            eprintln!("  caused by: {}", cause);
        }
    }
    process::exit(1);
}
