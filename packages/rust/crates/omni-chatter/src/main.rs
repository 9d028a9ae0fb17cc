//! omni-chatter CLI.
//!
//! Configuration comes from `OMNI_CHATTER_*` environment variables (a `.env`
//! file is honored) layered over `omni-chatter.yaml` settings.
//!
//! Logging: set `RUST_LOG=omni_chatter=debug` (or `info`, `warn`) to override the default filter.

mod cli;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use omni_chatter::{
    BotConfig, EventRouter, RuntimeOptions, build_collaborators, run_chatter,
    set_config_home_override,
};

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Some(conf_dir) = cli.conf.clone() {
        set_config_home_override(conf_dir);
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "omni_chatter=debug"
        } else {
            "omni_chatter=info"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = BotConfig::from_env()?;

    match cli.command {
        Command::CheckConfig => {
            println!("{config:#?}");
            Ok(())
        }
        Command::Run => run(config).await,
    }
}

async fn run(config: BotConfig) -> anyhow::Result<()> {
    let collaborators = build_collaborators(&config)?;
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("received Ctrl+C; shutting down");
                signal_token.cancel();
            }
            Err(error) => tracing::warn!(error = %error, "failed to install Ctrl+C handler"),
        }
    });

    let summary = run_chatter(
        RuntimeOptions::from_config(&config),
        collaborators,
        EventRouter::standard(),
        shutdown,
    )
    .await?;
    tracing::info!(
        end = ?summary.end,
        received = summary.received,
        filtered = summary.filtered,
        model_update_runs = summary.model_update.runs,
        history_upload_runs = summary.history_upload.runs,
        "omni-chatter stopped"
    );
    Ok(())
}
