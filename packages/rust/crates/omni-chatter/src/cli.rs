use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "omni-chatter")]
#[command(about = "Group-chat agent: probabilistic engagement, prediction backends, /blame.")]
pub(crate) struct Cli {
    /// Override config directory (settings are read from `<conf>/omni-chatter/settings.yaml`).
    #[arg(long, global = true)]
    pub(crate) conf: Option<PathBuf>,

    /// Debug logging for omni_chatter (ignored when RUST_LOG is set).
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub(crate) verbose: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Connect to the chat platform and serve the configured group until disconnected or Ctrl+C.
    Run,
    /// Load and validate configuration, print the resolved values (secrets redacted), then exit.
    CheckConfig,
}
