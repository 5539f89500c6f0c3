//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Replicate Tasks - Replay finished build tasks as scratch builds
#[derive(Parser, Debug)]
#[command(name = "replicate-tasks")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        default_value = "warn",
        value_parser = ["off", "error", "warn", "info", "debug", "trace"]
    )]
    log_level: String,

    /// Shorthand for --log-level debug
    #[arg(long, global = true)]
    debug: bool,

    /// Configuration file to read instead of the default one
    #[arg(long, global = true, value_name = "FILE", env = "REPLICATE_TASKS_CONFIG")]
    config: Option<PathBuf>,

    /// URL of the build hub's RPC endpoint
    #[arg(long, global = true, value_name = "URL", env = "REPLICATE_TASKS_HUB")]
    hub_url: Option<String>,
}

/// Options every command that talks to the hub needs.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub color: String,
    pub config: Option<PathBuf>,
    pub hub_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replicate tasks by id or by filter
    Replicate(commands::replicate::ReplicateArgs),

    /// List the tasks a filter selects, without replicating them
    Select(commands::select::SelectArgs),

    /// Print a tab-completion script for replicate-tasks
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    fn init_logging(&self) {
        let level = if self.debug { "debug" } else { &self.log_level };
        // RUST_LOG, when set, takes precedence over the flag.
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
            .format_timestamp(None)
            .try_init();
    }

    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        self.init_logging();
        let globals = GlobalArgs {
            color: self.color,
            config: self.config,
            hub_url: self.hub_url,
        };

        match self.command {
            Commands::Replicate(args) => commands::replicate::execute(args, &globals),
            Commands::Select(args) => commands::select::execute(args, &globals),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}
