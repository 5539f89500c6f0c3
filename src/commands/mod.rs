//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `replicate-tasks` command-line tool. Each subcommand is defined in its own
//! file to keep the logic separated and maintainable.
//!
//! ## Structure
//!
//! Each command module typically contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic.
//!
//! Commands validate every option before opening a hub session, so invalid
//! invocations never reach the hub.

pub mod completions;
pub mod replicate;
pub mod select;

use std::time::Duration;

use task_replicator::config::Config;
use task_replicator::error::Result;
use task_replicator::hub::http::HttpSession;
use task_replicator::hub::HubClient;

use crate::cli::GlobalArgs;

/// Loads the configuration file, with `--hub-url` applied on top.
pub fn load_config(globals: &GlobalArgs) -> Result<Config> {
    Ok(Config::load(globals.config.as_deref())?.with_hub_url(globals.hub_url.clone()))
}

/// Opens a hub session as configured.
pub fn connect(config: &Config) -> Result<HubClient> {
    let url = config.hub_url()?;
    log::info!("Connecting to {}", url);
    let session = HttpSession::connect(url)?;
    Ok(HubClient::new(Box::new(session))
        .with_poll_interval(Duration::from_secs(config.poll_interval_secs)))
}
