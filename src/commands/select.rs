//! # Select Command Implementation
//!
//! This module implements the `select` subcommand, which runs a task filter
//! against the hub and lists the tasks `replicate` would pick up, without
//! submitting anything. It shares its filter options with `replicate`.

use anyhow::Result;
use clap::Args;

use task_replicator::config::Config;
use task_replicator::defaults;
use task_replicator::selector::{self, TaskFilter};

use crate::cli::GlobalArgs;

/// Options choosing which tasks to look at.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only tasks from this channel (repeatable)
    #[arg(short = 'C', long = "channel", value_name = "CHANNEL")]
    pub channels: Vec<String>,

    /// Only tasks run on this host (repeatable, conflicts with --channel)
    #[arg(short = 'H', long = "host", value_name = "HOST")]
    pub hosts: Vec<String>,

    /// Only tasks of this method (repeatable)
    #[arg(short = 'm', long = "method", value_name = "METHOD")]
    pub methods: Vec<String>,

    /// Only tasks in this state, by name or number (repeatable) [default: CLOSED]
    #[arg(short = 's', long = "state", value_name = "STATE")]
    pub states: Vec<String>,

    /// Max task count per channel/host and method
    #[arg(long, value_name = "N")]
    pub limit: Option<u32>,

    /// Skip this many tasks per query
    #[arg(long, value_name = "N")]
    pub offset: Option<u32>,
}

impl FilterArgs {
    /// Builds and validates the filter, falling back to configured defaults.
    pub fn to_filter(&self, config: &Config) -> task_replicator::error::Result<TaskFilter> {
        let states = if self.states.is_empty() {
            selector::parse_states(&[defaults::STATE])?
        } else {
            selector::parse_states(&self.states)?
        };
        let filter = TaskFilter {
            channels: self.channels.clone(),
            hosts: self.hosts.clone(),
            methods: self.methods.clone(),
            states,
            limit: Some(self.limit.unwrap_or(config.limit)),
            offset: self.offset,
        };
        filter.validate()?;
        Ok(filter)
    }
}

/// List the tasks a filter selects
#[derive(Args, Debug)]
pub struct SelectArgs {
    #[command(flatten)]
    pub filter: FilterArgs,
}

/// Execute the `select` command.
pub fn execute(args: SelectArgs, globals: &GlobalArgs) -> Result<()> {
    let config = super::load_config(globals)?;
    let filter = args.filter.to_filter(&config)?;
    let client = super::connect(&config)?;

    let tasks = selector::select_tasks(&client, &filter)?;
    println!("{:>10}  {:<12} {:<9} {:>8}", "ID", "METHOD", "STATE", "CHANNEL");
    for task in &tasks {
        println!(
            "{:>10}  {:<12} {:<9} {:>8}",
            task.id,
            task.method,
            task.state.name(),
            task.channel_id
        );
    }
    println!("{} tasks", tasks.len());
    Ok(())
}
