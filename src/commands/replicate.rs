//! # Replicate Command Implementation
//!
//! This module implements the `replicate` subcommand, the main entry point of
//! the tool. Tasks are given by id on the command line or selected with the
//! filter options; each one is resubmitted as a scratch build on a fresh repo
//! by a pool of workers.
//!
//! ## Exit Status
//!
//! Invalid options, an unreachable hub and an empty selection fail the
//! command. Individual tasks that are skipped or fail to replicate are
//! reported in the log and the final summary only.

use std::str::FromStr;

use anyhow::Result;
use clap::Args;

use task_replicator::model::{Strategy, TaskId, TaskRef};
use task_replicator::output::{OutputConfig, Progress, Status};
use task_replicator::pool::WorkerPool;
use task_replicator::replicate::{self, ReplicationOptions, Replicator, RunSummary};
use task_replicator::selector;

use super::select::FilterArgs;
use crate::cli::GlobalArgs;

/// Replicate tasks by id or by filter
#[derive(Args, Debug)]
pub struct ReplicateArgs {
    /// Ids of the tasks to replicate; without ids, the filter options select them
    #[arg(value_name = "TASK_ID")]
    pub task_ids: Vec<TaskId>,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// How to obtain repos for the replicas: reuse or clone
    #[arg(long, value_name = "STRATEGY")]
    pub strategy: Option<String>,

    /// Tag inherited with top priority by cloned build tags (clone strategy only)
    #[arg(long, value_name = "TAG")]
    pub override_tag: Option<String>,

    /// Set the weight of the new tasks
    #[arg(short, long, value_name = "WEIGHT")]
    pub weight: Option<f64>,

    /// Submit the new tasks on this channel instead of the original one
    #[arg(long, value_name = "CHANNEL")]
    pub channel_override: Option<String>,

    /// Build only for this architecture (repeatable)
    #[arg(short, long = "arch", value_name = "ARCH")]
    pub arches: Vec<String>,

    /// Also replicate scratch builds
    #[arg(long)]
    pub include_scratch: bool,

    /// Number of concurrent workers
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Do not print task information
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute the `replicate` command.
pub fn execute(args: ReplicateArgs, globals: &GlobalArgs) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(&globals.color);
    let config = super::load_config(globals)?;

    // Everything below up to `connect` must not touch the hub.
    let strategy = match &args.strategy {
        Some(name) => Strategy::from_str(name)?,
        None => config.strategy,
    };
    let options = ReplicationOptions {
        strategy,
        override_tag: args.override_tag.clone(),
        include_scratch: args.include_scratch || config.include_scratch,
        arches: args.arches.clone(),
        weight: args.weight,
    };
    let replicator = Replicator::new(options)?;
    let filter = args.filter.to_filter(&config)?;
    let pool = WorkerPool::new(args.workers.unwrap_or(config.workers))?;

    let client = super::connect(&config)?;
    let channel = match &args.channel_override {
        Some(name) => Some(client.get_channel(name)?.id),
        None => None,
    };
    let replicator = replicator.with_channel(channel);

    let tasks: Vec<TaskRef> = if args.task_ids.is_empty() {
        selector::select_tasks(&client, &filter)?
            .into_iter()
            .map(TaskRef::from)
            .collect()
    } else {
        args.task_ids.iter().copied().map(TaskRef::Id).collect()
    };

    let progress = Progress::new(tasks.len() as u64, args.quiet);
    let summary = replicate::run(&client, &replicator, tasks, &pool, &progress)?;
    progress.finish();

    if !args.quiet {
        print_summary(&out, &summary);
    }
    Ok(())
}

fn print_summary(out: &OutputConfig, summary: &RunSummary) {
    for (original, replica) in &summary.replicated {
        println!("{} {} -> {}", out.marker(Status::Ok), original, replica);
    }
    for (task_id, reason) in &summary.skipped {
        println!("{} {}: {}", out.marker(Status::Skipped), task_id, reason);
    }
    for (task_id, message) in &summary.failed {
        println!("{} {}: {}", out.marker(Status::Failed), task_id, message);
    }
    println!("\n{}", summary);
}
