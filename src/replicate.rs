//! # Task Replication
//!
//! Replaying a build means submitting a new scratch task with the original
//! request, pointed at a repo that reproduces the original buildroot:
//!
//! 1.  The task is fetched if only its id is known. Only top-level `build`
//!     tasks are replicated; anything else is skipped with a [`SkipReason`].
//! 2.  The repo the original built against is read from its first
//!     `buildArch` child.
//! 3.  Scratch builds are skipped unless `include_scratch` is set.
//! 4.  The [`RepoResolver`] supplies a replacement repo. With the clone
//!     strategy the request's target is cleared, since the replica no
//!     longer lands in the original destination.
//! 5.  The request options get the new `repo_id`, `scratch = true` and an
//!     optional space-separated `arch_override`.
//! 6.  The new task is submitted on the original channel (or the override)
//!     and waited on until it reaches a terminal state.
//!
//! [`run`] drains a list of tasks through a [`WorkerPool`], each worker on
//! its own hub sub-session, and tallies a [`RunSummary`]. A failing task is
//! logged and counted; it never stops the other tasks.

use std::fmt;

use log::{error, info, warn};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::hub::HubClient;
use crate::model::{ChannelId, RepoId, Strategy, TaskId, TaskInfo, TaskRef, TaskState};
use crate::output::Progress;
use crate::pool::{TaskQueue, WorkerPool};
use crate::repository::RepoResolver;

/// Methods built through the image path, which replication does not handle.
pub const IMAGE_METHODS: [&str; 4] = ["image", "livemedia", "livecd", "appliance"];

/// User-supplied knobs for a replication run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplicationOptions {
    pub strategy: Strategy,
    pub override_tag: Option<String>,
    pub include_scratch: bool,
    /// Architectures to build for instead of the original ones.
    pub arches: Vec<String>,
    pub weight: Option<f64>,
}

impl ReplicationOptions {
    /// Checks the options without contacting the hub.
    pub fn validate(&self) -> Result<()> {
        if self.override_tag.is_some() && self.strategy != Strategy::Clone {
            return Err(Error::Config {
                message: "an override tag can only be used with the clone strategy".to_string(),
                hint: Some("add '--strategy clone' or drop '--override-tag'".to_string()),
            });
        }
        if let Some(weight) = self.weight {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::config(format!("invalid task weight {}", weight)));
            }
        }
        Ok(())
    }
}

/// Why a task was left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The task is a subtask of `parent`.
    NotTopLevel { parent: TaskId },
    /// The task's method cannot be replicated.
    UnsupportedMethod(String),
    /// The task belongs to the image family, which is not supported.
    ImageUnsupported(String),
    /// The original was a scratch build and scratch builds were not asked for.
    Scratch,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotTopLevel { parent } => {
                write!(f, "not a parent task (child of {})", parent)
            }
            SkipReason::UnsupportedMethod(method) => write!(f, "can not replicate {} task", method),
            SkipReason::ImageUnsupported(method) => {
                write!(f, "replicating {} tasks is not supported", method)
            }
            SkipReason::Scratch => f.write_str("skipping scratch build"),
        }
    }
}

/// Result of handling one task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A replica was submitted and reached `state`.
    Replicated {
        original: TaskId,
        task_id: TaskId,
        repo_id: RepoId,
        state: TaskState,
    },
    Skipped { task_id: TaskId, reason: SkipReason },
}

/// Positional parameters of a `build` request: `[source, target, opts]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildRequest {
    params: Vec<Value>,
    opts: Map<String, Value>,
}

impl BuildRequest {
    const TARGET_INDEX: usize = 1;
    const OPTS_INDEX: usize = 2;

    pub fn parse(task_id: TaskId, request: &[Value]) -> Result<Self> {
        if request.len() < Self::OPTS_INDEX {
            return Err(Error::replication(
                task_id,
                format!("malformed build request with {} parameters", request.len()),
            ));
        }
        let opts = match request.get(Self::OPTS_INDEX) {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(opts)) => opts.clone(),
            Some(other) => {
                return Err(Error::replication(
                    task_id,
                    format!("build options are not a mapping: {}", other),
                ))
            }
        };
        Ok(Self {
            params: request.to_vec(),
            opts,
        })
    }

    pub fn opts(&self) -> &Map<String, Value> {
        &self.opts
    }

    pub fn is_scratch(&self) -> bool {
        self.opts
            .get("scratch")
            .map(|value| match value {
                Value::Bool(flag) => *flag,
                Value::Null => false,
                Value::Number(n) => n.as_i64() != Some(0),
                _ => true,
            })
            .unwrap_or(false)
    }

    pub fn set_repo(&mut self, repo_id: RepoId) {
        self.opts.insert("repo_id".to_string(), Value::from(repo_id));
    }

    pub fn force_scratch(&mut self) {
        self.opts.insert("scratch".to_string(), Value::Bool(true));
    }

    /// Sets the arch override; an empty list leaves the request untouched.
    pub fn set_arch_override(&mut self, arches: &[String]) {
        if !arches.is_empty() {
            self.opts
                .insert("arch_override".to_string(), Value::from(arches.join(" ")));
        }
    }

    pub fn clear_target(&mut self) {
        self.params[Self::TARGET_INDEX] = Value::Null;
    }

    /// The parameter list to submit, with the options at their slot.
    pub fn into_arglist(self) -> Vec<Value> {
        let mut params = self.params;
        let opts = Value::Object(self.opts);
        if params.len() > Self::OPTS_INDEX {
            params[Self::OPTS_INDEX] = opts;
        } else {
            params.push(opts);
        }
        params
    }
}

/// The repo the first `buildArch` child built against.
pub fn source_repo(children: &[TaskInfo]) -> Option<RepoId> {
    children
        .iter()
        .filter(|child| child.method == "buildArch")
        .find_map(|child| {
            child
                .request
                .get(4)
                .and_then(|opts| opts.get("repo_id"))
                .and_then(Value::as_i64)
        })
}

/// Replicates tasks with one set of options and a shared repo cache.
#[derive(Debug, Clone)]
pub struct Replicator {
    resolver: RepoResolver,
    options: ReplicationOptions,
    channel: Option<ChannelId>,
}

impl Replicator {
    pub fn new(options: ReplicationOptions) -> Result<Self> {
        options.validate()?;
        let resolver = RepoResolver::new(options.strategy, options.override_tag.clone())?;
        Ok(Self {
            resolver,
            options,
            channel: None,
        })
    }

    /// Submits replicas on `channel` instead of the original channel.
    pub fn with_channel(mut self, channel: Option<ChannelId>) -> Self {
        self.channel = channel;
        self
    }

    pub fn resolver(&self) -> &RepoResolver {
        &self.resolver
    }

    pub fn options(&self) -> &ReplicationOptions {
        &self.options
    }

    /// Replicates one task and waits for the replica to finish.
    pub fn replicate_one(
        &self,
        client: &HubClient,
        task: TaskRef,
        progress: &Progress,
    ) -> Result<Outcome> {
        let task = match task {
            TaskRef::Id(id) => client.get_task_info(id)?,
            TaskRef::Info(info) => *info,
        };
        let task_id = task.id;
        info!("{}: Looking at task", task_id);

        if let Some(parent) = task.parent {
            return Ok(skipped(task_id, SkipReason::NotTopLevel { parent }));
        }
        if task.method != "build" {
            let reason = if IMAGE_METHODS.contains(&task.method.as_str()) {
                SkipReason::ImageUnsupported(task.method)
            } else {
                SkipReason::UnsupportedMethod(task.method)
            };
            return Ok(skipped(task_id, reason));
        }

        let children = client.get_task_children(task_id)?;
        let original_repo = source_repo(&children);
        let mut request = BuildRequest::parse(task_id, &task.request)?;
        if request.is_scratch() && !self.options.include_scratch {
            return Ok(skipped(task_id, SkipReason::Scratch));
        }
        let original_repo = original_repo
            .ok_or_else(|| Error::replication(task_id, "could not determine original repo"))?;

        let repo = self.resolver.resolve(client, original_repo, task_id)?;
        if self.resolver.strategy() == Strategy::Clone {
            request.clear_target();
        }
        request.set_repo(repo.id);
        request.force_scratch();
        if !self.options.arches.is_empty() {
            request.set_arch_override(&self.options.arches);
            info!("{}: override arches: {:?}", task_id, self.options.arches);
        }

        let channel = self.channel.unwrap_or(task.channel_id);
        let new_task = client.make_task(
            &task.method,
            request.into_arglist(),
            Some(channel),
            self.options.weight,
        )?;
        progress.println(format!(
            "Original task {} replicated as task {}",
            task_id, new_task
        ));
        let state = client.wait_for_task(new_task)?;
        Ok(Outcome::Replicated {
            original: task_id,
            task_id: new_task,
            repo_id: repo.id,
            state,
        })
    }
}

fn skipped(task_id: TaskId, reason: SkipReason) -> Outcome {
    Outcome::Skipped { task_id, reason }
}

/// Tally of a replication run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub replicated: Vec<(TaskId, TaskId)>,
    pub skipped: Vec<(TaskId, SkipReason)>,
    /// Tasks that errored or whose replica did not close, with the reason.
    pub failed: Vec<(TaskId, String)>,
}

impl RunSummary {
    pub fn record(&mut self, task_id: TaskId, result: Result<Outcome>) {
        match result {
            Ok(Outcome::Replicated {
                original,
                task_id: replica,
                state: TaskState::Closed,
                ..
            }) => self.replicated.push((original, replica)),
            Ok(Outcome::Replicated {
                task_id: replica,
                state,
                ..
            }) => self
                .failed
                .push((task_id, format!("replica {} finished in state {}", replica, state))),
            Ok(Outcome::Skipped { reason, .. }) => self.skipped.push((task_id, reason)),
            Err(e) => self.failed.push((task_id, e.to_string())),
        }
    }

    pub fn total(&self) -> usize {
        self.replicated.len() + self.skipped.len() + self.failed.len()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} replicated, {} skipped, {} failed",
            self.replicated.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}

/// Replicates `tasks` on `pool`, one hub sub-session per worker.
///
/// Only a pool that cannot drain the queue fails the run; per-task
/// problems are logged and end up in the summary.
pub fn run(
    client: &HubClient,
    replicator: &Replicator,
    tasks: Vec<TaskRef>,
    pool: &WorkerPool,
    progress: &Progress,
) -> Result<RunSummary> {
    let mut unaccounted: Vec<TaskId> = tasks.iter().map(TaskRef::id).collect();
    let queue: TaskQueue<TaskRef> = tasks.into_iter().collect();
    let results = pool.drain(
        &queue,
        |_worker| client.subclient(),
        |session: &HubClient, task: TaskRef| {
            let task_id = task.id();
            progress.println(format!("Replicating build from task #{}", task_id));
            let result = replicator.replicate_one(session, task, progress);
            match &result {
                Ok(Outcome::Skipped { reason, .. }) => warn!("#{}: {}", task_id, reason),
                Ok(Outcome::Replicated {
                    task_id: replica,
                    state,
                    ..
                }) if *state != TaskState::Closed => {
                    error!("#{}: replica {} finished in state {}", task_id, replica, state)
                }
                Ok(_) => {}
                Err(e) => error!("#{}: replication failed: {}", task_id, e),
            }
            progress.inc();
            (task_id, result)
        },
    )?;

    let mut summary = RunSummary::default();
    for (task_id, result) in results {
        if let Some(pos) = unaccounted.iter().position(|id| *id == task_id) {
            unaccounted.swap_remove(pos);
        }
        summary.record(task_id, result);
    }
    // Whatever produced no output panicked in its worker.
    for task_id in unaccounted {
        summary
            .failed
            .push((task_id, "replication panicked".to_string()));
    }
    info!("Replication finished: {}", summary);
    Ok(summary)
}
