//! # Task Selection
//!
//! Finds the top-level tasks to replicate. A [`TaskFilter`] names channels
//! *or* hosts, methods and states, plus a limit/offset window; it fans out
//! into one `listTasks` query per (channel × method) or (host × method)
//! combination, all dispatched in a single batch.
//!
//! Results are concatenated in query order and never de-duplicated: a task
//! matching two combinations is returned twice.

use log::{debug, info};

use crate::error::{Error, Result};
use crate::hub::{decode, Batch, HubCall, HubClient, QueryOpts, TaskQuery};
use crate::model::{ChannelId, HostId, TaskInfo, TaskState};

/// Parses one state given as a code (`0`–`5`) or a name (`closed`).
pub fn parse_state(input: &str) -> Result<TaskState> {
    let trimmed = input.trim();
    let parsed = match trimmed.parse::<i64>() {
        Ok(code) => TaskState::try_from(code).ok(),
        Err(_) => TaskState::from_name(trimmed),
    };
    parsed.ok_or_else(|| Error::Config {
        message: format!("unknown task state '{}'", input),
        hint: Some(format!(
            "use a number from 0 to 5 or one of: {}",
            TaskState::ALL.map(TaskState::name).join(", ")
        )),
    })
}

pub fn parse_states<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<TaskState>> {
    inputs.iter().map(|s| parse_state(s.as_ref())).collect()
}

/// What to look for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub channels: Vec<String>,
    pub hosts: Vec<String>,
    pub methods: Vec<String>,
    pub states: Vec<TaskState>,
    /// Window size per query; `None` or `0` means unbounded.
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl TaskFilter {
    /// Rejects filter combinations the hub cannot express.
    pub fn validate(&self) -> Result<()> {
        if !self.channels.is_empty() && !self.hosts.is_empty() {
            return Err(Error::Config {
                message: "channels and hosts cannot be combined".to_string(),
                hint: Some("filter by either '--channel' or '--host'".to_string()),
            });
        }
        Ok(())
    }

    fn query_opts(&self) -> QueryOpts {
        QueryOpts {
            limit: self.limit.filter(|limit| *limit > 0),
            offset: self.offset.filter(|offset| *offset > 0),
            order: Some("-id".to_string()),
        }
    }
}

/// Where a query is pinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Anywhere,
    Channel(ChannelId),
    Host(HostId),
}

/// Expands resolved scopes and the filter's methods into the list queries
/// to run.
pub fn build_queries(filter: &TaskFilter, scopes: &[Scope]) -> Vec<(TaskQuery, QueryOpts)> {
    let anywhere = [Scope::Anywhere];
    let scopes = if scopes.is_empty() { &anywhere[..] } else { scopes };
    let methods: Vec<Option<&str>> = if filter.methods.is_empty() {
        vec![None]
    } else {
        filter.methods.iter().map(|m| Some(m.as_str())).collect()
    };
    let state = if filter.states.is_empty() {
        None
    } else {
        Some(filter.states.iter().map(|s| s.code()).collect())
    };

    let mut queries = Vec::with_capacity(scopes.len() * methods.len());
    for scope in scopes {
        for method in &methods {
            let mut query = TaskQuery {
                state: state.clone(),
                parent: None,
                decode: true,
                method: method.map(str::to_string),
                ..TaskQuery::default()
            };
            match scope {
                Scope::Anywhere => {}
                Scope::Channel(id) => query.channel_id = Some(*id),
                Scope::Host(id) => query.host_id = Some(*id),
            }
            queries.push((query, filter.query_opts()));
        }
    }
    queries
}

/// Runs the filter against the hub and returns every matching task.
///
/// Fails with [`Error::NoTasks`] when nothing matches.
pub fn select_tasks(client: &HubClient, filter: &TaskFilter) -> Result<Vec<TaskInfo>> {
    filter.validate()?;

    let mut scopes = Vec::new();
    for name in &filter.channels {
        scopes.push(Scope::Channel(client.get_channel(name)?.id));
    }
    for name in &filter.hosts {
        scopes.push(Scope::Host(client.get_host(name)?.id));
    }

    let mut batch = Batch::new();
    for (opts, query_opts) in build_queries(filter, &scopes) {
        batch.push(HubCall::ListTasks { opts, query_opts });
    }
    debug!("Querying tasks with {} filters", batch.len());

    let mut tasks = Vec::new();
    for value in client.execute(batch)? {
        let found: Vec<TaskInfo> = decode("listTasks", value)?;
        tasks.extend(found);
    }
    if tasks.is_empty() {
        return Err(Error::NoTasks);
    }
    info!("Selected {} tasks", tasks.len());
    Ok(tasks)
}
