//! Typed access to the hub and blocking waits on remote tasks.

use std::thread;
use std::time::Duration;

use log::debug;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::{Batch, HubCall, HubSession, QueryOpts, TaskQuery};
use crate::defaults;
use crate::error::{Error, Result};
use crate::model::{
    ChannelId, ChannelInfo, EventId, GroupInfo, HostInfo, InheritanceLink, PackageEntry, RepoId,
    RepoInfo, TagId, TagInfo, TagRef, TaggedBuild, TaskId, TaskInfo, TaskState,
};

/// Decodes a call result, attributing failures to `method`.
pub fn decode<T: DeserializeOwned>(method: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::Decode {
        method: method.to_string(),
        message: e.to_string(),
    })
}

/// A session plus the typed calls the replication core needs.
pub struct HubClient {
    session: Box<dyn HubSession>,
    poll_interval: Duration,
}

impl HubClient {
    pub fn new(session: Box<dyn HubSession>) -> Self {
        Self {
            session,
            poll_interval: Duration::from_secs(defaults::POLL_INTERVAL_SECS),
        }
    }

    /// Sets how long [`HubClient::wait_for_task`] sleeps between polls.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn session(&self) -> &dyn HubSession {
        self.session.as_ref()
    }

    /// A client over an independent sub-session with the same settings.
    pub fn subclient(&self) -> Result<HubClient> {
        Ok(HubClient {
            session: self.session.subsession()?,
            poll_interval: self.poll_interval,
        })
    }

    fn invoke<T: DeserializeOwned>(&self, call: HubCall) -> Result<T> {
        let method = call.method();
        let value = self.session.call(&call)?;
        decode(method, value)
    }

    fn invoke_void(&self, call: HubCall) -> Result<()> {
        self.session.call(&call).map(|_| ())
    }

    /// Runs a batch on this client's session.
    pub fn execute(&self, batch: Batch) -> Result<Vec<Value>> {
        batch.execute(self.session.as_ref())
    }

    pub fn get_task_info(&self, task_id: TaskId) -> Result<TaskInfo> {
        self.invoke(HubCall::GetTaskInfo {
            task_id,
            request: true,
        })
    }

    pub fn get_task_children(&self, task_id: TaskId) -> Result<Vec<TaskInfo>> {
        self.invoke(HubCall::GetTaskChildren {
            task_id,
            request: true,
        })
    }

    pub fn list_tasks(&self, opts: TaskQuery, query_opts: QueryOpts) -> Result<Vec<TaskInfo>> {
        self.invoke(HubCall::ListTasks { opts, query_opts })
    }

    pub fn make_task(
        &self,
        method: &str,
        arglist: Vec<Value>,
        channel: Option<ChannelId>,
        weight: Option<f64>,
    ) -> Result<TaskId> {
        self.invoke(HubCall::MakeTask {
            method: method.to_string(),
            arglist,
            channel,
            weight,
        })
    }

    pub fn get_task_result(&self, task_id: TaskId) -> Result<Value> {
        self.session.call(&HubCall::GetTaskResult { task_id })
    }

    /// Strict channel lookup by name.
    pub fn get_channel(&self, name: &str) -> Result<ChannelInfo> {
        self.invoke(HubCall::GetChannel {
            channel: name.to_string(),
            strict: true,
        })
    }

    /// Strict host lookup by name.
    pub fn get_host(&self, name: &str) -> Result<HostInfo> {
        self.invoke(HubCall::GetHost {
            host: name.to_string(),
            strict: true,
        })
    }

    /// Tag lookup that yields `None` for a missing tag.
    pub fn get_tag(&self, tag: TagRef, event: Option<EventId>) -> Result<Option<TagInfo>> {
        self.invoke(HubCall::GetTag {
            tag,
            event,
            strict: false,
        })
    }

    /// Tag lookup that faults for a missing tag.
    pub fn get_tag_strict(&self, tag: TagRef, event: Option<EventId>) -> Result<TagInfo> {
        self.invoke(HubCall::GetTag {
            tag,
            event,
            strict: true,
        })
    }

    pub fn create_tag(
        &self,
        name: &str,
        arches: Option<String>,
        extra: Map<String, Value>,
    ) -> Result<TagId> {
        self.invoke(HubCall::CreateTag {
            name: name.to_string(),
            arches,
            extra,
        })
    }

    pub fn edit_tag(
        &self,
        tag: TagRef,
        arches: Option<String>,
        extra: Map<String, Value>,
    ) -> Result<()> {
        self.invoke_void(HubCall::EditTag2 { tag, arches, extra })
    }

    pub fn get_inheritance(&self, tag: TagRef) -> Result<Vec<InheritanceLink>> {
        self.invoke(HubCall::GetInheritanceData { tag })
    }

    /// Replaces the tag's inheritance with `data`.
    pub fn set_inheritance(&self, tag: TagRef, data: Vec<InheritanceLink>) -> Result<()> {
        self.invoke_void(HubCall::SetInheritanceData {
            tag,
            data,
            clear: true,
        })
    }

    pub fn list_packages(&self, tag_id: TagId, event: Option<EventId>) -> Result<Vec<PackageEntry>> {
        self.invoke(HubCall::ListPackages {
            tag_id,
            event,
            inherited: true,
        })
    }

    /// Latest builds tagged into `tag`, through inheritance.
    pub fn list_latest_tagged(&self, tag: TagRef, event: Option<EventId>) -> Result<Vec<TaggedBuild>> {
        self.invoke(HubCall::ListTagged {
            tag,
            event,
            inherited: true,
            latest: true,
        })
    }

    pub fn get_tag_groups(&self, tag: TagRef, event: Option<EventId>) -> Result<Vec<GroupInfo>> {
        self.invoke(HubCall::GetTagGroups {
            tag,
            event,
            inherited: true,
        })
    }

    /// Strict repo lookup.
    pub fn repo_info(&self, repo_id: RepoId) -> Result<RepoInfo> {
        self.invoke(HubCall::RepoInfo {
            repo_id,
            strict: true,
        })
    }

    /// Requests repo generation for a tag and returns the generating task.
    pub fn new_repo(&self, tag_name: &str, event: Option<EventId>) -> Result<TaskId> {
        self.invoke(HubCall::NewRepo {
            tag: tag_name.to_string(),
            event,
        })
    }

    /// Blocks until `task_id` reaches a terminal state and returns it.
    ///
    /// There is no local timeout; the hub's terminal states end the wait.
    pub fn wait_for_task(&self, task_id: TaskId) -> Result<TaskState> {
        loop {
            let info = self.get_task_info(task_id)?;
            if info.state.is_terminal() {
                debug!("task {} finished: {}", task_id, info.state);
                return Ok(info.state);
            }
            debug!("task {} is {}, waiting", task_id, info.state);
            thread::sleep(self.poll_interval);
        }
    }

    /// Waits for `task_id` and decodes its result; any end state other than
    /// CLOSED is an error.
    pub fn wait_for_result<T: DeserializeOwned>(&self, task_id: TaskId) -> Result<T> {
        let state = self.wait_for_task(task_id)?;
        if state != TaskState::Closed {
            return Err(Error::TaskFailed { task_id, state });
        }
        decode("getTaskResult", self.get_task_result(task_id)?)
    }

    /// Generates a repo for `tag_name` (optionally as of `event`), waits for
    /// the generating task and returns the new repo.
    pub fn generate_repo(&self, tag_name: &str, event: Option<EventId>) -> Result<RepoInfo> {
        let task_id = self.new_repo(tag_name, event)?;
        let (repo_id, _event_id): (RepoId, EventId) = self.wait_for_result(task_id)?;
        self.repo_info(repo_id)
    }
}
