//! # In-Memory Build Hub
//!
//! `MemoryHub` is a small, self-contained build system implementing
//! [`HubSession`]. It keeps tasks, channels, hosts, tags (with inheritance,
//! package lists, tagged builds and groups) and repos in memory, executes
//! every submitted task synchronously, and records each call it receives so
//! tests can assert on the exact traffic.
//!
//! Semantics worth knowing when writing tests against it:
//!
//! - A `newRepo` task closes immediately with a READY repo whose
//!   `create_event` is the requested event (or the current one).
//! - Any other submitted task ends in the configured build outcome
//!   (CLOSED unless changed with [`MemoryHub::set_build_outcome`]).
//! - No history is kept: `event` arguments are accepted and ignored by the
//!   list calls.
//! - List additions fault when the entry already exists in the tag's own
//!   list, unless `force` is set.
//! - Sub-sessions share state; they are handles onto the same hub.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::{CallOutcome, Fault, HubCall, HubSession, QueryOpts, TaskQuery};
use crate::error::Result;
use crate::model::{
    ChannelId, ChannelInfo, EventId, GroupInfo, GroupPackage, GroupReq, HostId, HostInfo,
    InheritanceLink, PackageEntry, RepoId, RepoInfo, RepoState, TagId, TagInfo, TagRef,
    TaggedBuild, TaskId, TaskInfo, TaskState,
};

const FAULT_GENERIC: i64 = 1000;

#[derive(Debug)]
struct HubState {
    next_id: i64,
    event: EventId,
    build_outcome: TaskState,
    tasks: BTreeMap<TaskId, TaskInfo>,
    results: HashMap<TaskId, Value>,
    channels: Vec<ChannelInfo>,
    hosts: Vec<HostInfo>,
    tags: BTreeMap<TagId, TagInfo>,
    inheritance: HashMap<TagId, Vec<InheritanceLink>>,
    packages: HashMap<TagId, Vec<PackageEntry>>,
    tagged: HashMap<TagId, Vec<TaggedBuild>>,
    groups: HashMap<TagId, Vec<GroupInfo>>,
    repos: BTreeMap<RepoId, RepoInfo>,
    failing: HashSet<String>,
    submitted: Vec<TaskId>,
    calls: Vec<HubCall>,
    multicalls: usize,
}

impl Default for HubState {
    fn default() -> Self {
        Self {
            next_id: 1,
            event: 1,
            build_outcome: TaskState::Closed,
            tasks: BTreeMap::new(),
            results: HashMap::new(),
            channels: Vec::new(),
            hosts: Vec::new(),
            tags: BTreeMap::new(),
            inheritance: HashMap::new(),
            packages: HashMap::new(),
            tagged: HashMap::new(),
            groups: HashMap::new(),
            repos: BTreeMap::new(),
            failing: HashSet::new(),
            submitted: Vec::new(),
            calls: Vec::new(),
            multicalls: 0,
        }
    }
}

fn fault(message: impl Into<String>) -> Fault {
    Fault::new(FAULT_GENERIC, message)
}

fn to_value<T: Serialize>(value: T) -> std::result::Result<Value, Fault> {
    serde_json::to_value(value).map_err(|e| fault(e.to_string()))
}

impl HubState {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn bump_event(&mut self) -> EventId {
        self.event += 1;
        self.event
    }

    fn find_tag(&self, tag: &TagRef) -> Option<&TagInfo> {
        match tag {
            TagRef::Id(id) => self.tags.get(id),
            TagRef::Name(name) => self.tags.values().find(|t| &t.name == name),
        }
    }

    fn require_tag(&self, tag: &TagRef) -> std::result::Result<TagId, Fault> {
        self.find_tag(tag)
            .map(|t| t.id)
            .ok_or_else(|| fault(format!("No such tag: {}", tag)))
    }

    /// The tag followed by its ancestors, nearest (lowest priority) first.
    fn lineage(&self, tag_id: TagId) -> Vec<TagId> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        self.walk(tag_id, &mut order, &mut seen);
        order
    }

    fn walk(&self, tag_id: TagId, order: &mut Vec<TagId>, seen: &mut HashSet<TagId>) {
        if !seen.insert(tag_id) {
            return;
        }
        order.push(tag_id);
        let mut parents = self.inheritance.get(&tag_id).cloned().unwrap_or_default();
        parents.sort_by_key(|link| link.priority);
        for link in parents {
            self.walk(link.parent_id, order, seen);
        }
    }

    fn inherited_packages(&self, tag_id: TagId) -> Vec<PackageEntry> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for id in self.lineage(tag_id) {
            for entry in self.packages.get(&id).into_iter().flatten() {
                if seen.insert(entry.package_name.clone()) {
                    out.push(entry.clone());
                }
            }
        }
        out
    }

    fn inherited_builds(&self, tag_id: TagId, latest: bool) -> Vec<TaggedBuild> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for id in self.lineage(tag_id) {
            for build in self.tagged.get(&id).into_iter().flatten().rev() {
                let key = build.package_name.clone().unwrap_or_else(|| build.nvr.clone());
                if !latest || seen.insert(key) {
                    out.push(build.clone());
                }
            }
        }
        out
    }

    fn inherited_groups(&self, tag_id: TagId) -> Vec<GroupInfo> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for id in self.lineage(tag_id) {
            for group in self.groups.get(&id).into_iter().flatten() {
                if seen.insert(group.name.clone()) {
                    out.push(group.clone());
                }
            }
        }
        out
    }

    fn create_task(&mut self, method: &str, request: Vec<Value>, channel_id: ChannelId) -> TaskId {
        let id = self.allocate_id();
        self.tasks.insert(
            id,
            TaskInfo {
                id,
                method: method.to_string(),
                parent: None,
                channel_id,
                host_id: None,
                state: TaskState::Free,
                request,
            },
        );
        id
    }

    fn finish_task(&mut self, task_id: TaskId, state: TaskState, result: Value) {
        if let Some(task) = self.tasks.get_mut(&task_id) {
            task.state = state;
        }
        self.results.insert(task_id, result);
    }

    fn matches(task: &TaskInfo, opts: &TaskQuery) -> bool {
        if task.parent != opts.parent {
            return false;
        }
        if let Some(states) = &opts.state {
            if !states.contains(&task.state.code()) {
                return false;
            }
        }
        if let Some(method) = &opts.method {
            if &task.method != method {
                return false;
            }
        }
        if let Some(channel_id) = opts.channel_id {
            if task.channel_id != channel_id {
                return false;
            }
        }
        if let Some(host_id) = opts.host_id {
            if task.host_id != Some(host_id) {
                return false;
            }
        }
        true
    }

    fn list_tasks(&self, opts: &TaskQuery, query_opts: &QueryOpts) -> Vec<TaskInfo> {
        let mut tasks: Vec<TaskInfo> = self
            .tasks
            .values()
            .filter(|task| Self::matches(task, opts))
            .cloned()
            .collect();
        if query_opts.order.as_deref() == Some("-id") {
            tasks.reverse();
        }
        let offset = query_opts.offset.unwrap_or(0) as usize;
        let limit = query_opts.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        tasks.into_iter().skip(offset).take(limit).collect()
    }

    fn dispatch(&mut self, call: &HubCall) -> CallOutcome {
        self.calls.push(call.clone());
        if self.failing.contains(call.method()) {
            return Err(fault(format!("{} is failing", call.method())));
        }
        match call {
            HubCall::GetTaskInfo { task_id, .. } => self
                .tasks
                .get(task_id)
                .ok_or_else(|| fault(format!("No such task: {}", task_id)))
                .and_then(to_value),
            HubCall::GetTaskChildren { task_id, .. } => {
                let children: Vec<&TaskInfo> = self
                    .tasks
                    .values()
                    .filter(|t| t.parent == Some(*task_id))
                    .collect();
                to_value(children)
            }
            HubCall::ListTasks { opts, query_opts } => to_value(self.list_tasks(opts, query_opts)),
            HubCall::MakeTask {
                method,
                arglist,
                channel,
                ..
            } => {
                let channel_id = channel.unwrap_or(1);
                let task_id = self.create_task(method, arglist.clone(), channel_id);
                self.submitted.push(task_id);
                let outcome = self.build_outcome;
                self.finish_task(task_id, outcome, Value::Null);
                Ok(json!(task_id))
            }
            HubCall::GetTaskResult { task_id } => {
                let task = self
                    .tasks
                    .get(task_id)
                    .ok_or_else(|| fault(format!("No such task: {}", task_id)))?;
                if task.state == TaskState::Failed {
                    return Err(fault(format!("Task {} failed", task_id)));
                }
                Ok(self.results.get(task_id).cloned().unwrap_or(Value::Null))
            }
            HubCall::GetChannel { channel, strict } => {
                match self.channels.iter().find(|c| &c.name == channel) {
                    Some(info) => to_value(info),
                    None if *strict => Err(fault(format!("No such channel: {}", channel))),
                    None => Ok(Value::Null),
                }
            }
            HubCall::GetHost { host, strict } => match self.hosts.iter().find(|h| &h.name == host) {
                Some(info) => to_value(info),
                None if *strict => Err(fault(format!("No such host: {}", host))),
                None => Ok(Value::Null),
            },
            HubCall::GetTag { tag, strict, .. } => match self.find_tag(tag) {
                Some(info) => to_value(info),
                None if *strict => Err(fault(format!("No such tag: {}", tag))),
                None => Ok(Value::Null),
            },
            HubCall::CreateTag {
                name,
                arches,
                extra,
            } => {
                if self.find_tag(&TagRef::Name(name.clone())).is_some() {
                    return Err(fault(format!("A tag with the name {} already exists", name)));
                }
                let id = self.allocate_id();
                self.tags.insert(
                    id,
                    TagInfo {
                        id,
                        name: name.clone(),
                        arches: arches.clone(),
                        extra: extra.clone(),
                    },
                );
                self.bump_event();
                Ok(json!(id))
            }
            HubCall::EditTag2 { tag, arches, extra } => {
                let id = self.require_tag(tag)?;
                if let Some(info) = self.tags.get_mut(&id) {
                    info.arches = arches.clone();
                    for (key, value) in extra {
                        info.extra.insert(key.clone(), value.clone());
                    }
                }
                self.bump_event();
                Ok(Value::Null)
            }
            HubCall::GetInheritanceData { tag } => {
                let id = self.require_tag(tag)?;
                let links: Vec<InheritanceLink> = self
                    .inheritance
                    .get(&id)
                    .cloned()
                    .unwrap_or_default()
                    .into_iter()
                    .map(|mut link| {
                        link.name = self.tags.get(&link.parent_id).map(|t| t.name.clone());
                        link
                    })
                    .collect();
                to_value(links)
            }
            HubCall::SetInheritanceData { tag, data, clear } => {
                let id = self.require_tag(tag)?;
                for link in data {
                    self.require_tag(&TagRef::Id(link.parent_id))?;
                }
                let stored: Vec<InheritanceLink> = data
                    .iter()
                    .cloned()
                    .map(|mut link| {
                        link.name = None;
                        link
                    })
                    .collect();
                let links = self.inheritance.entry(id).or_default();
                if *clear {
                    links.clear();
                }
                links.extend(stored);
                links.sort_by_key(|link| link.priority);
                self.bump_event();
                Ok(Value::Null)
            }
            HubCall::ListPackages {
                tag_id, inherited, ..
            } => {
                let id = self.require_tag(&TagRef::Id(*tag_id))?;
                if *inherited {
                    to_value(self.inherited_packages(id))
                } else {
                    to_value(self.packages.get(&id).cloned().unwrap_or_default())
                }
            }
            HubCall::ListTagged {
                tag,
                inherited,
                latest,
                ..
            } => {
                let id = self.require_tag(tag)?;
                if *inherited {
                    to_value(self.inherited_builds(id, *latest))
                } else {
                    to_value(self.tagged.get(&id).cloned().unwrap_or_default())
                }
            }
            HubCall::GetTagGroups { tag, inherited, .. } => {
                let id = self.require_tag(tag)?;
                if *inherited {
                    to_value(self.inherited_groups(id))
                } else {
                    to_value(self.groups.get(&id).cloned().unwrap_or_default())
                }
            }
            HubCall::PackageListAdd {
                tag,
                package,
                owner,
                block,
                extra_arches,
                force,
            } => {
                let id = self.require_tag(tag)?;
                let entries = self.packages.entry(id).or_default();
                let entry = PackageEntry {
                    package_name: package.clone(),
                    owner_name: owner.clone(),
                    blocked: *block,
                    extra_arches: extra_arches.clone(),
                };
                match entries.iter_mut().find(|e| &e.package_name == package) {
                    Some(_) if !*force => {
                        return Err(fault(format!("Package {} already listed in tag", package)))
                    }
                    Some(existing) => *existing = entry,
                    None => entries.push(entry),
                }
                self.bump_event();
                Ok(Value::Null)
            }
            HubCall::TagBuildBypass {
                tag, build, force, ..
            } => {
                let id = self.require_tag(tag)?;
                let known = self
                    .tagged
                    .values()
                    .flatten()
                    .find(|b| &b.nvr == build)
                    .cloned();
                let build_info = match known {
                    Some(info) => info,
                    None => TaggedBuild {
                        build_id: self.allocate_id(),
                        nvr: build.clone(),
                        package_name: None,
                    },
                };
                let builds = self.tagged.entry(id).or_default();
                if builds.iter().any(|b| &b.nvr == build) {
                    if !*force {
                        return Err(fault(format!("build {} already tagged", build)));
                    }
                } else {
                    builds.push(build_info);
                }
                self.bump_event();
                Ok(Value::Null)
            }
            HubCall::GroupListAdd {
                tag,
                group,
                block,
                force,
            } => {
                let id = self.require_tag(tag)?;
                let groups = self.groups.entry(id).or_default();
                match groups.iter_mut().find(|g| &g.name == group) {
                    Some(_) if !*force => {
                        return Err(fault(format!("group {} already exists", group)))
                    }
                    Some(existing) => existing.blocked = *block,
                    None => groups.push(GroupInfo {
                        name: group.clone(),
                        blocked: *block,
                        display_name: None,
                        description: None,
                        is_default: None,
                        uservisible: None,
                        packagelist: Vec::new(),
                        grouplist: Vec::new(),
                    }),
                }
                self.bump_event();
                Ok(Value::Null)
            }
            HubCall::GroupPackageListAdd {
                tag,
                group,
                package,
                block,
                force,
                kind,
            } => {
                let id = self.require_tag(tag)?;
                let info = self
                    .groups
                    .entry(id)
                    .or_default()
                    .iter_mut()
                    .find(|g| &g.name == group)
                    .ok_or_else(|| fault(format!("group {} not present in tag", group)))?;
                let member = GroupPackage {
                    package: package.clone(),
                    blocked: *block,
                    kind: kind.clone(),
                };
                match info.packagelist.iter_mut().find(|p| &p.package == package) {
                    Some(_) if !*force => {
                        return Err(fault(format!("package {} already in group {}", package, group)))
                    }
                    Some(existing) => *existing = member,
                    None => info.packagelist.push(member),
                }
                self.bump_event();
                Ok(Value::Null)
            }
            HubCall::GroupReqListAdd {
                tag,
                group,
                reqinfo,
                block,
                force,
                kind,
                is_metapkg,
            } => {
                let id = self.require_tag(tag)?;
                let info = self
                    .groups
                    .entry(id)
                    .or_default()
                    .iter_mut()
                    .find(|g| &g.name == group)
                    .ok_or_else(|| fault(format!("group {} not present in tag", group)))?;
                let req = GroupReq {
                    name: reqinfo.clone(),
                    blocked: *block,
                    kind: kind.clone(),
                    is_metapkg: *is_metapkg,
                };
                match info.grouplist.iter_mut().find(|r| &r.name == reqinfo) {
                    Some(_) if !*force => {
                        return Err(fault(format!("group {} already requires {}", group, reqinfo)))
                    }
                    Some(existing) => *existing = req,
                    None => info.grouplist.push(req),
                }
                self.bump_event();
                Ok(Value::Null)
            }
            HubCall::RepoInfo { repo_id, strict } => match self.repos.get(repo_id) {
                Some(info) => to_value(info),
                None if *strict => Err(fault(format!("No such repo: {}", repo_id))),
                None => Ok(Value::Null),
            },
            HubCall::NewRepo { tag, event } => {
                let tag_info = self
                    .find_tag(&TagRef::Name(tag.clone()))
                    .cloned()
                    .ok_or_else(|| fault(format!("No such tag: {}", tag)))?;
                let task_id = self.create_task("newRepo", vec![json!(tag), json!(event)], 1);
                let create_event = event.unwrap_or(self.event);
                let repo_id = self.allocate_id();
                self.repos.insert(
                    repo_id,
                    RepoInfo {
                        id: repo_id,
                        tag_id: tag_info.id,
                        tag_name: tag_info.name,
                        create_event,
                        state: RepoState::Ready,
                    },
                );
                self.finish_task(task_id, TaskState::Closed, json!([repo_id, create_event]));
                Ok(json!(task_id))
            }
        }
    }
}

/// A shared handle onto an in-memory build system.
#[derive(Debug, Clone, Default)]
pub struct MemoryHub {
    state: Arc<Mutex<HubState>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        // Keep serving after a panicking test thread.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_channel(&self, name: &str) -> ChannelId {
        let mut state = self.lock();
        let id = state.allocate_id();
        state.channels.push(ChannelInfo {
            id,
            name: name.to_string(),
        });
        id
    }

    pub fn add_host(&self, name: &str) -> HostId {
        let mut state = self.lock();
        let id = state.allocate_id();
        state.hosts.push(HostInfo {
            id,
            name: name.to_string(),
        });
        id
    }

    pub fn add_tag(&self, name: &str, arches: Option<&str>) -> TagId {
        self.add_tag_with_extra(name, arches, Map::new())
    }

    pub fn add_tag_with_extra(
        &self,
        name: &str,
        arches: Option<&str>,
        extra: Map<String, Value>,
    ) -> TagId {
        let mut state = self.lock();
        let id = state.allocate_id();
        state.tags.insert(
            id,
            TagInfo {
                id,
                name: name.to_string(),
                arches: arches.map(str::to_string),
                extra,
            },
        );
        id
    }

    pub fn add_parent(&self, child: TagId, parent: TagId, priority: i32) {
        let mut state = self.lock();
        let links = state.inheritance.entry(child).or_default();
        links.push(InheritanceLink::full(parent, priority));
        links.sort_by_key(|link| link.priority);
    }

    pub fn add_package(&self, tag: TagId, package: &str, owner: &str) {
        self.lock().packages.entry(tag).or_default().push(PackageEntry {
            package_name: package.to_string(),
            owner_name: owner.to_string(),
            blocked: false,
            extra_arches: None,
        });
    }

    pub fn add_tagged_build(&self, tag: TagId, package: &str, nvr: &str) {
        let mut state = self.lock();
        let build_id = state.allocate_id();
        state.tagged.entry(tag).or_default().push(TaggedBuild {
            build_id,
            nvr: nvr.to_string(),
            package_name: Some(package.to_string()),
        });
    }

    pub fn add_group(&self, tag: TagId, group: GroupInfo) {
        self.lock().groups.entry(tag).or_default().push(group);
    }

    /// Adds a repo on `tag` created at the current event.
    pub fn add_repo(&self, tag: TagId, state: RepoState) -> RepoId {
        let mut hub = self.lock();
        let tag_name = hub
            .tags
            .get(&tag)
            .map(|t| t.name.clone())
            .unwrap_or_default();
        let id = hub.allocate_id();
        let create_event = hub.bump_event();
        hub.repos.insert(
            id,
            RepoInfo {
                id,
                tag_id: tag,
                tag_name,
                create_event,
                state,
            },
        );
        id
    }

    pub fn set_repo_state(&self, repo: RepoId, state: RepoState) {
        if let Some(info) = self.lock().repos.get_mut(&repo) {
            info.state = state;
        }
    }

    /// Inserts a task as-is.
    pub fn add_task(&self, task: TaskInfo) -> TaskId {
        let id = task.id;
        let mut state = self.lock();
        state.next_id = state.next_id.max(id + 1);
        state.tasks.insert(id, task);
        id
    }

    /// Adds a finished top-level build of `source` plus one `buildArch`
    /// child that built against `repo`.
    pub fn add_build_task(
        &self,
        channel: ChannelId,
        source: &str,
        repo: Option<RepoId>,
        scratch: bool,
    ) -> TaskId {
        let mut state = self.lock();
        let id = state.allocate_id();
        let mut opts = Map::new();
        if scratch {
            opts.insert("scratch".to_string(), json!(true));
        }
        state.tasks.insert(
            id,
            TaskInfo {
                id,
                method: "build".to_string(),
                parent: None,
                channel_id: channel,
                host_id: None,
                state: TaskState::Closed,
                request: vec![json!(source), json!("dist-candidate"), Value::Object(opts)],
            },
        );
        let child = state.allocate_id();
        let mut child_opts = Map::new();
        if let Some(repo) = repo {
            child_opts.insert("repo_id".to_string(), json!(repo));
        }
        state.tasks.insert(
            child,
            TaskInfo {
                id: child,
                method: "buildArch".to_string(),
                parent: Some(id),
                channel_id: channel,
                host_id: None,
                state: TaskState::Closed,
                request: vec![
                    json!("tasks/1/pkg.src.rpm"),
                    json!(1),
                    json!("x86_64"),
                    json!(true),
                    Value::Object(child_opts),
                ],
            },
        );
        id
    }

    /// State that every non-repo task submitted from now on ends in.
    pub fn set_build_outcome(&self, state: TaskState) {
        self.lock().build_outcome = state;
    }

    /// Makes every call to `method` fault.
    pub fn fail_method(&self, method: &str) {
        self.lock().failing.insert(method.to_string());
    }

    pub fn calls(&self) -> Vec<HubCall> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, method: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.method() == method)
            .count()
    }

    /// Number of multicall round trips served.
    pub fn multicall_count(&self) -> usize {
        self.lock().multicalls
    }

    pub fn task(&self, id: TaskId) -> Option<TaskInfo> {
        self.lock().tasks.get(&id).cloned()
    }

    /// Tasks created through `makeTask`, oldest first.
    pub fn submitted_tasks(&self) -> Vec<TaskInfo> {
        let state = self.lock();
        state
            .submitted
            .iter()
            .filter_map(|id| state.tasks.get(id).cloned())
            .collect()
    }

    pub fn tag_by_name(&self, name: &str) -> Option<TagInfo> {
        self.lock().find_tag(&TagRef::Name(name.to_string())).cloned()
    }

    pub fn inheritance_of(&self, tag: TagId) -> Vec<InheritanceLink> {
        self.lock().inheritance.get(&tag).cloned().unwrap_or_default()
    }

    pub fn packages_of(&self, tag: TagId) -> Vec<PackageEntry> {
        self.lock().packages.get(&tag).cloned().unwrap_or_default()
    }

    pub fn tagged_of(&self, tag: TagId) -> Vec<TaggedBuild> {
        self.lock().tagged.get(&tag).cloned().unwrap_or_default()
    }

    pub fn groups_of(&self, tag: TagId) -> Vec<GroupInfo> {
        self.lock().groups.get(&tag).cloned().unwrap_or_default()
    }

    pub fn repo(&self, id: RepoId) -> Option<RepoInfo> {
        self.lock().repos.get(&id).cloned()
    }
}

impl HubSession for MemoryHub {
    fn call(&self, call: &HubCall) -> Result<Value> {
        self.lock()
            .dispatch(call)
            .map_err(|fault| fault.into_error(call.method()))
    }

    fn multicall(&self, calls: &[HubCall]) -> Result<Vec<CallOutcome>> {
        let mut state = self.lock();
        state.multicalls += 1;
        Ok(calls.iter().map(|call| state.dispatch(call)).collect())
    }

    fn subsession(&self) -> Result<Box<dyn HubSession>> {
        Ok(Box::new(self.clone()))
    }
}
