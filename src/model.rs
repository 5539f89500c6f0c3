//! # Build System Data Model
//!
//! Plain data types describing the objects the build hub hands back: tasks,
//! repos, tags and their inheritance, package lists, tagged builds and
//! groups. They deserialize directly from call results and serialize back
//! into call parameters, so the same shapes are shared by every
//! [`HubSession`](crate::hub::HubSession) implementation.
//!
//! The two state enumerations travel as small integers on the wire, which is
//! how the hub encodes them; their symbolic names are used for display and
//! for parsing user input.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

pub type TaskId = i64;
pub type RepoId = i64;
pub type TagId = i64;
pub type EventId = i64;
pub type ChannelId = i64;
pub type HostId = i64;

/// Lifecycle state of a remote task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum TaskState {
    Free,
    Open,
    Closed,
    Canceled,
    Assigned,
    Failed,
}

impl TaskState {
    /// All states in numeric order.
    pub const ALL: [TaskState; 6] = [
        TaskState::Free,
        TaskState::Open,
        TaskState::Closed,
        TaskState::Canceled,
        TaskState::Assigned,
        TaskState::Failed,
    ];

    pub fn code(self) -> i64 {
        match self {
            TaskState::Free => 0,
            TaskState::Open => 1,
            TaskState::Closed => 2,
            TaskState::Canceled => 3,
            TaskState::Assigned => 4,
            TaskState::Failed => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TaskState::Free => "FREE",
            TaskState::Open => "OPEN",
            TaskState::Closed => "CLOSED",
            TaskState::Canceled => "CANCELED",
            TaskState::Assigned => "ASSIGNED",
            TaskState::Failed => "FAILED",
        }
    }

    /// Looks a state up by its symbolic name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|state| state.name().eq_ignore_ascii_case(name))
    }

    /// Terminal states are the ones a waiting client stops polling at.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Closed | TaskState::Canceled | TaskState::Failed
        )
    }
}

impl TryFrom<i64> for TaskState {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|state| state.code() == code)
            .ok_or_else(|| format!("unknown task state {}", code))
    }
}

impl From<TaskState> for i64 {
    fn from(state: TaskState) -> Self {
        state.code()
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle state of a repo snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum RepoState {
    Init,
    Ready,
    Expired,
    Deleted,
    Problem,
}

impl RepoState {
    pub fn code(self) -> i64 {
        match self {
            RepoState::Init => 0,
            RepoState::Ready => 1,
            RepoState::Expired => 2,
            RepoState::Deleted => 3,
            RepoState::Problem => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RepoState::Init => "INIT",
            RepoState::Ready => "READY",
            RepoState::Expired => "EXPIRED",
            RepoState::Deleted => "DELETED",
            RepoState::Problem => "PROBLEM",
        }
    }

    /// Only READY and EXPIRED repos can still be built against.
    pub fn is_reusable(self) -> bool {
        matches!(self, RepoState::Ready | RepoState::Expired)
    }
}

impl TryFrom<i64> for RepoState {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(RepoState::Init),
            1 => Ok(RepoState::Ready),
            2 => Ok(RepoState::Expired),
            3 => Ok(RepoState::Deleted),
            4 => Ok(RepoState::Problem),
            other => Err(format!("unknown repo state {}", other)),
        }
    }
}

impl From<RepoState> for i64 {
    fn from(state: RepoState) -> Self {
        state.code()
    }
}

impl fmt::Display for RepoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A remote work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub id: TaskId,
    pub method: String,
    #[serde(default)]
    pub parent: Option<TaskId>,
    pub channel_id: ChannelId,
    #[serde(default)]
    pub host_id: Option<HostId>,
    pub state: TaskState,
    /// Decoded request parameters, positional as the hub stores them.
    #[serde(default)]
    pub request: Vec<Value>,
}

/// A task given either by id or as already-fetched info.
///
/// Explicit ids from the command line arrive as `Id`; tasks found by the
/// selector arrive as `Info` and save a round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskRef {
    Id(TaskId),
    Info(Box<TaskInfo>),
}

impl TaskRef {
    pub fn id(&self) -> TaskId {
        match self {
            TaskRef::Id(id) => *id,
            TaskRef::Info(info) => info.id,
        }
    }
}

impl From<TaskId> for TaskRef {
    fn from(id: TaskId) -> Self {
        TaskRef::Id(id)
    }
}

impl From<TaskInfo> for TaskRef {
    fn from(info: TaskInfo) -> Self {
        TaskRef::Info(Box::new(info))
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.id())
    }
}

/// An immutable snapshot of a tag's buildable content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub id: RepoId,
    pub tag_id: TagId,
    pub tag_name: String,
    pub create_event: EventId,
    pub state: RepoState,
}

/// Tag lookup key: the hub accepts either form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagRef {
    Id(TagId),
    Name(String),
}

impl From<TagId> for TagRef {
    fn from(id: TagId) -> Self {
        TagRef::Id(id)
    }
}

impl From<&str> for TagRef {
    fn from(name: &str) -> Self {
        TagRef::Name(name.to_string())
    }
}

impl fmt::Display for TagRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagRef::Id(id) => write!(f, "{}", id),
            TagRef::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagInfo {
    pub id: TagId,
    pub name: String,
    /// Space separated arch list, absent when the tag builds nothing.
    #[serde(default)]
    pub arches: Option<String>,
    #[serde(default)]
    pub extra: Map<String, Value>,
}

/// One parent link in a tag's inheritance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InheritanceLink {
    pub parent_id: TagId,
    pub priority: i32,
    #[serde(default)]
    pub maxdepth: Option<u32>,
    #[serde(default)]
    pub intransitive: bool,
    #[serde(default)]
    pub noconfig: bool,
    #[serde(default)]
    pub pkg_filter: String,
    /// Parent name as reported by the hub; not part of the link itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl InheritanceLink {
    /// A full-depth, transitive link with no config suppression or filter.
    pub fn full(parent_id: TagId, priority: i32) -> Self {
        Self {
            parent_id,
            priority,
            maxdepth: None,
            intransitive: false,
            noconfig: false,
            pkg_filter: String::new(),
            name: None,
        }
    }

    /// Compares the link attributes, ignoring the transient parent name.
    pub fn same_link(&self, other: &Self) -> bool {
        self.parent_id == other.parent_id
            && self.priority == other.priority
            && self.maxdepth == other.maxdepth
            && self.intransitive == other.intransitive
            && self.noconfig == other.noconfig
            && self.pkg_filter == other.pkg_filter
    }
}

/// A package list entry as seen through a tag's inheritance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageEntry {
    pub package_name: String,
    pub owner_name: String,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub extra_arches: Option<String>,
}

/// The latest build of a package tagged into a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedBuild {
    pub build_id: i64,
    pub nvr: String,
    #[serde(default)]
    pub package_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupPackage {
    pub package: String,
    #[serde(default)]
    pub blocked: bool,
    #[serde(rename = "type", default = "default_group_member_type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupReq {
    pub name: String,
    #[serde(default)]
    pub blocked: bool,
    #[serde(rename = "type", default = "default_group_member_type")]
    pub kind: String,
    #[serde(default)]
    pub is_metapkg: bool,
}

fn default_group_member_type() -> String {
    "mandatory".to_string()
}

/// A comps-style group definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub name: String,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_default: Option<bool>,
    #[serde(default)]
    pub uservisible: Option<bool>,
    #[serde(default)]
    pub packagelist: Vec<GroupPackage>,
    #[serde(default)]
    pub grouplist: Vec<GroupReq>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    pub id: HostId,
    pub name: String,
}

/// How a replacement repo is obtained for a replicated task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Regenerate a repo for the original tag.
    #[default]
    Reuse,
    /// Copy the tag hierarchy into isolated tags and build a repo on them.
    Clone,
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reuse" => Ok(Strategy::Reuse),
            "clone" => Ok(Strategy::Clone),
            other => Err(Error::Config {
                message: format!("unknown strategy '{}'", other),
                hint: Some("valid strategies are 'reuse' and 'clone'".to_string()),
            }),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Reuse => f.write_str("reuse"),
            Strategy::Clone => f.write_str("clone"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_state_codes_round_trip_through_json() {
        let state: TaskState = serde_json::from_value(json!(2)).unwrap();
        assert_eq!(state, TaskState::Closed);
        assert_eq!(serde_json::to_value(TaskState::Failed).unwrap(), json!(5));
    }

    #[test]
    fn test_task_state_rejects_unknown_code() {
        assert!(serde_json::from_value::<TaskState>(json!(9)).is_err());
    }

    #[test]
    fn test_task_state_from_name_ignores_case() {
        assert_eq!(TaskState::from_name("closed"), Some(TaskState::Closed));
        assert_eq!(TaskState::from_name("CANCELED"), Some(TaskState::Canceled));
        assert_eq!(TaskState::from_name("DONE"), None);
    }

    #[test]
    fn test_terminal_states() {
        let terminal: Vec<_> = TaskState::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![TaskState::Closed, TaskState::Canceled, TaskState::Failed]
        );
    }

    #[test]
    fn test_repo_state_reusable() {
        assert!(RepoState::Ready.is_reusable());
        assert!(RepoState::Expired.is_reusable());
        assert!(!RepoState::Init.is_reusable());
        assert!(!RepoState::Deleted.is_reusable());
        assert!(!RepoState::Problem.is_reusable());
    }

    #[test]
    fn test_task_info_deserializes_with_null_parent() {
        let info: TaskInfo = serde_json::from_value(json!({
            "id": 10,
            "method": "build",
            "parent": null,
            "channel_id": 1,
            "state": 2,
            "request": ["git://src", "f40-candidate", {}],
        }))
        .unwrap();
        assert_eq!(info.parent, None);
        assert_eq!(info.host_id, None);
        assert_eq!(info.request.len(), 3);
    }

    #[test]
    fn test_task_ref_id() {
        assert_eq!(TaskRef::from(5).id(), 5);
        let info = TaskInfo {
            id: 9,
            method: "build".to_string(),
            parent: None,
            channel_id: 1,
            host_id: None,
            state: TaskState::Closed,
            request: vec![],
        };
        assert_eq!(TaskRef::from(info).id(), 9);
        assert_eq!(TaskRef::Id(3).to_string(), "#3");
    }

    #[test]
    fn test_tag_ref_untagged() {
        assert_eq!(serde_json::to_value(TagRef::Id(4)).unwrap(), json!(4));
        assert_eq!(
            serde_json::to_value(TagRef::from("dist-x86_64")).unwrap(),
            json!("dist-x86_64")
        );
    }

    #[test]
    fn test_inheritance_same_link_ignores_name() {
        let mut reported = InheritanceLink::full(3, 15);
        reported.name = Some("task-replication-1-base".to_string());
        assert!(reported.same_link(&InheritanceLink::full(3, 15)));
        assert!(!reported.same_link(&InheritanceLink::full(3, 5)));
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("reuse".parse::<Strategy>().unwrap(), Strategy::Reuse);
        assert_eq!("clone".parse::<Strategy>().unwrap(), Strategy::Clone);
        let err = "copy".parse::<Strategy>().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("unknown strategy 'copy'"));
    }

    #[test]
    fn test_group_member_type_defaults() {
        let pkg: GroupPackage = serde_json::from_value(json!({"package": "bash"})).unwrap();
        assert_eq!(pkg.kind, "mandatory");
        assert!(!pkg.blocked);
    }
}
