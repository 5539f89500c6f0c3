//! # Build Hub Collaborator
//!
//! Everything this crate knows about the remote build system goes through
//! this module. The design separates three layers, in the same spirit as a
//! thin mockable operations trait sitting under a high-level manager:
//!
//! - **[`HubCall`]**: one variant per remote method, carrying its named
//!   parameters. It serializes to `{"method": ..., "params": {...}}`, which
//!   is exactly what the JSON-RPC transport puts on the wire.
//!
//! - **[`HubSession`]**: the transport seam. A session executes single calls,
//!   executes a batch of calls in one round trip ([`HubSession::multicall`]),
//!   and hands out independent sub-sessions for worker threads. The real
//!   implementation lives in [`http`]; [`memory`] provides an in-memory build
//!   system for tests.
//!
//! - **[`HubClient`]**: typed wrappers over the session (decode results into
//!   [`crate::model`] types) plus blocking waits on remote tasks.
//!
//! Batched mutations are expressed with [`Batch`]: enqueue calls, execute,
//! receive one result per call in submission order.

mod client;
pub mod http;
pub mod memory;

pub use client::{decode, HubClient};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::model::{
    ChannelId, EventId, HostId, InheritanceLink, RepoId, TagId, TagRef, TaskId,
};

/// Task list filter as understood by `listTasks`.
///
/// `parent` is always sent, so a `None` filters for top-level tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Vec<i64>>,
    pub parent: Option<TaskId>,
    #[serde(default)]
    pub decode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<ChannelId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_id: Option<HostId>,
}

/// Windowing and ordering for list queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOpts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    /// Field to order by; a leading `-` means descending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
}

/// A single remote method invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum HubCall {
    GetTaskInfo {
        task_id: TaskId,
        request: bool,
    },
    GetTaskChildren {
        task_id: TaskId,
        request: bool,
    },
    ListTasks {
        opts: TaskQuery,
        query_opts: QueryOpts,
    },
    MakeTask {
        method: String,
        arglist: Vec<Value>,
        channel: Option<ChannelId>,
        weight: Option<f64>,
    },
    GetTaskResult {
        task_id: TaskId,
    },
    GetChannel {
        channel: String,
        strict: bool,
    },
    GetHost {
        host: String,
        strict: bool,
    },
    GetTag {
        tag: TagRef,
        event: Option<EventId>,
        strict: bool,
    },
    CreateTag {
        name: String,
        arches: Option<String>,
        extra: Map<String, Value>,
    },
    EditTag2 {
        tag: TagRef,
        arches: Option<String>,
        extra: Map<String, Value>,
    },
    GetInheritanceData {
        tag: TagRef,
    },
    SetInheritanceData {
        tag: TagRef,
        data: Vec<InheritanceLink>,
        clear: bool,
    },
    ListPackages {
        tag_id: TagId,
        event: Option<EventId>,
        inherited: bool,
    },
    ListTagged {
        tag: TagRef,
        event: Option<EventId>,
        inherited: bool,
        latest: bool,
    },
    GetTagGroups {
        tag: TagRef,
        event: Option<EventId>,
        inherited: bool,
    },
    PackageListAdd {
        tag: TagRef,
        package: String,
        owner: String,
        block: bool,
        extra_arches: Option<String>,
        force: bool,
    },
    TagBuildBypass {
        tag: TagRef,
        build: String,
        force: bool,
        notify: bool,
    },
    GroupListAdd {
        tag: TagRef,
        group: String,
        block: bool,
        force: bool,
    },
    GroupPackageListAdd {
        tag: TagRef,
        group: String,
        package: String,
        block: bool,
        force: bool,
        #[serde(rename = "type")]
        kind: String,
    },
    GroupReqListAdd {
        tag: TagRef,
        group: String,
        reqinfo: String,
        block: bool,
        force: bool,
        #[serde(rename = "type")]
        kind: String,
        is_metapkg: bool,
    },
    RepoInfo {
        repo_id: RepoId,
        strict: bool,
    },
    NewRepo {
        tag: String,
        event: Option<EventId>,
    },
}

impl HubCall {
    /// The remote method name, as sent on the wire.
    pub fn method(&self) -> &'static str {
        match self {
            HubCall::GetTaskInfo { .. } => "getTaskInfo",
            HubCall::GetTaskChildren { .. } => "getTaskChildren",
            HubCall::ListTasks { .. } => "listTasks",
            HubCall::MakeTask { .. } => "makeTask",
            HubCall::GetTaskResult { .. } => "getTaskResult",
            HubCall::GetChannel { .. } => "getChannel",
            HubCall::GetHost { .. } => "getHost",
            HubCall::GetTag { .. } => "getTag",
            HubCall::CreateTag { .. } => "createTag",
            HubCall::EditTag2 { .. } => "editTag2",
            HubCall::GetInheritanceData { .. } => "getInheritanceData",
            HubCall::SetInheritanceData { .. } => "setInheritanceData",
            HubCall::ListPackages { .. } => "listPackages",
            HubCall::ListTagged { .. } => "listTagged",
            HubCall::GetTagGroups { .. } => "getTagGroups",
            HubCall::PackageListAdd { .. } => "packageListAdd",
            HubCall::TagBuildBypass { .. } => "tagBuildBypass",
            HubCall::GroupListAdd { .. } => "groupListAdd",
            HubCall::GroupPackageListAdd { .. } => "groupPackageListAdd",
            HubCall::GroupReqListAdd { .. } => "groupReqListAdd",
            HubCall::RepoInfo { .. } => "repoInfo",
            HubCall::NewRepo { .. } => "newRepo",
        }
    }
}

/// A fault reported by the hub for one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fault {
    pub code: i64,
    pub message: String,
}

impl Fault {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Converts the fault into a crate error attributed to `method`.
    pub fn into_error(self, method: &str) -> Error {
        Error::Fault {
            method: method.to_string(),
            code: self.code,
            message: self.message,
        }
    }
}

/// The outcome of one call inside a multicall.
pub type CallOutcome = std::result::Result<Value, Fault>;

/// Transport seam to the build hub.
///
/// Implementations must be usable from several threads; each worker still
/// gets its own handle through [`HubSession::subsession`] so that connection
/// state is never shared between workers.
pub trait HubSession: Send + Sync {
    /// Executes one call. A fault becomes [`Error::Fault`].
    fn call(&self, call: &HubCall) -> Result<Value>;

    /// Executes all calls in one round trip, returning one outcome per call
    /// in submission order. Only transport failures fail the whole batch.
    fn multicall(&self, calls: &[HubCall]) -> Result<Vec<CallOutcome>>;

    /// Opens an independent session against the same hub.
    fn subsession(&self) -> Result<Box<dyn HubSession>>;
}

/// A queue of calls dispatched together through [`HubSession::multicall`].
#[derive(Debug, Default, Clone)]
pub struct Batch {
    calls: Vec<HubCall>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a call and returns its position in the result list.
    pub fn push(&mut self, call: HubCall) -> usize {
        self.calls.push(call);
        self.calls.len() - 1
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn calls(&self) -> &[HubCall] {
        &self.calls
    }

    /// Dispatches the queued calls and returns their results in order.
    ///
    /// The first faulted call fails the batch; an empty batch makes no
    /// round trip at all.
    pub fn execute(self, session: &dyn HubSession) -> Result<Vec<Value>> {
        if self.calls.is_empty() {
            return Ok(Vec::new());
        }
        let outcomes = session.multicall(&self.calls)?;
        if outcomes.len() != self.calls.len() {
            return Err(Error::Decode {
                method: "multiCall".to_string(),
                message: format!(
                    "expected {} results, got {}",
                    self.calls.len(),
                    outcomes.len()
                ),
            });
        }
        self.calls
            .iter()
            .zip(outcomes)
            .map(|(call, outcome)| outcome.map_err(|fault| fault.into_error(call.method())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Session answering every call with its position, faulting on `getHost`.
    struct EchoSession {
        multicalls: Arc<Mutex<usize>>,
    }

    impl HubSession for EchoSession {
        fn call(&self, call: &HubCall) -> Result<Value> {
            Ok(json!(call.method()))
        }

        fn multicall(&self, calls: &[HubCall]) -> Result<Vec<CallOutcome>> {
            *self.multicalls.lock().unwrap() += 1;
            Ok(calls
                .iter()
                .enumerate()
                .map(|(i, call)| match call {
                    HubCall::GetHost { host, .. } => {
                        Err(Fault::new(1000, format!("No such host: {}", host)))
                    }
                    _ => Ok(json!(i)),
                })
                .collect())
        }

        fn subsession(&self) -> Result<Box<dyn HubSession>> {
            Ok(Box::new(EchoSession {
                multicalls: Arc::clone(&self.multicalls),
            }))
        }
    }

    #[test]
    fn test_hub_call_wire_shape() {
        let call = HubCall::GetTaskInfo {
            task_id: 12,
            request: true,
        };
        assert_eq!(
            serde_json::to_value(&call).unwrap(),
            json!({"method": "getTaskInfo", "params": {"task_id": 12, "request": true}})
        );
        let call = HubCall::EditTag2 {
            tag: TagRef::Id(1),
            arches: None,
            extra: Map::new(),
        };
        assert_eq!(serde_json::to_value(&call).unwrap()["method"], "editTag2");
    }

    #[test]
    fn test_method_matches_serialized_name() {
        let calls = vec![
            HubCall::ListTasks {
                opts: TaskQuery::default(),
                query_opts: QueryOpts::default(),
            },
            HubCall::GroupReqListAdd {
                tag: TagRef::Id(1),
                group: "build".to_string(),
                reqinfo: "core".to_string(),
                block: false,
                force: false,
                kind: "mandatory".to_string(),
                is_metapkg: false,
            },
            HubCall::NewRepo {
                tag: "dist".to_string(),
                event: None,
            },
        ];
        for call in calls {
            let value = serde_json::to_value(&call).unwrap();
            assert_eq!(value["method"], call.method());
        }
    }

    #[test]
    fn test_task_query_always_sends_parent() {
        let query = TaskQuery {
            decode: true,
            ..TaskQuery::default()
        };
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value, json!({"parent": null, "decode": true}));
    }

    #[test]
    fn test_batch_returns_results_in_order() {
        let multicalls = Arc::new(Mutex::new(0));
        let session = EchoSession {
            multicalls: Arc::clone(&multicalls),
        };
        let mut batch = Batch::new();
        for task_id in [3, 1, 2] {
            batch.push(HubCall::GetTaskResult { task_id });
        }
        let results = batch.execute(&session).unwrap();
        assert_eq!(results, vec![json!(0), json!(1), json!(2)]);
        assert_eq!(*multicalls.lock().unwrap(), 1);
    }

    #[test]
    fn test_batch_fault_names_method() {
        let session = EchoSession {
            multicalls: Arc::new(Mutex::new(0)),
        };
        let mut batch = Batch::new();
        batch.push(HubCall::GetTaskResult { task_id: 1 });
        batch.push(HubCall::GetHost {
            host: "builder-9".to_string(),
            strict: true,
        });
        let err = batch.execute(&session).unwrap_err();
        match err {
            Error::Fault { method, code, .. } => {
                assert_eq!(method, "getHost");
                assert_eq!(code, 1000);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_empty_batch_makes_no_round_trip() {
        let multicalls = Arc::new(Mutex::new(0));
        let session = EchoSession {
            multicalls: Arc::clone(&multicalls),
        };
        assert!(Batch::new().execute(&session).unwrap().is_empty());
        assert_eq!(*multicalls.lock().unwrap(), 0);
    }
}
