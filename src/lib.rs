//! # Task Replicator Library
//!
//! This library replays finished build tasks of a build hub as new scratch
//! builds, reconstructing for each one a repo that reproduces the buildroot
//! the original saw. It is designed to be used by the `replicate-tasks`
//! command-line tool but works against any [`hub::HubSession`], including the
//! in-memory [`hub::memory::MemoryHub`].
//!
//! ## Quick Example
//!
//! ```
//! use task_replicator::hub::{memory::MemoryHub, HubClient};
//! use task_replicator::model::{RepoState, TaskRef};
//! use task_replicator::output::Progress;
//! use task_replicator::replicate::{Outcome, ReplicationOptions, Replicator};
//!
//! // A hub with one finished build of a package
//! let hub = MemoryHub::new();
//! let channel = hub.add_channel("default");
//! let tag = hub.add_tag("dist-x86_64", Some("x86_64"));
//! let repo = hub.add_repo(tag, RepoState::Ready);
//! let task = hub.add_build_task(channel, "git://example.com/pkg", Some(repo), false);
//!
//! let client = HubClient::new(Box::new(hub.clone()));
//! let replicator = Replicator::new(ReplicationOptions::default()).unwrap();
//! let outcome = replicator
//!     .replicate_one(&client, TaskRef::Id(task), &Progress::hidden(true))
//!     .unwrap();
//! assert!(matches!(outcome, Outcome::Replicated { .. }));
//! ```
//!
//! ## Core Concepts
//!
//! - **Hub (`hub`)**: the remote build system, reached through the
//!   [`hub::HubSession`] seam; calls can be batched with [`hub::Batch`].
//! - **Selection (`selector`)**: turns channel/host/method/state filters into
//!   batched task queries.
//! - **Repo resolution (`repository`, `cache`, `tags`)**: finds or generates
//!   the repo a replica builds against, either on the original tag (`reuse`)
//!   or on an isolated copy of its hierarchy (`clone`), memoized per run.
//! - **Replication (`replicate`, `pool`)**: rewrites and submits each task,
//!   spread over a fixed pool of workers with one hub session each.
//!
//! Configuration (`config`, `defaults`) and terminal output (`output`) are
//! shared by the CLI commands.

pub mod cache;
pub mod config;
pub mod defaults;
pub mod error;
pub mod hub;
pub mod model;
pub mod output;
pub mod pool;
pub mod replicate;
pub mod repository;
pub mod selector;
pub mod tags;
