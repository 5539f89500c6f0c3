//! Shared test utilities for integration and E2E tests.
//!
//! This module provides common fixtures and helper functions to reduce
//! duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_config(configs::UNREACHABLE_HUB);
//!     fixture.command().arg("replicate").assert().failure();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;

use task_replicator::hub::memory::MemoryHub;
use task_replicator::hub::HubClient;
use task_replicator::model::{ChannelId, RepoId, RepoState, TagId};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    #[allow(unused_imports)]
    pub use super::{BuildHub, TestFixture};
}

/// Common configuration YAML snippets for testing.
#[allow(dead_code)]
pub mod configs {
    /// A hub URL nothing listens on; any remote call fails with a
    /// transport error.
    pub const UNREACHABLE_HUB: &str = "hub_url: http://127.0.0.1:9/kojihub\n";

    /// Unreachable hub with the clone strategy as default.
    pub const CLONE_STRATEGY: &str = "hub_url: http://127.0.0.1:9/kojihub\nstrategy: clone\n";

    /// Zero workers cannot drain anything.
    pub const NO_WORKERS: &str = "hub_url: http://127.0.0.1:9/kojihub\nworkers: 0\n";

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "invalid: yaml: content:";

    /// Well-formed YAML with a key the configuration does not know.
    pub const UNKNOWN_KEY: &str = "hub_url: http://127.0.0.1:9/kojihub\ncolour: red\n";
}

/// A temporary directory holding a `config.yaml`.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write `config.yaml` with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child("config.yaml")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("config.yaml")
    }

    /// A command running in the fixture directory, reading only the
    /// fixture's config and never a hub URL from the environment.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("replicate-tasks");
        cmd.current_dir(self.path())
            .env("REPLICATE_TASKS_CONFIG", self.config_path())
            .env_remove("REPLICATE_TASKS_HUB")
            .env_remove("RUST_LOG");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// An in-memory hub with one channel and a READY repo on `dist-x86_64`.
#[allow(dead_code)]
pub struct BuildHub {
    pub hub: MemoryHub,
    pub channel: ChannelId,
    pub tag: TagId,
    pub repo: RepoId,
}

#[allow(dead_code)]
impl BuildHub {
    pub fn new() -> Self {
        let hub = MemoryHub::new();
        let channel = hub.add_channel("default");
        let parent = hub.add_tag("dist-base", None);
        let tag = hub.add_tag("dist-x86_64", Some("x86_64"));
        hub.add_parent(tag, parent, 10);
        hub.add_package(parent, "bash", "admin");
        hub.add_package(tag, "gcc", "toolchain");
        hub.add_tagged_build(tag, "gcc", "gcc-14.1-1");
        let repo = hub.add_repo(tag, RepoState::Ready);
        Self {
            hub,
            channel,
            tag,
            repo,
        }
    }

    /// A client that polls without delay.
    pub fn client(&self) -> HubClient {
        HubClient::new(Box::new(self.hub.clone())).with_poll_interval(Duration::from_millis(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_with_config() {
        let fixture = TestFixture::new().with_config(configs::UNREACHABLE_HUB);
        assert!(fixture.config_path().exists());
    }

    #[test]
    fn test_invalid_yaml_is_actually_invalid() {
        let result = serde_yaml::from_str::<serde_yaml::Value>(configs::INVALID_YAML);
        assert!(result.is_err(), "INVALID_YAML should not parse");
    }
}
