//! Default values for task-replicator configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Number of concurrent replication workers.
pub const WORKERS: usize = 4;

/// Seconds between polls while waiting on a remote task.
pub const POLL_INTERVAL_SECS: u64 = 5;

/// Maximum tasks per channel/host/method query.
pub const LIMIT: u32 = 3;

/// State selected when no `--state` is given.
pub const STATE: &str = "CLOSED";

/// Returns the default configuration file path.
///
/// Uses the platform-appropriate configuration directory:
/// - Linux: `~/.config/replicate-tasks/config.yaml` (XDG Base Directory)
/// - macOS: `~/Library/Application Support/replicate-tasks/config.yaml`
/// - Windows: `{FOLDERID_RoamingAppData}\replicate-tasks\config.yaml`
///
/// Falls back to `.replicate-tasks.yaml` in the current directory if the
/// platform configuration directory cannot be determined.
///
/// This can be overridden by the `--config` CLI flag or the
/// `REPLICATE_TASKS_CONFIG` environment variable.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("replicate-tasks").join("config.yaml"))
        .unwrap_or_else(|| PathBuf::from(".replicate-tasks.yaml"))
}
