//! # Error Handling
//!
//! This module defines the centralized error type for `task-replicator`. It
//! uses `thiserror` to describe every failure mode the replication core can
//! run into, each variant carrying enough context to be logged on its own.
//!
//! ## Taxonomy
//!
//! - **Configuration errors** (`Config`): conflicting or invalid options,
//!   detected before any remote call is made. They abort the whole run.
//! - **Selection errors** (`NoTasks`): the task query matched nothing.
//! - **Remote errors** (`Fault`, `Transport`, `Decode`, `TaskFailed`): a call
//!   to the build hub failed. Inside a worker these are per-task failures.
//! - **Replication errors** (`Replication`): a task could not be replicated
//!   for a reason local to that task (malformed request, missing data).
//! - **Internal errors** (`CacheCorrupted`, `LockPoisoned`, `WorkerPool`).
//!
//! Conditions that merely mean "skip this task" are not errors; see
//! [`crate::replicate::SkipReason`].

use thiserror::Error;

use crate::model::{RepoId, TaskId, TaskState};

/// Main error type for task-replicator operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or conflicting options.
    ///
    /// Includes an optional hint describing how to fix the invocation.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// The task query returned no candidates.
    #[error("no tasks to replicate")]
    NoTasks,

    /// The hub answered a call with a fault.
    #[error("Remote fault in {method} ({code}): {message}")]
    Fault {
        method: String,
        code: i64,
        message: String,
    },

    /// The hub could not be reached or returned a malformed envelope.
    #[error("Transport error talking to {url}: {message}")]
    Transport { url: String, message: String },

    /// A call result did not have the expected shape.
    #[error("Could not decode result of {method}: {message}")]
    Decode { method: String, message: String },

    /// A remote task we waited on ended in a state other than CLOSED.
    #[error("Task {task_id} finished in state {state}")]
    TaskFailed { task_id: TaskId, state: TaskState },

    /// A single task could not be replicated.
    #[error("Task {task_id}: {message}")]
    Replication { task_id: TaskId, message: String },

    /// The repo cache contains a cycle or self-mapping.
    #[error("Repo cache corrupted at repo {repo_id}: {message}")]
    CacheCorrupted { repo_id: RepoId, message: String },

    /// A mutex guarding shared state was poisoned by a panicking worker.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// The worker pool could not be started.
    #[error("Worker pool error: {message}")]
    WorkerPool { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Shorthand for a [`Error::Config`] without a hint.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            hint: None,
        }
    }

    /// Shorthand for a [`Error::Replication`].
    pub fn replication(task_id: TaskId, message: impl Into<String>) -> Self {
        Error::Replication {
            task_id,
            message: message.into(),
        }
    }

    /// Whether this error belongs to the configuration class, i.e. was
    /// raised before any remote interaction.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config { .. })
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config() {
        let error = Error::config("Options --channel and --host conflict");
        let display = format!("{}", error);
        assert!(display.contains("Configuration error"));
        assert!(display.contains("--channel and --host"));
        assert!(!display.contains("hint:"));
    }

    #[test]
    fn test_error_display_config_with_hint() {
        let error = Error::Config {
            message: "--override-tag requires the clone strategy".to_string(),
            hint: Some("Add '--strategy clone'".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("hint:"));
        assert!(display.contains("--strategy clone"));
    }

    #[test]
    fn test_error_display_no_tasks() {
        assert_eq!(Error::NoTasks.to_string(), "no tasks to replicate");
    }

    #[test]
    fn test_error_display_fault() {
        let error = Error::Fault {
            method: "getTag".to_string(),
            code: 1000,
            message: "No such tag: missing".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("getTag"));
        assert!(display.contains("1000"));
        assert!(display.contains("No such tag"));
    }

    #[test]
    fn test_error_display_task_failed() {
        let error = Error::TaskFailed {
            task_id: 42,
            state: TaskState::Failed,
        };
        assert_eq!(error.to_string(), "Task 42 finished in state FAILED");
    }

    #[test]
    fn test_error_display_replication() {
        let error = Error::replication(7, "malformed build request");
        assert_eq!(error.to_string(), "Task 7: malformed build request");
    }

    #[test]
    fn test_is_config() {
        assert!(Error::config("bad").is_config());
        assert!(!Error::NoTasks.is_config());
    }

    #[test]
    fn test_error_from_yaml_error() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: [unclosed").unwrap_err();
        let error: Error = yaml_error.into();
        assert!(error.to_string().contains("YAML parsing error"));
    }

    #[test]
    fn test_error_from_url_error() {
        let url_error = url::Url::parse("not a url").unwrap_err();
        let error: Error = url_error.into();
        assert!(error.to_string().contains("URL parsing error"));
    }
}
