//! # Output Configuration
//!
//! This module provides utilities for controlling CLI output appearance:
//! colour support based on terminal capabilities and user preferences, the
//! status markers used in summaries, and the [`Progress`] handle workers
//! print through.
//!
//! ## Respecting User Preferences
//!
//! The module respects the following environment variables and flags:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals
//!
//! ## Usage
//!
//! ```rust,ignore
//! use task_replicator::output::{OutputConfig, Status};
//!
//! let config = OutputConfig::from_env_and_flag("auto");
//! println!("{} 3 replicated", config.marker(Status::Ok));
//! ```

use std::env;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output configuration for controlling colors.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors should be used in output.
    pub use_color: bool,
}

/// Kind of a user-facing status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Skipped,
    Failed,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// # Arguments
    /// * `color_flag` - The value of the --color CLI flag: "always", "never", or "auto"
    ///
    /// In auto mode, colors are disabled if:
    /// - `NO_COLOR` environment variable is set (any value, including empty)
    /// - `CLICOLOR=0` is set
    /// - `TERM=dumb` is set
    /// - stdout is not a TTY (unless `CLICOLOR_FORCE=1`)
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    /// Detect whether color output is supported based on environment.
    fn detect_color_support() -> bool {
        // The presence of the variable (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    /// Create a configuration with colors always enabled.
    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    /// Create a configuration with colors always disabled.
    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }

    /// The marker printed in front of a status line.
    pub fn marker(&self, status: Status) -> String {
        let plain = match status {
            Status::Ok => "[OK]",
            Status::Skipped => "[SKIP]",
            Status::Failed => "[FAIL]",
        };
        if !self.use_color {
            return plain.to_string();
        }
        let styled = match status {
            Status::Ok => style(plain).green(),
            Status::Skipped => style(plain).yellow(),
            Status::Failed => style(plain).red().bold(),
        };
        styled.force_styling(true).to_string()
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Progress display shared by all workers of a run.
///
/// Lines go above the bar while it is drawn and straight to stdout
/// otherwise; with `quiet` nothing is printed at all.
#[derive(Debug, Clone)]
pub struct Progress {
    bar: ProgressBar,
    quiet: bool,
}

impl Progress {
    /// A bar over `len` items, drawn only on an interactive stderr.
    pub fn new(len: u64, quiet: bool) -> Self {
        if quiet || !console::Term::stderr().is_term() {
            return Self::hidden(quiet);
        }
        let bar = ProgressBar::new(len);
        let template = "{spinner} [{elapsed_precise}] {bar:30} {pos}/{len} tasks";
        bar.set_style(
            ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar, quiet }
    }

    /// No bar; lines are printed unless `quiet`.
    pub fn hidden(quiet: bool) -> Self {
        Self {
            bar: ProgressBar::hidden(),
            quiet,
        }
    }

    pub fn println<S: AsRef<str>>(&self, message: S) {
        if self.quiet {
            return;
        }
        if self.bar.is_hidden() {
            println!("{}", message.as_ref());
        } else {
            self.bar.println(message);
        }
    }

    pub fn inc(&self) {
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
