//! # Configuration File
//!
//! Settings that rarely change between runs live in a YAML file, by default
//! `<config_dir>/replicate-tasks/config.yaml` (see
//! [`crate::defaults::default_config_path`]):
//!
//! ```yaml
//! hub_url: https://koji.example.com/kojihub
//! workers: 4
//! poll_interval_secs: 5
//! strategy: reuse
//! limit: 3
//! include_scratch: false
//! ```
//!
//! Every key is optional. Command-line flags take precedence over the file;
//! the file takes precedence over built-in defaults. A missing file at the
//! default location is not an error, a missing file that was asked for
//! explicitly is.

use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::defaults;
use crate::error::{Error, Result};
use crate::model::Strategy;

/// Parsed configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Endpoint of the build hub's RPC interface.
    pub hub_url: Option<String>,
    pub workers: usize,
    pub poll_interval_secs: u64,
    pub strategy: Strategy,
    /// Tasks per query when selecting by filter.
    pub limit: u32,
    pub include_scratch: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hub_url: None,
            workers: defaults::WORKERS,
            poll_interval_secs: defaults::POLL_INTERVAL_SECS,
            strategy: Strategy::default(),
            limit: defaults::LIMIT,
            include_scratch: false,
        }
    }
}

impl Config {
    /// Parses and validates configuration YAML. Empty input yields defaults.
    pub fn parse(yaml_content: &str) -> Result<Self> {
        if yaml_content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(yaml_content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from `path`, or from the default location
    /// when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config {
                        message: format!("config file {} does not exist", path.display()),
                        hint: Some("check --config or REPLICATE_TASKS_CONFIG".to_string()),
                    });
                }
                Self::from_file(path)
            }
            None => {
                let path = defaults::default_config_path();
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    log::debug!("No config file at {}, using defaults", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        log::debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Checks values that parse but cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config {
                message: "workers must be at least 1".to_string(),
                hint: Some(format!("the default is {}", defaults::WORKERS)),
            });
        }
        if let Some(url) = &self.hub_url {
            parse_hub_url(url)?;
        }
        Ok(())
    }

    /// Replaces the hub URL, e.g. with one given on the command line.
    pub fn with_hub_url(mut self, hub_url: Option<String>) -> Self {
        if hub_url.is_some() {
            self.hub_url = hub_url;
        }
        self
    }

    /// The hub endpoint; it has no default and must be configured.
    pub fn hub_url(&self) -> Result<Url> {
        match &self.hub_url {
            Some(url) => parse_hub_url(url),
            None => Err(Error::Config {
                message: "no hub URL configured".to_string(),
                hint: Some(
                    "pass --hub-url, set REPLICATE_TASKS_HUB or add hub_url to the config file"
                        .to_string(),
                ),
            }),
        }
    }
}

fn parse_hub_url(input: &str) -> Result<Url> {
    let url = Url::parse(input).map_err(|e| Error::Config {
        message: format!("invalid hub URL '{}': {}", input, e),
        hint: None,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::Config {
            message: format!("unsupported hub URL scheme '{}'", other),
            hint: Some("use an http:// or https:// URL".to_string()),
        }),
    }
}
