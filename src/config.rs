//! Runtime settings.
//!
//! Values come from serde defaults, then an optional config file, then
//! `TOPOWATCH_*` environment variables. Nested keys use `__`, for example
//! `TOPOWATCH_REDACT__PSEUDONYMIZE=hname,uname`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::RedactError;
use crate::normalize::LayerPolicy;
use crate::redact::{RedactField, Redactor};

/// Console log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Fields to clear or pseudonymize before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactSettings {
    pub clear: Vec<RedactField>,
    pub pseudonymize: Vec<RedactField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// How often the snapshot source is polled.
    pub poll_interval_ms: u64,
    /// A snapshot JSON file, or a directory of them to replay.
    pub snapshot_path: PathBuf,
    /// Directory holding `machine_state_<host>.json` reports.
    pub feed_dir: Option<PathBuf>,
    pub feed_poll_interval_ms: u64,
    pub feed_channel_capacity: usize,
    /// Where each cycle report is written.
    pub output_path: Option<PathBuf>,
    pub layer_policy: LayerPolicy,
    pub log_format: LogFormat,
    pub redact: RedactSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            snapshot_path: PathBuf::from("monitor.json"),
            feed_dir: None,
            feed_poll_interval_ms: 1000,
            feed_channel_capacity: 256,
            output_path: None,
            layer_policy: LayerPolicy::Strict,
            log_format: LogFormat::Pretty,
            redact: RedactSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from `path` (if any) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(
                Environment::with_prefix("TOPOWATCH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("redact.clear")
                    .with_list_parse_key("redact.pseudonymize"),
            )
            .build()
            .context("failed to read configuration")?;

        config
            .try_deserialize()
            .context("invalid configuration")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn feed_poll_interval(&self) -> Duration {
        Duration::from_millis(self.feed_poll_interval_ms.max(1))
    }

    pub fn redactor(&self) -> Result<Redactor, RedactError> {
        Redactor::new(
            self.redact.clear.iter().copied(),
            self.redact.pseudonymize.iter().copied(),
        )
    }
}
