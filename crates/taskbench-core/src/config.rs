//! Configuration types for taskbench.
//!
//! [`Config::load`] layers an optional user TOML file and command-line
//! overrides over the embedded defaults. [`Config::defaults`] returns the
//! defaults alone (useful in tests).
//!
//! Free-form benchmark properties live under `[props]`. A property given as
//! an array is a *by-round* property: [`Config::get`] picks element
//! `round % len`, and [`Config::new_round`] advances the round.

use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::info;

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[log]
step      = 1000
max_depth = 0

[log.task_steps]

[report]
time_step_msec = 0

[content]
source         = "single"
forever        = true
docs_file      = ""
generated_docs = 1000
doc_size       = 0

[props]
"#;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level benchmark configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    props: HashMap<String, config::Value>,
    #[serde(skip)]
    round: AtomicU32,
}

/// `[log]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Emit a progress line every `step` completions; `<= 0` disables.
    #[serde(default = "default_log_step")]
    pub step: i64,
    /// Log "starting" lines for tasks at or above this depth.
    #[serde(default)]
    pub max_depth: usize,
    /// Per-task overrides of `step`, keyed by task name.
    #[serde(default)]
    pub task_steps: HashMap<String, i64>,
}

fn default_log_step() -> i64 { 1000 }

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            step: default_log_step(),
            max_depth: 0,
            task_steps: HashMap::new(),
        }
    }
}

/// `[report]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportConfig {
    /// Width of per-sequence throughput buckets in milliseconds; 0 disables.
    #[serde(default)]
    pub time_step_msec: u64,
}

/// `[content]` section: which document feed tasks read from.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    #[serde(default = "default_source")]
    pub source: String,
    /// Rewind instead of reporting exhaustion when the feed runs out.
    #[serde(default = "default_forever")]
    pub forever: bool,
    #[serde(default)]
    pub docs_file: String,
    #[serde(default = "default_generated_docs")]
    pub generated_docs: usize,
    /// Truncate document bodies to this many bytes; 0 keeps them whole.
    #[serde(default)]
    pub doc_size: usize,
}

fn default_source() -> String { "single".to_string() }
fn default_forever() -> bool { true }
fn default_generated_docs() -> usize { 1000 }

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            forever: default_forever(),
            docs_file: String::new(),
            generated_docs: default_generated_docs(),
            doc_size: 0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Defaults, then `path` (if given), then `key=value` overrides such as
    /// `content.source=line` or `props.merge_factor=10`.
    pub fn load(path: Option<&Path>, overrides: &[(String, String)]) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml));
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        for (key, value) in overrides {
            builder = builder.set_override(key.as_str(), value.as_str())?;
        }
        builder.build()?.try_deserialize().map_err(Into::into)
    }

    /// Defaults layered under an inline TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Ok(config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }

    // -----------------------------------------------------------------------
    // Rounds and properties
    // -----------------------------------------------------------------------

    pub fn round(&self) -> u32 {
        self.round.load(Ordering::Acquire)
    }

    /// Advance to the next round and log every by-round property whose value
    /// changes. Returns the new round number.
    pub fn new_round(&self) -> u32 {
        let previous = self.round.fetch_add(1, Ordering::AcqRel);
        let round = previous + 1;

        let mut names: Vec<&String> = self.props.keys().collect();
        names.sort();
        for name in names {
            let Some(values) = self.round_values(name) else {
                continue;
            };
            let before = display_value(&values[previous as usize % values.len()]);
            let after = display_value(&values[round as usize % values.len()]);
            if before != after {
                info!(round, property = %name, from = %before, to = %after, "by-round property changed");
            }
        }
        round
    }

    /// Typed lookup of a `[props]` entry, case-insensitive on the name.
    /// Missing properties yield `default`.
    pub fn get<T: FromStr>(&self, name: &str, default: T) -> Result<T, ConfigError> {
        let Some(value) = self.prop(name) else {
            return Ok(default);
        };
        let value = match self.round_values(name) {
            Some(values) => values[self.round() as usize % values.len()].clone(),
            None => value.clone(),
        };
        let text = display_value(&value);
        text.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value: text,
        })
    }

    /// `true` if `[props]` defines `name`.
    pub fn has_prop(&self, name: &str) -> bool {
        self.prop(name).is_some()
    }

    /// Progress-log step for `task_name`: the per-task override if present,
    /// else `log.step`.
    pub fn log_step_for(&self, task_name: &str) -> i64 {
        self.log
            .task_steps
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(task_name))
            .map(|(_, v)| *v)
            .unwrap_or(self.log.step)
    }

    fn prop(&self, name: &str) -> Option<&config::Value> {
        self.props
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    fn round_values(&self, name: &str) -> Option<Vec<config::Value>> {
        let values = self.prop(name)?.clone().into_array().ok()?;
        (!values.is_empty()).then_some(values)
    }
}

fn display_value(value: &config::Value) -> String {
    value
        .clone()
        .into_string()
        .unwrap_or_else(|_| value.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
