//! Robot configuration.

use crate::errors::RobotError;
use crate::workflow::WorkflowOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration, loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotConfig {
    /// Folder whose sub-folders are tickets.
    pub input_folder_path: PathBuf,

    /// YAML mapping of organization title to ppud code.
    pub organizations_file: PathBuf,

    /// One of trace, debug, info, warn, error. `LOG_LEVEL` overrides it.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Daily log files kept on disk.
    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: usize,

    /// Profile file copied into the LanDocs profile folder before launch.
    #[serde(default)]
    pub landocs_custom_profile: Option<PathBuf>,

    #[serde(default)]
    pub landocs_profile_folder: Option<PathBuf>,

    /// LanDocs executable.
    #[serde(default)]
    pub landocs_app_path: Option<PathBuf>,

    /// Name typed into the signer field.
    #[serde(default)]
    pub signatory: String,

    /// External spreadsheet converter.
    #[serde(default)]
    pub converter: ConverterConfig,

    #[serde(default)]
    pub timings: TimingsConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_retention_days() -> usize {
    30
}

/// Command used to convert one spreadsheet, with `{input}`, `{output}` and
/// `{outdir}` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    #[serde(default = "default_converter_program")]
    pub program: String,

    #[serde(default = "default_converter_args")]
    pub args: Vec<String>,

    #[serde(default = "default_converter_timeout")]
    pub timeout_secs: u64,
}

fn default_converter_program() -> String {
    "soffice".to_string()
}

fn default_converter_args() -> Vec<String> {
    ["--headless", "--convert-to", "pdf", "--outdir", "{outdir}", "{input}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_converter_timeout() -> u64 {
    120
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: default_converter_program(),
            args: default_converter_args(),
            timeout_secs: default_converter_timeout(),
        }
    }
}

/// Timing knobs, in milliseconds unless the name says otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingsConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Hard cap on one programmatic invoke.
    #[serde(default = "default_invoke_timeout")]
    pub invoke_timeout_ms: u64,

    /// How long to wait for the main window after launch.
    #[serde(default = "default_app_window_timeout")]
    pub app_window_timeout_secs: u64,

    #[serde(default = "default_app_window_poll")]
    pub app_window_poll_ms: u64,

    /// Pause after the main window appears.
    #[serde(default = "default_app_settle")]
    pub app_settle_ms: u64,

    /// Multiplier for the fixed pauses of the workflow.
    #[serde(default = "default_pause_scale")]
    pub pause_scale: f64,
}

fn default_poll_interval() -> u64 {
    500
}

fn default_invoke_timeout() -> u64 {
    5000
}

fn default_app_window_timeout() -> u64 {
    300
}

fn default_app_window_poll() -> u64 {
    1000
}

fn default_app_settle() -> u64 {
    5000
}

fn default_pause_scale() -> f64 {
    1.0
}

impl Default for TimingsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            invoke_timeout_ms: default_invoke_timeout(),
            app_window_timeout_secs: default_app_window_timeout(),
            app_window_poll_ms: default_app_window_poll(),
            app_settle_ms: default_app_settle(),
            pause_scale: default_pause_scale(),
        }
    }
}

impl TimingsConfig {
    pub fn workflow_options(&self) -> WorkflowOptions {
        WorkflowOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            invoke_timeout: Duration::from_millis(self.invoke_timeout_ms),
            pause_scale: self.pause_scale,
            ..WorkflowOptions::default()
        }
    }
}

impl RobotConfig {
    /// Minimal configuration for the given folders; everything else defaults.
    pub fn new(input_folder_path: impl Into<PathBuf>, organizations_file: impl Into<PathBuf>) -> Self {
        Self {
            input_folder_path: input_folder_path.into(),
            organizations_file: organizations_file.into(),
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            log_retention_days: default_log_retention_days(),
            landocs_custom_profile: None,
            landocs_profile_folder: None,
            landocs_app_path: None,
            signatory: String::new(),
            converter: ConverterConfig::default(),
            timings: TimingsConfig::default(),
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self, RobotError> {
        serde_yaml::from_str(text).map_err(|e| RobotError::Config(format!("invalid config: {e}")))
    }

    /// Reads and parses a config file. Relative paths inside it are kept as written.
    pub fn load(path: &Path) -> Result<Self, RobotError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| RobotError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml(&text)
    }
}

/// Organization title -> ppud code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationMap {
    entries: BTreeMap<String, String>,
}

impl OrganizationMap {
    pub fn from_yaml(text: &str) -> Result<Self, RobotError> {
        serde_yaml::from_str(text)
            .map_err(|e| RobotError::Config(format!("invalid organization map: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, RobotError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RobotError::Config(format!("cannot read organization map {}: {e}", path.display()))
        })?;
        Self::from_yaml(&text)
    }

    /// Exact match first, then a trimmed case-insensitive one.
    pub fn ppud_for(&self, organization: &str) -> Option<String> {
        if let Some(code) = self.entries.get(organization) {
            return Some(code.trim().to_string());
        }
        let wanted = organization.trim().to_lowercase();
        self.entries
            .iter()
            .find(|(title, _)| title.trim().to_lowercase() == wanted)
            .map(|(_, code)| code.trim().to_string())
    }

    pub fn insert(&mut self, organization: impl Into<String>, ppud: impl Into<String>) {
        self.entries.insert(organization.into(), ppud.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
