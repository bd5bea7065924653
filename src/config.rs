use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{ScoutError, ScoutResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub oracle: OracleConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub actions: ActionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Full chat-completions endpoint URL.
    pub api_base: String,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Optional API key stored in config.toml (the DROIDSCOUT_API_KEY
    /// environment variable takes precedence).
    #[serde(default)]
    pub api_key: Option<String>,
}

impl OracleConfig {
    pub fn resolve_api_key(&self) -> ScoutResult<String> {
        if let Ok(key) = std::env::var("DROIDSCOUT_API_KEY") {
            if !key.is_empty() {
                return Ok(key);
            }
        }
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ScoutError::Config(
                    "no oracle API key: set DROIDSCOUT_API_KEY or [oracle].api_key".into(),
                )
            })
    }
}

fn default_temperature() -> f64 {
    0.1
}

fn default_max_tokens() -> u32 {
    1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    /// Pause between rounds, a courtesy to the oracle transport.
    #[serde(default = "default_request_interval")]
    pub request_interval_secs: u64,
    /// Where per-task artifact directories are created. Defaults to the
    /// platform data directory.
    #[serde(default)]
    pub root_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            request_interval_secs: default_request_interval(),
            root_dir: None,
        }
    }
}

fn default_max_rounds() -> u32 {
    20
}

fn default_request_interval() -> u64 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_adb_path")]
    pub adb_path: String,
    /// Device serial. When absent and exactly one device is attached, that
    /// device is used; otherwise the operator is asked.
    #[serde(default)]
    pub serial: Option<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            adb_path: default_adb_path(),
            serial: None,
        }
    }
}

fn default_adb_path() -> String {
    "adb".into()
}

/// Which actions the prompt offers to the oracle. The dispatcher itself
/// supports every action uniformly in both addressing modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionsConfig {
    #[serde(default = "default_true")]
    pub enable_long_press: bool,
    #[serde(default = "default_true")]
    pub enable_swipe: bool,
    #[serde(default = "default_true")]
    pub enable_grid: bool,
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            enable_long_press: true,
            enable_swipe: true,
            enable_grid: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn resolve_config_path(explicit: Option<&Path>) -> ScoutResult<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(ScoutError::Config(format!(
            "config file not found: {}",
            path.display()
        )));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(ScoutError::Config(
        "config.toml not found next to executable or in working directory".into(),
    ))
}

pub fn load_config(explicit: Option<&Path>) -> ScoutResult<AppConfig> {
    let path = resolve_config_path(explicit)?;
    let content = std::fs::read_to_string(&path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), model = %config.oracle.model, "config loaded");
    Ok(config)
}
