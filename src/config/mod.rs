// ABOUTME: Configuration types and parsing for tagflip.yml.
// ABOUTME: Handles YAML parsing, env var interpolation and env overrides.

mod env_value;
mod init;

pub use env_value::EnvValue;
pub use init::init_config;

use crate::control::{
    ControlSettings, DEFAULT_MUTABLE_TAG, DEFAULT_WINDOW, DebounceMode, MIN_HISTORY_DEPTH,
};
use crate::error::{Error, Result};
use nonempty::NonEmpty;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "tagflip.yml";
pub const CONFIG_FILENAME_ALT: &str = "tagflip.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".tagflip/config.yml";

pub const ENV_PIPELINE_NAME: &str = "TAGFLIP_PIPELINE_NAME";
pub const ENV_RECORD_STORE: &str = "TAGFLIP_RECORD_STORE";
pub const ENV_REGISTRY_ENDPOINT: &str = "TAGFLIP_REGISTRY_ENDPOINT";
pub const ENV_WINDOW_SECONDS: &str = "TAGFLIP_SELF_TRIGGER_WINDOW_SECONDS";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub records: RecordsConfig,

    #[serde(default)]
    pub debounce: DebounceConfig,

    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub name: EnvValue,

    /// Command run for each pipeline run.
    #[serde(deserialize_with = "deserialize_command")]
    pub command: NonEmpty<String>,

    #[serde(default = "default_history_depth")]
    pub history_depth: usize,

    /// Runs that never report an exit code are considered dead after this.
    #[serde(default = "default_stale_after", with = "humantime_serde")]
    pub stale_after: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Docker-API endpoint; local daemon defaults when unset.
    #[serde(default)]
    pub endpoint: Option<EnvValue>,

    #[serde(default = "default_mutable_tag")]
    pub mutable_tag: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            mutable_tag: default_mutable_tag(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordsConfig {
    #[serde(default = "default_records_name")]
    pub name: EnvValue,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            name: default_records_name(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DebounceConfig {
    #[serde(default = "default_window", with = "humantime_serde")]
    pub window: Duration,

    #[serde(default)]
    pub mode: DebounceMode,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            mode: DebounceMode::default(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".tagflip")
}

fn default_history_depth() -> usize {
    MIN_HISTORY_DEPTH
}

fn default_stale_after() -> Duration {
    Duration::from_secs(3600)
}

fn default_mutable_tag() -> String {
    DEFAULT_MUTABLE_TAG.to_string()
}

fn default_records_name() -> EnvValue {
    EnvValue::literal("history")
}

fn default_window() -> Duration {
    DEFAULT_WINDOW
}

fn deserialize_command<'de, D>(deserializer: D) -> std::result::Result<NonEmpty<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let argv: Vec<String> = Vec::deserialize(deserializer)?;
    NonEmpty::from_vec(argv)
        .ok_or_else(|| serde::de::Error::custom("pipeline command cannot be empty"))
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!("Using configuration {}", path.display());
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn validate(&self) -> Result<()> {
        let tag = self.registry.mutable_tag.trim();
        if tag.is_empty() {
            return Err(Error::InvalidConfig(
                "registry.mutable_tag cannot be empty".to_string(),
            ));
        }
        if tag.chars().any(|c| c.is_ascii_digit()) {
            return Err(Error::InvalidConfig(format!(
                "registry.mutable_tag `{tag}` must not contain digits"
            )));
        }
        Ok(())
    }

    /// Apply `TAGFLIP_*` environment overrides on top of the file values.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(name) = std::env::var(ENV_PIPELINE_NAME) {
            self.pipeline.name = EnvValue::literal(name);
        }
        if let Ok(name) = std::env::var(ENV_RECORD_STORE) {
            self.records.name = EnvValue::literal(name);
        }
        if let Ok(endpoint) = std::env::var(ENV_REGISTRY_ENDPOINT) {
            self.registry.endpoint = Some(EnvValue::literal(endpoint));
        }
        if let Ok(secs) = std::env::var(ENV_WINDOW_SECONDS) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::InvalidConfig(format!(
                    "{ENV_WINDOW_SECONDS} must be a whole number of seconds, got `{secs}`"
                ))
            })?;
            self.debounce.window = Duration::from_secs(secs);
        }
        Ok(self)
    }

    /// Settings for the controller, with env references resolved.
    pub fn control_settings(&self) -> Result<ControlSettings> {
        Ok(ControlSettings {
            pipeline: self.pipeline.name.resolve_non_empty("pipeline.name")?,
            history_depth: self.pipeline.history_depth.max(MIN_HISTORY_DEPTH),
            mutable_tag: self.registry.mutable_tag.trim().to_string(),
            window: self.debounce.window,
            debounce: self.debounce.mode,
        })
    }

    pub fn records_name(&self) -> Result<String> {
        let name = self.records.name.resolve_non_empty("records.name")?;
        if name.contains('/') || name.contains('\\') || name.starts_with('.') {
            return Err(Error::InvalidConfig(format!(
                "records.name `{name}` must be a plain file name"
            )));
        }
        Ok(name)
    }

    pub fn registry_endpoint(&self) -> Result<Option<String>> {
        self.registry
            .endpoint
            .as_ref()
            .map(|e| e.resolve_non_empty("registry.endpoint"))
            .transpose()
    }

    /// State directory, relative paths taken from `base`.
    pub fn state_dir(&self, base: &Path) -> PathBuf {
        if self.state_dir.is_absolute() {
            self.state_dir.clone()
        } else {
            base.join(&self.state_dir)
        }
    }

    pub fn template(pipeline: &str) -> Self {
        Config {
            pipeline: PipelineConfig {
                name: EnvValue::literal(pipeline),
                command: NonEmpty::new("./deploy.sh".to_string()),
                history_depth: default_history_depth(),
                stale_after: default_stale_after(),
            },
            registry: RegistryConfig::default(),
            records: RecordsConfig::default(),
            debounce: DebounceConfig::default(),
            state_dir: default_state_dir(),
        }
    }
}
