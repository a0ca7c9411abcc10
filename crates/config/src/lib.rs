//! Configuration loading, validation, and management for DevAssist.
//!
//! Loads configuration from `~/.devassist/config.toml` with environment
//! variable overrides. Validates all settings at startup; a config that
//! fails validation is a programmer error and is reported, never patched.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The root configuration structure.
///
/// Maps directly to `~/.devassist/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Agent loop and dispatcher settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Volatile and durable store settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Task planner settings
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Model capability settings
    #[serde(default)]
    pub model: ModelConfig,
}

/// How the dispatcher chooses between one agent and the role pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Auto,
    Single,
    Multi,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Single => "single",
            Self::Multi => "multi",
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "single" => Ok(Self::Single),
            "multi" => Ok(Self::Multi),
            other => Err(ConfigError::ValidationError(format!(
                "unknown execution mode '{other}' (expected auto, single or multi)"
            ))),
        }
    }
}

/// When an agent loop stops before its iteration cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationKind {
    /// Run every iteration up to `max_iterations`
    #[default]
    RunToCap,
    /// Stop after the first successful observation
    StopOnSuccess,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default)]
    pub mode: ExecutionMode,

    /// Complexity score at or above which `auto` picks the role pipeline
    #[serde(default = "default_complexity_threshold")]
    pub complexity_threshold: f64,

    #[serde(default)]
    pub termination: TerminationKind,

    /// Built-in tools to enable. Empty = all.
    #[serde(default)]
    pub tools: Vec<String>,
}

fn default_max_iterations() -> u32 {
    10
}
fn default_complexity_threshold() -> f64 {
    7.0
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            mode: ExecutionMode::default(),
            complexity_threshold: default_complexity_threshold(),
            termination: TerminationKind::default(),
            tools: vec![],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub short_term: ShortTermConfig,

    #[serde(default)]
    pub long_term: LongTermConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortTermConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Seconds an item stays visible after creation
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_capacity() -> usize {
    1000
}
fn default_ttl_secs() -> u64 {
    3600
}

impl Default for ShortTermConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongTermConfig {
    /// Storage root; defaults to `~/.devassist/memory`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub index_in_memory: bool,

    #[serde(default = "default_max_items_per_category")]
    pub max_items_per_category: usize,
}

fn default_true() -> bool {
    true
}
fn default_max_items_per_category() -> usize {
    1000
}

impl Default for LongTermConfig {
    fn default() -> Self {
        Self {
            storage_path: None,
            index_in_memory: true,
            max_items_per_category: default_max_items_per_category(),
        }
    }
}

impl LongTermConfig {
    /// The configured storage root, or the default under the config dir.
    pub fn resolved_path(&self) -> PathBuf {
        self.storage_path
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("memory"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    #[serde(default = "default_domains")]
    pub domains: Vec<String>,
}

fn default_max_steps() -> usize {
    15
}
fn default_domains() -> Vec<String> {
    [
        "frontend",
        "backend",
        "database",
        "testing",
        "deployment",
        "infrastructure",
        "security",
        "documentation",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            domains: default_domains(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model() -> String {
    "claude-3-7-sonnet".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.devassist/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `DEVASSIST_MODE`
    /// - `DEVASSIST_MAX_ITERATIONS`
    /// - `DEVASSIST_MEMORY_PATH`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup("DEVASSIST_MODE") {
            self.agent.mode = mode.parse()?;
        }
        if let Some(raw) = lookup("DEVASSIST_MAX_ITERATIONS") {
            self.agent.max_iterations = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("DEVASSIST_MAX_ITERATIONS is not a number: {raw}"))
            })?;
        }
        if let Some(path) = lookup("DEVASSIST_MEMORY_PATH") {
            self.memory.long_term.storage_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".devassist")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError("agent.max_iterations must be at least 1".into()));
        }
        if !(0.0..=10.0).contains(&self.agent.complexity_threshold) {
            return Err(ConfigError::ValidationError(
                "agent.complexity_threshold must be between 0.0 and 10.0".into(),
            ));
        }
        if self.memory.short_term.capacity == 0 {
            return Err(ConfigError::ValidationError("memory.short_term.capacity must be > 0".into()));
        }
        if self.memory.short_term.ttl_secs == 0 {
            return Err(ConfigError::ValidationError("memory.short_term.ttl_secs must be > 0".into()));
        }
        if self.memory.long_term.max_items_per_category == 0 {
            return Err(ConfigError::ValidationError(
                "memory.long_term.max_items_per_category must be > 0".into(),
            ));
        }
        if self.planner.max_steps == 0 {
            return Err(ConfigError::ValidationError("planner.max_steps must be > 0".into()));
        }
        if self.model.temperature < 0.0 || self.model.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "model.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        Ok(())
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
