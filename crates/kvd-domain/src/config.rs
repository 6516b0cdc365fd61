use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_port")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: d_port(),
            host: d_host(),
        }
    }
}

fn d_port() -> u16 {
    6502
}
fn d_host() -> String {
    "127.0.0.1".into()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Model selection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Which `ModelRuntime` adapter the gateway loads, and which of the two
/// canonical sampling presets (rwkv / mamba) seeds the starting profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Rwkv,
    Mamba,
    Mock,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModelKind::Rwkv => "rwkv",
            ModelKind::Mamba => "mamba",
            ModelKind::Mock => "mock",
        };
        write!(f, "{s}")
    }
}

impl Default for ModelKind {
    fn default() -> Self {
        ModelKind::Rwkv
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub kind: ModelKind,
    /// Path to the on-disk model file the adapter loads at startup.
    /// The mock adapter ignores this.
    #[serde(default)]
    pub model_path: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            kind: ModelKind::default(),
            model_path: None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Generation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Character budget M (spec.md §4.4). Defaults follow the RWKV variant;
    /// the mamba preset halves it per spec.md §3.
    #[serde(default = "d_max_chars")]
    pub max_chars: usize,
    /// Ceiling on a single frame payload before FrameTooLarge is raised.
    #[serde(default = "d_frame_ceiling")]
    pub frame_ceiling_bytes: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_chars: d_max_chars(),
            frame_ceiling_bytes: d_frame_ceiling(),
        }
    }
}

fn d_max_chars() -> usize {
    8192
}
fn d_frame_ceiling() -> usize {
    16 * 1024 * 1024
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Paths
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "d_snapshot_path")]
    pub default_snapshot: String,
    #[serde(default = "d_profile_path")]
    pub default_profile: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            default_snapshot: d_snapshot_path(),
            default_profile: d_profile_path(),
        }
    }
}

fn d_snapshot_path() -> String {
    "kv.pkl".into()
}
fn d_profile_path() -> String {
    "set.json".into()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Logging
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "d_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: d_log_level(),
            json: false,
        }
    }
}

fn d_log_level() -> String {
    "info".into()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues. An empty
    /// vec means everything looks good. This is advisory diagnostics, not
    /// schema enforcement (spec.md Non-goals).
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }

        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }

        if self.generation.max_chars == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "generation.max_chars".into(),
                message: "max_chars must be greater than 0".into(),
            });
        }

        if matches!(self.model.kind, ModelKind::Rwkv | ModelKind::Mamba)
            && self.model.model_path.is_none()
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "model.model_path".into(),
                message: format!(
                    "model.kind = \"{}\" but no model_path configured",
                    self.model.kind
                ),
            });
        }

        if self.paths.default_snapshot.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "paths.default_snapshot".into(),
                message: "default_snapshot must not be empty".into(),
            });
        }

        if self.paths.default_profile.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "paths.default_profile".into(),
                message: "default_profile must not be empty".into(),
            });
        }

        errors
    }
}
