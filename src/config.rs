//! Configuration for Reflector.
//!
//! Settings are read from `reflector.toml` and layered: file → environment → CLI.
//!
//! # Configuration File Format
//!
//! ```toml
//! [storage]
//! log_dir = "logs"
//! compact_after = 64
//!
//! [backend]
//! kind = "claude"          # claude | ollama | command | mock
//! model = "sonnet"
//! command = "claude"       # program override; required for kind = "command"
//! args = []
//! thinking = false
//! prompt_as_arg = false
//!
//! [generation]
//! max_tokens = 1000
//! temperature = 0.7
//!
//! [explore]
//! seed = 42
//! max_explorations = 3
//! recent_limit = 5
//! per_entry = 2
//! ```
//!
//! # Environment
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `REFLECTOR_LOG_DIR` | `storage.log_dir` |
//! | `REFLECTOR_BACKEND` | `backend.kind` |
//! | `REFLECTOR_MODEL` | `backend.model` |
//! | `REFLECTOR_COMMAND` | `backend.command` |

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::backend::{BackendKind, BackendSettings, GenerateOptions};
use crate::store::DEFAULT_COMPACT_AFTER;

pub const CONFIG_FILE_NAME: &str = "reflector.toml";
pub const RESPONSES_FILE_NAME: &str = "responses.jsonl";
pub const EXPLORATIONS_FILE_NAME: &str = "explorations.jsonl";

/// Where logs live and how they are maintained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSection {
    /// Directory holding responses.jsonl and explorations.jsonl
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Superseded lines tolerated before automatic compaction (0 disables it)
    #[serde(default = "default_compact_after")]
    pub compact_after: usize,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_compact_after() -> usize {
    DEFAULT_COMPACT_AFTER
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            compact_after: default_compact_after(),
        }
    }
}

/// Exploration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExploreSection {
    /// Seed for exploration type selection; entropy when unset
    #[serde(default)]
    pub seed: Option<u64>,
    /// Default number of types picked by auto-explore
    #[serde(default = "default_max_explorations")]
    pub max_explorations: usize,
    /// Default number of recent entries auto-explored
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
    /// Default explorations per recent entry
    #[serde(default = "default_per_entry")]
    pub per_entry: usize,
}

fn default_max_explorations() -> usize {
    3
}

fn default_recent_limit() -> usize {
    5
}

fn default_per_entry() -> usize {
    2
}

impl Default for ExploreSection {
    fn default() -> Self {
        Self {
            seed: None,
            max_explorations: default_max_explorations(),
            recent_limit: default_recent_limit(),
            per_entry: default_per_entry(),
        }
    }
}

/// Contents of `reflector.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReflectorToml {
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub generation: GenerateOptions,
    #[serde(default)]
    pub explore: ExploreSection,
}

impl ReflectorToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse reflector.toml")
    }

    /// Load `reflector.toml` from `dir`, or defaults when it doesn't exist.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize reflector.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Human-readable warnings about suspicious settings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.storage.compact_after == 0 {
            warnings.push("storage.compact_after is 0: automatic compaction is disabled".to_string());
        }

        if self.backend.kind == BackendKind::Command && self.backend.command.is_none() {
            warnings.push("backend.command is required when backend.kind = \"command\"".to_string());
        }
        if self.backend.seed.is_some() && self.backend.kind != BackendKind::Mock {
            warnings.push(format!(
                "backend.seed only affects the mock backend (kind is '{}')",
                self.backend.kind
            ));
        }

        if let Some(temperature) = self.generation.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            warnings.push(format!(
                "generation.temperature {} is outside the usual 0.0-2.0 range",
                temperature
            ));
        }
        if self.generation.max_tokens == Some(0) {
            warnings.push("generation.max_tokens is 0".to_string());
        }

        if self.explore.max_explorations == 0 || self.explore.per_entry == 0 {
            warnings.push("explore.max_explorations and explore.per_entry should be at least 1".to_string());
        }

        warnings
    }
}

/// Values given on the command line; `None` keeps the lower layer's value.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub log_dir: Option<PathBuf>,
    pub backend: Option<String>,
    pub model: Option<String>,
}

/// Effective configuration after layering file, environment and CLI.
#[derive(Debug, Clone)]
pub struct ReflectorConfig {
    /// File the settings were read from, when one existed
    pub config_path: Option<PathBuf>,
    pub toml: ReflectorToml,
}

impl ReflectorConfig {
    /// Load from an explicit file (which must exist) or from `./reflector.toml` if present.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        match config_path {
            Some(path) => Ok(Self {
                config_path: Some(path.to_path_buf()),
                toml: ReflectorToml::load(path)?,
            }),
            None => {
                let default_path = PathBuf::from(CONFIG_FILE_NAME);
                let exists = default_path.exists();
                Ok(Self {
                    config_path: exists.then_some(default_path),
                    toml: ReflectorToml::load_or_default(Path::new("."))?,
                })
            }
        }
    }

    pub fn from_toml(toml: ReflectorToml) -> Self {
        Self {
            config_path: None,
            toml,
        }
    }

    /// Full resolution: file, then process environment, then CLI flags.
    pub fn resolve(config_path: Option<&Path>, cli: &CliOverrides) -> Result<Self> {
        Self::load(config_path)?
            .with_env(|key| std::env::var(key).ok())?
            .with_cli(cli)
    }

    /// Apply `REFLECTOR_*` overrides read through `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = lookup("REFLECTOR_LOG_DIR") {
            self.toml.storage.log_dir = PathBuf::from(dir);
        }
        if let Some(kind) = lookup("REFLECTOR_BACKEND") {
            self.toml.backend.kind = kind.parse().context("Invalid REFLECTOR_BACKEND")?;
        }
        if let Some(model) = lookup("REFLECTOR_MODEL") {
            self.toml.backend.model = Some(model);
        }
        if let Some(command) = lookup("REFLECTOR_COMMAND") {
            self.toml.backend.command = Some(command);
        }
        Ok(self)
    }

    pub fn with_cli(mut self, cli: &CliOverrides) -> Result<Self> {
        if let Some(dir) = &cli.log_dir {
            self.toml.storage.log_dir = dir.clone();
        }
        if let Some(kind) = &cli.backend {
            self.toml.backend.kind = kind.parse().context("Invalid --backend")?;
        }
        if let Some(model) = &cli.model {
            self.toml.backend.model = Some(model.clone());
        }
        Ok(self)
    }

    pub fn log_dir(&self) -> &Path {
        &self.toml.storage.log_dir
    }

    pub fn responses_path(&self) -> PathBuf {
        self.log_dir().join(RESPONSES_FILE_NAME)
    }

    pub fn explorations_path(&self) -> PathBuf {
        self.log_dir().join(EXPLORATIONS_FILE_NAME)
    }

    pub fn compact_after(&self) -> usize {
        self.toml.storage.compact_after
    }

    pub fn backend(&self) -> &BackendSettings {
        &self.toml.backend
    }

    pub fn generation(&self) -> GenerateOptions {
        self.toml.generation
    }

    pub fn explore(&self) -> &ExploreSection {
        &self.toml.explore
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
