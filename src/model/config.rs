use crate::dialects::DatabaseVersion;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use toml::{Table, Value};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub dialect: DialectSettings,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub properties: PropertyOverrides,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialectSettings {
    #[serde(default = "default_dialect")]
    pub name: String,

    /// Backend version; the dialect's default version when unset
    pub version: Option<String>,

    /// TOML files layered over the dialect definition, in order
    #[serde(default)]
    pub patches: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_colored")]
    pub colored: bool,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Overrides for a dialect's default properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PropertyOverrides {
    pub use_sql_comments: Option<bool>,
    pub statement_batch_size: Option<u32>,
    pub use_streams_for_binary: Option<bool>,
}

/// An override file (`config/{env}.toml`, `config/local.toml`). Only the
/// values it actually sets are applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigOverlay {
    #[serde(default)]
    pub dialect: DialectOverlay,

    #[serde(default)]
    pub logging: LoggingOverlay,

    #[serde(default)]
    pub properties: PropertyOverrides,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DialectOverlay {
    pub name: Option<String>,
    pub version: Option<String>,

    /// Appended after the patches already configured
    #[serde(default)]
    pub patches: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingOverlay {
    pub level: Option<String>,
    pub colored: Option<bool>,
    pub format: Option<String>,
}

// Default values
fn default_dialect() -> String {
    "generic".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_colored() -> bool {
    true
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for DialectSettings {
    fn default() -> Self {
        Self {
            name: default_dialect(),
            version: None,
            patches: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            colored: default_colored(),
            format: default_log_format(),
        }
    }
}

impl DialectSettings {
    /// The configured backend version, parsed
    pub fn parsed_version(&self) -> Result<Option<DatabaseVersion>, ConfigError> {
        self.version
            .as_deref()
            .map(|v| {
                v.parse::<DatabaseVersion>()
                    .map_err(|e| ConfigError::InvalidValue("dialect.version".to_string(), e.to_string()))
            })
            .transpose()
    }

    /// Read and parse every patch file
    pub fn load_patches(&self) -> Result<Vec<Table>, ConfigError> {
        self.patches
            .iter()
            .map(|path| {
                debug!("Loading dialect patch: {}", path);
                let content = fs::read_to_string(path)
                    .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
                toml::from_str::<Table>(&content)
                    .map_err(|e| ConfigError::Parse(path.to_string(), e.to_string()))
            })
            .collect()
    }
}

impl PropertyOverrides {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// A dialect patch carrying only the overridden properties
    pub fn to_patch(&self) -> Table {
        let mut properties = Table::new();
        if let Some(value) = self.use_sql_comments {
            properties.insert("use_sql_comments".to_string(), Value::Boolean(value));
        }
        if let Some(value) = self.statement_batch_size {
            properties.insert("statement_batch_size".to_string(), Value::Integer(value.into()));
        }
        if let Some(value) = self.use_streams_for_binary {
            properties.insert("use_streams_for_binary".to_string(), Value::Boolean(value));
        }

        let mut patch = Table::new();
        if !properties.is_empty() {
            patch.insert("properties".to_string(), Value::Table(properties));
        }
        patch
    }

    /// Merge with another, with the other taking precedence where set
    fn merge(self, other: Self) -> Self {
        Self {
            use_sql_comments: other.use_sql_comments.or(self.use_sql_comments),
            statement_batch_size: other.statement_batch_size.or(self.statement_batch_size),
            use_streams_for_binary: other.use_streams_for_binary.or(self.use_streams_for_binary),
        }
    }
}

impl Config {
    /// Load configuration from file with environment override support
    pub fn load(config_path: Option<&str>, environment: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // Load base configuration file
        if let Some(path) = config_path {
            config = Self::load_from_file(path)?;
        } else {
            // Try loading from standard locations
            for standard_path in Self::standard_config_paths() {
                if standard_path.exists() {
                    debug!("Loading config from: {}", standard_path.display());
                    config = Self::load_from_file(&standard_path.to_string_lossy())?;
                    break;
                }
            }
        }

        // Load environment-specific overrides
        if let Some(env) = environment {
            if let Some(overlay) = Self::load_environment_config(env)? {
                debug!("Applying environment config for: {}", env);
                config = config.merge(overlay);
            }
        }

        // Load local overrides (always last)
        if let Some(overlay) = Self::load_overlay("config/local.toml")? {
            debug!("Applying local config overrides");
            config = config.merge(overlay);
        }

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_string(), e.to_string()))
    }

    /// Load an override file; a missing file is skipped, anything else is an error
    pub fn load_overlay(path: &str) -> Result<Option<ConfigOverlay>, ConfigError> {
        if !Path::new(path).exists() {
            debug!("No override file at {}", path);
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        toml::from_str(&content)
            .map(Some)
            .map_err(|e| ConfigError::Parse(path.to_string(), e.to_string()))
    }

    /// Load environment-specific configuration
    fn load_environment_config(environment: &str) -> Result<Option<ConfigOverlay>, ConfigError> {
        let env_path = format!("config/{}.toml", environment);
        Self::load_overlay(&env_path)
    }

    /// Get standard configuration file paths in order of precedence
    fn standard_config_paths() -> Vec<PathBuf> {
        vec![
            PathBuf::from("config.toml"),
            PathBuf::from("config/default.toml"),
        ]
    }

    /// Apply an override file; values it leaves unset keep their current setting
    pub fn merge(mut self, overlay: ConfigOverlay) -> Self {
        // Merge dialect settings
        if let Some(name) = overlay.dialect.name {
            self.dialect.name = name;
        }
        if let Some(version) = overlay.dialect.version {
            self.dialect.version = Some(version);
        }
        self.dialect.patches.extend(overlay.dialect.patches);

        // Merge logging config
        if let Some(level) = overlay.logging.level {
            self.logging.level = level;
        }
        if let Some(colored) = overlay.logging.colored {
            self.logging.colored = colored;
        }
        if let Some(format) = overlay.logging.format {
            self.logging.format = format;
        }

        self.properties = self.properties.merge(overlay.properties);

        self
    }

    /// Every patch to layer over the dialect definition: patch files, then
    /// property overrides
    pub fn dialect_patches(&self) -> Result<Vec<Table>, ConfigError> {
        let mut patches = self.dialect.load_patches()?;
        if !self.properties.is_empty() {
            patches.push(self.properties.to_patch());
        }
        Ok(patches)
    }

    /// Generate a default configuration file
    pub fn generate_default_config(path: &str) -> Result<(), ConfigError> {
        let config = Config::default();
        let toml_content =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::write(path, toml_content)
            .map_err(|e| ConfigError::FileWrite(path.to_string(), e.to_string()))?;

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}': {1}")]
    FileRead(String, String),

    #[error("Failed to parse config file '{0}': {1}")]
    Parse(String, String),

    #[error("Failed to write config file '{0}': {1}")]
    FileWrite(String, String),

    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("Invalid value for '{0}': {1}")]
    InvalidValue(String, String),
}
