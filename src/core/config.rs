//! Configuration management with layered hierarchy

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::EntityKind;

/// Which resolution policy an import runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    /// Ask the operator through terminal menus
    Interactive,
    /// Fall back to fixed default entities, never prompt
    Default,
}

impl std::str::FromStr for ResolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "interactive" => Ok(ResolverKind::Interactive),
            "default" => Ok(ResolverKind::Default),
            other => Err(format!(
                "unknown resolver '{}' (expected 'interactive' or 'default')",
                other
            )),
        }
    }
}

/// Fixed names the Default Resolver substitutes for nameless requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultNames {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datafile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datafile_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy: Option<String>,
}

impl DefaultNames {
    /// Get the default name for a kind
    pub fn name(&self, kind: EntityKind) -> &str {
        let configured = match kind {
            EntityKind::Platform => &self.platform,
            EntityKind::Sensor => &self.sensor,
            EntityKind::Datafile => &self.datafile,
            EntityKind::Nationality => &self.nationality,
            EntityKind::PlatformType => &self.platform_type,
            EntityKind::SensorType => &self.sensor_type,
            EntityKind::DatafileType => &self.datafile_type,
            EntityKind::Privacy => &self.privacy,
        };
        configured
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| Self::builtin(kind))
    }

    /// Built-in default name for a kind
    pub fn builtin(kind: EntityKind) -> &'static str {
        match kind {
            EntityKind::Platform => "PLATFORM-1",
            EntityKind::Sensor => "SENSOR-1",
            EntityKind::Datafile => "DATAFILE-1",
            EntityKind::Nationality => "UK",
            EntityKind::PlatformType => "Warship",
            EntityKind::SensorType => "Position",
            EntityKind::DatafileType => "DATAFILE-TYPE-1",
            EntityKind::Privacy => "PRIVACY-1",
        }
    }

    fn merge(&mut self, other: DefaultNames) {
        let DefaultNames {
            platform,
            sensor,
            datafile,
            nationality,
            platform_type,
            sensor_type,
            datafile_type,
            privacy,
        } = other;
        for (slot, value) in [
            (&mut self.platform, platform),
            (&mut self.sensor, sensor),
            (&mut self.datafile, datafile),
            (&mut self.nationality, nationality),
            (&mut self.platform_type, platform_type),
            (&mut self.sensor_type, sensor_type),
            (&mut self.datafile_type, datafile_type),
            (&mut self.privacy, privacy),
        ] {
            if value.is_some() {
                *slot = value;
            }
        }
    }
}

/// Errors raised while loading configuration
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    #[diagnostic(code(tir::config::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {message}")]
    #[diagnostic(
        code(tir::config::parse),
        help("config files are YAML with keys database, resolver, author and defaults")
    )]
    Parse { path: PathBuf, message: String },

    #[error("invalid value for {var}: {message}")]
    #[diagnostic(code(tir::config::env))]
    Env { var: String, message: String },
}

/// TIR configuration with layered hierarchy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the SQLite entity store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,

    /// Resolution policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolver: Option<ResolverKind>,

    /// User recorded on audit changes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Default Resolver names per kind
    pub defaults: DefaultNames,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // 1. Global user config (~/.config/tir/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                config.merge(Self::from_file(&global_path)?);
            }
        }

        // 2. Explicit config file
        if let Ok(path) = std::env::var("TIR_CONFIG") {
            config.merge(Self::from_file(Path::new(&path))?);
        }

        // 3. Environment variables
        config.apply_env(|var| std::env::var(var).ok())?;

        Ok(config)
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse a config document; an empty document is the empty config
    pub fn from_yaml(contents: &str) -> Result<Self, String> {
        if contents.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yml::from_str(contents).map_err(|e| e.to_string())
    }

    /// Apply `TIR_*` variables from an environment lookup
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(database) = var("TIR_DATABASE").filter(|v| !v.is_empty()) {
            self.database = Some(PathBuf::from(database));
        }
        if let Some(resolver) = var("TIR_RESOLVER").filter(|v| !v.is_empty()) {
            let kind = resolver.parse().map_err(|message| ConfigError::Env {
                var: "TIR_RESOLVER".to_string(),
                message,
            })?;
            self.resolver = Some(kind);
        }
        if let Some(author) = var("TIR_AUTHOR").filter(|v| !v.is_empty()) {
            self.author = Some(author);
        }
        Ok(())
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "tir")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        if other.database.is_some() {
            self.database = other.database;
        }
        if other.resolver.is_some() {
            self.resolver = other.resolver;
        }
        if other.author.is_some() {
            self.author = other.author;
        }
        self.defaults.merge(other.defaults);
    }

    /// Get the database path
    pub fn database(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| PathBuf::from("tir.db"))
    }

    /// Get the resolution policy
    pub fn resolver(&self) -> ResolverKind {
        self.resolver.unwrap_or(ResolverKind::Interactive)
    }

    /// Get the author name, falling back to the login name
    pub fn author(&self) -> String {
        if let Some(ref author) = self.author {
            return author.clone();
        }

        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }
}
