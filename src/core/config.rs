//! Site configuration from YAML

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "site.yaml";

/// Errors while loading or validating the site configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level site configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Source tree root
    pub source_dir: PathBuf,

    /// Build output root
    pub build_dir: PathBuf,

    /// Dev server settings
    pub server: ServerConfig,

    /// Watch settings
    pub watch: WatchConfig,

    /// Script bundler settings
    pub scripts: ScriptConfig,
}

/// Dev server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,

    /// Fixed port
    pub port: u16,

    /// Open the default browser once the server is up
    pub open: bool,
}

/// Watch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Filesystem poll interval in milliseconds
    pub poll_interval_ms: u64,
}

/// External bundler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Bundler executable
    pub bundler: String,

    /// Syntax target the bundler lowers to
    pub target: String,

    /// Bundler timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("app"),
            build_dir: PathBuf::from("build"),
            server: ServerConfig::default(),
            watch: WatchConfig::default(),
            scripts: ScriptConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            open: true,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { poll_interval_ms: 100 }
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            bundler: "esbuild".to_string(),
            target: "es2015".to_string(),
            timeout_secs: 120,
        }
    }
}

impl SiteConfig {
    /// Load site configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse site configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: SiteConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the explicit file if given, else `site.yaml` if present, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("source_dir must not be empty".to_string()));
        }
        if self.build_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("build_dir must not be empty".to_string()));
        }
        if self.build_dir == self.source_dir {
            return Err(ConfigError::Invalid(
                "build_dir must differ from source_dir".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must not be 0".to_string()));
        }
        if self.watch.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "watch.poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.scripts.bundler.trim().is_empty() {
            return Err(ConfigError::Invalid("scripts.bundler must not be empty".to_string()));
        }
        Ok(())
    }
}
