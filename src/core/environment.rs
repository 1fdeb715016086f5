//! Build environment resolution

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Name of the variable that selects the build environment
pub const ENV_VAR: &str = "NODE_ENV";

/// The only value that selects a production build
pub const PRODUCTION_MARKER: &str = "production";

static RESOLVED: OnceLock<BuildEnvironment> = OnceLock::new();

/// Development or production build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildEnvironment {
    Development,
    Production,
}

impl BuildEnvironment {
    /// Resolve the environment for this process.
    ///
    /// The variable is read on the first call only; every later call returns
    /// the cached value.
    pub fn resolve() -> Self {
        *RESOLVED.get_or_init(|| {
            let value = std::env::var(ENV_VAR).ok();
            Self::from_value(value.as_deref())
        })
    }

    /// Map a raw variable value to an environment.
    ///
    /// Only the exact string `production` selects production. Anything else,
    /// including an unset variable, is development.
    pub fn from_value(value: Option<&str>) -> Self {
        match value {
            Some(PRODUCTION_MARKER) => BuildEnvironment::Production,
            _ => BuildEnvironment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, BuildEnvironment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, BuildEnvironment::Development)
    }
}

impl fmt::Display for BuildEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildEnvironment::Development => write!(f, "development"),
            BuildEnvironment::Production => write!(f, "production"),
        }
    }
}
