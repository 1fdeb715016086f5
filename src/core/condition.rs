//! Environment conditions attached to pipeline steps

use crate::core::BuildEnvironment;

/// When a step takes effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Runs in every environment
    Always,
    /// Runs only in production builds
    ProductionOnly,
    /// Runs only in development builds
    DevelopmentOnly,
}

impl Condition {
    /// Check whether the condition holds for the given environment
    pub fn holds(&self, env: BuildEnvironment) -> bool {
        match self {
            Condition::Always => true,
            Condition::ProductionOnly => env.is_production(),
            Condition::DevelopmentOnly => env.is_development(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Condition::Always => "always",
            Condition::ProductionOnly => "production",
            Condition::DevelopmentOnly => "development",
        }
    }
}
