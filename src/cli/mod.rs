//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{ListCommand, RunCommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Static-site front-end build tool
#[derive(Debug, Parser, Clone)]
#[command(name = "sitepipe")]
#[command(version = "0.1.0")]
#[command(about = "Builds templates, styles, scripts and images; serves them with live reload", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to site configuration file (defaults to site.yaml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Build every pipeline without cleaning
    Default,

    /// Clean, then build every pipeline
    Build,

    /// Clean, build, then watch and serve with live reload
    Development,

    /// Run a single task by name
    Run(RunCommand),

    /// List registered tasks and commands
    List(ListCommand),
}

impl Command {
    /// Name of the top-level command this maps to, if any
    pub fn top_level(&self) -> Option<&'static str> {
        match self {
            Command::Default => Some("default"),
            Command::Build => Some("build"),
            Command::Development => Some("development"),
            Command::Run(_) | Command::List(_) => None,
        }
    }
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
