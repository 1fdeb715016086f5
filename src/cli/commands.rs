//! CLI command definitions

use clap::Args;

/// Run a single registered task
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Task name (e.g. styles, images, clean)
    pub task: String,
}

/// List registered tasks
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
