use anyhow::{Context, Result};
use sitepipe::cli::commands::{ListCommand, RunCommand};
use sitepipe::cli::output::*;
use sitepipe::cli::{Cli, Command};
use sitepipe::core::error::error_chain;
use sitepipe::execution::{EventHandler, Node};
use sitepipe::site::{self, Site, COMMANDS};
use sitepipe::{BuildEnvironment, SiteConfig};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set logging subscriber")?;

    let config = SiteConfig::load(cli.config.as_deref()).context("Failed to load site config")?;
    let env = BuildEnvironment::resolve();

    match &cli.command {
        Command::Run(cmd) => run_task(cmd, config, env).await?,
        Command::List(cmd) => list_tasks(cmd, config, env)?,
        command => {
            let name = command.top_level().context("not a top-level command")?;
            let node = site::command(name).context("unknown command")?;
            execute(name, node, config, env).await?;
        }
    }

    Ok(())
}

fn console_handler() -> EventHandler {
    Arc::new(|event| println!("{}", format_execution_event(&event)))
}

async fn execute(label: &str, node: Node, config: SiteConfig, env: BuildEnvironment) -> Result<()> {
    println!(
        "{} {} {} ({})",
        ROCKET,
        style(label).bold(),
        style(&node).dim(),
        style(env).cyan()
    );

    let site = Site::new(config, env).with_event_handler(console_handler());
    let engine = site.engine().context("Failed to assemble site")?;

    let start = Instant::now();
    let result = engine.run(node).await;
    let elapsed = format_duration(start.elapsed());

    match result {
        Ok(()) => {
            println!(
                "\n{} {} completed {} in {}",
                CHECK,
                style(label).bold(),
                style("successfully").green(),
                style(elapsed).dim()
            );
            Ok(())
        }
        Err(e) => {
            println!("\n{} {} {} after {}", CROSS, style(label).bold(), style("failed").red(), elapsed);
            error!("{}", error_chain(&e));
            std::process::exit(1);
        }
    }
}

async fn run_task(cmd: &RunCommand, config: SiteConfig, env: BuildEnvironment) -> Result<()> {
    execute(&cmd.task, Node::task(cmd.task.clone()), config, env).await
}

fn list_tasks(cmd: &ListCommand, config: SiteConfig, env: BuildEnvironment) -> Result<()> {
    let site = Site::new(config, env);
    let registry = site.registry().context("Failed to assemble site")?;

    if cmd.json {
        let tasks: Vec<_> = registry
            .tasks()
            .map(|t| serde_json::json!({ "name": t.name(), "description": t.description() }))
            .collect();
        let commands: Vec<_> = COMMANDS
            .iter()
            .filter_map(|name| site::command(name).map(|node| serde_json::json!({ "name": name, "runs": node.to_string() })))
            .collect();
        let data = serde_json::json!({ "tasks": tasks, "commands": commands });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("{} Tasks ({}):", INFO, style(env).cyan());
    for task in registry.tasks() {
        println!("{}", format_task(task));
    }

    println!("\n{} Commands:", INFO);
    for name in COMMANDS {
        if let Some(node) = site::command(name) {
            println!("  {:<12} {}", style(name).bold(), style(node).dim());
        }
    }

    Ok(())
}
