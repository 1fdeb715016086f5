//! CLI output formatting

use crate::execution::{ExecutionEvent, Task};
use console::Emoji;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Format a duration as `Xms` below one second, `X.XXs` above
pub fn format_duration(duration: Duration) -> String {
    if duration < Duration::from_secs(1) {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::TaskStarted { task } => format!("{} {}", SPINNER, style(task).cyan()),
        ExecutionEvent::TaskCompleted { task, duration } => format!(
            "{} {} {}",
            CHECK,
            style(task).green(),
            style(format_duration(*duration)).dim()
        ),
        ExecutionEvent::TaskFailed { task, error, duration } => format!(
            "{} {} {}: {}",
            CROSS,
            style(task).red(),
            style(format_duration(*duration)).dim(),
            style(error).dim()
        ),
    }
}

/// One line of the task listing
pub fn format_task(task: &Task) -> String {
    format!("  {:<12} {}", style(task.name()).bold(), style(task.description()).dim())
}
