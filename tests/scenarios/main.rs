//! Scenario-based tests for sitepipe

mod helpers;

mod build;
mod composition;
mod live_reload;
mod partials;
mod styles;
mod watch;
