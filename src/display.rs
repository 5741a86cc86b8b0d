//! Colored status lines for supervisor output.
//!
//! These lines are for the user and are printed independently of the
//! `tracing` diagnostics, which go to stderr.

use std::io::{self, Write};
use std::path::Path;

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::supervisor::GenerationExit;

const PREFIX: &str = "[hotwire]";

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Render a path relative to the working directory when it lies inside it.
#[must_use]
pub fn display_path(path: &Path, working_dir: &Path) -> String {
    path.strip_prefix(working_dir)
        .ok()
        .filter(|rel| !rel.as_os_str().is_empty())
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Text of the exit status line, or `None` while the child is running.
#[must_use]
pub fn exit_message(exit: GenerationExit) -> Option<String> {
    match exit {
        GenerationExit::Running => None,
        GenerationExit::Clean => Some("process exited with code 0".to_string()),
        GenerationExit::Error(code) => Some(format!("process exited with code {code}")),
        GenerationExit::Killed { .. } => Some("process exited".to_string()),
    }
}

fn status(message: &str) {
    println!("{} {} {}", timestamp().dimmed(), PREFIX.cyan().bold(), message);
    let _ = io::stdout().flush();
}

/// Print the first start of the supervised program.
pub fn print_start(entry: &Path) {
    println!(
        "{} {} start {}",
        timestamp().dimmed(),
        PREFIX.cyan().bold(),
        entry.display().dimmed()
    );
    let _ = io::stdout().flush();
}

pub fn print_restart_scheduled() {
    status(&"restart scheduled".yellow().to_string());
}

/// Print one changed path below the restart-scheduled line.
pub fn print_changed_path(path: &Path, working_dir: &Path) {
    println!("  {}", display_path(path, working_dir).dimmed());
    let _ = io::stdout().flush();
}

/// Print the marker shown once more changes arrive than are listed.
pub fn print_changed_overflow() {
    println!("  {}", "...".dimmed());
    let _ = io::stdout().flush();
}

pub fn print_restart() {
    status(&"restart".yellow().bold().to_string());
}

pub fn print_killing(pid: Option<u32>) {
    let pid = pid.map_or_else(|| "?".to_string(), |p| p.to_string());
    status(&format!("killing process {pid}"));
}

/// Print how the child ended.
pub fn print_exit(exit: GenerationExit) {
    let Some(message) = exit_message(exit) else {
        return;
    };
    match exit {
        GenerationExit::Clean => status(&message.green().to_string()),
        GenerationExit::Error(_) => status(&message.red().to_string()),
        _ => status(&message),
    }
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!(
        "{} {} {}",
        PREFIX.cyan().bold(),
        "[ERROR]".red().bold(),
        message.red()
    );
    let _ = io::stderr().flush();
}
