//! Detection and invocation of the external CLIs we wrap (uv, uvx, rsconnect)

use anyhow::Context;
use std::path::PathBuf;
use std::process::{Command, Output};

/// Looks up a command on PATH, returning its location if installed
pub fn check_command(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Runs a command with captured stdout/stderr. A non-zero exit is not an error
/// at this layer, callers inspect the status themselves
pub fn run_command(program: &str, args: &[&str]) -> anyhow::Result<Output> {
    Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("Failed to run {}", program))
}

/// The trimmed stdout of a finished command
pub fn stdout_trimmed(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// The trimmed stderr of a finished command
pub fn stderr_trimmed(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}
