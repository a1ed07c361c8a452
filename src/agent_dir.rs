//! Gitignore hygiene for the agent skills directory the helper ships in
//!
//! The skill gets installed under an editor/agent directory such as
//! `.cursor/`. Committing that directory pollutes the deployment repo, so
//! diagnose and check warn when it isn't gitignored.

use fs_err as fs;
use std::path::Path;

const AGENT_DIRS: &[&str] = &[".cursor", ".claude", ".agents", ".codex", ".windsurf"];

/// The first recognized agent directory under the project root, if any
pub fn detect(root: &Path) -> Option<&'static str> {
    AGENT_DIRS
        .iter()
        .copied()
        .find(|dir| root.join(dir).is_dir())
}

/// Returns `(is_gitignored, agent_dir)`. `agent_dir` is None when the project
/// has no recognized agent directory, in which case the check is skipped
pub fn check_gitignored(root: &Path) -> (bool, Option<&'static str>) {
    match detect(root) {
        Some(dir) => (is_gitignored(root, dir), Some(dir)),
        None => (false, None),
    }
}

fn is_gitignored(root: &Path, dir: &str) -> bool {
    match fs::read_to_string(root.join(".gitignore")) {
        Ok(gitignore) => gitignore_has_dir(&gitignore, dir),
        Err(_) => false,
    }
}

/// Whether a .gitignore names the directory (`dir`, `dir/`, `/dir/` all count)
pub fn gitignore_has_dir(gitignore: &str, dir: &str) -> bool {
    gitignore
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .any(|line| {
            let line = line.strip_prefix('/').unwrap_or(line);
            line.trim_end_matches('/') == dir
        })
}
