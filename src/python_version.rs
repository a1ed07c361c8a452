//! Python version strings the way Posit Connect understands them
//!
//! Connect matches content to an interpreter on the server by the version
//! recorded in manifest.json, so `3.12` and `3.12.7` are meaningfully
//! different: only an exact major.minor.patch pin deploys predictably.

use crate::tools::{check_command, run_command, stdout_trimmed};
use fs_err as fs;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

/// True only for a full, all-numeric major.minor.patch version such as `3.12.7`
pub fn is_exact(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

/// The `major.minor` prefix, used for "close enough" comparisons where patch
/// differences don't matter
pub fn major_minor(version: &str) -> String {
    version.split('.').take(2).collect::<Vec<_>>().join(".")
}

/// The trimmed contents of `.python-version` (pyenv, uv), if present and non-empty
pub fn version_file(root: &Path) -> Option<String> {
    let contents = fs::read_to_string(root.join(".python-version")).ok()?;
    let version = contents.trim().to_string();
    if version.is_empty() {
        None
    } else {
        Some(version)
    }
}

/// The local Python version: `.python-version` first, then the interpreter on PATH
pub fn local_version(root: &Path) -> Option<String> {
    version_file(root).or_else(interpreter_version)
}

/// Finds a Python interpreter on PATH
pub fn interpreter_path() -> Option<PathBuf> {
    ["python3", "python"].iter().find_map(|name| check_command(name))
}

/// Asks the interpreter on PATH for its major.minor.patch version
pub fn interpreter_version() -> Option<String> {
    let version_re = Regex::new(r"(\d+\.\d+\.\d+)").unwrap();
    for python in ["python3", "python"] {
        if check_command(python).is_none() {
            continue;
        }
        let output = match run_command(python, &["--version"]) {
            Ok(output) => output,
            Err(err) => {
                debug!("{} --version failed: {}", python, err);
                continue;
            }
        };
        if !output.status.success() {
            continue;
        }
        if let Some(captures) = version_re.captures(&stdout_trimmed(&output)) {
            return Some(captures[1].to_string());
        }
    }
    None
}

#[cfg(test)]
mod test {
    use super::{is_exact, local_version, major_minor, version_file};
    use fs_err as fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_exact() {
        assert!(is_exact("3.12.7"));
        assert!(is_exact("3.9.0"));
        assert!(!is_exact("3.12"));
        assert!(!is_exact("3"));
        assert!(!is_exact("3.12.7rc1"));
        assert!(!is_exact("3.12."));
        assert!(!is_exact(""));
    }

    #[test]
    fn test_major_minor() {
        assert_eq!(major_minor("3.12.7"), "3.12");
        assert_eq!(major_minor("3.12"), "3.12");
        assert_eq!(major_minor("3"), "3");
    }

    #[test]
    fn test_version_file() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(version_file(temp_dir.path()), None);

        fs::write(temp_dir.path().join(".python-version"), "3.11.6\n").unwrap();
        assert_eq!(version_file(temp_dir.path()).as_deref(), Some("3.11.6"));

        fs::write(temp_dir.path().join(".python-version"), "  \n").unwrap();
        assert_eq!(version_file(temp_dir.path()), None);
    }

    #[test]
    fn test_local_version_prefers_version_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(".python-version"), "3.10").unwrap();
        assert_eq!(local_version(temp_dir.path()).as_deref(), Some("3.10"));
    }
}
