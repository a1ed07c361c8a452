//! The diagnose subcommand: environment, key files, manifest and requirements
//! status, with accumulated issues deciding the exit code

use crate::agent_dir;
use crate::manifest;
use crate::output::{box_header, SYM_CHECK, SYM_CROSS, SYM_WARN};
use crate::pyproject;
use crate::python_version::{self, is_exact, major_minor};
use crate::requirements;
use crate::tools::{check_command, run_command, stdout_trimmed};
use anyhow::Context;
use chrono::{DateTime, Local};
use fs_err as fs;
use std::env;

const KEY_FILES: &[&str] = &[
    "requirements.txt",
    "manifest.json",
    "pyproject.toml",
    ".python-version",
    "uv.lock",
    ".rscignore",
];

const UV_INSTALL_HINT: &str = if cfg!(windows) {
    "uv not installed — install: powershell -ExecutionPolicy ByPass -c \"irm https://astral.sh/uv/install.ps1 | iex\""
} else {
    "uv not installed — install: curl -LsSf https://astral.sh/uv/install.sh | sh"
};

pub fn diagnose(verbose: bool) -> anyhow::Result<Option<i32>> {
    let root = env::current_dir().context("Couldn't determine the working directory")?;
    let mut issues: Vec<String> = Vec::new();

    box_header("PYTHON DEPLOYMENT DIAGNOSTICS");

    println!("--- Environment ---");
    let raw_pv = python_version::version_file(&root);
    let local_version = python_version::local_version(&root);
    if let Some(raw_pv) = raw_pv.as_deref().filter(|raw_pv| !is_exact(raw_pv)) {
        let hint = requires_python_hint(&root);
        println!(
            "Python version: {} {} not exact",
            local_version.as_deref().unwrap_or("unknown"),
            SYM_WARN
        );
        issues.push(format!(
            ".python-version uses '{}' — Posit Connect needs exact version (e.g. {}.6). \
             Set to the version on your Connect server{}",
            raw_pv, raw_pv, hint
        ));
    } else {
        println!(
            "Python version: {}",
            local_version.as_deref().unwrap_or("unknown")
        );
    }
    match python_version::interpreter_path() {
        Some(path) => println!("Python path: {}", path.display()),
        None => println!("Python path: not found"),
    }
    println!("Working dir: {}", root.display());

    if check_command("uv").is_some() {
        match run_command("uv", &["--version"]) {
            Ok(output) if output.status.success() => {
                println!("uv version: {}", stdout_trimmed(&output))
            }
            _ => println!("uv: installed (couldn't get version)"),
        }
    } else {
        println!("uv: NOT INSTALLED");
        issues.push(UV_INSTALL_HINT.to_string());
    }

    if check_command("rsconnect").is_some() {
        match run_command("rsconnect", &["version"]) {
            Ok(output) if output.status.success() => {
                println!("rsconnect-python: {}", stdout_trimmed(&output))
            }
            _ => println!("rsconnect-python: installed (couldn't get version)"),
        }
    } else if check_command("uvx").is_some() {
        println!(
            "{} rsconnect-python: not installed (uvx available as fallback)",
            SYM_WARN
        );
    } else {
        println!("rsconnect-python: NOT INSTALLED");
        issues.push(
            "rsconnect-python not installed — install: uv tool install rsconnect-python"
                .to_string(),
        );
    }
    println!();

    println!("--- Gitignore ---");
    let (is_ignored, agent_dir) = agent_dir::check_gitignored(&root);
    if let Some(agent_dir) = agent_dir {
        if is_ignored {
            println!("{} {}/ is in .gitignore", SYM_CHECK, agent_dir);
        } else {
            println!("{} {}/ is NOT in .gitignore", SYM_WARN, agent_dir);
            issues.push(format!(
                "Add '{}/' to .gitignore to avoid committing agent skill files",
                agent_dir
            ));
        }
    } else {
        println!("Skill not under a recognized agent directory — skipped");
    }
    println!();

    println!("--- Key Files ---");
    for file in KEY_FILES {
        match fs::metadata(root.join(file)).and_then(|metadata| metadata.modified()) {
            Ok(mtime) => {
                let mtime: DateTime<Local> = mtime.into();
                println!("{} {} ( {} )", SYM_CHECK, file, mtime.format("%Y-%m-%d %H:%M"));
            }
            Err(_) => {
                println!("{} {} — missing", SYM_CROSS, file);
                if *file == "manifest.json" {
                    issues.push(
                        "manifest.json missing — run: rsconnect write-manifest <type> ."
                            .to_string(),
                    );
                } else if *file == "requirements.txt" {
                    issues.push(
                        "requirements.txt missing — run: uv export --no-hashes -o requirements.txt"
                            .to_string(),
                    );
                }
            }
        }
    }
    println!();

    println!("--- Manifest Details ---");
    if root.join("manifest.json").exists() {
        let manifest = manifest::read(&root.join("manifest.json")).unwrap_or_default();
        println!(
            "Python version: {}",
            manifest.python_version().unwrap_or("not set")
        );
        println!(
            "Content type: {}",
            manifest.content_type().unwrap_or("not set")
        );
        println!("Entrypoint: {}", manifest.entrypoint().unwrap_or("not set"));

        match manifest.allow_uv() {
            Some(true) => println!("allow_uv: {} enabled", SYM_CHECK),
            Some(false) => println!("allow_uv: {} explicitly disabled", SYM_WARN),
            None => println!("allow_uv: {} not set (server default)", SYM_WARN),
        }

        if let (Some(manifest_version), Some(local_version)) =
            (manifest.python_version(), local_version.as_deref())
        {
            let manifest_mm = major_minor(manifest_version);
            let local_mm = major_minor(local_version);
            if manifest_mm != local_mm {
                println!(
                    "{} Version mismatch: local {} vs manifest {}",
                    SYM_WARN, local_version, manifest_version
                );
                issues.push(format!(
                    "Python version mismatch (local {} vs manifest {})",
                    local_mm, manifest_mm
                ));
            } else if manifest_version != local_version {
                println!(
                    "{} Patch mismatch: local {} vs manifest {}",
                    SYM_WARN, local_version, manifest_version
                );
                issues.push(
                    "Python patch mismatch — Posit Connect requires an exact patch version \
                     in manifest.json"
                        .to_string(),
                );
            }
        }
    } else {
        println!("No manifest.json found");
    }
    println!();

    println!("--- Requirements ---");
    if root.join("requirements.txt").exists() {
        let packages = requirements::packages(&root.join("requirements.txt"));
        println!("Package count: {}", packages.len());
        if verbose && !packages.is_empty() {
            println!();
            println!("Packages:");
            for package in &packages {
                println!("  - {}", package);
            }
        }
    } else {
        println!("No requirements.txt found");
    }
    println!();

    println!("--- Project Configuration ---");
    if root.join("pyproject.toml").exists() {
        println!("{} pyproject.toml found", SYM_CHECK);
        if verbose {
            if let Ok(content) = fs::read_to_string(root.join("pyproject.toml")) {
                for line in content.lines().map(str::trim) {
                    if line.starts_with("name") || line.starts_with("version") {
                        println!("  {}", line);
                    }
                }
            }
        }
    } else {
        println!("{} No pyproject.toml — uv projects require this", SYM_WARN);
    }
    println!();

    println!("=== Summary ===");
    if issues.is_empty() {
        println!("{} No issues detected!", SYM_CHECK);
        println!();
        println!("Ready to deploy. Run the pre-deploy check to confirm:");
        println!("  {} check", env!("CARGO_PKG_NAME"));
        Ok(None)
    } else {
        println!("{} {} issue(s) found:", SYM_CROSS, issues.len());
        for (position, issue) in issues.iter().enumerate() {
            println!("  {}. {}", position + 1, issue);
        }
        println!();
        println!("Suggested fixes:");
        println!(
            "  - Regenerate manifest: {} regenerate-manifest",
            env!("CARGO_PKG_NAME")
        );
        println!("  - Full pre-deploy check: {} check", env!("CARGO_PKG_NAME"));
        Ok(Some(1))
    }
}

/// The requires-python hint appended to the non-exact-version issue, empty
/// when pyproject.toml doesn't pin anything
fn requires_python_hint(root: &std::path::Path) -> String {
    pyproject::read(root)
        .and_then(|pyproject| pyproject.requires_python().map(ToString::to_string))
        .map(|requires_python| format!(" | pyproject.toml requires-python: {}", requires_python))
        .unwrap_or_default()
}
