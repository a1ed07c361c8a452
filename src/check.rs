//! The check subcommand: the numbered pre-deploy readiness checklist

use crate::agent_dir;
use crate::manifest;
use crate::output::{box_header, box_result, SYM_CHECK, SYM_CROSS, SYM_WARN};
use crate::pyproject;
use crate::python_version::{self, is_exact, major_minor};
use crate::requirements;
use crate::tools::check_command;
use anyhow::Context;
use std::env;
use std::path::Path;

pub fn pre_deploy_check() -> anyhow::Result<Option<i32>> {
    let root = env::current_dir().context("Couldn't determine the working directory")?;
    let mut passed = true;
    let mut issues: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    box_header("PYTHON PRE-DEPLOY CHECK");

    let (is_ignored, agent_dir) = agent_dir::check_gitignored(&root);
    if let Some(agent_dir) = agent_dir {
        if !is_ignored {
            println!(
                "{} Skill directory '{}/' is not in .gitignore",
                SYM_WARN, agent_dir
            );
            warnings.push(format!(
                "Add '{}/' to .gitignore to avoid committing agent skill files",
                agent_dir
            ));
            println!();
        }
    }

    let pyproject = pyproject::read(&root);

    print!("1. Project file... ");
    if root.join("pyproject.toml").exists() {
        match pyproject.as_ref().and_then(|pyproject| pyproject.requires_python()) {
            Some(requires_python) => {
                println!(
                    "{} pyproject.toml (requires-python: {})",
                    SYM_CHECK, requires_python
                );
            }
            None => {
                println!("{} pyproject.toml found but no requires-python set", SYM_WARN);
                warnings
                    .push("Add requires-python to pyproject.toml [project] section".to_string());
            }
        }
    } else {
        println!("{} MISSING", SYM_CROSS);
        issues.push(
            "No pyproject.toml — regenerate manifest to auto-create, or run: uv init".to_string(),
        );
        passed = false;
    }

    print!("2. Manifest file... ");
    if root.join("manifest.json").exists() {
        println!("{} Present", SYM_CHECK);
    } else {
        println!("{} MISSING", SYM_CROSS);
        issues.push(format!("Run: {} regenerate-manifest", env!("CARGO_PKG_NAME")));
        passed = false;
    }

    print!("3. Requirements file... ");
    if root.join("requirements.txt").exists() {
        let packages = requirements::packages(&root.join("requirements.txt"));
        println!("{} Present ({} packages)", SYM_CHECK, packages.len());
    } else {
        println!("{} MISSING", SYM_CROSS);
        issues.push("Run: uv export --no-hashes -o requirements.txt".to_string());
        passed = false;
    }

    print!("4. uv installed... ");
    if check_command("uv").is_some() {
        println!("{} Found", SYM_CHECK);
    } else {
        println!("{} NOT FOUND", SYM_CROSS);
        issues.push("Install uv: curl -LsSf https://astral.sh/uv/install.sh | sh".to_string());
        passed = false;
    }

    print!("5. rsconnect-python... ");
    if check_command("rsconnect").is_some() {
        println!("{} Found", SYM_CHECK);
    } else if check_command("uvx").is_some() {
        println!("{} Not installed (uvx available as fallback)", SYM_WARN);
        warnings.push("Consider: uv tool install rsconnect-python".to_string());
    } else {
        println!("{} NOT FOUND", SYM_CROSS);
        issues.push("Install: uv tool install rsconnect-python".to_string());
        passed = false;
    }

    print!("6. Python version pinning... ");
    let raw_pv = python_version::version_file(&root);
    match raw_pv.as_deref() {
        Some(raw_pv) if is_exact(raw_pv) => {
            println!("{} {} (exact)", SYM_CHECK, raw_pv);
        }
        Some(raw_pv) => {
            let hint = pyproject
                .as_ref()
                .and_then(|pyproject| pyproject.requires_python())
                .map(|requires_python| {
                    format!(" (pyproject.toml requires-python: {})", requires_python)
                })
                .unwrap_or_default();
            println!(
                "{} .python-version says '{}' — needs exact major.minor.patch",
                SYM_WARN, raw_pv
            );
            warnings.push(format!(
                ".python-version uses '{}' — Posit Connect needs exact version (e.g. {}.6). \
                 Set to the version on your Connect server{}",
                raw_pv, raw_pv, hint
            ));
        }
        None => {
            println!("{} No .python-version file", SYM_WARN);
            warnings.push(
                "Create .python-version with exact version matching your Connect server \
                 (e.g. 3.12.7)"
                    .to_string(),
            );
        }
    }

    print!("7. Python version match... ");
    let manifest_version = manifest::read(&root.join("manifest.json"))
        .and_then(|manifest| manifest.python_version().map(ToString::to_string));
    let local_version = python_version::local_version(&root);
    match (manifest_version.as_deref(), local_version.as_deref()) {
        (Some(manifest_version), Some(local_version)) => {
            if manifest_version == local_version {
                println!("{} {} (exact match)", SYM_CHECK, local_version);
            } else {
                // Patch differences are usually fine, major.minor is not
                let manifest_mm = major_minor(manifest_version);
                let local_mm = major_minor(local_version);
                if manifest_mm == local_mm {
                    println!(
                        "{} {} (manifest: {})",
                        SYM_CHECK, local_version, manifest_version
                    );
                } else {
                    println!(
                        "{} Local {} vs manifest {}",
                        SYM_WARN, local_version, manifest_version
                    );
                    warnings.push(format!(
                        "Python version mismatch (local {} vs manifest {}) — regenerate \
                         manifest if intentional",
                        local_mm, manifest_mm
                    ));
                }
            }
        }
        (Some(manifest_version), None) => {
            println!("? Manifest says {}, couldn't detect local", manifest_version);
        }
        (None, _) if root.join("manifest.json").exists() => {
            println!("? No Python version in manifest");
        }
        (None, _) => {
            println!("- Skipped (no manifest)");
        }
    }

    print!("8. Manifest freshness... ");
    match (
        mtime(&root.join("manifest.json")),
        mtime(&root.join("requirements.txt")),
    ) {
        (Some(manifest_mtime), Some(requirements_mtime)) => {
            if manifest_mtime >= requirements_mtime {
                println!("{} Manifest is up to date", SYM_CHECK);
            } else {
                println!(
                    "{} Manifest may be stale (older than requirements.txt)",
                    SYM_WARN
                );
                warnings.push(format!(
                    "Consider: {} regenerate-manifest",
                    env!("CARGO_PKG_NAME")
                ));
            }
        }
        _ => println!("- Skipped (missing files)"),
    }

    print!("9. allow_uv in manifest... ");
    let allow_uv = manifest::read(&root.join("manifest.json")).and_then(|manifest| manifest.allow_uv());
    match allow_uv {
        Some(true) => println!("{} Enabled", SYM_CHECK),
        Some(false) => {
            println!("{} Explicitly disabled", SYM_WARN);
            warnings.push("allow_uv is false — Connect will use pip instead of uv".to_string());
        }
        None if root.join("manifest.json").exists() => {
            println!("{} Not set (Connect uses server default)", SYM_WARN);
            warnings.push(format!(
                "Set allow_uv: true in manifest for faster installs — run: {} regenerate-manifest",
                env!("CARGO_PKG_NAME")
            ));
        }
        None => println!("- Skipped (no manifest)"),
    }

    box_result(passed);

    if passed {
        if !warnings.is_empty() {
            println!();
            println!("Optional improvements:");
            for warning in &warnings {
                println!("  - {}", warning);
            }
        }
        Ok(None)
    } else {
        println!();
        println!("Fixes needed:");
        for issue in &issues {
            println!("  - {}", issue);
        }
        if !warnings.is_empty() {
            println!();
            println!("Also consider:");
            for warning in &warnings {
                println!("  - {}", warning);
            }
        }
        Ok(Some(1))
    }
}

fn mtime(path: &Path) -> Option<std::time::SystemTime> {
    fs_err::metadata(path).and_then(|metadata| metadata.modified()).ok()
}
