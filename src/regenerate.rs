//! The regenerate-manifest subcommand: exports the dependency lock with uv,
//! rewrites manifest.json through rsconnect write-manifest and patches
//! allow_uv back in

use crate::manifest::{self, PatchOutcome};
use crate::output::{box_header, box_result, SYM_CHECK, SYM_CROSS, SYM_WARN};
use crate::pyproject;
use crate::python_version::{self, interpreter_version, is_exact, major_minor};
use crate::tools::{check_command, run_command, stderr_trimmed};
use anyhow::Context;
use clap::ValueEnum;
use fs_err as fs;
use regex::Regex;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(ValueEnum, Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Api,
    Fastapi,
    Flask,
    Dash,
    Streamlit,
    Bokeh,
    Notebook,
}

impl ContentType {
    /// The type rsconnect write-manifest expects. Flask apps deploy as the
    /// generic api type
    fn rsconnect_type(self) -> &'static str {
        match self {
            ContentType::Api | ContentType::Flask => "api",
            ContentType::Fastapi => "fastapi",
            ContentType::Dash => "dash",
            ContentType::Streamlit => "streamlit",
            ContentType::Bokeh => "bokeh",
            ContentType::Notebook => "notebook",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentType::Api => "api",
            ContentType::Fastapi => "fastapi",
            ContentType::Flask => "flask",
            ContentType::Dash => "dash",
            ContentType::Streamlit => "streamlit",
            ContentType::Bokeh => "bokeh",
            ContentType::Notebook => "notebook",
        };
        f.write_str(name)
    }
}

const ENTRYPOINT_CANDIDATES: &[&str] = &[
    "app.py",
    "main.py",
    "api.py",
    "application.py",
    "server.py",
    "wsgi.py",
    "asgi.py",
];

fn add_dir(search_dirs: &mut Vec<PathBuf>, dir: PathBuf) {
    if dir.is_dir() && !search_dirs.contains(&dir) {
        search_dirs.push(dir);
    }
}

fn add_path(candidate_paths: &mut Vec<PathBuf>, path: PathBuf) {
    if path.is_file() && !candidate_paths.contains(&path) {
        candidate_paths.push(path);
    }
}

/// `my_app.server` -> `my_app/server.py` and `my_app/server/__init__.py`
fn module_to_paths(module: &str) -> [PathBuf; 2] {
    let rel: PathBuf = module.split('.').collect();
    [rel.with_extension("py"), rel.join("__init__.py")]
}

/// Auto-detects the content type by looking for framework imports in likely
/// entrypoint files under the project root, `src/` and package directories
pub fn detect_content_type(root: &Path) -> Option<ContentType> {
    let pyproject = pyproject::read(root);

    let mut search_dirs: Vec<PathBuf> = Vec::new();
    add_dir(&mut search_dirs, root.to_path_buf());
    add_dir(&mut search_dirs, root.join("src"));
    if let Some(name) = pyproject.as_ref().and_then(|pyproject| pyproject.name()) {
        let package = name.replace('-', "_");
        add_dir(&mut search_dirs, root.join(&package));
        add_dir(&mut search_dirs, root.join("src").join(&package));
    }
    for base in [root.to_path_buf(), root.join("src")] {
        let Ok(entries) = fs::read_dir(&base) else {
            continue;
        };
        for entry in entries.filter_map(Result::ok) {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || matches!(name.as_str(), "__pycache__" | "venv") {
                continue;
            }
            let path = entry.path();
            if path.is_dir() && path.join("__init__.py").is_file() {
                add_dir(&mut search_dirs, path);
            }
        }
    }

    let mut candidate_paths: Vec<PathBuf> = Vec::new();
    for base in &search_dirs {
        for name in ENTRYPOINT_CANDIDATES {
            add_path(&mut candidate_paths, base.join(name));
        }
    }
    for module in pyproject
        .iter()
        .flat_map(|pyproject| pyproject.entry_point_modules())
    {
        for rel in module_to_paths(&module) {
            add_path(&mut candidate_paths, root.join(&rel));
            add_path(&mut candidate_paths, root.join("src").join(&rel));
        }
    }

    if candidate_paths.is_empty() {
        for base in [root.to_path_buf(), root.join("src"), root.join("notebooks")] {
            let Ok(entries) = fs::read_dir(&base) else {
                continue;
            };
            let has_notebook = entries
                .filter_map(Result::ok)
                .any(|entry| entry.file_name().to_string_lossy().ends_with(".ipynb"));
            if has_notebook {
                return Some(ContentType::Notebook);
            }
        }
        return None;
    }

    let frameworks = [
        (r"from\s+fastapi\s+import|import\s+fastapi", ContentType::Fastapi),
        (r"from\s+flask\s+import|import\s+flask", ContentType::Flask),
        (r"from\s+dash\s+import|import\s+dash", ContentType::Dash),
        (r"from\s+streamlit|import\s+streamlit", ContentType::Streamlit),
        (r"from\s+bokeh|import\s+bokeh", ContentType::Bokeh),
        // Shiny for Python deploys as the generic api type
        (r"from\s+shiny\s+import|import\s+shiny", ContentType::Api),
    ];
    let frameworks: Vec<(Regex, ContentType)> = frameworks
        .iter()
        .map(|(pattern, content_type)| (Regex::new(pattern).unwrap(), *content_type))
        .collect();

    for entrypoint in &candidate_paths {
        // Lossy so a stray non-UTF-8 byte doesn't hide a framework import
        let Ok(content) = fs::read(entrypoint) else {
            continue;
        };
        let content = String::from_utf8_lossy(&content);
        for (framework_import, content_type) in &frameworks {
            if framework_import.is_match(&content) {
                debug!("Detected {} from {}", content_type, entrypoint.display());
                return Some(*content_type);
            }
        }
    }

    // Entrypoints exist but import no known framework
    Some(ContentType::Api)
}

/// The Python version to stamp into the manifest, resolved from the
/// `.python-version` pin and the interpreter on PATH
#[derive(Debug, Clone, Eq, PartialEq)]
enum TargetPython {
    /// An exact version, either pinned or taken from the interpreter
    Resolved(String),
    /// The pin isn't exact but the interpreter matches its major.minor, so
    /// the interpreter's patch version can stand in
    InterpreterFallback { pin: String, interpreter: String },
    /// The pin isn't exact and the interpreter is a different major.minor
    PinMismatch { pin: String, interpreter: String },
    /// The pin isn't exact and no interpreter was found to resolve it
    PinUnresolvable { pin: String },
    /// No pin and no interpreter
    Unknown,
}

fn resolve_target_python(pin: Option<&str>, interpreter: Option<&str>) -> TargetPython {
    match pin {
        Some(pin) if is_exact(pin) => TargetPython::Resolved(pin.to_string()),
        Some(pin) => match interpreter {
            Some(interpreter) if major_minor(pin) == major_minor(interpreter) => {
                TargetPython::InterpreterFallback {
                    pin: pin.to_string(),
                    interpreter: interpreter.to_string(),
                }
            }
            Some(interpreter) => TargetPython::PinMismatch {
                pin: pin.to_string(),
                interpreter: interpreter.to_string(),
            },
            None => TargetPython::PinUnresolvable {
                pin: pin.to_string(),
            },
        },
        None => match interpreter {
            Some(interpreter) => TargetPython::Resolved(interpreter.to_string()),
            None => TargetPython::Unknown,
        },
    }
}

pub fn regenerate_manifest(
    content_type: Option<ContentType>,
    no_uv_export: bool,
    no_allow_uv: bool,
) -> anyhow::Result<Option<i32>> {
    let root = env::current_dir().context("Couldn't determine the working directory")?;

    box_header("REGENERATE PYTHON MANIFEST");

    if check_command("rsconnect").is_none() && check_command("uvx").is_none() {
        println!(
            "{} rsconnect-python not installed and uvx not available",
            SYM_CROSS
        );
        println!("Install: uv tool install rsconnect-python");
        return Ok(Some(1));
    }

    // Connect needs an exact patch version stamped into the manifest
    let target_python = match resolve_target_python(
        python_version::version_file(&root).as_deref(),
        interpreter_version().as_deref(),
    ) {
        TargetPython::Resolved(version) => version,
        TargetPython::InterpreterFallback { pin, interpreter } => {
            println!(
                "{} .python-version says '{}' — using interpreter {} (exact)",
                SYM_WARN, pin, interpreter
            );
            println!("  Update .python-version to the exact patch version on your Connect server");
            interpreter
        }
        TargetPython::PinMismatch { pin, interpreter } => {
            println!(
                "{} .python-version says '{}' but interpreter is {}",
                SYM_CROSS, pin, interpreter
            );
            println!(
                "  Set .python-version to an exact patch version installed on your \
                 Connect server"
            );
            return Ok(Some(1));
        }
        TargetPython::PinUnresolvable { pin } => {
            println!(
                "{} .python-version says '{}' and no interpreter was found to resolve \
                 the exact patch version",
                SYM_CROSS, pin
            );
            println!(
                "  Set .python-version to an exact patch version installed on your \
                 Connect server"
            );
            return Ok(Some(1));
        }
        TargetPython::Unknown => {
            println!(
                "{} Couldn't determine a Python version (no .python-version file and no \
                 python on PATH)",
                SYM_CROSS
            );
            return Ok(Some(1));
        }
    };

    // uvx --python stamps the manifest with the target interpreter version.
    // The package is rsconnect-python but the executable is rsconnect, so uvx
    // needs --from rsconnect-python rsconnect
    let rsconnect_cmd: Vec<String> = if check_command("uvx").is_some() {
        println!("Target Python: {} (via uvx --python)", target_python);
        [
            "uvx",
            "--python",
            target_python.as_str(),
            "--from",
            "rsconnect-python",
            "rsconnect",
        ]
        .map(ToString::to_string)
        .to_vec()
    } else {
        println!("Target Python: {} (using installed rsconnect)", target_python);
        vec!["rsconnect".to_string()]
    };

    let content_type = match content_type {
        Some(content_type) => {
            println!("Content type: {}", content_type);
            content_type
        }
        None => {
            print!("Detecting content type... ");
            match detect_content_type(&root) {
                Some(content_type) => {
                    println!("{} {}", SYM_CHECK, content_type);
                    content_type
                }
                None => {
                    println!("{} Could not auto-detect", SYM_CROSS);
                    println!(
                        "Specify with: --type [api|fastapi|flask|dash|streamlit|bokeh|notebook]"
                    );
                    return Ok(Some(1));
                }
            }
        }
    };

    if !no_uv_export {
        println!();
        print!("Exporting requirements.txt... ");
        if check_command("uv").is_none() {
            println!("{} uv not found", SYM_CROSS);
            println!("Install uv or use --no-uv-export with existing requirements.txt");
            return Ok(Some(1));
        }

        // uv export refuses to run without a pyproject.toml
        if !root.join("pyproject.toml").exists() {
            println!("{} no pyproject.toml", SYM_WARN);
            print!("  Generating minimal pyproject.toml... ");
            let generated = pyproject::generate_minimal(&root, &target_python);
            match fs::write(root.join("pyproject.toml"), generated) {
                Ok(()) => {
                    println!("{}", SYM_CHECK);
                    println!(
                        "  {} Review pyproject.toml and adjust dependencies as needed",
                        SYM_WARN
                    );
                }
                Err(err) => {
                    println!("{} Failed: {}", SYM_CROSS, err);
                    println!(
                        "  Create manually or use --no-uv-export with existing requirements.txt"
                    );
                    return Ok(Some(1));
                }
            }
        }

        let output = run_command("uv", &["export", "--no-hashes", "-o", "requirements.txt"])?;
        if output.status.success() {
            println!("{}", SYM_CHECK);
        } else {
            println!("{}", SYM_CROSS);
            println!("  Error: {}", stderr_trimmed(&output));
            return Ok(Some(1));
        }
    } else {
        println!();
        println!("Skipping uv export (using existing requirements.txt)");
        if !root.join("requirements.txt").exists() {
            println!("  {} requirements.txt not found", SYM_CROSS);
            return Ok(Some(1));
        }
    }

    let rsconnect_type = content_type.rsconnect_type();
    println!();
    print!("Generating manifest.json ({})... ", rsconnect_type);
    let mut cmd = rsconnect_cmd;
    cmd.extend(["write-manifest", rsconnect_type, ".", "--overwrite"].map(ToString::to_string));
    debug!("Running {:?}", cmd);
    let args: Vec<&str> = cmd[1..].iter().map(String::as_str).collect();
    let output = run_command(&cmd[0], &args)?;
    if output.status.success() {
        println!("{}", SYM_CHECK);
    } else {
        println!("{}", SYM_CROSS);
        println!("  Error: {}", stderr_trimmed(&output));
        box_result(false);
        println!();
        println!("Common causes:");
        println!("  - Missing entrypoint (app.py, main.py)");
        println!("  - Wrong content type (try --type flag)");
        println!("  - rsconnect-python not installed (uv tool install rsconnect-python)");
        return Ok(Some(1));
    }

    if !no_allow_uv {
        print!("Patching allow_uv: true... ");
        match manifest::patch_allow_uv(&root.join("manifest.json")) {
            Ok(PatchOutcome::Patched) => println!("{}", SYM_CHECK),
            Ok(PatchOutcome::NoPythonSection) => println!(
                "{} No python section in manifest — skipping allow_uv patch",
                SYM_WARN
            ),
            Err(err) => {
                debug!("allow_uv patch failed: {}", err);
                println!("{} Failed (manifest still usable without it)", SYM_WARN);
            }
        }
    }

    if root.join("manifest.json").exists() {
        box_result(true);
        println!();
        println!("manifest.json regenerated successfully");
        println!();
        println!("Next steps:");
        println!("  1. Run pre-deploy check: {} check", env!("CARGO_PKG_NAME"));
        println!(
            "  2. Commit: git add manifest.json requirements.txt && \
             git commit -m 'chore: update manifest'"
        );
        println!("  3. Push to trigger deployment");
        Ok(None)
    } else {
        box_result(false);
        println!();
        println!("rsconnect write-manifest succeeded but manifest.json not found");
        Ok(Some(1))
    }
}

#[cfg(test)]
mod test {
    use super::{
        detect_content_type, module_to_paths, resolve_target_python, ContentType, TargetPython,
    };
    use fs_err as fs;
    use indoc::indoc;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_detect_fastapi_app() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("app.py"),
            "from fastapi import FastAPI\napp = FastAPI()\n",
        )
        .unwrap();
        assert_eq!(
            detect_content_type(temp_dir.path()),
            Some(ContentType::Fastapi)
        );
    }

    #[test]
    fn test_detect_flask_in_src() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("src")).unwrap();
        fs::write(
            temp_dir.path().join("src").join("main.py"),
            "from flask import Flask\napp = Flask(__name__)\n",
        )
        .unwrap();
        assert_eq!(
            detect_content_type(temp_dir.path()),
            Some(ContentType::Flask)
        );
    }

    #[test]
    fn test_detect_via_entry_point_module() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("pyproject.toml"),
            indoc! {r#"
                [project]
                name = "dashboard"

                [project.scripts]
                serve = "dashboard.server:main"
            "#},
        )
        .unwrap();
        let package = temp_dir.path().join("src").join("dashboard");
        fs::create_dir_all(&package).unwrap();
        fs::write(package.join("server.py"), "import streamlit as st\n").unwrap();
        assert_eq!(
            detect_content_type(temp_dir.path()),
            Some(ContentType::Streamlit)
        );
    }

    #[test]
    fn test_detect_notebook_fallback() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("notebooks")).unwrap();
        fs::write(
            temp_dir.path().join("notebooks").join("analysis.ipynb"),
            "{}",
        )
        .unwrap();
        assert_eq!(
            detect_content_type(temp_dir.path()),
            Some(ContentType::Notebook)
        );
    }

    #[test]
    fn test_detect_plain_entrypoint_is_api() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("main.py"), "print('hello')\n").unwrap();
        assert_eq!(detect_content_type(temp_dir.path()), Some(ContentType::Api));
    }

    #[test]
    fn test_detect_empty_project() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(detect_content_type(temp_dir.path()), None);
    }

    #[test]
    fn test_hidden_dirs_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let venv = temp_dir.path().join(".venv").join("lib");
        fs::create_dir_all(&venv).unwrap();
        fs::write(venv.join("__init__.py"), "").unwrap();
        assert_eq!(detect_content_type(temp_dir.path()), None);
    }

    #[test]
    fn test_module_to_paths() {
        let [file, package] = module_to_paths("my_app.server");
        assert_eq!(file, Path::new("my_app").join("server.py"));
        assert_eq!(package, Path::new("my_app").join("server").join("__init__.py"));
    }

    #[test]
    fn test_detect_tolerates_invalid_utf8() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("app.py"),
            b"# caf\xe9\nfrom fastapi import FastAPI\n".to_vec(),
        )
        .unwrap();
        assert_eq!(
            detect_content_type(temp_dir.path()),
            Some(ContentType::Fastapi)
        );
    }

    #[test]
    fn test_resolve_exact_pin() {
        assert_eq!(
            resolve_target_python(Some("3.12.7"), Some("3.11.4")),
            TargetPython::Resolved("3.12.7".to_string())
        );
        // An exact pin doesn't need an interpreter at all
        assert_eq!(
            resolve_target_python(Some("3.12.7"), None),
            TargetPython::Resolved("3.12.7".to_string())
        );
    }

    #[test]
    fn test_resolve_no_pin_uses_interpreter() {
        assert_eq!(
            resolve_target_python(None, Some("3.11.4")),
            TargetPython::Resolved("3.11.4".to_string())
        );
        assert_eq!(resolve_target_python(None, None), TargetPython::Unknown);
    }

    #[test]
    fn test_resolve_loose_pin_matching_interpreter() {
        assert_eq!(
            resolve_target_python(Some("3.11"), Some("3.11.4")),
            TargetPython::InterpreterFallback {
                pin: "3.11".to_string(),
                interpreter: "3.11.4".to_string(),
            }
        );
    }

    #[test]
    fn test_resolve_loose_pin_mismatched_interpreter() {
        assert_eq!(
            resolve_target_python(Some("3.11"), Some("3.12.1")),
            TargetPython::PinMismatch {
                pin: "3.11".to_string(),
                interpreter: "3.12.1".to_string(),
            }
        );
        assert_eq!(
            resolve_target_python(Some("3.11"), None),
            TargetPython::PinUnresolvable {
                pin: "3.11".to_string(),
            }
        );
    }

    #[test]
    fn test_rsconnect_type_mapping() {
        assert_eq!(ContentType::Flask.rsconnect_type(), "api");
        assert_eq!(ContentType::Fastapi.rsconnect_type(), "fastapi");
        assert_eq!(ContentType::Notebook.rsconnect_type(), "notebook");
    }
}
