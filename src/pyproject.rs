//! Reads the parts of pyproject.toml that matter for deployment and can
//! generate a minimal one when a project has none yet (uv export needs it)

use crate::python_version::major_minor;
use crate::requirements;
use fs_err as fs;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Deserialize, Debug, Default)]
pub struct PyprojectToml {
    pub project: Option<Project>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Project {
    pub name: Option<String>,
    #[serde(rename = "requires-python")]
    pub requires_python: Option<String>,
    /// Values are `module:attr` strings, but we tolerate anything
    pub scripts: Option<BTreeMap<String, toml::Value>>,
    #[serde(rename = "entry-points")]
    pub entry_points: Option<BTreeMap<String, BTreeMap<String, toml::Value>>>,
}

impl PyprojectToml {
    pub fn name(&self) -> Option<&str> {
        self.project.as_ref()?.name.as_deref()
    }

    pub fn requires_python(&self) -> Option<&str> {
        self.project.as_ref()?.requires_python.as_deref()
    }

    /// Module names referenced by `[project.scripts]` and
    /// `[project.entry-points.*]`, deduplicated in first-seen order
    pub fn entry_point_modules(&self) -> Vec<String> {
        let mut modules: Vec<String> = Vec::new();
        let mut add_module = |value: &toml::Value| {
            let Some(target) = value.as_str() else { return };
            let module = target.split(':').next().unwrap_or("").trim().to_string();
            if !module.is_empty() && !modules.contains(&module) {
                modules.push(module);
            }
        };

        if let Some(project) = &self.project {
            for value in project.scripts.iter().flatten().map(|(_, value)| value) {
                add_module(value);
            }
            for group in project.entry_points.iter().flatten().map(|(_, group)| group) {
                for value in group.values() {
                    add_module(value);
                }
            }
        }
        modules
    }
}

/// Parses `<root>/pyproject.toml`, returning None if it's missing or unparsable
pub fn read(root: &Path) -> Option<PyprojectToml> {
    let content = fs::read_to_string(root.join("pyproject.toml")).ok()?;
    toml::from_str(&content).ok()
}

/// A minimal pyproject.toml so uv can resolve and export. The project name
/// comes from the directory name, dependencies are seeded from an existing
/// requirements.txt
pub fn generate_minimal(root: &Path, python_version: &str) -> String {
    let name = root
        .file_name()
        .map(|name| sanitize_project_name(&name.to_string_lossy()))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "app".to_string());

    let dependencies = requirements::packages(&root.join("requirements.txt"));
    let dependencies = if dependencies.is_empty() {
        "[]".to_string()
    } else {
        let entries: Vec<String> = dependencies
            .iter()
            .map(|dep| format!("    \"{}\",", dep.replace('"', "")))
            .collect();
        format!("[\n{}\n]", entries.join("\n"))
    };

    format!(
        "[project]\n\
         name = \"{}\"\n\
         version = \"0.1.0\"\n\
         requires-python = \">={}\"\n\
         dependencies = {}\n",
        name,
        major_minor(python_version),
        dependencies
    )
}

/// PEP 503-ish normalization: lowercase, runs of non-alphanumerics become a
/// single dash
fn sanitize_project_name(raw: &str) -> String {
    let mut name = String::new();
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            name.push(c.to_ascii_lowercase());
        } else if !name.ends_with('-') && !name.is_empty() {
            name.push('-');
        }
    }
    name.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod test {
    use super::{generate_minimal, read, sanitize_project_name};
    use fs_err as fs;
    use indoc::indoc;
    use tempfile::TempDir;

    fn write_pyproject(content: &str) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("pyproject.toml"), content).unwrap();
        temp_dir
    }

    #[test]
    fn test_read_project_fields() {
        let temp_dir = write_pyproject(indoc! {r#"
            [project]
            name = "my-app"
            version = "1.2.3"
            requires-python = ">=3.11"

            [project.scripts]
            serve = "my_app.server:main"
            tool = "my_app.cli:run"

            [project.entry-points."my_app.plugins"]
            default = "my_app.plugins.default:Plugin"
        "#});

        let pyproject = read(temp_dir.path()).unwrap();
        assert_eq!(pyproject.name(), Some("my-app"));
        assert_eq!(pyproject.requires_python(), Some(">=3.11"));
        assert_eq!(
            pyproject.entry_point_modules(),
            ["my_app.server", "my_app.cli", "my_app.plugins.default"]
        );
    }

    #[test]
    fn test_read_tolerates_missing_sections() {
        let temp_dir = write_pyproject("[build-system]\nrequires = [\"hatchling\"]\n");
        let pyproject = read(temp_dir.path()).unwrap();
        assert_eq!(pyproject.name(), None);
        assert_eq!(pyproject.requires_python(), None);
        assert!(pyproject.entry_point_modules().is_empty());
    }

    #[test]
    fn test_read_missing_or_broken() {
        let temp_dir = TempDir::new().unwrap();
        assert!(read(temp_dir.path()).is_none());
        fs::write(temp_dir.path().join("pyproject.toml"), "[project\n").unwrap();
        assert!(read(temp_dir.path()).is_none());
    }

    #[test]
    fn test_generate_minimal() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("My Fancy App");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("requirements.txt"), "flask==3.0.0\n# a comment\n").unwrap();

        let generated = generate_minimal(&root, "3.12.7");
        // The generated file must itself parse
        let pyproject: super::PyprojectToml = toml::from_str(&generated).unwrap();
        assert_eq!(pyproject.name(), Some("my-fancy-app"));
        assert_eq!(pyproject.requires_python(), Some(">=3.12"));
        assert!(generated.contains("\"flask==3.0.0\""));
    }

    #[test]
    fn test_generate_minimal_no_requirements() {
        let temp_dir = TempDir::new().unwrap();
        let generated = generate_minimal(temp_dir.path(), "3.11.4");
        assert!(generated.contains("dependencies = []"));
    }

    #[test]
    fn test_sanitize_project_name() {
        assert_eq!(sanitize_project_name("My Fancy App"), "my-fancy-app");
        assert_eq!(sanitize_project_name("app_2.0"), "app-2-0");
        assert_eq!(sanitize_project_name("---"), "");
    }
}
