//! Reading and patching the manifest.json that Connect deploys from
//!
//! rsconnect write-manifest owns the file, we only read the handful of fields
//! the checks need and patch `python.package_manager.allow_uv` in place. The
//! patch goes through `serde_json::Value` so fields we don't model survive a
//! read-modify-write cycle.

use fs_err as fs;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("Invalid manifest.json: {0}")]
    Json(#[from] serde_json::Error),
}

/// The fields of manifest.json the checks care about
#[derive(Deserialize, Debug, Default)]
pub struct Manifest {
    #[serde(default)]
    pub metadata: Metadata,
    pub python: Option<PythonSection>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Metadata {
    pub content_type: Option<String>,
    /// Older rsconnect versions wrote appmode instead of content_type
    pub appmode: Option<String>,
    pub entrypoint: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct PythonSection {
    pub version: Option<String>,
    #[serde(default)]
    pub package_manager: PackageManager,
}

#[derive(Deserialize, Debug, Default)]
pub struct PackageManager {
    pub allow_uv: Option<bool>,
}

impl Manifest {
    pub fn content_type(&self) -> Option<&str> {
        self.metadata
            .content_type
            .as_deref()
            .or(self.metadata.appmode.as_deref())
    }

    pub fn entrypoint(&self) -> Option<&str> {
        self.metadata.entrypoint.as_deref()
    }

    pub fn python_version(&self) -> Option<&str> {
        self.python.as_ref()?.version.as_deref()
    }

    /// `Some(bool)` if allow_uv is explicitly set, `None` when Connect would
    /// fall back to the server default
    pub fn allow_uv(&self) -> Option<bool> {
        self.python.as_ref()?.package_manager.allow_uv
    }
}

/// Parses manifest.json, returning None if it's missing or unparsable
pub fn read(manifest_json: &Path) -> Option<Manifest> {
    let content = fs::read_to_string(manifest_json).ok()?;
    serde_json::from_str(&content).ok()
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PatchOutcome {
    Patched,
    /// The manifest has no python section, so there's nowhere to put the flag
    NoPythonSection,
}

/// Sets `python.package_manager.allow_uv = true` in manifest.json, preserving
/// everything else in the file. Idempotent
pub fn patch_allow_uv(manifest_json: &Path) -> Result<PatchOutcome, ManifestError> {
    let content = fs::read_to_string(manifest_json)?;
    let mut manifest: Value = serde_json::from_str(&content)?;

    let python = match manifest.get_mut("python").and_then(Value::as_object_mut) {
        Some(python) => python,
        None => return Ok(PatchOutcome::NoPythonSection),
    };
    let package_manager = python
        .entry("package_manager")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(package_manager) = package_manager {
        package_manager.insert("allow_uv".to_string(), Value::Bool(true));
    }

    let mut patched = serde_json::to_string_pretty(&manifest)?;
    patched.push('\n');
    fs::write(manifest_json, patched)?;
    Ok(PatchOutcome::Patched)
}
