pub use crate::cli::{run_cli, Cli};
pub use crate::manifest::ManifestError;

mod agent_dir;
mod check;
mod cli;
mod diagnose;
pub mod manifest;
pub mod output;
pub mod pyproject;
pub mod python_version;
mod regenerate;
pub mod requirements;
pub mod tools;
