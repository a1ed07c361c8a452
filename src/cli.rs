use crate::regenerate::ContentType;
use crate::{check, diagnose, regenerate};
use clap::Parser;

/// Deployment helpers for Python apps on Posit Connect (Git-backed)
#[derive(Parser)]
#[clap(version)]
pub enum Cli {
    /// Report Python/uv/rsconnect versions, key files, manifest details and
    /// package counts
    Diagnose {
        /// Include detailed manifest and requirements output
        #[clap(long, short)]
        verbose: bool,
    },
    /// Run the pre-deploy readiness checklist
    Check,
    /// Export the dependency lock via uv and rewrite manifest.json via
    /// rsconnect write-manifest
    RegenerateManifest {
        /// Content type (auto-detected if not specified)
        #[clap(long = "type", value_enum)]
        content_type: Option<ContentType>,
        /// Skip the uv export step and use the existing requirements.txt
        #[clap(long)]
        no_uv_export: bool,
        /// Don't patch allow_uv: true into the manifest
        #[clap(long)]
        no_allow_uv: bool,
    },
}

/// Runs a subcommand in the current working directory. `Ok(Some(code))` is an
/// exit code to propagate, `Ok(None)` means all clean
pub fn run_cli(cli: Cli) -> anyhow::Result<Option<i32>> {
    match cli {
        Cli::Diagnose { verbose } => diagnose::diagnose(verbose),
        Cli::Check => check::pre_deploy_check(),
        Cli::RegenerateManifest {
            content_type,
            no_uv_export,
            no_allow_uv,
        } => regenerate::regenerate_manifest(content_type, no_uv_export, no_allow_uv),
    }
}

#[cfg(test)]
mod test {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn test_parse_regenerate_manifest_flags() {
        let cli = Cli::try_parse_from([
            "connect-preflight",
            "regenerate-manifest",
            "--type",
            "fastapi",
            "--no-allow-uv",
        ])
        .unwrap();
        match cli {
            Cli::RegenerateManifest {
                content_type,
                no_uv_export,
                no_allow_uv,
            } => {
                assert_eq!(format!("{}", content_type.unwrap()), "fastapi");
                assert!(!no_uv_export);
                assert!(no_allow_uv);
            }
            _ => panic!("Expected regenerate-manifest"),
        }
    }

    #[test]
    fn test_parse_bad_content_type() {
        assert!(Cli::try_parse_from([
            "connect-preflight",
            "regenerate-manifest",
            "--type",
            "gradio"
        ])
        .is_err());
    }
}
