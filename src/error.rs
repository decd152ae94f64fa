//! Error taxonomy for an export run.
//!
//! Everything else in the crate uses `anyhow::Result`; these variants are the
//! failures the CLI needs to tell apart when choosing an exit code.

use std::path::PathBuf;

/// Failures that abort an export run
#[derive(Debug)]
pub enum ExportError {
    /// `kicad-cli` could not be located or did not answer `--version`
    ToolNotFound { tried: Vec<String> },
    /// Project directory or project files are missing
    ProjectNotFound(String),
    /// More than one `.kicad_pro` and no `--project-name`
    AmbiguousProject(Vec<String>),
    /// Config file missing or malformed
    InvalidConfig(String),
    /// The external tool exited non-zero
    ExportFailed {
        stage: &'static str,
        code: i32,
        output: String,
    },
    /// The tool reported success but the expected file is missing or empty
    MissingOutput { stage: &'static str, path: PathBuf },
}

impl ExportError {
    /// Process exit code for this failure: `2` for setup problems, `1` for a failed export.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExportError::ToolNotFound { .. }
            | ExportError::ProjectNotFound(_)
            | ExportError::AmbiguousProject(_)
            | ExportError::InvalidConfig(_) => 2,
            ExportError::ExportFailed { .. } | ExportError::MissingOutput { .. } => 1,
        }
    }
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::ToolNotFound { tried } => {
                write!(f, "Could not find 'kicad-cli'. Tried: {}", tried.join(", "))
            }
            ExportError::ProjectNotFound(msg) => write!(f, "{}", msg),
            ExportError::AmbiguousProject(names) => write!(
                f,
                "Multiple .kicad_pro files found: {}. Use --project-name to disambiguate.",
                names.join(", ")
            ),
            ExportError::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
            ExportError::ExportFailed {
                stage,
                code,
                output,
            } => {
                write!(f, "{} export failed (exit code {})", stage, code)?;
                if !output.is_empty() {
                    write!(f, ": {}", output)?;
                }
                Ok(())
            }
            ExportError::MissingOutput { stage, path } => write!(
                f,
                "{} export failed: expected output not produced at {}",
                stage,
                path.display()
            ),
        }
    }
}

impl std::error::Error for ExportError {}

/// Map any error from a run to the process exit code.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ExportError>())
        .map(ExportError::exit_code)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_errors_exit_with_two() {
        assert_eq!(ExportError::AmbiguousProject(vec![]).exit_code(), 2);
        assert_eq!(ExportError::ToolNotFound { tried: vec![] }.exit_code(), 2);
        assert_eq!(ExportError::InvalidConfig("x".into()).exit_code(), 2);
    }

    #[test]
    fn test_export_failure_exits_with_one() {
        let err = ExportError::ExportFailed {
            stage: "STEP",
            code: 3,
            output: "boom".into(),
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "STEP export failed (exit code 3): boom");
    }

    #[test]
    fn test_exit_code_through_context() {
        let err = anyhow::Error::new(ExportError::ProjectNotFound("gone".into()))
            .context("while detecting project");
        assert_eq!(exit_code_for(&err), 2);
        assert_eq!(exit_code_for(&anyhow::anyhow!("plain")), 1);
    }
}
