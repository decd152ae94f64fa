//! Artifact exporters.
//!
//! Each exporter builds a `kicad-cli` argument list, runs it, and moves the
//! result to its fixed name in the output directory:
//!
//! | Artifact        | Output                              |
//! |-----------------|-------------------------------------|
//! | Gerbers + drill | `<base>_gerbers.zip` or `gerbers/`  |
//! | STEP            | `<base>.step`                       |
//! | PCB PDF         | `<base>_PCB.pdf`                    |
//! | Schematic PDF   | `<base>.pdf`                        |
//! | BOM             | `<base>_BOM.csv`                    |
//!
//! `<base>` is `{project}_{tag}` with unsafe characters replaced.

pub mod bom;
pub mod gerbers;
pub mod pdf;
pub mod step;

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ExportError;
use crate::package::Labels;
use crate::project::Project;
use crate::runner::{CommandRunner, RunResult};
use crate::toolchain::KicadCli;

/// Everything an exporter needs to know about the current run.
pub struct ExportContext<'a> {
    pub cli: &'a KicadCli,
    pub project: &'a Project,
    pub out_dir: &'a Path,
    pub labels: &'a Labels,
}

impl ExportContext<'_> {
    /// `<out_dir>/<base><suffix>`
    pub fn output_path(&self, suffix: &str) -> PathBuf {
        self.out_dir.join(format!("{}{}", self.labels.base(), suffix))
    }

    /// Run `kicad-cli` with `args`; a non-zero exit becomes `ExportFailed`.
    pub(crate) fn run(
        &self,
        runner: &mut CommandRunner,
        stage: &'static str,
        args: Vec<OsString>,
    ) -> Result<RunResult> {
        let res = self.try_run(runner, stage, args);
        if res.success() {
            Ok(res)
        } else {
            Err(export_failed(stage, &res).into())
        }
    }

    /// Like [`run`](Self::run) but hands back failures for the caller to inspect.
    pub(crate) fn try_run(
        &self,
        runner: &mut CommandRunner,
        stage: &'static str,
        args: Vec<OsString>,
    ) -> RunResult {
        runner.run(
            &self.cli.path,
            &args,
            Some(&self.project.dir),
            &format!("Exporting {}...", stage),
        )
    }
}

pub(crate) fn export_failed(stage: &'static str, res: &RunResult) -> ExportError {
    ExportError::ExportFailed {
        stage,
        code: res.code,
        output: res.error_text().to_string(),
    }
}

/// `kicad-cli` argument list: subcommand words followed by flags.
pub(crate) fn args<I, S>(items: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    items.into_iter().map(Into::into).collect()
}

/// Remove a stale copy so a silent tool failure cannot pass the output check.
pub(crate) fn prepare_target(path: &Path) -> Result<()> {
    if path.is_file() {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove stale {}", path.display()))?;
    }
    Ok(())
}

/// The tool exited 0; make sure it actually wrote something.
pub(crate) fn expect_file(stage: &'static str, path: &Path) -> Result<()> {
    let written = fs::metadata(path).map(|m| m.is_file() && m.len() > 0);
    if written.unwrap_or(false) {
        Ok(())
    } else {
        Err(ExportError::MissingOutput {
            stage,
            path: path.to_path_buf(),
        }
        .into())
    }
}

/// Fresh scratch directory inside the output directory.
pub(crate) fn scratch_dir(out_dir: &Path, name: &str) -> Result<PathBuf> {
    let dir = out_dir.join(name);
    if dir.exists() {
        fs::remove_dir_all(&dir)
            .with_context(|| format!("Failed to clear {}", dir.display()))?;
    }
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    Ok(dir)
}

/// Move `from` to `to`, replacing `to`.
pub(crate) fn move_file(from: &Path, to: &Path) -> Result<()> {
    prepare_target(to)?;
    if fs::rename(from, to).is_err() {
        fs::copy(from, to).with_context(|| {
            format!("Failed to move {} to {}", from.display(), to.display())
        })?;
        fs::remove_file(from).ok();
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn fixture(name: &str, tag: &str) -> (Project, KicadCli, Labels) {
        let dir = PathBuf::from("/work/boards");
        let project = Project {
            dir: dir.clone(),
            name: name.to_string(),
            pro: dir.join(format!("{}.kicad_pro", name)),
            pcb: dir.join(format!("{}.kicad_pcb", name)),
            sch: dir.join(format!("{}.kicad_sch", name)),
        };
        let cli = KicadCli::new(PathBuf::from("kicad-cli"), "9.0.1".to_string());
        (project, cli, Labels::new(name, tag))
    }

    pub fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }
}
