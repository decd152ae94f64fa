//! Gerber and Excellon drill export.
//!
//! Both commands write into a scratch directory. The staged files are then
//! either zipped into `<base>_gerbers.zip` or moved into `gerbers/` under
//! sanitized names; the scratch directory never survives the export.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use super::{ExportContext, args, move_file, scratch_dir};
use crate::config::{DrillConfig, GerberConfig};
use crate::error::ExportError;
use crate::manifest::ArtifactKind;
use crate::package::{self, sanitize_file_name};
use crate::runner::CommandRunner;

const STAGE_DIR: &str = "_gerbers_tmp";
const GERBER_DIR: &str = "gerbers";

pub fn gerber_args(pcb: &Path, out: &Path, layers: &[String]) -> Vec<OsString> {
    let mut a = args(["pcb", "export", "gerbers"]);
    a.push(pcb.into());
    a.push("-o".into());
    a.push(out.into());
    if !layers.is_empty() {
        a.push("--layers".into());
        a.push(layers.join(",").into());
    }
    a
}

pub fn drill_args(pcb: &Path, out: &Path, drill: &DrillConfig) -> Vec<OsString> {
    let mut a = args(["pcb", "export", "drill"]);
    a.push(pcb.into());
    a.push("-o".into());
    a.push(out.into());
    a.extend(args(["--excellon-units", drill.units.as_cli()]));
    if let Some(map) = drill.map_format_cli() {
        a.extend(args(["--generate-map", "--map-format"]));
        a.push(map.into());
    }
    if !drill.merge_npth {
        a.push("--excellon-separate-th".into());
    }
    a
}

/// Export Gerbers (and drill files when enabled) and package them.
pub fn export_gerbers(
    ctx: &ExportContext,
    runner: &mut CommandRunner,
    cfg: &GerberConfig,
    zip: bool,
) -> Result<(ArtifactKind, Vec<PathBuf>)> {
    let stage = scratch_dir(ctx.out_dir, STAGE_DIR)?;
    let result = stage_and_collect(ctx, runner, cfg, zip, &stage);
    fs::remove_dir_all(&stage).ok();
    result
}

fn stage_and_collect(
    ctx: &ExportContext,
    runner: &mut CommandRunner,
    cfg: &GerberConfig,
    zip: bool,
    stage: &Path,
) -> Result<(ArtifactKind, Vec<PathBuf>)> {
    ctx.run(runner, "Gerber", gerber_args(&ctx.project.pcb, stage, &cfg.layers))?;

    if cfg.drill.enabled {
        ctx.run(runner, "Drill", drill_args(&ctx.project.pcb, stage, &cfg.drill))?;
    }

    let staged = package::files_under(stage)?;
    if staged.is_empty() {
        return Err(ExportError::MissingOutput {
            stage: "Gerber",
            path: stage.to_path_buf(),
        }
        .into());
    }

    if zip {
        let zip_path = ctx.output_path("_gerbers.zip");
        package::zip_dir(&zip_path, stage)
            .with_context(|| format!("Failed to write {}", zip_path.display()))?;
        return Ok((ArtifactKind::GerbersZip, vec![zip_path]));
    }

    let dest_dir = ctx.out_dir.join(GERBER_DIR);
    fs::create_dir_all(&dest_dir)
        .with_context(|| format!("Failed to create {}", dest_dir.display()))?;
    let mut taken = HashSet::new();
    let mut moved = Vec::with_capacity(staged.len());
    for file in staged {
        let name = file
            .file_name()
            .map(|n| sanitize_file_name(&n.to_string_lossy()))
            .unwrap_or_default();
        let dest = dest_dir.join(package::unique_name(&name, &mut taken));
        move_file(&file, &dest)?;
        moved.push(dest);
    }
    moved.sort();
    Ok((ArtifactKind::Gerbers, moved))
}
