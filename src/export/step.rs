use anyhow::Result;
use colored::*;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::{ExportContext, args, expect_file, export_failed, prepare_target};
use crate::config::StepConfig;
use crate::feedback::is_missing_model_error;
use crate::runner::{CommandRunner, Verbosity};

const STAGE: &str = "STEP";

fn base_args(pcb: &Path, out: &Path) -> Vec<OsString> {
    let mut a = args(["pcb", "export", "step"]);
    a.push(pcb.into());
    a.push("-o".into());
    a.push(out.into());
    a
}

pub fn step_args(pcb: &Path, out: &Path, cfg: &StepConfig) -> Vec<OsString> {
    let mut a = base_args(pcb, out);
    if cfg.include_tracks_zones {
        a.extend(args(["--include-tracks", "--include-zones"]));
    }
    let flags = [
        (cfg.include_pads, "--include-pads"),
        (cfg.include_inner_copper, "--include-inner-copper"),
        (cfg.include_silkscreen, "--include-silkscreen"),
        (cfg.include_soldermask, "--include-soldermask"),
        (cfg.board_only, "--board-only"),
        (cfg.fuse_shapes, "--fuse-shapes"),
    ];
    a.extend(
        flags
            .iter()
            .filter(|(on, _)| *on)
            .map(|(_, flag)| OsString::from(*flag)),
    );
    if let Some(origin) = cfg.user_origin.as_deref().filter(|o| !o.is_empty()) {
        match origin.to_lowercase().as_str() {
            "grid" => a.push("--grid-origin".into()),
            "drill" => a.push("--drill-origin".into()),
            _ => a.extend(args(["--user-origin", origin])),
        }
    }
    a
}

/// Retry without component models; only includes that make sense for a bare board are kept.
pub fn fallback_args(pcb: &Path, out: &Path, cfg: &StepConfig) -> Vec<OsString> {
    let mut a = base_args(pcb, out);
    a.push("--board-only".into());
    if cfg.include_silkscreen {
        a.push("--include-silkscreen".into());
    }
    if cfg.include_soldermask {
        a.push("--include-soldermask".into());
    }
    a
}

pub fn export_step(
    ctx: &ExportContext,
    runner: &mut CommandRunner,
    cfg: &StepConfig,
) -> Result<PathBuf> {
    let out = ctx.output_path(".step");
    prepare_target(&out)?;

    let res = ctx.try_run(runner, STAGE, step_args(&ctx.project.pcb, &out, cfg));
    if res.success() {
        expect_file(STAGE, &out)?;
        return Ok(out);
    }

    if cfg.ignore_missing_models && is_missing_model_error(res.error_text()) {
        eprintln!(
            "   {} STEP export reported missing 3D models; attempting fallback.",
            "⚠".yellow()
        );
        if runner.verbosity() != Verbosity::Quiet {
            for line in res.error_text().lines() {
                eprintln!("     {}", line.dimmed());
            }
        }
        if cfg.fallback_board_only {
            let retry = ctx.try_run(runner, STAGE, fallback_args(&ctx.project.pcb, &out, cfg));
            if retry.success() && expect_file(STAGE, &out).is_ok() {
                return Ok(out);
            }
        }
    }

    // The first failure explains the problem better than the retry's
    Err(export_failed(STAGE, &res).into())
}
