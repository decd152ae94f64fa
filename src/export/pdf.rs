//! PCB layer and schematic PDF export.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use super::{ExportContext, args, expect_file, move_file, prepare_target, scratch_dir};
use crate::config::{PcbPdfConfig, SchematicPdfConfig};
use crate::error::ExportError;
use crate::runner::CommandRunner;

const PCB_STAGE: &str = "PCB PDF";
const SCH_STAGE: &str = "Schematic PDF";
const PCB_SCRATCH: &str = "_pcb_pdf_tmp";

/// `-o` is a directory for `pcb export pdf` in multipage mode.
pub fn pcb_pdf_args(pcb: &Path, out_dir: &Path, cfg: &PcbPdfConfig) -> Vec<OsString> {
    let mut a = args(["pcb", "export", "pdf"]);
    a.push(pcb.into());
    a.push("-o".into());
    a.push(out_dir.into());
    if !cfg.layers.is_empty() {
        a.push("--layers".into());
        a.push(cfg.layers.join(",").into());
    }
    // One layer per page in a single file
    a.push("--mode-multipage".into());
    if cfg.include_title_block {
        a.push("--include-border-title".into());
    }
    if cfg.monochrome {
        a.push("--black-and-white".into());
    }
    a
}

pub fn sch_pdf_args(sch: &Path, out: &Path, cfg: &SchematicPdfConfig) -> Vec<OsString> {
    let mut a = args(["sch", "export", "pdf"]);
    a.push(sch.into());
    a.push("-o".into());
    a.push(out.into());
    if cfg.monochrome {
        a.push("--black-and-white".into());
    }
    a
}

pub fn export_pcb_pdf(
    ctx: &ExportContext,
    runner: &mut CommandRunner,
    cfg: &PcbPdfConfig,
) -> Result<PathBuf> {
    let out = ctx.output_path("_PCB.pdf");
    let scratch = scratch_dir(ctx.out_dir, PCB_SCRATCH)?;
    let result = export_pcb_pdf_via(ctx, runner, cfg, &scratch, &out);
    fs::remove_dir_all(&scratch).ok();
    result.map(|_| out)
}

fn export_pcb_pdf_via(
    ctx: &ExportContext,
    runner: &mut CommandRunner,
    cfg: &PcbPdfConfig,
    scratch: &Path,
    out: &Path,
) -> Result<()> {
    ctx.run(
        runner,
        PCB_STAGE,
        pcb_pdf_args(&ctx.project.pcb, scratch, cfg),
    )?;

    let chosen = pick_pdf(scratch, &ctx.project.name)?.ok_or_else(|| ExportError::MissingOutput {
        stage: PCB_STAGE,
        path: scratch.to_path_buf(),
    })?;
    move_file(&chosen, out)?;
    expect_file(PCB_STAGE, out)
}

/// `<project>.pdf` when present, else the first PDF by name.
fn pick_pdf(dir: &Path, project_name: &str) -> Result<Option<PathBuf>> {
    let preferred = dir.join(format!("{}.pdf", project_name));
    if preferred.is_file() {
        return Ok(Some(preferred));
    }
    let mut pdfs = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file()
            && path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        {
            pdfs.push(path);
        }
    }
    pdfs.sort();
    Ok(pdfs.into_iter().next())
}

pub fn export_sch_pdf(
    ctx: &ExportContext,
    runner: &mut CommandRunner,
    cfg: &SchematicPdfConfig,
) -> Result<PathBuf> {
    let out = ctx.output_path(".pdf");
    prepare_target(&out)?;
    ctx.run(runner, SCH_STAGE, sch_pdf_args(&ctx.project.sch, &out, cfg))?;
    expect_file(SCH_STAGE, &out)?;
    Ok(out)
}
