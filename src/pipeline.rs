//! The export run, start to finish.
//!
//! Config, project and tool are resolved first; then the enabled exporters run
//! in a fixed order. The first failure aborts the run, so later artifacts and
//! the manifest are never written for a failed export.

use anyhow::{Context, Result};
use colored::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{self, ExportConfig};
use crate::error::ExportError;
use crate::export::{self, ExportContext};
use crate::manifest::{self, ArtifactKind, HostInfo, Manifest, ProjectInfo, ToolInfo};
use crate::package::{self, Labels};
use crate::project::{self, Project};
use crate::runner::{CommandRunner, Verbosity};
use crate::toolchain::{self, KicadCli};
use crate::ui;

/// Inputs of one run, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub project_dir: PathBuf,
    pub project_name: Option<String>,
    pub tag: Option<String>,
    pub config_path: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    /// `Some(true)` forces monochrome PDFs, `Some(false)` forces color
    pub monochrome: Option<bool>,
    pub verbosity: Verbosity,
}

/// Run every enabled export and write the manifest.
pub fn run(options: &ExportOptions) -> Result<Manifest> {
    let project_dir = absolute(&options.project_dir);

    let (mut config, config_source) =
        config::resolve_config(options.config_path.as_deref(), &project_dir)?;
    config.apply_monochrome_override(options.monochrome);

    let project = project::detect_project(&project_dir, options.project_name.as_deref())?;

    let tag = options.tag.clone().unwrap_or_else(package::default_tag);
    let labels = Labels::new(&project.name, &tag);
    let out_dir = match &options.out_dir {
        Some(dir) => absolute(dir),
        None => project.dir.join("Exports").join(labels.base()),
    };
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;
    if config.general.clean_output {
        // Compare resolved paths: `..` and symlinks must not hide the project.
        let real_out = fs::canonicalize(&out_dir)
            .with_context(|| format!("Failed to resolve {}", out_dir.display()))?;
        let real_project = fs::canonicalize(&project.dir)
            .with_context(|| format!("Failed to resolve {}", project.dir.display()))?;
        if real_project.starts_with(&real_out) {
            return Err(ExportError::InvalidConfig(format!(
                "refusing to clean {}: it contains the project; pick another --out-dir or set clean_output = false",
                out_dir.display()
            ))
            .into());
        }
        package::clean_output_dir(&out_dir)?;
    }

    let mut runner = CommandRunner::new(options.verbosity);
    let cli = toolchain::find_kicad_cli(config.general.kicad_cli.as_deref(), &mut runner)?;

    let quiet = options.verbosity == Verbosity::Quiet;
    if !quiet {
        ui::print_header(&cli, &project, &out_dir, &tag, config_source.as_deref());
    }

    let ctx = ExportContext {
        cli: &cli,
        project: &project,
        out_dir: &out_dir,
        labels: &labels,
    };
    let outputs = export_all(&ctx, &mut runner, &config, quiet)?;

    let manifest = build_manifest(project, &labels, &cli, config, outputs, out_dir, runner);
    let manifest_path = manifest.write(&manifest.outputs_dir)?;

    if !quiet {
        ui::print_summary(&manifest, &manifest_path);
    }
    Ok(manifest)
}

fn export_all(
    ctx: &ExportContext,
    runner: &mut CommandRunner,
    config: &ExportConfig,
    quiet: bool,
) -> Result<BTreeMap<ArtifactKind, Vec<PathBuf>>> {
    let mut outputs = BTreeMap::new();
    let step_done = |kind: ArtifactKind, paths: &[PathBuf]| {
        if !quiet {
            for path in paths {
                let name = path.file_name().unwrap_or_default().to_string_lossy();
                println!("   {} {} {}", "✓".green(), kind.label().dimmed(), name);
            }
        }
    };

    if config.gerbers.enabled {
        announce(quiet, "Gerbers + drill");
        let (kind, files) = export::gerbers::export_gerbers(
            ctx,
            runner,
            &config.gerbers,
            config.general.zip_gerbers,
        )?;
        step_done(kind, &files);
        outputs.insert(kind, files);
    }

    if config.step.enabled {
        announce(quiet, "STEP model");
        let path = export::step::export_step(ctx, runner, &config.step)?;
        step_done(ArtifactKind::Step, std::slice::from_ref(&path));
        outputs.insert(ArtifactKind::Step, vec![path]);
    }

    if config.pcb_pdf.enabled {
        announce(quiet, "PCB PDF");
        let path = export::pdf::export_pcb_pdf(ctx, runner, &config.pcb_pdf)?;
        step_done(ArtifactKind::PcbPdf, std::slice::from_ref(&path));
        outputs.insert(ArtifactKind::PcbPdf, vec![path]);
    }

    if config.schematics_pdf.enabled {
        announce(quiet, "Schematic PDF");
        let path = export::pdf::export_sch_pdf(ctx, runner, &config.schematics_pdf)?;
        step_done(ArtifactKind::SchematicsPdf, std::slice::from_ref(&path));
        outputs.insert(ArtifactKind::SchematicsPdf, vec![path]);
    }

    if config.bom.enabled {
        announce(quiet, "BOM");
        let path = export::bom::export_bom(ctx, runner, &config.bom)?;
        step_done(ArtifactKind::BomCsv, std::slice::from_ref(&path));
        outputs.insert(ArtifactKind::BomCsv, vec![path]);
    }

    Ok(outputs)
}

fn announce(quiet: bool, what: &str) {
    if !quiet {
        println!("{} Exporting {}...", "→".cyan(), what);
    }
}

fn build_manifest(
    project: Project,
    labels: &Labels,
    cli: &KicadCli,
    config: ExportConfig,
    outputs: BTreeMap<ArtifactKind, Vec<PathBuf>>,
    out_dir: PathBuf,
    runner: CommandRunner,
) -> Manifest {
    Manifest {
        project: ProjectInfo {
            project,
            safe_name: labels.safe_name.clone(),
        },
        tag: labels.tag.clone(),
        tag_safe: labels.tag_safe.clone(),
        timestamp_utc: manifest::timestamp_utc(),
        host: HostInfo::current(),
        tools: ToolInfo::from(cli),
        config,
        outputs,
        outputs_dir: out_dir,
        invoked_commands: runner.into_invoked(),
    }
}

// Relative paths are resolved against the working directory; the path need not exist yet.
fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
