//! `manifest.json`: what a run produced, with which tool and configuration.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ExportConfig;
use crate::project::Project;
use crate::runner::Invocation;
use crate::toolchain::KicadCli;

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Kinds of artifact a run can produce, in export order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    GerbersZip,
    Gerbers,
    Step,
    PcbPdf,
    SchematicsPdf,
    BomCsv,
}

impl ArtifactKind {
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::GerbersZip => "gerbers_zip",
            ArtifactKind::Gerbers => "gerbers",
            ArtifactKind::Step => "step",
            ArtifactKind::PcbPdf => "pcb_pdf",
            ArtifactKind::SchematicsPdf => "schematics_pdf",
            ArtifactKind::BomCsv => "bom_csv",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectInfo {
    #[serde(flatten)]
    pub project: Project,
    pub safe_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HostInfo {
    pub os: String,
    pub arch: String,
    pub tool_version: String,
}

impl HostInfo {
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub kicad_cli_path: PathBuf,
    pub kicad_cli_version: String,
}

impl From<&KicadCli> for ToolInfo {
    fn from(cli: &KicadCli) -> Self {
        Self {
            kicad_cli_path: cli.path.clone(),
            kicad_cli_version: cli.version.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub project: ProjectInfo,
    pub tag: String,
    pub tag_safe: String,
    pub timestamp_utc: String,
    pub host: HostInfo,
    pub tools: ToolInfo,
    pub config: ExportConfig,
    pub outputs: BTreeMap<ArtifactKind, Vec<PathBuf>>,
    pub outputs_dir: PathBuf,
    pub invoked_commands: Vec<Invocation>,
}

impl Manifest {
    /// Every produced file, in export order
    pub fn artifacts(&self) -> Vec<&Path> {
        self.outputs
            .values()
            .flatten()
            .map(PathBuf::as_path)
            .collect()
    }

    pub fn path_in(out_dir: &Path) -> PathBuf {
        out_dir.join(MANIFEST_FILE_NAME)
    }

    /// Write pretty-printed JSON to `<out_dir>/manifest.json`.
    pub fn write(&self, out_dir: &Path) -> Result<PathBuf> {
        let path = Self::path_in(out_dir);
        let json = serde_json::to_string_pretty(self).context("Failed to serialize manifest")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// UTC timestamp in the manifest's format, e.g. `2026-10-19T08:30:00Z`
pub fn timestamp_utc() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
