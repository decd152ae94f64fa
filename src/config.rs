//! Export configuration (`kicad-export.toml`).
//!
//! Every section carries `#[serde(default)]`, so a user file only needs the
//! keys it changes: tables merge with the defaults, lists replace them.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ExportError;

/// Config file picked up from the project directory when `--config` is absent.
pub const CONFIG_FILE_NAME: &str = "kicad-export.toml";

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    pub general: GeneralConfig,
    pub gerbers: GerberConfig,
    pub pcb_pdf: PcbPdfConfig,
    pub schematics_pdf: SchematicPdfConfig,
    pub step: StepConfig,
    pub bom: BomConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GeneralConfig {
    pub clean_output: bool,
    pub zip_gerbers: bool,
    /// Explicit path to `kicad-cli`, tried before PATH
    pub kicad_cli: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            clean_output: true,
            zip_gerbers: true,
            kicad_cli: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GerberConfig {
    pub enabled: bool,
    pub layers: Vec<String>,
    pub drill: DrillConfig,
}

impl Default for GerberConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            layers: string_list(&[
                "F.Cu", "B.Cu", "F.Paste", "B.Paste", "F.SilkS", "B.SilkS", "F.Mask", "B.Mask",
                "Edge.Cuts",
            ]),
            drill: DrillConfig::default(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DrillUnits {
    Mm,
    #[serde(alias = "in")]
    Inch,
}

impl DrillUnits {
    /// Value expected by `--excellon-units`
    pub fn as_cli(&self) -> &'static str {
        match self {
            DrillUnits::Mm => "mm",
            DrillUnits::Inch => "in",
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DrillConfig {
    pub enabled: bool,
    pub units: DrillUnits,
    /// gerber | gerberx2 | pdf | ps | dxf | svg; unset skips the drill map
    pub map_format: Option<String>,
    /// false writes plated and non-plated holes to separate files
    pub merge_npth: bool,
}

impl Default for DrillConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            units: DrillUnits::Mm,
            map_format: Some("gerber".to_string()),
            merge_npth: false,
        }
    }
}

impl DrillConfig {
    /// Map format as KiCad 8/9 spell it; the legacy `gerber` means `gerberx2`.
    pub fn map_format_cli(&self) -> Option<String> {
        let fmt = self.map_format.as_deref()?.trim().to_lowercase();
        match fmt.as_str() {
            "" => None,
            "gerber" => Some("gerberx2".to_string()),
            _ => Some(fmt),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PcbPdfConfig {
    pub enabled: bool,
    pub layers: Vec<String>,
    pub monochrome: bool,
    pub include_title_block: bool,
}

impl Default for PcbPdfConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            layers: string_list(&[
                "F.Cu", "B.Cu", "F.SilkS", "B.SilkS", "F.Mask", "B.Mask", "Edge.Cuts",
            ]),
            monochrome: false,
            include_title_block: true,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SchematicPdfConfig {
    pub enabled: bool,
    pub monochrome: bool,
}

impl Default for SchematicPdfConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            monochrome: false,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StepConfig {
    pub enabled: bool,
    pub include_tracks_zones: bool,
    pub include_pads: bool,
    pub include_inner_copper: bool,
    pub include_silkscreen: bool,
    pub include_soldermask: bool,
    pub board_only: bool,
    pub fuse_shapes: bool,
    /// `grid`, `drill`, or explicit coordinates such as `25.4x25.4mm`
    pub user_origin: Option<String>,
    /// Treat missing 3D models as a warning rather than a failure
    pub ignore_missing_models: bool,
    /// Retry with `--board-only` when models are missing
    pub fallback_board_only: bool,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            include_tracks_zones: false,
            include_pads: false,
            include_inner_copper: false,
            include_silkscreen: false,
            include_soldermask: false,
            board_only: false,
            fuse_shapes: false,
            user_origin: None,
            ignore_missing_models: true,
            fallback_board_only: true,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BomFormat {
    Csv,
    Tsv,
}

impl BomFormat {
    /// Name of the built-in `--format-preset`
    pub fn preset(&self) -> &'static str {
        match self {
            BomFormat::Csv => "CSV",
            BomFormat::Tsv => "TSV",
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BomConfig {
    pub enabled: bool,
    pub output_format: BomFormat,
    pub fields: Vec<String>,
    /// Column headers; ignored unless there is one per final field
    pub labels: Option<Vec<String>>,
    pub group_by: Vec<String>,
}

impl Default for BomConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_format: BomFormat::Csv,
            fields: string_list(&[
                "Reference",
                "${QUANTITY}",
                "Value",
                "Footprint",
                "Supplier",
                "Supplier Part Number",
                "${DNP}",
            ]),
            labels: None,
            group_by: string_list(&["Value", "Footprint"]),
        }
    }
}

fn string_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl ExportConfig {
    /// Force both PDF exports to color (`Some(false)`) or black and white (`Some(true)`).
    pub fn apply_monochrome_override(&mut self, monochrome: Option<bool>) {
        if let Some(mono) = monochrome {
            self.pcb_pdf.monochrome = mono;
            self.schematics_pdf.monochrome = mono;
        }
    }
}

/// Parse config text on top of the defaults.
pub fn parse_config(content: &str) -> Result<ExportConfig, ExportError> {
    toml::from_str(content).map_err(|e| ExportError::InvalidConfig(e.to_string()))
}

/// Load a config file. A missing file is an error: the user asked for it explicitly.
pub fn load_config(path: &Path) -> Result<ExportConfig> {
    if !path.exists() {
        return Err(
            ExportError::InvalidConfig(format!("config file not found: {}", path.display())).into(),
        );
    }
    let content = fs::read_to_string(path).map_err(|e| {
        ExportError::InvalidConfig(format!("failed to read {}: {}", path.display(), e))
    })?;
    let config = parse_config(&content).map_err(|e| match e {
        ExportError::InvalidConfig(msg) => {
            ExportError::InvalidConfig(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })?;
    Ok(config)
}

/// Resolve which config applies: the explicit path, else `kicad-export.toml`
/// in the project directory, else the built-in defaults.
pub fn resolve_config(
    explicit: Option<&Path>,
    project_dir: &Path,
) -> Result<(ExportConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        return Ok((load_config(path)?, Some(path.to_path_buf())));
    }
    let discovered = project_dir.join(CONFIG_FILE_NAME);
    if discovered.is_file() {
        return Ok((load_config(&discovered)?, Some(discovered)));
    }
    Ok((ExportConfig::default(), None))
}

/// Commented default config written by `kicad-export init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# kicad-export configuration
# Only the keys you change are needed; everything else keeps its default.

[general]
clean_output = true     # empty the output directory before exporting
zip_gerbers = true      # pack Gerber + drill files into <name>_<tag>_gerbers.zip
# kicad_cli = "/usr/bin/kicad-cli"

[gerbers]
enabled = true
layers = ["F.Cu", "B.Cu", "F.Paste", "B.Paste", "F.SilkS", "B.SilkS", "F.Mask", "B.Mask", "Edge.Cuts"]

[gerbers.drill]
enabled = true
units = "mm"            # mm | inch
map_format = "gerber"   # gerber | pdf | ps | dxf | svg
merge_npth = false

[pcb_pdf]
enabled = true
layers = ["F.Cu", "B.Cu", "F.SilkS", "B.SilkS", "F.Mask", "B.Mask", "Edge.Cuts"]
monochrome = false
include_title_block = true

[schematics_pdf]
enabled = true
monochrome = false

[step]
enabled = true
include_tracks_zones = false
board_only = false
# user_origin = "grid"  # grid | drill | 25.4x25.4mm
ignore_missing_models = true
fallback_board_only = true

[bom]
enabled = true
output_format = "csv"   # csv | tsv
fields = ["Reference", "${QUANTITY}", "Value", "Footprint", "Supplier", "Supplier Part Number", "${DNP}"]
group_by = ["Value", "Footprint"]
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let config = parse_config("").unwrap();
        assert_eq!(config, ExportConfig::default());
        assert!(config.general.clean_output);
        assert!(config.general.zip_gerbers);
        assert_eq!(config.gerbers.layers.len(), 9);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = parse_config(
            r#"
[gerbers.drill]
units = "in"

[bom]
enabled = false
"#,
        )
        .unwrap();
        assert_eq!(config.gerbers.drill.units, DrillUnits::Inch);
        assert!(config.gerbers.drill.enabled);
        assert!(config.gerbers.enabled);
        assert!(!config.bom.enabled);
        assert_eq!(config.bom.group_by, vec!["Value", "Footprint"]);
    }

    #[test]
    fn test_lists_replace_defaults() {
        let config = parse_config("[pcb_pdf]\nlayers = [\"F.Cu\"]\n").unwrap();
        assert_eq!(config.pcb_pdf.layers, vec!["F.Cu"]);
    }

    #[test]
    fn test_wrong_type_is_invalid_config() {
        let err = parse_config("[general]\nclean_output = \"yes\"\n").unwrap_err();
        assert!(matches!(err, ExportError::InvalidConfig(_)));
    }

    #[test]
    fn test_map_format_legacy_name() {
        let mut drill = DrillConfig::default();
        assert_eq!(drill.map_format_cli().as_deref(), Some("gerberx2"));
        drill.map_format = Some("PDF".into());
        assert_eq!(drill.map_format_cli().as_deref(), Some("pdf"));
        drill.map_format = None;
        assert_eq!(drill.map_format_cli(), None);
    }

    #[test]
    fn test_monochrome_override() {
        let mut config = ExportConfig::default();
        config.apply_monochrome_override(Some(true));
        assert!(config.pcb_pdf.monochrome && config.schematics_pdf.monochrome);
        config.apply_monochrome_override(None);
        assert!(config.pcb_pdf.monochrome);
        config.apply_monochrome_override(Some(false));
        assert!(!config.schematics_pdf.monochrome);
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let config = parse_config(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert_eq!(config, ExportConfig::default());
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }
}
