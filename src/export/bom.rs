//! Bill of materials export.
//!
//! Uses the KiCad 8/9 syntax (`--format-preset`, `--fields`, `--labels`,
//! `--group-by`). Supplier columns are always requested, and their absence
//! from the written header is reported as a warning.

use anyhow::{Context, Result};
use colored::*;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use super::{ExportContext, args, expect_file, prepare_target};
use crate::config::BomConfig;
use crate::runner::CommandRunner;

const STAGE: &str = "BOM";

const QUANTITY: &str = "${QUANTITY}";
const DNP: &str = "${DNP}";

/// Columns the BOM must carry for ordering
pub const REQUIRED_FIELDS: [&str; 2] = ["Supplier", "Supplier Part Number"];

const FALLBACK_FIELDS: [&str; 5] = ["Reference", QUANTITY, "Value", "Footprint", DNP];

/// Normalize quantity/DNP spellings, drop duplicates, append required supplier fields.
pub fn normalize_fields(fields: &[String]) -> Vec<String> {
    let source: Vec<&str> = if fields.is_empty() {
        FALLBACK_FIELDS.to_vec()
    } else {
        fields.iter().map(String::as_str).collect()
    };

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let normalized = source.into_iter().map(|f| {
        let f = f.trim();
        match f.to_lowercase().as_str() {
            "qty" | "quantity" | "${quantity}" => QUANTITY.to_string(),
            "dnp" | "${dnp}" => DNP.to_string(),
            _ => f.to_string(),
        }
    });
    for field in normalized.chain(REQUIRED_FIELDS.iter().map(|f| f.to_string())) {
        if seen.insert(field.clone()) {
            out.push(field);
        }
    }
    out
}

/// Column headers: the configured labels when they line up with `fields`.
pub fn column_labels(fields: &[String], configured: Option<&[String]>) -> Vec<String> {
    if let Some(labels) = configured.filter(|l| l.len() == fields.len()) {
        return labels.to_vec();
    }
    fields
        .iter()
        .map(|f| match f.as_str() {
            QUANTITY => "Qty".to_string(),
            DNP => "DNP".to_string(),
            other => other.to_string(),
        })
        .collect()
}

pub fn bom_args(sch: &Path, out: &Path, cfg: &BomConfig) -> Vec<OsString> {
    let mut a = args(["sch", "export", "bom"]);
    a.push(sch.into());
    a.push("-o".into());
    a.push(out.into());
    a.extend(args(["--format-preset", cfg.output_format.preset()]));

    let fields = normalize_fields(&cfg.fields);
    let labels = column_labels(&fields, cfg.labels.as_deref());
    a.push("--fields".into());
    a.push(fields.join(",").into());
    a.push("--labels".into());
    a.push(labels.join(",").into());

    if !cfg.group_by.is_empty() {
        a.push("--group-by".into());
        a.push(cfg.group_by.join(",").into());
    }
    a
}

pub fn export_bom(
    ctx: &ExportContext,
    runner: &mut CommandRunner,
    cfg: &BomConfig,
) -> Result<PathBuf> {
    let out = ctx.output_path("_BOM.csv");
    prepare_target(&out)?;
    ctx.run(runner, STAGE, bom_args(&ctx.project.sch, &out, cfg))?;
    expect_file(STAGE, &out)?;

    // Header problems never fail the export
    match missing_columns(&out) {
        Ok(missing) => {
            for col in missing {
                eprintln!(
                    "   {} BOM is missing expected column '{}'. Add this field to your symbols or update BOM settings.",
                    "⚠".yellow(),
                    col
                );
            }
        }
        Err(e) => eprintln!("   {} Could not check BOM header: {}", "⚠".yellow(), e),
    }
    Ok(out)
}

/// Required supplier columns absent from the BOM header.
pub fn missing_columns(path: &Path) -> Result<Vec<String>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let content = content.trim_start_matches('\u{feff}');
    let first_line = content.lines().next().unwrap_or_default();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(sniff_delimiter(first_line))
        .from_reader(content.as_bytes());
    let header: HashSet<String> = match reader.records().next() {
        Some(record) => record?.iter().map(|h| h.trim().to_string()).collect(),
        None => HashSet::new(),
    };

    Ok(REQUIRED_FIELDS
        .iter()
        .filter(|col| !header.contains(**col))
        .map(|col| col.to_string())
        .collect())
}

fn sniff_delimiter(line: &str) -> u8 {
    [b',', b'\t', b';']
        .into_iter()
        .max_by_key(|d| line.bytes().filter(|b| b == d).count())
        .filter(|d| line.as_bytes().contains(d))
        .unwrap_or(b',')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BomFormat;
    use crate::export::test_support::strings;

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_quantity_and_dnp_spellings() {
        let fields = normalize_fields(&owned(&["Reference", " Qty ", "quantity", "dnp", "Value"]));
        assert_eq!(
            fields,
            owned(&[
                "Reference",
                "${QUANTITY}",
                "${DNP}",
                "Value",
                "Supplier",
                "Supplier Part Number"
            ])
        );
    }

    #[test]
    fn test_normalize_empty_uses_fallback() {
        let fields = normalize_fields(&[]);
        assert_eq!(fields[0], "Reference");
        assert_eq!(&fields[5..], &["Supplier", "Supplier Part Number"]);
    }

    #[test]
    fn test_required_fields_not_duplicated() {
        let fields = normalize_fields(&owned(&["Supplier", "Reference"]));
        assert_eq!(
            fields,
            owned(&["Supplier", "Reference", "Supplier Part Number"])
        );
    }

    #[test]
    fn test_derived_labels() {
        let fields = owned(&["Reference", "${QUANTITY}", "${DNP}"]);
        assert_eq!(column_labels(&fields, None), owned(&["Reference", "Qty", "DNP"]));

        let wrong_len = owned(&["Ref"]);
        assert_eq!(
            column_labels(&fields, Some(wrong_len.as_slice())),
            owned(&["Reference", "Qty", "DNP"])
        );

        let custom = owned(&["Ref", "Count", "Skip"]);
        assert_eq!(column_labels(&fields, Some(custom.as_slice())), custom);
    }

    #[test]
    fn test_bom_args_tsv() {
        let cfg = BomConfig {
            output_format: BomFormat::Tsv,
            fields: owned(&["Reference", "Supplier", "Supplier Part Number"]),
            group_by: vec![],
            ..BomConfig::default()
        };
        let a = strings(&bom_args(Path::new("b.kicad_sch"), Path::new("b.csv"), &cfg));
        assert_eq!(
            &a[6..],
            &[
                "--format-preset",
                "TSV",
                "--fields",
                "Reference,Supplier,Supplier Part Number",
                "--labels",
                "Reference,Supplier,Supplier Part Number"
            ]
        );
    }

    #[test]
    fn test_missing_columns_comma() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("bom.csv");
        fs::write(&path, "\u{feff}\"Reference\",\"Qty\",\"Supplier\"\n\"R1\",\"1\",\"\"\n")?;
        assert_eq!(missing_columns(&path)?, vec!["Supplier Part Number"]);
        Ok(())
    }

    #[test]
    fn test_missing_columns_tab_complete() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("bom.tsv");
        fs::write(&path, "Reference\tSupplier\tSupplier Part Number\nR1\tX\tY\n")?;
        assert!(missing_columns(&path)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a;b;c"), b';');
        assert_eq!(sniff_delimiter("a\tb"), b'\t');
        assert_eq!(sniff_delimiter("single"), b',');
    }
}
