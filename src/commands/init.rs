//! Init command handler
//!
//! Handles `kicad-export init`: writes a commented default config.

use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::Path;

use crate::config::{CONFIG_FILE_NAME, DEFAULT_CONFIG_TEMPLATE};

/// Write `kicad-export.toml` into `project_dir`. Returns `false` when one already exists.
pub fn init_config(project_dir: &Path) -> Result<bool> {
    let path = project_dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        println!(
            "{} Config already exists at {}",
            "!".yellow(),
            path.display()
        );
        return Ok(false);
    }

    fs::create_dir_all(project_dir)
        .with_context(|| format!("Failed to create {}", project_dir.display()))?;
    fs::write(&path, DEFAULT_CONFIG_TEMPLATE).context("Failed to write config file")?;

    println!("{} Created {}", "✓".green(), path.display());
    println!("   Edit it, then run {} to export.", "kicad-export".cyan());
    Ok(true)
}
