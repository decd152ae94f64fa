//! Doctor command handler
//!
//! Handles `kicad-export doctor`: checks that an export could start.

use anyhow::{Result, bail};
use colored::*;
use std::path::Path;

use crate::config;
use crate::project;
use crate::runner::{CommandRunner, Verbosity};
use crate::toolchain;

/// Oldest KiCad whose CLI accepts the flags the exporters pass
const MIN_KICAD_MAJOR: u32 = 8;

/// Run the `doctor` command for `project_dir`; `project_name` picks one of several projects.
pub fn run_doctor(
    project_dir: &Path,
    project_name: Option<&str>,
    config_path: Option<&Path>,
) -> Result<()> {
    println!("{} Running System Doctor...", "🚑".red());
    println!("-------------------------------");
    let mut problems = 0;

    print!("Checking OS... ");
    println!(
        "{} ({})",
        std::env::consts::OS.green(),
        std::env::consts::ARCH.cyan()
    );

    print!("Checking config... ");
    let config = match config::resolve_config(config_path, project_dir) {
        Ok((config, Some(path))) => {
            println!("{} ({})", "OK".green(), path.display());
            config
        }
        Ok((config, None)) => {
            println!("{}", "Defaults".green());
            config
        }
        Err(e) => {
            println!("{}", format!("Invalid: {:#}", e).red());
            problems += 1;
            config::ExportConfig::default()
        }
    };

    print!("Checking kicad-cli... ");
    let mut runner = CommandRunner::new(Verbosity::Quiet);
    match toolchain::find_kicad_cli(config.general.kicad_cli.as_deref(), &mut runner) {
        Ok(cli) => {
            println!("{} {} ({})", "Found".green(), cli.path.display(), cli.version);
            if let Some(major) = cli.major_version()
                && major < MIN_KICAD_MAJOR
            {
                println!(
                    "  {} KiCad {} is older than {}; some export options will be rejected.",
                    "⚠".yellow(),
                    major,
                    MIN_KICAD_MAJOR
                );
            }
        }
        Err(e) => {
            println!("{}", "Not Found (Install KiCad 8 or newer)".red());
            println!("  {}", e.to_string().dimmed());
            problems += 1;
        }
    }

    print!("Checking project... ");
    match project::detect_project(project_dir, project_name) {
        Ok(p) => println!("{} {}", "Found".green(), p.name.bold()),
        Err(e) => {
            println!("{}", e.to_string().red());
            problems += 1;
        }
    }

    if problems > 0 {
        bail!("doctor found {} problem(s)", problems);
    }
    println!("{} Ready to export.", "✓".green());
    Ok(())
}
