//! # kicad-export CLI Entry Point
//!
//! Parses arguments with clap and runs the export, or one of the helper
//! commands (`doctor`, `init`, `completion`).
//!
//! Exit codes: `0` success, `1` a failed export, `2` a setup problem
//! (config, project detection, missing `kicad-cli`).

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::path::PathBuf;

use kicad_export::commands;
use kicad_export::error::exit_code_for;
use kicad_export::pipeline::{self, ExportOptions};
use kicad_export::runner::Verbosity;
use kicad_export::ui;

#[derive(Parser)]
#[command(name = "kicad-export")]
#[command(about = "Export KiCad manufacturing and documentation artifacts with kicad-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    export: ExportArgs,
}

#[derive(Args)]
struct ExportArgs {
    /// Folder containing the .kicad_pro
    #[arg(long, default_value = ".")]
    project_dir: PathBuf,
    /// Project basename without extension (needed when several exist)
    #[arg(long)]
    project_name: Option<String>,
    /// Git tag or build label [default: UTC yyyyMMdd-HHmm]
    #[arg(long)]
    tag: Option<String>,
    /// TOML config overriding export options [default: <project-dir>/kicad-export.toml if present]
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output directory [default: <project-dir>/Exports/<name>_<tag>/]
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Force color PDF outputs (overrides config)
    #[arg(long, conflicts_with = "monochrome")]
    color: bool,
    /// Force black-and-white PDF outputs (overrides config)
    #[arg(long)]
    monochrome: bool,
    /// Echo every kicad-cli command
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
    /// Only print warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl ExportArgs {
    fn into_options(self) -> ExportOptions {
        let monochrome = if self.color {
            Some(false)
        } else if self.monochrome {
            Some(true)
        } else {
            None
        };
        let verbosity = if self.verbose {
            Verbosity::Verbose
        } else if self.quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        };
        ExportOptions {
            project_dir: self.project_dir,
            project_name: self.project_name,
            tag: self.tag,
            config_path: self.config,
            out_dir: self.out_dir,
            monochrome,
            verbosity,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check that kicad-cli, the config and the project are usable
    Doctor {
        /// Folder containing the .kicad_pro
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
        /// Project basename without extension (needed when several exist)
        #[arg(long)]
        project_name: Option<String>,
        /// TOML config to validate
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Write a default kicad-export.toml
    Init {
        /// Folder to write the config into
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
    },
    /// Generate shell completion scripts
    Completion { shell: Shell },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = dispatch(cli) {
        ui::print_error(&e);
        std::process::exit(exit_code_for(&e));
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Doctor {
            project_dir,
            project_name,
            config,
        }) => commands::doctor::run_doctor(
            &project_dir,
            project_name.as_deref(),
            config.as_deref(),
        ),
        Some(Commands::Init { project_dir }) => {
            commands::init::init_config(&project_dir)?;
            Ok(())
        }
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
            Ok(())
        }
        None => {
            pipeline::run(&cli.export.into_options())?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_export_flags() {
        let cli = Cli::try_parse_from([
            "kicad-export",
            "--project-dir",
            "hw",
            "--tag",
            "v1.0",
            "--monochrome",
            "-q",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        let options = cli.export.into_options();
        assert_eq!(options.project_dir, PathBuf::from("hw"));
        assert_eq!(options.tag.as_deref(), Some("v1.0"));
        assert_eq!(options.monochrome, Some(true));
        assert_eq!(options.verbosity, Verbosity::Quiet);
    }

    #[test]
    fn test_color_conflicts_with_monochrome() {
        assert!(Cli::try_parse_from(["kicad-export", "--color", "--monochrome"]).is_err());
        assert!(Cli::try_parse_from(["kicad-export", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_doctor_subcommand() {
        let cli = Cli::try_parse_from([
            "kicad-export",
            "doctor",
            "--project-dir",
            "hw",
            "--project-name",
            "main",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Doctor {
                project_dir,
                project_name,
                config,
            }) => {
                assert_eq!(project_dir, PathBuf::from("hw"));
                assert_eq!(project_name.as_deref(), Some("main"));
                assert!(config.is_none());
            }
            _ => panic!("expected the doctor subcommand"),
        }
    }
}
