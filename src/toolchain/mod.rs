//! `kicad-cli` discovery
//!
//! Tries an explicit path from the config, then PATH, then the usual install
//! locations. A candidate counts only if `--version` succeeds.

pub mod types;

pub use types::KicadCli;

use std::path::{Path, PathBuf};

use crate::error::ExportError;
use crate::runner::CommandRunner;

/// Executable name on this platform
pub fn executable_name() -> &'static str {
    if cfg!(windows) {
        "kicad-cli.exe"
    } else {
        "kicad-cli"
    }
}

/// Locate a working `kicad-cli`, recording each `--version` check in `runner`.
pub fn find_kicad_cli(
    explicit: Option<&Path>,
    runner: &mut CommandRunner,
) -> Result<KicadCli, ExportError> {
    locate(candidates(explicit), Path::new(executable_name()), runner)
}

/// First existing candidate that answers `--version`, then `last_resort` as given.
fn locate(
    candidates: Vec<PathBuf>,
    last_resort: &Path,
    runner: &mut CommandRunner,
) -> Result<KicadCli, ExportError> {
    let mut tried: Vec<String> = Vec::new();

    for candidate in candidates {
        let shown = candidate.display().to_string();
        if tried.contains(&shown) {
            continue;
        }
        tried.push(shown);
        if !candidate.exists() {
            continue;
        }
        if let Some(version) = query_version(&candidate, runner) {
            return Ok(KicadCli::new(candidate, version));
        }
    }

    // Last resort: let the OS resolve the bare name
    if let Some(version) = query_version(last_resort, runner) {
        return Ok(KicadCli::new(last_resort.to_path_buf(), version));
    }
    let shown = last_resort.display().to_string();
    if !tried.contains(&shown) {
        tried.push(shown);
    }

    Err(ExportError::ToolNotFound { tried })
}

fn candidates(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut list = Vec::new();
    if let Some(path) = explicit {
        list.push(path.to_path_buf());
    }
    if let Some(on_path) = search_path(executable_name()) {
        list.push(on_path);
    }
    list.extend(common_locations());
    list
}

/// First `name` found in a PATH directory
pub fn search_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(windows)]
fn common_locations() -> Vec<PathBuf> {
    ["9.0", "9", "8.0", "8"]
        .iter()
        .map(|ver| {
            PathBuf::from(format!(
                "C:/Program Files/KiCad/{}/bin/kicad-cli.exe",
                ver
            ))
        })
        .collect()
}

#[cfg(not(windows))]
fn common_locations() -> Vec<PathBuf> {
    [
        "/usr/local/bin/kicad-cli",
        "/opt/homebrew/bin/kicad-cli",
        "/usr/bin/kicad-cli",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}

fn query_version(path: &Path, runner: &mut CommandRunner) -> Option<String> {
    let res = runner.run(path, &["--version".into()], None, "Checking kicad-cli...");
    if !res.success() {
        return None;
    }
    res.stdout
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
}
