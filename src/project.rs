//! KiCad project detection.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ExportError;

/// A KiCad project: `<name>.kicad_pro` with its board and top-level schematic.
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub dir: PathBuf,
    pub name: String,
    pub pro: PathBuf,
    pub pcb: PathBuf,
    pub sch: PathBuf,
}

/// Find the project in `dir`. Without `name` there must be exactly one `.kicad_pro`.
pub fn detect_project(dir: &Path, name: Option<&str>) -> Result<Project> {
    if !dir.is_dir() {
        return Err(ExportError::ProjectNotFound(format!(
            "Project directory does not exist: {}",
            dir.display()
        ))
        .into());
    }

    let (name, pro) = match name {
        Some(name) => {
            let pro = dir.join(format!("{}.kicad_pro", name));
            if !pro.exists() {
                return Err(ExportError::ProjectNotFound(format!(
                    ".kicad_pro not found for project name: {}",
                    pro.display()
                ))
                .into());
            }
            (name.to_string(), pro)
        }
        None => {
            let mut candidates = project_files(dir)?;
            match candidates.len() {
                0 => {
                    return Err(ExportError::ProjectNotFound(format!(
                        "No .kicad_pro found in {}",
                        dir.display()
                    ))
                    .into());
                }
                1 => {
                    let pro = candidates.remove(0);
                    let stem = pro
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    (stem, pro)
                }
                _ => {
                    let names = candidates
                        .iter()
                        .filter_map(|p| p.file_name())
                        .map(|n| n.to_string_lossy().into_owned())
                        .collect();
                    return Err(ExportError::AmbiguousProject(names).into());
                }
            }
        }
    };

    let pcb = dir.join(format!("{}.kicad_pcb", name));
    let sch = dir.join(format!("{}.kicad_sch", name));
    if !pcb.exists() {
        return Err(
            ExportError::ProjectNotFound(format!("PCB file not found: {}", pcb.display())).into(),
        );
    }
    // Hierarchical designs still have a top-level sheet named after the project.
    if !sch.exists() {
        return Err(ExportError::ProjectNotFound(format!(
            "Schematic file not found: {}",
            sch.display()
        ))
        .into());
    }

    Ok(Project {
        dir: dir.to_path_buf(),
        name,
        pro,
        pcb,
        sch,
    })
}

/// All `*.kicad_pro` files directly in `dir`, sorted.
fn project_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "kicad_pro") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_project(dir: &Path, name: &str) {
        for ext in ["kicad_pro", "kicad_pcb", "kicad_sch"] {
            fs::write(dir.join(format!("{}.{}", name, ext)), "").unwrap();
        }
    }

    fn export_error(err: &anyhow::Error) -> &ExportError {
        err.downcast_ref::<ExportError>().unwrap()
    }

    #[test]
    fn test_single_project_needs_no_name() {
        let dir = tempfile::tempdir().unwrap();
        write_project(dir.path(), "board");
        let project = detect_project(dir.path(), None).unwrap();
        assert_eq!(project.name, "board");
        assert_eq!(project.pcb, dir.path().join("board.kicad_pcb"));
        assert_eq!(project.sch, dir.path().join("board.kicad_sch"));
    }

    #[test]
    fn test_multiple_projects_are_ambiguous() {
        let dir = tempfile::tempdir().unwrap();
        write_project(dir.path(), "alpha");
        write_project(dir.path(), "beta");
        let err = detect_project(dir.path(), None).unwrap_err();
        match export_error(&err) {
            ExportError::AmbiguousProject(names) => {
                assert_eq!(names, &vec!["alpha.kicad_pro", "beta.kicad_pro"]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let project = detect_project(dir.path(), Some("beta")).unwrap();
        assert_eq!(project.name, "beta");
    }

    #[test]
    fn test_no_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = detect_project(dir.path(), None).unwrap_err();
        assert!(matches!(export_error(&err), ExportError::ProjectNotFound(_)));
    }

    #[test]
    fn test_unknown_project_name() {
        let dir = tempfile::tempdir().unwrap();
        write_project(dir.path(), "board");
        let err = detect_project(dir.path(), Some("other")).unwrap_err();
        assert!(err.to_string().contains("other.kicad_pro"));
    }

    #[test]
    fn test_missing_schematic() {
        let dir = tempfile::tempdir().unwrap();
        write_project(dir.path(), "board");
        fs::remove_file(dir.path().join("board.kicad_sch")).unwrap();
        let err = detect_project(dir.path(), None).unwrap_err();
        assert!(err.to_string().contains("Schematic file not found"));
    }

    #[test]
    fn test_missing_directory() {
        let err = detect_project(Path::new("/no/such/kicad/dir"), None).unwrap_err();
        assert!(matches!(export_error(&err), ExportError::ProjectNotFound(_)));
    }
}
