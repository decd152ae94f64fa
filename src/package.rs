//! Output packaging: filesystem-safe names, Gerber archives, output cleanup.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;
use zip::write::FileOptions;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^-._a-zA-Z0-9]").expect("valid regex"));
static UNDERSCORE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_+").expect("valid regex"));

/// Filesystem-friendly label: only `[-._a-zA-Z0-9]`, spaces become underscores.
pub fn sanitize_label(s: &str) -> String {
    let replaced = UNSAFE_CHARS.replace_all(s, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "_");
    let trimmed = collapsed.trim_matches(|c: char| c == '.' || c == '_' || c == '-');
    if trimmed.is_empty() {
        "artifact".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sanitize a file name, keeping its extension.
pub fn sanitize_file_name(name: &str) -> String {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match path.extension() {
        Some(ext) => format!(
            "{}.{}",
            sanitize_label(&stem),
            sanitize_label(&ext.to_string_lossy())
        ),
        None => sanitize_label(&stem),
    }
}

/// Build label used when no `--tag` is given: UTC `YYYYMMDD-HHMM`.
pub fn default_tag() -> String {
    chrono::Utc::now().format("%Y%m%d-%H%M").to_string()
}

/// Names shared by every artifact of one run.
#[derive(Debug, Clone)]
pub struct Labels {
    pub tag: String,
    pub tag_safe: String,
    pub safe_name: String,
}

impl Labels {
    pub fn new(project_name: &str, tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            tag_safe: sanitize_label(tag),
            safe_name: sanitize_label(project_name),
        }
    }

    /// `{safe_name}_{tag_safe}`, the prefix of every output file
    pub fn base(&self) -> String {
        format!("{}_{}", self.safe_name, self.tag_safe)
    }
}

/// Remove everything inside `dir`, keeping the directory itself.
pub fn clean_output_dir(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        } else {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
    }
    Ok(())
}

/// Deflate every file under `src_dir` into `zip_path`, sorted, with sanitized entry names.
pub fn zip_dir(zip_path: &Path, src_dir: &Path) -> Result<()> {
    let file = File::create(zip_path)
        .with_context(|| format!("Failed to create {}", zip_path.display()))?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::<()>::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let mut taken = HashSet::new();
    for path in files_under(src_dir)? {
        let rel = path.strip_prefix(src_dir).unwrap_or(&path);
        let name = unique_name(&archive_name(rel), &mut taken);
        zip.start_file(name, options)?;
        let mut f = File::open(&path)?;
        io::copy(&mut f, &mut zip)?;
    }

    zip.finish()?;
    Ok(())
}

/// `name` itself, or `name` with `_2`, `_3`, ... before the extension once it is taken.
///
/// Sanitizing can map two tool outputs (`a b.gbr`, `a_b.gbr`) onto one name.
pub fn unique_name(name: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.to_string()) {
        return name.to_string();
    }
    let file_start = name.rfind('/').map_or(0, |i| i + 1);
    let (stem, ext) = match name[file_start..].rfind('.') {
        Some(dot) if dot > 0 => name.split_at(file_start + dot),
        _ => (name, ""),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}{}", stem, n, ext);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Every regular file below `dir`, sorted by path.
pub fn files_under(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

// Zip entries always use forward slashes.
fn archive_name(rel: &Path) -> String {
    rel.components()
        .map(|c| sanitize_file_name(&c.as_os_str().to_string_lossy()))
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_sanitize_label_spaces_and_symbols() {
        assert_eq!(sanitize_label("My Board"), "My_Board");
        assert_eq!(sanitize_label("v1.0 beta/rc#2"), "v1.0_beta_rc_2");
        assert_eq!(sanitize_label("a   b"), "a_b");
        assert_eq!(sanitize_label("  _lead-"), "lead");
        assert_eq!(sanitize_label("???"), "artifact");
        assert_eq!(sanitize_label(""), "artifact");
    }

    #[test]
    fn test_sanitize_file_name_keeps_extension() {
        assert_eq!(sanitize_file_name("My Board-F_Cu.gbr"), "My_Board-F_Cu.gbr");
        assert_eq!(sanitize_file_name("Board-job.gbrjob"), "Board-job.gbrjob");
        assert_eq!(sanitize_file_name("README"), "README");
    }

    #[test]
    fn test_labels_base() {
        let labels = Labels::new("My Board", "v1.2 rc1");
        assert_eq!(labels.base(), "My_Board_v1.2_rc1");
        assert_eq!(labels.tag, "v1.2 rc1");
        assert!(!labels.base().contains(' '));
    }

    #[test]
    fn test_default_tag_shape() {
        let tag = default_tag();
        assert_eq!(tag.len(), 13);
        assert_eq!(&tag[8..9], "-");
        assert!(tag.chars().filter(|c| *c != '-').all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_clean_output_dir() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("old.txt"), "x")?;
        fs::create_dir_all(dir.path().join("sub/deeper"))?;
        fs::write(dir.path().join("sub/deeper/f"), "x")?;
        clean_output_dir(dir.path())?;
        assert!(dir.path().exists());
        assert_eq!(fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_zip_dir_entries_sorted_and_sanitized() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let src = dir.path().join("src");
        fs::create_dir_all(&src)?;
        fs::write(src.join("My Board-F_Cu.gbr"), "G04*")?;
        fs::write(src.join("A-PTH.drl"), "M48")?;

        let zip_path = dir.path().join("out.zip");
        zip_dir(&zip_path, &src)?;

        let mut archive = zip::ZipArchive::new(File::open(&zip_path)?)?;
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).map(|f| f.name().to_string()))
            .collect::<Result<_, _>>()?;
        assert_eq!(names, vec!["A-PTH.drl", "My_Board-F_Cu.gbr"]);

        let mut content = String::new();
        archive.by_name("A-PTH.drl")?.read_to_string(&mut content)?;
        assert_eq!(content, "M48");
        Ok(())
    }

    #[test]
    fn test_unique_name_suffixes_before_extension() {
        let mut taken = HashSet::new();
        assert_eq!(unique_name("a_b.gbr", &mut taken), "a_b.gbr");
        assert_eq!(unique_name("a_b.gbr", &mut taken), "a_b_2.gbr");
        assert_eq!(unique_name("a_b.gbr", &mut taken), "a_b_3.gbr");
        assert_eq!(unique_name("README", &mut taken), "README");
        assert_eq!(unique_name("README", &mut taken), "README_2");
        assert_eq!(unique_name("v1.0/job", &mut taken), "v1.0/job");
        assert_eq!(unique_name("v1.0/job", &mut taken), "v1.0/job_2");
    }

    #[test]
    fn test_zip_dir_keeps_colliding_names_apart() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let src = dir.path().join("src");
        fs::create_dir_all(&src)?;
        fs::write(src.join("a b.gbr"), "first")?;
        fs::write(src.join("a_b.gbr"), "second")?;

        let zip_path = dir.path().join("out.zip");
        zip_dir(&zip_path, &src)?;

        let mut archive = zip::ZipArchive::new(File::open(&zip_path)?)?;
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        archive.by_name("a_b.gbr")?.read_to_string(&mut content)?;
        assert_eq!(content, "first");
        content.clear();
        archive.by_name("a_b_2.gbr")?.read_to_string(&mut content)?;
        assert_eq!(content, "second");
        Ok(())
    }
}
