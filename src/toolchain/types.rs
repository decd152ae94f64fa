use serde::Serialize;
use std::path::PathBuf;

/// A `kicad-cli` executable that answered `--version`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KicadCli {
    /// Path the tool is invoked with
    pub path: PathBuf,

    /// First line of `kicad-cli --version`
    pub version: String,
}

impl KicadCli {
    pub fn new(path: PathBuf, version: String) -> Self {
        Self { path, version }
    }

    /// Major version, when the version line starts with one (e.g. `9.0.1` -> 9)
    pub fn major_version(&self) -> Option<u32> {
        self.version
            .trim()
            .split(|c: char| !c.is_ascii_digit())
            .find(|s| !s.is_empty())
            .and_then(|s| s.parse().ok())
    }
}
