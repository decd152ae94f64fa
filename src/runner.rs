//! Synchronous subprocess execution with an invocation log.
//!
//! Every call is recorded so the manifest can show exactly what was run.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

const PREVIEW_CHARS: usize = 500;

/// Exit code recorded when the program could not be started at all.
pub const SPAWN_FAILED: i32 = 127;

/// Console detail level for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

/// Outcome of one external command
#[derive(Debug, Clone)]
pub struct RunResult {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunResult {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// stderr when the tool wrote any, stdout otherwise
    pub fn error_text(&self) -> &str {
        if self.stderr.is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// Manifest record of one external command
#[derive(Debug, Clone, Serialize)]
pub struct Invocation {
    pub cmd: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub code: i32,
    pub stdout_preview: String,
    pub stderr_preview: String,
}

#[derive(Debug, Default)]
pub struct CommandRunner {
    verbosity: Verbosity,
    invoked: Vec<Invocation>,
}

impl CommandRunner {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            invoked: Vec::new(),
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Commands run so far, in order
    pub fn invoked(&self) -> &[Invocation] {
        &self.invoked
    }

    pub fn into_invoked(self) -> Vec<Invocation> {
        self.invoked
    }

    /// Run `program args...` to completion and capture its output.
    ///
    /// Never fails: a program that cannot be spawned yields code 127 with the
    /// OS error as stderr, so callers judge every outcome by exit code alone.
    pub fn run(
        &mut self,
        program: &Path,
        args: &[OsString],
        cwd: Option<&Path>,
        message: &str,
    ) -> RunResult {
        let mut cmd_line = vec![program.to_string_lossy().into_owned()];
        cmd_line.extend(args.iter().map(|a| a.to_string_lossy().into_owned()));

        if self.verbosity == Verbosity::Verbose {
            println!("   {} {}", "$".dimmed(), cmd_line.join(" ").dimmed());
        }

        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let spinner = (self.verbosity == Verbosity::Normal).then(|| spinner(message));
        let output = cmd.output();
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        let result = match output {
            Ok(out) => RunResult {
                // Killed by a signal: no code, report as generic failure
                code: out.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&out.stdout).trim().to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            },
            Err(e) => RunResult {
                code: SPAWN_FAILED,
                stdout: String::new(),
                stderr: e.to_string(),
            },
        };

        self.invoked.push(Invocation {
            cmd: cmd_line,
            cwd: cwd.map(Path::to_path_buf),
            code: result.code,
            stdout_preview: preview(&result.stdout),
            stderr_preview: preview(&result.stderr),
        });

        result
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("   {spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", ""]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}
