//! Terminal output for a run: header, artifact table, failure hints.
//!
//! The artifact table sizes itself to the terminal:
//!
//! ```text
//!   ┌──────────────┬──────────────────────────┐
//!   │ Artifact     │ File                     │
//!   ├──────────────┼──────────────────────────┤
//!   │ gerbers_zip  │ board_v1.0_gerbers.zip   │
//!   └──────────────┴──────────────────────────┘
//! ```

use colored::*;
use std::path::Path;

use crate::error::ExportError;
use crate::feedback::FeedbackAnalyzer;
use crate::manifest::Manifest;
use crate::project::Project;
use crate::toolchain::KicadCli;

pub fn print_header(
    cli: &KicadCli,
    project: &Project,
    out_dir: &Path,
    tag: &str,
    config: Option<&Path>,
) {
    println!(
        "{} Using kicad-cli: {} ({})",
        "🔧".cyan(),
        cli.path.display(),
        cli.version.green()
    );
    println!("{} Project: {}", "→".dimmed(), project.name.bold());
    println!("{} Tag: {}", "→".dimmed(), tag.cyan());
    println!("{} Outputs: {}", "→".dimmed(), out_dir.display());
    match config {
        Some(path) => println!("{} Config: {}", "→".dimmed(), path.display()),
        None => println!("{} Config: {}", "→".dimmed(), "defaults".dimmed()),
    }
    println!();
}

pub fn print_summary(manifest: &Manifest, manifest_path: &Path) {
    println!();
    let mut table = Table::new(&["Artifact", "File"]);
    for (kind, paths) in &manifest.outputs {
        for path in paths {
            let shown = path
                .strip_prefix(&manifest.outputs_dir)
                .unwrap_or(path)
                .display()
                .to_string();
            table.add_row(vec![kind.label().to_string(), shown]);
        }
    }
    if table.is_empty() {
        println!("{} No artifacts enabled.", "!".yellow());
    } else {
        table.print();
    }
    println!();
    println!("{} Manifest: {}", "✓".green(), manifest_path.display());
}

/// Print a failed run to stderr, with a hint when the tool output is recognizable.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {:#}", "x".red(), err);
    let tool_output = err.chain().find_map(|cause| match cause.downcast_ref::<ExportError>() {
        Some(ExportError::ExportFailed { output, .. }) => Some(output.as_str()),
        _ => None,
    });
    if let Some(hint) = tool_output.and_then(FeedbackAnalyzer::analyze) {
        eprintln!();
        eprintln!("{} {}", "💡".yellow(), hint);
    }
}

struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn add_row(&mut self, row: Vec<String>) {
        if row.len() == self.headers.len() {
            self.rows.push(row);
        }
    }

    fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn print(&self) {
        let widths = self.column_widths(console::Term::stdout().size().1 as usize);

        let sep = |left: &str, mid: &str, right: &str| {
            let parts: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("  {}{}{}", left, parts.join(mid), right)
        };
        let line = |cells: &[String], bold: bool| {
            let mut s = String::from("  │");
            for (cell, width) in cells.iter().zip(&widths) {
                let text = console::truncate_str(cell, *width, "...");
                let padded = console::pad_str(&text, *width, console::Alignment::Left, None);
                if bold {
                    s.push_str(&format!(" {} │", padded.to_string().bold()));
                } else {
                    s.push_str(&format!(" {} │", padded));
                }
            }
            s
        };

        println!("{}", sep("┌", "┬", "┐"));
        println!("{}", line(self.headers.as_slice(), true));
        println!("{}", sep("├", "┼", "┤"));
        for row in &self.rows {
            println!("{}", line(row.as_slice(), false));
        }
        println!("{}", sep("└", "┴", "┘"));
    }

    /// Content width per column, shrinking the widest column until the table fits.
    fn column_widths(&self, term_width: usize) -> Vec<usize> {
        let mut widths: Vec<usize> = self
            .headers
            .iter()
            .map(|h| console::measure_text_width(h))
            .collect();
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(console::measure_text_width(cell));
            }
        }

        let overhead = 3 + 3 * widths.len();
        let available = term_width.saturating_sub(overhead);
        while widths.iter().sum::<usize>() > available {
            match widths.iter_mut().filter(|w| **w > 8).max_by_key(|w| **w) {
                Some(widest) => *widest -= 1,
                None => break,
            }
        }
        widths
    }
}
