//! # kicad-export - KiCad artifact export
//!
//! Drives `kicad-cli` to produce manufacturing and documentation outputs for a
//! KiCad project and collects them in a versioned directory with a manifest.
//!
//! ## Outputs
//!
//! - **Gerbers + Excellon drill**, zipped or loose
//! - **STEP** 3D model, with a board-only fallback for missing models
//! - **PCB PDF** (one layer per page) and **schematic PDF**
//! - **BOM** CSV/TSV with supplier columns
//! - **manifest.json** with tool version, effective config and invoked commands
//!
//! ## Quick Start
//!
//! ```bash
//! # Export the single project in the current directory
//! kicad-export --tag v1.0
//!
//! # Pick one of several projects, with a custom config
//! kicad-export --project-dir hw --project-name main_board --config export.toml
//! ```
//!
//! ## Module Organization
//!
//! - [`pipeline`] - The export run in order
//! - [`config`] - Configuration parsing (`kicad-export.toml`)
//! - [`export`] - One exporter per artifact type
//! - [`toolchain`] - `kicad-cli` discovery

/// Auxiliary command handlers (`doctor`, `init`).
pub mod commands;

/// Configuration file parsing (`kicad-export.toml`).
pub mod config;

/// Error taxonomy and exit codes.
pub mod error;

/// Artifact exporters.
pub mod export;

/// Troubleshooting hints from `kicad-cli` output.
pub mod feedback;

/// Run manifest (`manifest.json`).
pub mod manifest;

/// Output naming, zipping and cleanup.
pub mod package;

/// The export run.
pub mod pipeline;

/// KiCad project detection.
pub mod project;

/// Subprocess execution.
pub mod runner;

/// `kicad-cli` discovery.
pub mod toolchain;

/// Terminal output.
pub mod ui;
