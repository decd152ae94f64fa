//! CLI command handlers besides the export itself.

pub mod doctor;
pub mod init;
