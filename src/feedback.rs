//! Troubleshooting hints derived from `kicad-cli` output.

use colored::*;

/// True when a STEP failure was caused by 3D models that could not be resolved.
pub fn is_missing_model_error(output: &str) -> bool {
    let t = output.to_lowercase();
    t.contains("could not add 3d model") || (t.contains("file not found:") && t.contains(".step"))
}

pub struct FeedbackAnalyzer;

impl FeedbackAnalyzer {
    pub fn analyze(output: &str) -> Option<String> {
        let lower = output.to_lowercase();

        if is_missing_model_error(output) {
            return Some(format!(
                "Some footprints reference {} that could not be found.\nCheck your 3D model library paths, or keep {} and {} enabled in [step].",
                "3D models".bold().yellow(),
                "ignore_missing_models".bold().green(),
                "fallback_board_only".bold().green()
            ));
        }

        // Flags differ between KiCad 7, 8 and 9
        if lower.contains("unknown argument")
            || lower.contains("unrecognized option")
            || lower.contains("unknown option")
            || lower.contains("invalid choice")
        {
            return Some(format!(
                "kicad-cli rejected an option. This usually means an {} release.\nKiCad 8 or newer is required; run {} to see which one was found.",
                "older KiCad".bold().red(),
                "kicad-export doctor".bold().green()
            ));
        }

        if lower.contains("invalid layer") || lower.contains("not a valid layer") {
            return Some(format!(
                "A layer name in {} is not known to this board.\nUse KiCad's canonical names such as {} or {}.",
                "layers".bold().yellow(),
                "F.Cu".bold().green(),
                "Edge.Cuts".bold().green()
            ));
        }

        if lower.contains("failed to load board") || lower.contains("failed to load schematic") {
            return Some(format!(
                "kicad-cli could not open the design. It may have been saved by a {} than the one installed.",
                "newer KiCad".bold().red()
            ));
        }

        None
    }
}
