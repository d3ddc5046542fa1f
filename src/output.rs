//! CLI output formatting for the build steps.
//!
//! Progress is printed as a header per step followed by indented check-mark
//! lines, one per produced item:
//!
//! ```text
//! Generating Last.fm collage:
//!   ✔ Fetched "Kid A" by Radiohead
//!   ✔ Fetched "Blue Train" by John Coltrane
//!   → content/static/collage.avif
//!
//! Generating CV:
//!   ✔ PDF
//!   ✔ HTML
//!   ✔ DOCX
//! ```
//!
//! Each step has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::cv::{CvOutcome, Format};
use crate::pipeline::StepOutcome;
use crate::types::Placement;
use std::path::Path;

const CHECK: &str = "\u{2714}";
const ARROW: &str = "\u{2192}";

// ============================================================================
// Collage
// ============================================================================

/// Header, one line per fetched album, then the saved path.
///
/// Mock collages have random labels, so their albums are not listed.
pub fn format_collage_output(placements: &[Placement], path: &Path, mock: bool) -> Vec<String> {
    let mut lines = Vec::with_capacity(placements.len() + 2);
    if mock {
        lines.push("Generating mock collage:".to_string());
    } else {
        lines.push("Generating Last.fm collage:".to_string());
        for p in placements {
            lines.push(format!("  {CHECK} Fetched \"{}\" by {}", p.title, p.artist));
        }
    }
    lines.push(format!("  {ARROW} {}", path.display()));
    lines
}

pub fn print_collage_output(placements: &[Placement], path: &Path, mock: bool) {
    for line in format_collage_output(placements, path, mock) {
        println!("{}", line);
    }
}

// ============================================================================
// CV
// ============================================================================

pub fn format_cv_output(outcome: &CvOutcome, out_dir: &Path) -> Vec<String> {
    let mut lines = vec!["Generating CV:".to_string()];
    match outcome {
        CvOutcome::Skipped => {
            lines.push(format!("  up to date in {}", out_dir.display()));
        }
        CvOutcome::Generated(formats) => {
            lines.extend(formats.iter().map(|f| format_cv_line(*f)));
        }
    }
    lines
}

fn format_cv_line(format: Format) -> String {
    format!("  {CHECK} {}", format.label())
}

pub fn print_cv_output(outcome: &CvOutcome, out_dir: &Path) {
    for line in format_cv_output(outcome, out_dir) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

/// Lines for one finished build step.
pub fn format_step_output(name: &str, outcome: &StepOutcome) -> Vec<String> {
    match outcome {
        StepOutcome::Collage {
            path,
            placements,
            mock,
        } => format_collage_output(placements, path, *mock),
        StepOutcome::Cv(formats) => {
            let mut lines = vec!["Generating CV:".to_string()];
            lines.extend(formats.iter().map(|f| format_cv_line(*f)));
            lines
        }
        StepOutcome::UpToDate(path) => {
            vec![format!("{name}: up to date ({})", path.display())]
        }
    }
}

pub fn print_step_output(name: &str, outcome: &StepOutcome) {
    println!();
    for line in format_step_output(name, outcome) {
        println!("{}", line);
    }
}
