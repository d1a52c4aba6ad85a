//! Rendering seam for the viewer.
//!
//! The session talks to a [`Surface`] instead of a terminal so tests can
//! record exactly what would have been shown.

use serde_json::Value;

/// Where a session renders its state.
pub trait Surface {
    /// Show a parsed document.
    fn show_tree(&mut self, document: &Value);

    /// Show raw text, the fallback for documents that are not JSON.
    fn show_text(&mut self, text: &str);

    /// Replace the status line.
    fn set_status(&mut self, status: &str);

    /// Update the progress indicator. `None` means there is nothing
    /// determinate to show: either no total was declared or no transfer
    /// is under way.
    fn set_progress(&mut self, percent: Option<u8>);
}

/// Line-oriented surface for the terminal binary.
///
/// Documents go to stdout; status and progress go to stderr so piping
/// the document away stays clean. Progress prints once per ten-percent
/// step rather than once per chunk.
#[derive(Debug, Default)]
pub struct TerminalSurface {
    last_decade: Option<u8>,
    announced_indeterminate: bool,
}

impl Surface for TerminalSurface {
    fn show_tree(&mut self, document: &Value) {
        let rendered =
            serde_json::to_string_pretty(document).unwrap_or_else(|_| document.to_string());
        println!("{rendered}");
    }

    fn show_text(&mut self, text: &str) {
        println!("{text}");
    }

    fn set_status(&mut self, status: &str) {
        eprintln!("{status}");
    }

    fn set_progress(&mut self, percent: Option<u8>) {
        match percent {
            Some(p) => {
                self.announced_indeterminate = false;
                let decade = p / 10;
                if self.last_decade != Some(decade) {
                    self.last_decade = Some(decade);
                    eprintln!("  ... {p}%");
                }
            }
            None => {
                self.last_decade = None;
                if !self.announced_indeterminate {
                    self.announced_indeterminate = true;
                    eprintln!("  ... receiving");
                }
            }
        }
    }
}
