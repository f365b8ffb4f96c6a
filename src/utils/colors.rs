// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Status markers shared by the CLI, the runner and the watcher

use colored::{ColoredString, Colorize};

/// Outcome shown in front of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Done,
    Failed,
    Warning,
}

impl Status {
    /// Colored marker glyph
    pub fn marker(self) -> ColoredString {
        match self {
            Self::Done => "✓".green(),
            Self::Failed => "✗".red(),
            Self::Warning => "⚠".yellow(),
        }
    }

    /// Indented status line
    pub fn line(self, message: impl std::fmt::Display) -> String {
        format!("  {} {}", self.marker(), message)
    }
}

/// Print a status line to stdout
pub fn print_status(status: Status, message: impl std::fmt::Display) {
    println!("{}", status.line(message));
}

/// Print a bold heading preceded by a blank line
pub fn print_heading(title: impl std::fmt::Display) {
    println!("\n{}:", title.to_string().bold());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_keeps_message() {
        colored::control::set_override(false);
        assert_eq!(Status::Failed.line("html failed"), "  ✗ html failed");
        assert_eq!(Status::Warning.line(3), "  ⚠ 3");
    }
}
