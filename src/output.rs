//! # Output Configuration
//!
//! Controls how reconciliation reports look on the terminal. Colors and
//! status markers follow the user's preferences:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals
//!
//! Without color, every marker has a plain-text replacement so that build
//! logs stay greppable.

use std::env;
use std::path::Path;

use console::Style;

use crate::reconcile::{EntryReport, Outcome};

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `color_flag` is `always`, `never` or `auto`. In auto mode, colors are
    /// disabled if `NO_COLOR` is set, `CLICOLOR=0`, `TERM=dumb`, or stdout
    /// is not a TTY (unless `CLICOLOR_FORCE=1`).
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // Presence alone disables colors, even if empty
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    pub fn without_color() -> Self {
        Self { use_color: false }
    }

    fn paint(&self, style: Style, text: &str) -> String {
        if self.use_color {
            style.force_styling(true).apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// One report line: `<indent><marker> <path>: <kind> (<detail>)`.
    pub fn entry_line(&self, depth: usize, path: &Path, outcome: &Outcome) -> String {
        let (marker, style) = match outcome {
            Outcome::Repointed { .. } => (emoji(self, "🔗", "[REPOINT]"), Style::new().green()),
            Outcome::Cloned { .. } => (emoji(self, "📥", "[CLONE]"), Style::new().cyan()),
            Outcome::Skipped { .. } => (emoji(self, "⏭️", "[SKIP]"), Style::new().yellow()),
            Outcome::Failed { .. } => (emoji(self, "❌", "[FAIL]"), Style::new().red().bold()),
        };
        format!(
            "{}{} {}: {} ({})",
            "  ".repeat(depth),
            marker,
            path.display(),
            self.paint(style, outcome.kind()),
            outcome.detail()
        )
    }

    /// A warning attached to the report line above it.
    pub fn warning_line(&self, depth: usize, warning: &str) -> String {
        format!(
            "{}  {} {}",
            "  ".repeat(depth),
            emoji(self, "⚠️", "[WARN]"),
            self.paint(Style::new().yellow(), warning)
        )
    }

    /// Render a report and everything below it.
    pub fn report_lines(&self, report: &EntryReport) -> Vec<String> {
        let mut lines = Vec::new();
        report.walk(&mut |depth, path, entry| {
            lines.push(self.entry_line(depth, path, &entry.outcome));
            for warning in &entry.warnings {
                lines.push(self.warning_line(depth, warning));
            }
        });
        lines
    }

    pub fn heading(&self, text: &str) -> String {
        self.paint(Style::new().bold(), text)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns the emoji when colors are enabled, the plain text otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}
