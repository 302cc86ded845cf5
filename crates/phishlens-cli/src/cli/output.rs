//! Shared CLI output formatting: colors, feature symbols, mode switches.

use std::io::IsTerminal;

use phishlens::FeatureValue;
use serde::Serialize;

/// Check if color output is enabled.
pub fn color_enabled() -> bool {
    // https://no-color.org/
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    std::io::stdout().is_terminal()
}

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Colored string builder.
pub struct Styled {
    use_color: bool,
}

impl Styled {
    pub fn new() -> Self {
        Self {
            use_color: color_enabled(),
        }
    }

    #[cfg(test)]
    pub fn plain() -> Self {
        Self { use_color: false }
    }

    /// Symbol for a feature value: check, warning or cross.
    pub fn value_sym(&self, value: FeatureValue) -> &'static str {
        match (value, self.use_color) {
            (FeatureValue::Legitimate, true) => "\x1b[32m\u{2713}\x1b[0m",
            (FeatureValue::Neutral, true) => "\x1b[33m\u{26a0}\x1b[0m",
            (FeatureValue::Suspicious, true) => "\x1b[31m\u{2717}\x1b[0m",
            (FeatureValue::Legitimate, false) => "OK",
            (FeatureValue::Neutral, false) => "??",
            (FeatureValue::Suspicious, false) => "!!",
        }
    }

    fn paint(&self, code: &str, s: &str) -> String {
        if self.use_color {
            format!("{code}{s}{RESET}")
        } else {
            s.to_string()
        }
    }

    pub fn green(&self, s: &str) -> String {
        self.paint(GREEN, s)
    }

    pub fn red(&self, s: &str) -> String {
        self.paint(RED, s)
    }

    pub fn yellow(&self, s: &str) -> String {
        self.paint(YELLOW, s)
    }

    pub fn dim(&self, s: &str) -> String {
        self.paint(DIM, s)
    }

    pub fn bold(&self, s: &str) -> String {
        self.paint(BOLD, s)
    }
}

impl Default for Styled {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if --quiet mode is active.
pub fn is_quiet() -> bool {
    std::env::var("PHISHLENS_QUIET").is_ok()
}

/// Check if --verbose mode is active.
pub fn is_verbose() -> bool {
    std::env::var("PHISHLENS_VERBOSE").is_ok()
}

/// Check if --json mode is active.
pub fn is_json() -> bool {
    std::env::var("PHISHLENS_JSON").is_ok()
}

/// Print pretty JSON to stdout.
pub fn print_json(value: &serde_json::Value) {
    if let Ok(s) = serde_json::to_string_pretty(value) {
        println!("{s}");
    }
}

/// Print JSON to stdout on a single line, keys in serialization order.
pub fn print_json_line<T: Serialize>(value: &T) {
    if let Ok(s) = serde_json::to_string(value) {
        println!("{s}");
    }
}
