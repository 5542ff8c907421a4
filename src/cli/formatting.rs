//! Terminal styling for CLI output.

/// ANSI escape codes
pub struct Colors;

impl Colors {
    /// Reset all formatting
    pub const RESET: &'static str = "\x1b[0m";
    /// Bold text
    pub const BOLD: &'static str = "\x1b[1m";
    /// Dim text
    pub const DIM: &'static str = "\x1b[2m";
    /// Red color
    pub const RED: &'static str = "\x1b[31m";
    /// Green color
    pub const GREEN: &'static str = "\x1b[32m";
    /// Cyan color
    pub const CYAN: &'static str = "\x1b[36m";
}

/// Section header.
pub fn format_header(text: &str) -> String {
    format!("{}{}{}{}", Colors::BOLD, Colors::CYAN, text, Colors::RESET)
}

/// Dimmed `label: value` line.
pub fn format_field(label: &str, value: impl std::fmt::Display) -> String {
    format!("  {}{label}:{} {value}", Colors::DIM, Colors::RESET)
}

/// Pass/fail marker.
pub fn format_check(ok: bool) -> String {
    if ok {
        format!("{}ok{}", Colors::GREEN, Colors::RESET)
    } else {
        format!("{}out of sync{}", Colors::RED, Colors::RESET)
    }
}

/// Error message for stderr.
pub fn format_error(message: &str) -> String {
    format!("{}{}error:{} {message}", Colors::BOLD, Colors::RED, Colors::RESET)
}
