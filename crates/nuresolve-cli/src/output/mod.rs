//! Terminal output helpers.
//!
//! Messages go to stderr so that stdout carries only the plan, the trees or
//! JSON.

pub mod json;
pub mod progress;
pub mod table;

use console::style;
use std::io::{IsTerminal, stderr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static QUIET: AtomicBool = AtomicBool::new(false);

/// Initialize output settings from the command-line flags.
pub fn init(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

/// Check if messages are suppressed.
pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Check if stderr is a terminal.
pub fn is_tty() -> bool {
    stderr().is_terminal()
}

/// Print a styled header
pub fn header(text: &str) {
    if !is_quiet() && !json::is_enabled() {
        eprintln!("{} {}", style("nuresolve").cyan().bold(), style(text).dim());
    }
}

/// Print a success message
pub fn success(text: &str) {
    if !is_quiet() && !json::is_enabled() {
        eprintln!("{} {text}", style("Success:").green().bold());
    }
}

/// Print a warning message
pub fn warning(text: &str) {
    if !is_quiet() && !json::is_enabled() {
        eprintln!("{} {}", style("Warning:").yellow().bold(), style(text).yellow());
    }
}

/// Print an error message
pub fn error(text: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), style(text).red());
}

/// Format duration for display
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 0.001 {
        format!("{:.0}us", secs * 1_000_000.0)
    } else if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{secs:.2}s")
    } else {
        let mins = secs / 60.0;
        format!("{mins:.1}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_micros(250)), "250us");
        assert_eq!(format_duration(Duration::from_millis(42)), "42ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }
}
