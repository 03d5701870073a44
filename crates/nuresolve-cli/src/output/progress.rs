//! Progress bar for a resolution pass.

use indicatif::{ProgressBar, ProgressStyle};
use nuresolve_resolver::{ProgressCallback, ProgressReport};
use std::sync::Arc;
use std::time::Duration;

const TEMPLATE: &str = "{spinner:.green} [{bar:30.cyan/blue}] {percent:>3}% {msg}";

/// Shows resolver progress on stderr. Hidden when quiet, in JSON mode or
/// when stderr is not a terminal.
#[derive(Debug, Clone)]
pub struct ResolveProgress {
    bar: ProgressBar,
}

impl ResolveProgress {
    pub fn new() -> Self {
        if super::is_quiet() || super::json::is_enabled() || !super::is_tty() {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }

        let bar = ProgressBar::new(100);
        if let Ok(style) = ProgressStyle::default_bar().template(TEMPLATE) {
            bar.set_style(style.progress_chars("█▓▒░"));
        }
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }

    /// A resolver callback that moves this bar.
    pub fn callback(&self) -> ProgressCallback {
        let bar = self.bar.clone();
        Arc::new(move |report: &ProgressReport| {
            bar.set_position(position(report.progress));
            bar.set_message(report.info.clone());
        })
    }

    /// Remove the bar.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn position(progress: f32) -> u64 {
    (progress.clamp(0.0, 1.0) * 100.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions() {
        assert_eq!(position(0.0), 0);
        assert_eq!(position(0.8), 80);
        assert_eq!(position(1.5), 100);
    }

    #[test]
    fn hidden_bar_accepts_reports() {
        let progress = ResolveProgress {
            bar: ProgressBar::hidden(),
        };
        (progress.callback())(&ProgressReport {
            progress: 0.5,
            info: "Read dependencies".to_string(),
        });
        assert_eq!(progress.bar.position(), 50);
        progress.finish();
    }
}
