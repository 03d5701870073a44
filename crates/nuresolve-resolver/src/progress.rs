//! Progress reporting.

use std::sync::Arc;

/// A progress update.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    /// Overall progress in `0.0..=1.0`.
    pub progress: f32,
    /// What is happening.
    pub info: String,
}

/// Receives progress updates. May be called any number of times.
pub type ProgressCallback = Arc<dyn Fn(&ProgressReport) + Send + Sync>;

/// Maps the progress of one phase onto a slice of the overall range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSegment {
    min: f32,
    max: f32,
}

impl ProgressSegment {
    /// Reading declarations and dependency metadata.
    pub const DEPENDENCIES: Self = Self::new(0.0, 0.8);
    /// Running the solver and building the plan.
    pub const SOLVE: Self = Self::new(0.8, 1.0);

    /// Create a segment covering `min..=max`.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Overall progress for phase progress `p` (clamped to `0.0..=1.0`).
    #[must_use]
    pub fn evaluate(&self, p: f32) -> f32 {
        (self.max - self.min).mul_add(p.clamp(0.0, 1.0), self.min)
    }
}

/// Sends reports to an optional callback.
#[derive(Clone, Default)]
pub(crate) struct ProgressSink {
    callback: Option<ProgressCallback>,
}

impl ProgressSink {
    pub(crate) fn new(callback: Option<ProgressCallback>) -> Self {
        Self { callback }
    }

    pub(crate) fn report(&self, segment: ProgressSegment, p: f32, info: impl Into<String>) {
        if let Some(callback) = &self.callback {
            callback(&ProgressReport {
                progress: segment.evaluate(p),
                info: info.into(),
            });
        }
    }
}

impl std::fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSink")
            .field("enabled", &self.callback.is_some())
            .finish()
    }
}
