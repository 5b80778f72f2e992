//! Progress reporting for long-running encoder phases.

/// A fractional completion value in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress(f32);

impl Progress {
    /// Builds a progress value from `done` of `total` steps.
    /// A zero `total` counts as complete.
    pub fn from_steps(done: usize, total: usize) -> Self {
        if total == 0 {
            return Progress(1.0);
        }
        Progress((done as f32 / total as f32).clamp(0.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

/// Receives progress notifications. Advisory only; a sink cannot abort the task.
pub trait ProgressSink {
    fn report(&mut self, progress: Progress);
}

impl<F: FnMut(Progress)> ProgressSink for F {
    fn report(&mut self, progress: Progress) {
        self(progress)
    }
}

/// A sink that drops every notification.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _progress: Progress) {}
}
