//! Progress reporting side channel.
//!
//! The codec never decides how progress is shown. It reports a phase label
//! and a fraction in `[0, 1]` to whatever [`ProgressSink`] the caller hands
//! in; a progress bar, a status line, or nothing at all.

/// Receives `(phase label, fraction)` updates.
///
/// Fractions are local to the named phase. Within one phase they never
/// decrease. Cadence is coarse (about once per buffered read).
pub trait ProgressSink {
    fn report(&mut self, label: &str, fraction: f64);
}

impl<F> ProgressSink for F
where
    F: FnMut(&str, f64),
{
    fn report(&mut self, label: &str, fraction: f64) {
        self(label, fraction)
    }
}

/// A sink that drops every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _label: &str, _fraction: f64) {}
}

/// Per-phase reporter that clamps fractions and keeps them monotonic.
pub struct PhaseProgress<'a> {
    sink: &'a mut dyn ProgressSink,
    label: &'static str,
    last: Option<f64>,
}

impl<'a> PhaseProgress<'a> {
    pub fn new(sink: &'a mut dyn ProgressSink, label: &'static str) -> Self {
        Self {
            sink,
            label,
            last: None,
        }
    }

    /// Report `fraction` (clamped to `[0, 1]`) unless it would move backwards.
    pub fn update(&mut self, fraction: f64) {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        match self.last {
            Some(last) if fraction <= last => {}
            _ => {
                self.last = Some(fraction);
                self.sink.report(self.label, fraction);
            }
        }
    }

    /// Report `done / total`. A zero total counts as complete.
    pub fn update_ratio(&mut self, done: u64, total: u64) {
        if total == 0 {
            self.update(1.0);
        } else {
            self.update(done as f64 / total as f64);
        }
    }

    pub fn finish(&mut self) {
        self.update(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_and_clamped() {
        let mut seen = Vec::new();
        let mut sink = |label: &str, fraction: f64| seen.push((label.to_string(), fraction));
        {
            let mut progress = PhaseProgress::new(&mut sink, "Counting");
            progress.update(0.0);
            progress.update(0.5);
            progress.update(0.25);
            progress.update(7.0);
            progress.finish();
        }
        let fractions: Vec<f64> = seen.iter().map(|(_, f)| *f).collect();
        assert_eq!(fractions, vec![0.0, 0.5, 1.0]);
        assert!(seen.iter().all(|(l, _)| l == "Counting"));
    }

    #[test]
    fn test_ratio_with_zero_total() {
        let mut last = -1.0;
        let mut sink = |_: &str, fraction: f64| last = fraction;
        {
            let mut progress = PhaseProgress::new(&mut sink, "Writing");
            progress.update_ratio(0, 0);
        }
        assert_eq!(last, 1.0);
    }

    #[test]
    fn test_nan_reports_zero() {
        let mut seen = Vec::new();
        let mut sink = |_: &str, fraction: f64| seen.push(fraction);
        {
            let mut progress = PhaseProgress::new(&mut sink, "Decoding");
            progress.update(f64::NAN);
            progress.update(0.5);
        }
        assert_eq!(seen, vec![0.0, 0.5]);
    }

    #[test]
    fn test_no_progress() {
        let mut sink = NoProgress;
        let mut progress = PhaseProgress::new(&mut sink, "Idle");
        progress.update(0.3);
        progress.finish();
    }
}
