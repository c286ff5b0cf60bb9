/// Receives progress of a long replication.
///
/// `fraction` is in `[0, 1]`. The engine cannot be cancelled from here.
pub trait ProgressReporter {
    fn report(&mut self, fraction: f64, message: Option<&str>);
}

impl<F: FnMut(f64, Option<&str>)> ProgressReporter for F {
    fn report(&mut self, fraction: f64, message: Option<&str>) {
        self(fraction, message)
    }
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&mut self, _fraction: f64, _message: Option<&str>) {}
}

/// Clamps reported fractions to `[0, 1]` and never lets them go backwards.
pub(crate) struct Monotonic<'p> {
    inner: &'p mut dyn ProgressReporter,
    last: f64,
}

impl<'p> Monotonic<'p> {
    pub(crate) fn new(inner: &'p mut dyn ProgressReporter) -> Self {
        Self { inner, last: 0.0 }
    }

    pub(crate) fn report(&mut self, fraction: f64, message: Option<&str>) {
        let fraction = if fraction.is_nan() {
            self.last
        } else {
            fraction.clamp(self.last, 1.0)
        };
        self.last = fraction;
        self.inner.report(fraction, message);
    }

    /// Report the `step`-th of `steps` equal parts of sheet `sheet` out of `sheets`.
    pub(crate) fn step(
        &mut self,
        sheet: usize,
        sheets: usize,
        step: usize,
        steps: usize,
        message: &str,
    ) {
        let sheets = sheets.max(1) as f64;
        let fraction = (sheet as f64 + step as f64 / steps.max(1) as f64) / sheets;
        self.report(fraction, Some(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fractions_never_decrease() {
        let mut seen = Vec::new();
        let mut sink = |f: f64, _: Option<&str>| seen.push(f);
        {
            let mut progress = Monotonic::new(&mut sink);
            progress.report(0.5, None);
            progress.report(0.25, None);
            progress.report(1.5, None);
            progress.report(f64::NAN, None);
        }
        assert_eq!(seen, vec![0.5, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn test_step_fraction() {
        let mut seen = Vec::new();
        let mut sink = |f: f64, _: Option<&str>| seen.push(f);
        {
            let mut progress = Monotonic::new(&mut sink);
            progress.step(1, 2, 1, 2, "tracks");
        }
        assert_eq!(seen, vec![0.75]);
    }
}
