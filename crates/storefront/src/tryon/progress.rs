//! Simulated progress for a running try-on.
//!
//! The relay gives no progress events, so the meter advances on a timer: fast
//! at first, then slowly, and never past 90% until the result arrives.

/// Status shown when a submission starts.
pub const INITIAL_STATUS: &str = "Initializing AI...";
/// Status shown once the result arrives.
pub const COMPLETE_STATUS: &str = "Complete!";

const FAST_STEP: u8 = 5;
const SLOW_STEP: u8 = 1;
const SLOW_FROM: u8 = 50;
const CEILING: u8 = 90;

/// Percentage and status text for the progress bar.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressMeter {
    percent: u8,
    status: String,
}

impl ProgressMeter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to 0% with the initial status.
    pub fn start(&mut self) {
        self.percent = 0;
        INITIAL_STATUS.clone_into(&mut self.status);
    }

    /// Advance one timer tick.
    pub fn tick(&mut self) {
        let step = if self.percent < SLOW_FROM { FAST_STEP } else { SLOW_STEP };
        self.percent = self.percent.saturating_add(step).min(CEILING);
    }

    /// Jump to 100%.
    pub fn complete(&mut self) {
        self.percent = 100;
        COMPLETE_STATUS.clone_into(&mut self.status);
    }

    /// Drop back to 0% after a failure.
    pub fn fail(&mut self) {
        self.percent = 0;
    }

    #[must_use]
    pub const fn percent(&self) -> u8 {
        self.percent
    }

    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_then_slow() {
        let mut meter = ProgressMeter::new();
        meter.start();
        assert_eq!(meter.status(), "Initializing AI...");

        for _ in 0..10 {
            meter.tick();
        }
        assert_eq!(meter.percent(), 50);

        meter.tick();
        assert_eq!(meter.percent(), 51);
    }

    #[test]
    fn test_caps_at_ninety() {
        let mut meter = ProgressMeter::new();
        meter.start();
        for _ in 0..500 {
            meter.tick();
        }
        assert_eq!(meter.percent(), 90);
    }

    #[test]
    fn test_complete_and_fail() {
        let mut meter = ProgressMeter::new();
        meter.start();
        meter.tick();
        meter.complete();
        assert_eq!(meter.percent(), 100);
        assert_eq!(meter.status(), "Complete!");

        meter.start();
        meter.tick();
        meter.fail();
        assert_eq!(meter.percent(), 0);
    }
}
