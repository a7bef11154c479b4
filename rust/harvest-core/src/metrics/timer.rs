// rust/harvest-core/src/metrics/timer.rs

use std::time::{Duration, Instant};

use crate::config::Cadence;

/// Decides when a periodic hook fires, either every N steps or every N
/// seconds, never both.
#[derive(Debug, Clone)]
pub struct StepTimer {
    cadence: Cadence,
    last_triggered: Option<(u64, Instant)>,
}

impl StepTimer {
    pub fn new(cadence: Cadence) -> Self {
        Self {
            cadence,
            last_triggered: None,
        }
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// Forgets the last trigger; the next step fires and starts a new window.
    pub fn reset(&mut self) {
        self.last_triggered = None;
    }

    pub fn last_triggered_step(&self) -> Option<u64> {
        self.last_triggered.map(|(step, _)| step)
    }

    pub fn should_trigger_for_step(&self, step: u64, now: Instant) -> bool {
        let Some((last_step, last_time)) = self.last_triggered else {
            return true;
        };

        if step == last_step {
            return false;
        }

        match self.cadence {
            Cadence::Steps(n) => step >= last_step.saturating_add(n),
            Cadence::Interval(every) => now.saturating_duration_since(last_time) >= every,
        }
    }

    /// Marks `step` as triggered and returns the steps and time elapsed since
    /// the previous trigger, or `None` on the first trigger.
    pub fn update_last_triggered_step(
        &mut self,
        step: u64,
        now: Instant,
    ) -> Option<(u64, Duration)> {
        let previous = self.last_triggered.replace((step, now));
        previous.map(|(last_step, last_time)| {
            (
                step.saturating_sub(last_step),
                now.saturating_duration_since(last_time),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_step_triggers_without_elapsed() {
        let mut timer = StepTimer::new(Cadence::Steps(10));
        let now = Instant::now();

        assert!(timer.should_trigger_for_step(0, now));
        assert_eq!(timer.update_last_triggered_step(0, now), None);
        assert_eq!(timer.last_triggered_step(), Some(0));
    }

    #[test]
    fn test_step_cadence() {
        let mut timer = StepTimer::new(Cadence::Steps(10));
        let start = Instant::now();
        timer.update_last_triggered_step(0, start);

        assert!(!timer.should_trigger_for_step(0, start));
        assert!(!timer.should_trigger_for_step(9, start + Duration::from_secs(100)));
        assert!(timer.should_trigger_for_step(10, start));

        let later = start + Duration::from_secs(2);
        assert_eq!(
            timer.update_last_triggered_step(12, later),
            Some((12, Duration::from_secs(2)))
        );
        assert!(!timer.should_trigger_for_step(21, later));
        assert!(timer.should_trigger_for_step(22, later));
    }

    #[test]
    fn test_interval_cadence() {
        let mut timer = StepTimer::new(Cadence::Interval(Duration::from_secs(5)));
        let start = Instant::now();
        timer.update_last_triggered_step(0, start);

        // Step count alone never triggers
        assert!(!timer.should_trigger_for_step(1_000, start + Duration::from_secs(4)));
        assert!(timer.should_trigger_for_step(1, start + Duration::from_secs(5)));
    }

    #[test]
    fn test_reset() {
        let mut timer = StepTimer::new(Cadence::Steps(100));
        let now = Instant::now();
        timer.update_last_triggered_step(5, now);
        timer.reset();

        assert!(timer.should_trigger_for_step(6, now));
        assert_eq!(timer.update_last_triggered_step(6, now), None);
    }
}
