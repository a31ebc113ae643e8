use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

use greenlight_core::domain::repository::Clock;

/// Clock that only moves when told to
///
/// Makes SLA breach scenarios deterministic: tests pin a start time, run
/// transitions, then advance past a due date and sweep.
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock pinned to the given instant
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().expect("clock poisoned");
        *now = *now + by;
    }

    /// Pin the clock to a specific instant
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.write().expect("clock poisoned") = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().expect("clock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_holds_and_advances() {
        let start = Utc::now();
        let clock = ManualClock::starting_at(start);

        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::hours(25));
        assert_eq!(clock.now(), start + Duration::hours(25));

        let pinned = start + Duration::days(7);
        clock.set(pinned);
        assert_eq!(clock.now(), pinned);
    }
}
