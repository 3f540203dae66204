//! Injectable time source.

use crate::model::EpochMillis;
use chrono::Utc;
use std::cell::Cell;

/// Supplies "now" to the progress service.
pub trait Clock {
    fn now(&self) -> EpochMillis;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> EpochMillis {
        (**self).now()
    }
}

/// Wall clock in UTC epoch milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> EpochMillis {
        Utc::now().timestamp_millis()
    }
}

/// Manually driven clock for deterministic callers and tests.
#[derive(Debug, Default)]
pub struct FixedClock {
    now: Cell<EpochMillis>,
}

impl FixedClock {
    pub fn new(now: EpochMillis) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    pub fn set(&self, now: EpochMillis) {
        self.now.set(now);
    }

    pub fn advance(&self, millis: i64) {
        self.now.set(self.now.get().saturating_add(millis));
    }
}

impl Clock for FixedClock {
    fn now(&self) -> EpochMillis {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, FixedClock, SystemClock};

    #[test]
    fn fixed_clock_moves_only_when_told() {
        let clock = FixedClock::new(1_000);
        assert_eq!(clock.now(), 1_000);
        clock.advance(500);
        assert_eq!((&clock).now(), 1_500);
        clock.set(42);
        assert_eq!(clock.now(), 42);
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now() > 1_577_836_800_000);
    }
}
