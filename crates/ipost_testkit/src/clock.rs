//! A clock tests can set and advance.

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use parking_lot::Mutex;
use std::sync::Arc;

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Starts the clock at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Starts the clock at a fixed, arbitrary instant.
    pub fn fixed() -> Self {
        Self::new(Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).single().unwrap_or_default())
    }

    /// Wraps the clock for [`ipost_core::CoordinatorConfig::clock`].
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Moves the clock forward.
    pub fn advance(&self, delta: Duration) {
        *self.0.lock() += delta;
    }

    /// Moves the clock forward by whole seconds.
    pub fn advance_seconds(&self, seconds: i64) {
        self.advance(Duration::seconds(seconds));
    }

    /// Jumps to `now`, forwards or backwards.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock() = now;
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_only_when_told() {
        let clock = MutableClock::fixed();
        let start = clock.utc();
        assert_eq!(clock.utc(), start);
        clock.advance_seconds(90);
        assert_eq!(clock.utc() - start, Duration::seconds(90));
        clock.set(start);
        assert_eq!(clock.utc(), start);
    }
}
