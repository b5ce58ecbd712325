// tests/harness/virtual_clock.rs
//
// Virtual clock so stored timestamps and ids are deterministic in tests.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, RwLock};

use mailbox_leads::Clock;

/// A clock that can be controlled for testing.
/// Thread-safe via Arc<RwLock<...>>; clones share the same time.
#[derive(Clone)]
pub struct VirtualClock {
    inner: Arc<RwLock<DateTime<Utc>>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(time)),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut guard = self.inner.write().unwrap();
        *guard += duration;
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.advance(Duration::minutes(minutes));
    }

    pub fn set(&self, time: DateTime<Utc>) {
        *self.inner.write().unwrap() = time;
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.inner.read().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_virtual_clock_advance() {
        let clock = VirtualClock::at(t("2024-01-15T10:00:00+00:00"));
        clock.advance_minutes(90);
        assert_eq!(clock.now(), t("2024-01-15T11:30:00+00:00"));
    }

    #[test]
    fn test_virtual_clock_clones_share_time() {
        let a = VirtualClock::new();
        let b = a.clone();
        a.set(t("2025-06-01T00:00:00+00:00"));
        assert_eq!(b.now(), t("2025-06-01T00:00:00+00:00"));
    }
}
