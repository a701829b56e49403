//! Wall-clock source used for artifact names and age checks.
//!
//! The loops never call `SystemTime::now()` directly so that tests can move
//! time forward without sleeping.
#[cfg(test)]
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;

    /// Whole seconds since the Unix epoch; 0 if the clock is before 1970.
    fn unix_secs(&self) -> u64 {
        self.now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// The real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

#[cfg(test)]
/// A clock that only moves when told to. Second resolution is all the
/// artifact naming scheme can express, so that is all this stores.
#[derive(Debug)]
pub struct ManualClock {
    secs: AtomicU64,
}

#[cfg(test)]
impl ManualClock {
    pub fn at(unix_secs: u64) -> Self {
        Self { secs: AtomicU64::new(unix_secs) }
    }

    pub fn advance(&self, by: Duration) {
        self.secs.fetch_add(by.as_secs(), Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.secs.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_reports_its_start_time() {
        let clock = ManualClock::at(1_700_000_000);
        assert_eq!(clock.unix_secs(), 1_700_000_000);
    }

    #[test]
    fn manual_clock_advances_by_whole_seconds() {
        let clock = ManualClock::at(100);
        clock.advance(Duration::from_secs(601));
        assert_eq!(clock.unix_secs(), 701);
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.unix_secs() > 1_577_836_800);
    }
}
