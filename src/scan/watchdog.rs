//! Scan watchdog: notices when the calculator stops refreshing its display.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::config::WATCHDOG_TIMEOUT_TICKS;

/// Tick counter reset by every cycle-start edge.
pub struct Watchdog {
    ticks: AtomicU32,
    timeout: u32,
}

impl Watchdog {
    pub const fn new() -> Self {
        Self::with_timeout(WATCHDOG_TIMEOUT_TICKS)
    }

    pub const fn with_timeout(timeout_ticks: u32) -> Self {
        Self {
            ticks: AtomicU32::new(0),
            timeout: timeout_ticks,
        }
    }

    /// Called from the cycle-start interrupt.
    #[inline]
    pub fn reset(&self) {
        self.ticks.store(0, Ordering::Relaxed);
    }

    /// Called every `WATCHDOG_TICK_MS` from the main loop.
    ///
    /// Returns `true` only on the tick that reaches the timeout.
    pub fn tick(&self) -> bool {
        let previous = self
            .ticks
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |t| t.checked_add(1))
            .unwrap_or(u32::MAX);
        previous.wrapping_add(1) == self.timeout
    }

    pub fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn timeout(&self) -> u32 {
        self.timeout
    }

    /// Level condition: no cycle start for at least the timeout.
    pub fn is_expired(&self) -> bool {
        self.ticks() >= self.timeout
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_at_timeout() {
        let wd = Watchdog::with_timeout(3);
        assert!(!wd.tick());
        assert!(!wd.tick());
        assert!(!wd.is_expired());
        assert!(wd.tick());
        assert!(wd.is_expired());
        assert!(!wd.tick());
        assert!(wd.is_expired());
    }

    #[test]
    fn reset_rearms() {
        let wd = Watchdog::with_timeout(2);
        wd.tick();
        wd.tick();
        assert!(wd.is_expired());
        wd.reset();
        assert_eq!(wd.ticks(), 0);
        assert!(!wd.is_expired());
        assert!(!wd.tick());
        assert!(wd.tick());
    }

    #[test]
    fn saturates_instead_of_wrapping() {
        let wd = Watchdog::with_timeout(1);
        wd.ticks.store(u32::MAX, Ordering::Relaxed);
        assert!(!wd.tick());
        assert_eq!(wd.ticks(), u32::MAX);
    }

    #[test]
    fn default_timeout_matches_config() {
        assert_eq!(Watchdog::new().timeout(), 50);
    }
}
