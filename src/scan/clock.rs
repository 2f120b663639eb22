//! Microsecond clock on top of a free-running cycle counter.

/// Free-running hardware cycle counter (DWT CYCCNT on Cortex-M).
pub trait CycleCounter {
    /// Raw counter value. Wraps at `u32::MAX`.
    fn now(&self) -> u32;
}

impl<C: CycleCounter + ?Sized> CycleCounter for &C {
    fn now(&self) -> u32 {
        (**self).now()
    }
}

/// Spin iterations used to see the counter move during calibration.
const CALIBRATION_SPINS: u32 = 8;

/// Cycle counter calibrated to microseconds.
///
/// Single-context use only: the delay assumes it is not preempted, which
/// holds because it only runs inside the scan interrupts.
pub struct MicrosClock<C> {
    counter: C,
    clocks_per_usec: u32,
}

impl<C: CycleCounter> MicrosClock<C> {
    /// Check the counter is running and derive clocks per microsecond.
    ///
    /// A stopped counter yields `clocks_per_usec() == 0`; delays then
    /// return immediately and intervals read as zero.
    pub fn calibrate(counter: C, core_clock_hz: u32) -> Self {
        let start = counter.now();
        let mut running = false;
        for _ in 0..CALIBRATION_SPINS {
            core::hint::spin_loop();
            if counter.now() != start {
                running = true;
                break;
            }
        }

        let clocks_per_usec = if running { core_clock_hz / 1_000_000 } else { 0 };
        Self {
            counter,
            clocks_per_usec,
        }
    }

    pub fn clocks_per_usec(&self) -> u32 {
        self.clocks_per_usec
    }

    pub fn is_calibrated(&self) -> bool {
        self.clocks_per_usec != 0
    }

    /// Raw counter value for interval math.
    #[inline]
    pub fn now(&self) -> u32 {
        self.counter.now()
    }

    /// Microseconds between two raw counter readings, wrap-safe.
    #[inline]
    pub fn usec_between(&self, earlier: u32, later: u32) -> u32 {
        match self.clocks_per_usec {
            0 => 0,
            cpu => later.wrapping_sub(earlier) / cpu,
        }
    }

    /// Busy-wait for `usec` microseconds.
    pub fn delay_usec(&self, usec: u32) {
        let cpu = self.clocks_per_usec;
        if cpu == 0 || usec == 0 {
            return;
        }
        let start = self.counter.now();
        // Half a microsecond goes to the call itself.
        let ticks = (usec * cpu).saturating_sub(cpu / 2);
        while self.counter.now().wrapping_sub(start) < ticks {
            core::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    /// Counter that advances by `step` on every read.
    struct StepCounter {
        value: Cell<u32>,
        step: u32,
        reads: Cell<u32>,
    }

    impl StepCounter {
        fn new(start: u32, step: u32) -> Self {
            Self {
                value: Cell::new(start),
                step,
                reads: Cell::new(0),
            }
        }
    }

    impl CycleCounter for StepCounter {
        fn now(&self) -> u32 {
            let v = self.value.get();
            self.value.set(v.wrapping_add(self.step));
            self.reads.set(self.reads.get() + 1);
            v
        }
    }

    #[test]
    fn calibrate_running_counter() {
        let counter = StepCounter::new(0, 1);
        let clock = MicrosClock::calibrate(&counter, 64_000_000);
        assert_eq!(clock.clocks_per_usec(), 64);
        assert!(clock.is_calibrated());
    }

    #[test]
    fn calibrate_stopped_counter_fails() {
        let counter = StepCounter::new(1234, 0);
        let clock = MicrosClock::calibrate(&counter, 64_000_000);
        assert_eq!(clock.clocks_per_usec(), 0);
        assert!(!clock.is_calibrated());
    }

    #[test]
    fn uncalibrated_delay_is_noop() {
        let counter = StepCounter::new(0, 0);
        let clock = MicrosClock::calibrate(&counter, 64_000_000);
        let reads = counter.reads.get();
        clock.delay_usec(100);
        assert_eq!(counter.reads.get(), reads);
        assert_eq!(clock.usec_between(0, 64_000), 0);
    }

    #[test]
    fn delay_waits_for_requested_cycles() {
        let counter = StepCounter::new(0, 8);
        let clock = MicrosClock::calibrate(&counter, 64_000_000);
        let before = counter.value.get();
        clock.delay_usec(2);
        // 2 us * 64 - 32 = 96 cycles at 8 cycles per read
        assert!(counter.value.get().wrapping_sub(before) >= 96);
    }

    #[test]
    fn usec_between_handles_wrap() {
        let counter = StepCounter::new(0, 1);
        let clock = MicrosClock::calibrate(&counter, 64_000_000);
        let earlier = u32::MAX - 63;
        let later = 64 * 1400 - 64;
        assert_eq!(clock.usec_between(earlier, later), 1400);
    }
}
