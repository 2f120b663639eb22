//! Scan timer control surface.
//!
//! The scanner owns one countdown timer running at 1 MHz, so reload values
//! are microseconds per scan position.

pub trait ScanTimer {
    /// Load a new reload value, latch it immediately and clear any pending
    /// interrupt raised by the old period. All three happen together so a
    /// stale interrupt never fires with the previous period.
    fn set_period(&mut self, reload_usec: u32);

    /// Start counting with the interrupt enabled.
    fn enable(&mut self);

    /// Stop counting and mask the interrupt. Idempotent.
    fn disable(&mut self);
}

impl<T: ScanTimer + ?Sized> ScanTimer for &mut T {
    fn set_period(&mut self, reload_usec: u32) {
        (**self).set_period(reload_usec)
    }

    fn enable(&mut self) {
        (**self).enable()
    }

    fn disable(&mut self) {
        (**self).disable()
    }
}
