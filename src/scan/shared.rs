//! Process-wide state shared between the scan interrupts and the main loop.
//!
//! Everything here is a relaxed atomic. The values are either written by
//! one side and displayed by the other (statistics), or owned by the
//! console and sampled once per cycle by the scanner (flags).

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use super::Watchdog;

/// Console options that shape scanning and printing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanFlags(u8);

impl ScanFlags {
    /// Print raw hex codes before each line.
    pub const PRINT_HEX: Self = Self(0x01);
    /// Let key positions take part in change detection and printing.
    pub const PRINT_KEYS: Self = Self(0x02);
    /// Print scanned lines to the console at all.
    pub const PRINT_SCAN: Self = Self(0x80);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn set(&mut self, other: Self, on: bool) {
        if on {
            self.0 |= other.0;
        } else {
            self.0 &= !other.0;
        }
    }
}

/// Timing values mirrored out of the interrupt for the `info` command.
pub struct ScanStats {
    period_usec: AtomicU32,
    reload_usec: AtomicU32,
    overruns: AtomicU32,
    clocks_per_usec: AtomicU32,
}

impl ScanStats {
    pub const fn new() -> Self {
        Self {
            period_usec: AtomicU32::new(0),
            reload_usec: AtomicU32::new(0),
            overruns: AtomicU32::new(0),
            clocks_per_usec: AtomicU32::new(0),
        }
    }

    /// Last measured interval between cycle-start edges.
    pub fn period_usec(&self) -> u32 {
        self.period_usec.load(Ordering::Relaxed)
    }

    /// Per-position timer reload derived from the last accepted period.
    pub fn reload_usec(&self) -> u32 {
        self.reload_usec.load(Ordering::Relaxed)
    }

    pub fn overruns(&self) -> u32 {
        self.overruns.load(Ordering::Relaxed)
    }

    pub fn clocks_per_usec(&self) -> u32 {
        self.clocks_per_usec.load(Ordering::Relaxed)
    }

    pub(crate) fn set_period(&self, usec: u32) {
        self.period_usec.store(usec, Ordering::Relaxed);
    }

    pub(crate) fn set_reload(&self, usec: u32) {
        self.reload_usec.store(usec, Ordering::Relaxed);
    }

    pub(crate) fn set_clocks_per_usec(&self, cpu: u32) {
        self.clocks_per_usec.store(cpu, Ordering::Relaxed);
    }

    pub(crate) fn record_overrun(&self) {
        let n = self.overruns.load(Ordering::Relaxed);
        self.overruns.store(n.saturating_add(1), Ordering::Relaxed);
    }
}

impl Default for ScanStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything both contexts need, in one `static`.
pub struct ScanShared {
    pub watchdog: Watchdog,
    pub stats: ScanStats,
    flags: AtomicU8,
}

impl ScanShared {
    pub const fn new(flags: ScanFlags) -> Self {
        Self {
            watchdog: Watchdog::new(),
            stats: ScanStats::new(),
            flags: AtomicU8::new(flags.bits()),
        }
    }

    pub fn flags(&self) -> ScanFlags {
        ScanFlags::from_bits(self.flags.load(Ordering::Relaxed))
    }

    /// Console side only.
    pub fn set_flags(&self, flags: ScanFlags) {
        self.flags.store(flags.bits(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_set_and_clear() {
        let mut flags = ScanFlags::PRINT_SCAN;
        assert!(flags.contains(ScanFlags::PRINT_SCAN));
        assert!(!flags.contains(ScanFlags::PRINT_HEX));

        flags.set(ScanFlags::PRINT_HEX, true);
        assert!(flags.contains(ScanFlags::PRINT_HEX.union(ScanFlags::PRINT_SCAN)));

        flags.set(ScanFlags::PRINT_SCAN, false);
        assert_eq!(flags, ScanFlags::PRINT_HEX);
    }

    #[test]
    fn shared_flags_roundtrip_through_atomic() {
        let shared = ScanShared::new(ScanFlags::empty());
        shared.set_flags(ScanFlags::PRINT_KEYS);
        assert_eq!(shared.flags(), ScanFlags::PRINT_KEYS);
    }

    #[test]
    fn overrun_counter_saturates() {
        let stats = ScanStats::new();
        stats.overruns.store(u32::MAX - 1, Ordering::Relaxed);
        stats.record_overrun();
        stats.record_overrun();
        assert_eq!(stats.overruns(), u32::MAX);
    }
}
