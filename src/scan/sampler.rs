//! Per-position segment sampling and line classification.

use super::ScanLine;
use crate::config::{DIGIT_MASK, NUM_DIGITS, NUM_SCAN_POS, PROGRAM_RUNNING};

/// The 8-bit segment bus (A..G + DP).
pub trait SegmentBus {
    /// Read all eight segment lines at once.
    fn read(&mut self) -> u8;
}

impl<B: SegmentBus + ?Sized> SegmentBus for &mut B {
    fn read(&mut self) -> u8 {
        (**self).read()
    }
}

/// Outcome of a finished cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Verdict {
    /// At least one position changed and at least one is lit.
    Normal,
    /// Every considered position is dark.
    Blank,
    /// Nothing worth reporting.
    Unchanged,
}

/// In-progress line plus the cycle-scoped change and non-blank masks.
pub struct Sampler {
    line: ScanLine,
    changed: u16,
    nonblank: u16,
}

impl Sampler {
    pub const fn new() -> Self {
        Self {
            line: ScanLine::blank(),
            changed: 0,
            nonblank: 0,
        }
    }

    /// Clear both masks at the start of a cycle. The segment values stay,
    /// they are the reference for change detection.
    pub fn begin_cycle(&mut self) {
        self.changed = 0;
        self.nonblank = 0;
    }

    /// Read the bus once and store it at `position` (display order).
    #[inline]
    pub fn sample<B: SegmentBus>(&mut self, bus: &mut B, position: usize) {
        let seg = bus.read();
        let bit = 1u16 << position;
        if seg != 0 {
            self.nonblank |= bit;
        }
        if self.line.segments[position] != seg {
            self.changed |= bit;
        }
        self.line.segments[position] = seg;
    }

    pub fn changed(&self) -> u16 {
        self.changed
    }

    pub fn nonblank(&self) -> u16 {
        self.nonblank
    }

    pub fn line(&self) -> &ScanLine {
        &self.line
    }

    pub fn line_mut(&mut self) -> &mut ScanLine {
        &mut self.line
    }

    /// Classify the finished cycle.
    ///
    /// Key positions flicker with keyboard scanning, so they only count when
    /// the console asked for key scans.
    pub fn verdict(&self, include_keys: bool) -> Verdict {
        let mask = if include_keys {
            (1u16 << NUM_SCAN_POS) - 1
        } else {
            DIGIT_MASK
        };
        let changed = self.changed & mask;
        let nonblank = self.nonblank & mask;

        if changed != 0 && nonblank != 0 {
            Verdict::Normal
        } else if nonblank == 0 {
            Verdict::Blank
        } else {
            Verdict::Unchanged
        }
    }

    /// The calculator shows '9' on the first key position while a program
    /// runs.
    pub fn program_running(&self) -> bool {
        self.line.segments[NUM_DIGITS] == PROGRAM_RUNNING
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedBus(u8);

    impl SegmentBus for FixedBus {
        fn read(&mut self) -> u8 {
            self.0
        }
    }

    #[test]
    fn sample_sets_changed_and_nonblank() {
        let mut sampler = Sampler::new();
        sampler.begin_cycle();
        sampler.sample(&mut FixedBus(0x3F), 3);
        assert_eq!(sampler.changed(), 1 << 3);
        assert_eq!(sampler.nonblank(), 1 << 3);
        assert_eq!(sampler.line().segments[3], 0x3F);
    }

    #[test]
    fn same_value_is_not_a_change() {
        let mut sampler = Sampler::new();
        sampler.sample(&mut FixedBus(0x06), 5);
        sampler.begin_cycle();
        sampler.sample(&mut FixedBus(0x06), 5);
        assert_eq!(sampler.changed(), 0);
        assert_eq!(sampler.nonblank(), 1 << 5);
    }

    #[test]
    fn going_dark_is_a_change_but_blank() {
        let mut sampler = Sampler::new();
        sampler.sample(&mut FixedBus(0x06), 1);
        sampler.begin_cycle();
        sampler.sample(&mut FixedBus(0x00), 1);
        assert_eq!(sampler.changed(), 1 << 1);
        assert_eq!(sampler.nonblank(), 0);
        assert_eq!(sampler.verdict(false), Verdict::Blank);
    }

    #[test]
    fn key_positions_ignored_unless_requested() {
        let mut sampler = Sampler::new();
        sampler.begin_cycle();
        sampler.sample(&mut FixedBus(0x6F), 12);
        assert_eq!(sampler.verdict(false), Verdict::Blank);
        assert_eq!(sampler.verdict(true), Verdict::Normal);
        assert!(sampler.program_running());
    }

    #[test]
    fn lit_but_unchanged_is_unchanged() {
        let mut sampler = Sampler::new();
        sampler.sample(&mut FixedBus(0x7F), 2);
        sampler.begin_cycle();
        sampler.sample(&mut FixedBus(0x7F), 2);
        assert_eq!(sampler.verdict(false), Verdict::Unchanged);
    }
}
