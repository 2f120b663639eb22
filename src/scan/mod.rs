//! Segment scan acquisition pipeline.
//!
//! The calculator multiplexes 14 positions (12 digits + 2 virtual key
//! positions) onto one 8-bit segment bus. Two interrupt sources drive the
//! acquisition:
//!
//! 1. **Cycle start** - rising edge of the digit-8 grid line. Measures the
//!    cycle period, programs the scan timer and samples the first position.
//! 2. **Scan timer** - fires 13 more times per cycle, sampling one position
//!    each, and classifies the finished line on the last one.
//!
//! Everything the interrupts touch is owned by [`ScanMachine`]. Only two
//! objects cross into the main loop: the [`queue`] of [`LineEvent`]s and
//! the [`history`] of published [`ScanLine`]s, each split into a move-only
//! producer half and a consumer half.

pub mod clock;
pub mod history;
pub mod machine;
pub mod queue;
pub mod sampler;
pub mod shared;
pub mod timer;
pub mod watchdog;


pub use clock::{CycleCounter, MicrosClock};
pub use history::{HistoryReader, HistoryWriter, LineHistory};
pub use machine::{ScanMachine, ScanState};
pub use queue::{EventConsumer, EventProducer, EventQueue};
pub use sampler::{Sampler, SegmentBus, Verdict};
pub use shared::{ScanFlags, ScanShared, ScanStats};
pub use timer::ScanTimer;
pub use watchdog::Watchdog;

use crate::config::{NUM_DIGITS, NUM_SCAN_POS};

/// One fully sampled scan cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanLine {
    /// Raw segment byte per position, in display order.
    pub segments: [u8; NUM_SCAN_POS],
    /// Consecutive blank cycles seen before this line.
    pub idle_cycles: u16,
}

impl ScanLine {
    pub const fn blank() -> Self {
        Self {
            segments: [0; NUM_SCAN_POS],
            idle_cycles: 0,
        }
    }

    /// Sign + digit positions.
    pub fn digits(&self) -> &[u8] {
        &self.segments[..NUM_DIGITS]
    }

    /// Virtual key positions.
    pub fn keys(&self) -> &[u8] {
        &self.segments[NUM_DIGITS..]
    }
}

const LINE_TYPE_NORMAL: u8 = 0x80;
const LINE_TYPE_IDLE: u8 = 0x40;
const LINE_TYPE_EXEC: u8 = 0x20;
const LINE_SLOT_MASK: u8 = 0x1F;

/// Notification from the scanner to the main loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineEvent {
    /// A changed, non-blank line was published to history slot `slot`.
    Normal { slot: u8, executing: bool },
    /// The display went blank.
    Idle { executing: bool },
}

impl LineEvent {
    /// Pack into the queue byte.
    ///
    /// ```text
    /// bit 7    NORMAL
    /// bit 6    IDLE
    /// bit 5    EXEC (program running)
    /// bits 4-0 history slot (NORMAL only)
    /// ```
    pub const fn to_byte(self) -> u8 {
        match self {
            LineEvent::Normal { slot, executing } => {
                LINE_TYPE_NORMAL | exec_bit(executing) | (slot & LINE_SLOT_MASK)
            }
            LineEvent::Idle { executing } => LINE_TYPE_IDLE | exec_bit(executing),
        }
    }

    /// Unpack a queue byte. Bytes with neither or both type bits are
    /// reserved.
    pub const fn from_byte(byte: u8) -> Option<Self> {
        let executing = byte & LINE_TYPE_EXEC != 0;
        let normal = byte & LINE_TYPE_NORMAL != 0;
        let idle = byte & LINE_TYPE_IDLE != 0;
        if normal && idle {
            None
        } else if normal {
            Some(LineEvent::Normal {
                slot: byte & LINE_SLOT_MASK,
                executing,
            })
        } else if idle {
            Some(LineEvent::Idle { executing })
        } else {
            None
        }
    }
}

const fn exec_bit(executing: bool) -> u8 {
    if executing {
        LINE_TYPE_EXEC
    } else {
        0
    }
}
