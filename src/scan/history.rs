//! Ring of recently published scan lines.
//!
//! Slots are relaxed atomics: the writer fills a slot, then queues the
//! event naming it, and the queue's Release/Acquire makes the slot visible.
//! A consumer that lags by `NUM_LINES` cycles reads a newer line than the
//! event announced; that is tolerated, never undefined.

use core::sync::atomic::{AtomicU16, AtomicU8, Ordering};

use super::ScanLine;
use crate::config::{NUM_LINES, NUM_SCAN_POS};

struct Slot {
    segments: [AtomicU8; NUM_SCAN_POS],
    idle_cycles: AtomicU16,
}

impl Slot {
    const fn new() -> Self {
        Self {
            segments: [const { AtomicU8::new(0) }; NUM_SCAN_POS],
            idle_cycles: AtomicU16::new(0),
        }
    }
}

pub struct LineHistory {
    slots: [Slot; NUM_LINES],
}

impl LineHistory {
    pub const fn new() -> Self {
        Self {
            slots: [const { Slot::new() }; NUM_LINES],
        }
    }

    /// Hand out the single writer and the single reader.
    pub fn split(&mut self) -> (HistoryWriter<'_>, HistoryReader<'_>) {
        let slots = &self.slots;
        (
            HistoryWriter { slots, cursor: 0 },
            HistoryReader { slots },
        )
    }
}

impl Default for LineHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Interrupt-side half; owns the write cursor.
pub struct HistoryWriter<'a> {
    slots: &'a [Slot; NUM_LINES],
    cursor: usize,
}

impl HistoryWriter<'_> {
    /// Slot the next `publish` writes to.
    pub fn cursor(&self) -> u8 {
        self.cursor as u8
    }

    /// Copy `line` into the next slot and return its index.
    pub fn publish(&mut self, line: &ScanLine) -> u8 {
        let index = self.cursor;
        let slot = &self.slots[index];
        for (dst, &src) in slot.segments.iter().zip(line.segments.iter()) {
            dst.store(src, Ordering::Relaxed);
        }
        slot.idle_cycles.store(line.idle_cycles, Ordering::Relaxed);
        self.cursor = (index + 1) & (NUM_LINES - 1);
        index as u8
    }
}

/// Main-loop half.
pub struct HistoryReader<'a> {
    slots: &'a [Slot; NUM_LINES],
}

impl HistoryReader<'_> {
    /// Copy out the line in `slot`. Out-of-range indices wrap.
    pub fn read(&self, slot: u8) -> ScanLine {
        let slot = &self.slots[slot as usize & (NUM_LINES - 1)];
        let mut line = ScanLine::blank();
        for (dst, src) in line.segments.iter_mut().zip(slot.segments.iter()) {
            *dst = src.load(Ordering::Relaxed);
        }
        line.idle_cycles = slot.idle_cycles.load(Ordering::Relaxed);
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_with(first: u8, idle_cycles: u16) -> ScanLine {
        let mut line = ScanLine::blank();
        line.segments[0] = first;
        line.segments[NUM_SCAN_POS - 1] = 0x7F;
        line.idle_cycles = idle_cycles;
        line
    }

    #[test]
    fn publish_then_read_same_slot() {
        let mut history = LineHistory::new();
        let (mut writer, reader) = history.split();

        let line = line_with(0x40, 7);
        let slot = writer.publish(&line);
        assert_eq!(slot, 0);
        assert_eq!(writer.cursor(), 1);
        assert_eq!(reader.read(slot), line);
    }

    #[test]
    fn cursor_wraps_at_capacity() {
        let mut history = LineHistory::new();
        let (mut writer, reader) = history.split();

        for i in 0..NUM_LINES {
            assert_eq!(writer.publish(&line_with(i as u8, 0)) as usize, i);
        }
        assert_eq!(writer.cursor(), 0);

        // Slot 0 gets recycled.
        let slot = writer.publish(&line_with(0xAA, 1));
        assert_eq!(slot, 0);
        assert_eq!(reader.read(0).segments[0], 0xAA);
        assert_eq!(reader.read(1).segments[0], 1);
    }
}
