//! Scanner → main loop event queue.
//!
//! A `heapless::spsc::Queue` of packed [`LineEvent`] bytes. The producer
//! half lives inside the scan interrupts, the consumer half in the
//! presenter task; neither can be cloned. The queue's own Release/Acquire
//! pair orders the history slot write before the event becomes visible.
//!
//! Overflow drops the newest event and bumps [`ScanStats::overruns`]: the
//! producer cannot move the consumer's read index, so drop-oldest is not
//! available without breaking single-writer ownership.

use heapless::spsc::{Consumer, Producer, Queue};

use super::{LineEvent, ScanStats};
use crate::config::EVENT_QUEUE_LEN;

/// Backing storage. Place in a `static` (or `StaticCell`) and `split` once.
pub struct EventQueue {
    inner: Queue<u8, EVENT_QUEUE_LEN>,
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            inner: Queue::new(),
        }
    }

    /// Events that fit before the producer starts dropping.
    pub const fn capacity(&self) -> usize {
        EVENT_QUEUE_LEN - 1
    }

    pub fn split<'a>(
        &'a mut self,
        stats: &'a ScanStats,
    ) -> (EventProducer<'a>, EventConsumer<'a>) {
        let (producer, consumer) = self.inner.split();
        (
            EventProducer { producer, stats },
            EventConsumer { consumer },
        )
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Interrupt-side half.
pub struct EventProducer<'a> {
    producer: Producer<'a, u8, EVENT_QUEUE_LEN>,
    stats: &'a ScanStats,
}

impl EventProducer<'_> {
    /// Queue an event without blocking. Returns `false` if it was dropped.
    pub fn push(&mut self, event: LineEvent) -> bool {
        match self.producer.enqueue(event.to_byte()) {
            Ok(()) => true,
            Err(_) => {
                self.stats.record_overrun();
                false
            }
        }
    }
}

/// Main-loop half.
pub struct EventConsumer<'a> {
    consumer: Consumer<'a, u8, EVENT_QUEUE_LEN>,
}

impl EventConsumer<'_> {
    /// Next event, if any. Reserved bytes are skipped.
    pub fn try_pop(&mut self) -> Option<LineEvent> {
        while let Some(byte) = self.consumer.dequeue() {
            if let Some(event) = LineEvent::from_byte(byte) {
                return Some(event);
            }
        }
        None
    }

    /// Events waiting to be handled.
    pub fn len(&self) -> usize {
        self.consumer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
