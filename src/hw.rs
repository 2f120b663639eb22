//! nRF52840 bindings for the scan pipeline.
//!
//! The scan path does not go through the embassy-nrf drivers. TIMER1 and
//! GPIOTE channel 0 are programmed through the PAC and serviced by the
//! `#[interrupt]` handlers in `main.rs`, both at [`SCAN_IRQ_PRIORITY`] so
//! they never preempt each other.
//!
//!   Cycle counter → DWT CYCCNT (64 MHz core clock)
//!   Scan timer    → TIMER1, 1 MHz, CC[0] + COMPARE0_CLEAR short
//!   Cycle start   → GPIOTE IN[0], rising edge on P0.11
//!   Segment bus   → P1.01 .. P1.08, one IN register read

use cortex_m::peripheral::{DCB, DWT};
use embassy_nrf::gpio::{AnyPin, Input, Pull};
use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_nrf::pac;
use embassy_nrf::pac::gpiote::vals as gpiote_vals;
use embassy_nrf::pac::timer::vals as timer_vals;
use mk52_scan::config::{SCAN_GPIOTE_CHANNEL, SCAN_PIN, SEG_PIN_SHIFT};
use mk52_scan::scan::{CycleCounter, ScanTimer, SegmentBus};

/// Just below the time driver's RTC1 (P0); tasks run in thread mode.
pub const SCAN_IRQ_PRIORITY: Priority = Priority::P1;

/// 16 MHz / 2^4 = 1 tick per microsecond.
const TIMER_PRESCALER: u8 = 4;

/// DWT cycle counter.
pub struct DwtCounter;

impl DwtCounter {
    pub fn enable(dcb: &mut DCB, dwt: &mut DWT) -> Self {
        dcb.enable_trace();
        dwt.set_cycle_count(0);
        dwt.enable_cycle_counter();
        Self
    }
}

impl CycleCounter for DwtCounter {
    #[inline]
    fn now(&self) -> u32 {
        DWT::cycle_count()
    }
}

/// TIMER1 as a one-shot-per-position countdown.
pub struct Timer1;

impl Timer1 {
    pub fn init() -> Self {
        let t = pac::TIMER1;
        t.tasks_stop().write_value(1);
        t.mode().write(|w| w.set_mode(timer_vals::Mode::TIMER));
        t.bitmode().write(|w| w.set_bitmode(timer_vals::Bitmode::_32BIT));
        t.prescaler().write(|w| w.set_prescaler(TIMER_PRESCALER));
        t.shorts().write(|w| w.set_compare_clear(0, true));
        t.events_compare(0).write_value(0);
        t.intenset().write(|w| w.set_compare(0, true));

        interrupt::TIMER1.unpend();
        interrupt::TIMER1.set_priority(SCAN_IRQ_PRIORITY);
        unsafe { interrupt::TIMER1.enable() };
        Self
    }

    /// Clear COMPARE[0]. First thing in the TIMER1 handler.
    #[inline]
    pub fn acknowledge() {
        pac::TIMER1.events_compare(0).write_value(0);
    }
}

impl ScanTimer for Timer1 {
    #[inline]
    fn set_period(&mut self, reload_usec: u32) {
        // Counter was cleared by the short; only the next compare moves.
        let t = pac::TIMER1;
        t.cc(0).write_value(reload_usec);
        t.events_compare(0).write_value(0);
        interrupt::TIMER1.unpend();
    }

    fn enable(&mut self) {
        let t = pac::TIMER1;
        t.tasks_clear().write_value(1);
        // A compare from the previous period may have pended during the
        // start delay.
        t.events_compare(0).write_value(0);
        interrupt::TIMER1.unpend();
        t.tasks_start().write_value(1);
    }

    fn disable(&mut self) {
        let t = pac::TIMER1;
        t.tasks_stop().write_value(1);
        t.events_compare(0).write_value(0);
        interrupt::TIMER1.unpend();
    }
}

/// Rising edge on the digit-8 grid line.
pub fn enable_cycle_start_irq() {
    let g = pac::GPIOTE;
    g.config(SCAN_GPIOTE_CHANNEL).write(|w| {
        w.set_mode(gpiote_vals::Mode::EVENT);
        w.set_psel(SCAN_PIN);
        w.set_port(false);
        w.set_polarity(gpiote_vals::Polarity::LO_TO_HI);
    });
    g.events_in(SCAN_GPIOTE_CHANNEL).write_value(0);
    g.intenset().write(|w| w.set_in(SCAN_GPIOTE_CHANNEL, true));

    interrupt::GPIOTE.unpend();
    interrupt::GPIOTE.set_priority(SCAN_IRQ_PRIORITY);
    unsafe { interrupt::GPIOTE.enable() };
}

/// Clear IN[0]; `false` if the interrupt was not ours.
#[inline]
pub fn acknowledge_cycle_start() -> bool {
    let event = pac::GPIOTE.events_in(SCAN_GPIOTE_CHANNEL);
    if event.read() == 0 {
        return false;
    }
    event.write_value(0);
    true
}

/// Segment lines A..DP on contiguous P1 pins.
pub struct SegmentPort {
    // Held so the input buffers stay connected.
    _pins: [Input<'static>; 8],
}

impl SegmentPort {
    pub fn new(pins: [AnyPin; 8]) -> Self {
        Self {
            _pins: pins.map(|pin| Input::new(pin, Pull::None)),
        }
    }
}

impl SegmentBus for SegmentPort {
    #[inline]
    fn read(&mut self) -> u8 {
        (pac::P1.in_().read().0 >> SEG_PIN_SHIFT) as u8
    }
}

/// 64-bit factory device ID, shown by `help`.
pub fn device_id() -> [u32; 2] {
    let ficr = pac::FICR;
    [ficr.deviceid(0).read(), ficr.deviceid(1).read()]
}
