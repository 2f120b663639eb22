//! Scan cycle state machine.
//!
//! ```text
//!            first edge              edge, period >= floor
//!  IdleWait ───────────► FirstEdge ─────────────────────────► Sampling
//!     ▲   ▲                  │ edge, period < floor               │
//!     │   └──────────────────┘                                    │
//!     └──────────────────── 14th sample classified ◄──────────────┘
//! ```
//!
//! Both entry points run in interrupt context at the same priority, so
//! they never preempt each other. The machine is the single owner of all
//! cycle-scoped state.

use super::{
    CycleCounter, EventProducer, HistoryWriter, LineEvent, MicrosClock, Sampler, ScanFlags,
    ScanShared, ScanTimer, SegmentBus, Verdict,
};
use crate::config::{
    FIRST_TICK_EXTRA_USEC, MIN_SCAN_PERIOD_USEC, NUM_SCAN_POS, SCAN_ORDER, SCAN_START_DELAY_USEC,
    SIGN_SEGMENT_MASK, TICK_CORRECTION_USEC,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanState {
    /// No cycle in progress.
    IdleWait,
    /// Exactly one edge seen so far; period unknown.
    FirstEdge,
    /// Timer running, positions being sampled.
    Sampling,
}

pub struct ScanMachine<'a, C, T, B> {
    clock: MicrosClock<C>,
    timer: T,
    bus: B,
    sampler: Sampler,
    state: ScanState,
    last_edge: Option<u32>,
    /// Live timer reload, corrected as the cycle progresses.
    reload: u32,
    /// Positions sampled in the current cycle.
    samples: usize,
    /// Inside a run of blank cycles (the Idle event was already sent).
    blank_run: bool,
    events: EventProducer<'a>,
    history: HistoryWriter<'a>,
    shared: &'a ScanShared,
}

impl<'a, C, T, B> ScanMachine<'a, C, T, B>
where
    C: CycleCounter,
    T: ScanTimer,
    B: SegmentBus,
{
    pub fn new(
        clock: MicrosClock<C>,
        mut timer: T,
        bus: B,
        events: EventProducer<'a>,
        history: HistoryWriter<'a>,
        shared: &'a ScanShared,
    ) -> Self {
        timer.disable();
        shared.stats.set_clocks_per_usec(clock.clocks_per_usec());
        Self {
            clock,
            timer,
            bus,
            sampler: Sampler::new(),
            state: ScanState::IdleWait,
            last_edge: None,
            reload: 0,
            samples: 0,
            blank_run: false,
            events,
            history,
            shared,
        }
    }

    /// Rising edge on the digit-8 grid line.
    pub fn on_cycle_start(&mut self) {
        let now = self.clock.now();
        self.shared.watchdog.reset();

        let Some(last) = self.last_edge.replace(now) else {
            self.state = ScanState::FirstEdge;
            return;
        };

        let period = self.clock.usec_between(last, now);
        self.shared.stats.set_period(period);
        if period < MIN_SCAN_PERIOD_USEC {
            // Calculator powering up; a cycle already in flight carries on.
            if self.state != ScanState::Sampling {
                self.state = ScanState::IdleWait;
            }
            return;
        }

        if self.state == ScanState::Sampling {
            // Restart: the old period must not tick into the new cycle.
            self.timer.disable();
        }
        self.reload = period / NUM_SCAN_POS as u32;
        self.shared.stats.set_reload(self.reload);
        self.timer.set_period(self.reload + FIRST_TICK_EXTRA_USEC);

        self.clock.delay_usec(SCAN_START_DELAY_USEC);
        self.sampler.begin_cycle();
        self.samples = 0;
        self.sample_next();
        self.timer.enable();
        self.state = ScanState::Sampling;
    }

    /// Scan timer expired. Returns the event queued by this tick, if any.
    pub fn on_timer_tick(&mut self) -> Option<LineEvent> {
        if self.state != ScanState::Sampling {
            self.timer.disable();
            return None;
        }

        self.sample_next();

        if self.samples == NUM_SCAN_POS {
            self.timer.disable();
            self.state = ScanState::IdleWait;
            return self.finish_cycle();
        }

        if self.samples & 0x03 == 0x03 {
            self.reload = self.reload.saturating_sub(TICK_CORRECTION_USEC);
        }
        self.timer.set_period(self.reload);
        None
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Live timer reload in microseconds.
    pub fn reload(&self) -> u32 {
        self.reload
    }

    /// Positions sampled so far in the current cycle.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Blank cycles counted since the Idle event.
    pub fn idle_cycles(&self) -> u16 {
        self.sampler.line().idle_cycles
    }

    #[inline]
    fn sample_next(&mut self) {
        let position = SCAN_ORDER[self.samples];
        self.sampler.sample(&mut self.bus, position);
        self.samples += 1;
    }

    fn finish_cycle(&mut self) -> Option<LineEvent> {
        let flags = self.shared.flags();
        let executing = self.sampler.program_running();

        match self.sampler.verdict(flags.contains(ScanFlags::PRINT_KEYS)) {
            Verdict::Normal => {
                let mut published = *self.sampler.line();
                published.segments[0] &= SIGN_SEGMENT_MASK;
                let slot = self.history.publish(&published);
                self.sampler.line_mut().idle_cycles = 0;
                self.blank_run = false;
                self.queue(LineEvent::Normal { slot, executing })
            }
            Verdict::Blank if self.blank_run => {
                let line = self.sampler.line_mut();
                line.idle_cycles = line.idle_cycles.saturating_add(1);
                None
            }
            Verdict::Blank => {
                self.blank_run = true;
                self.queue(LineEvent::Idle { executing })
            }
            Verdict::Unchanged => None,
        }
    }

    fn queue(&mut self, event: LineEvent) -> Option<LineEvent> {
        self.events.push(event).then_some(event)
    }
}
