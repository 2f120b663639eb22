//! Main-loop consumer: turns scan events into display actions.
//!
//! Knows nothing about the OLED or the UART. The embedded binary applies
//! the returned [`Action`] to the hardware and hands the same action to
//! [`crate::console::report`] for the serial log.

use crate::error::Error;
use crate::render::Frame;
use crate::scan::{HistoryReader, LineEvent, ScanLine, ScanStats, Watchdog};

/// What the display should do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Draw a new line.
    Show {
        frame: Frame,
        line: ScanLine,
        /// A program is running on the calculator.
        dim: bool,
        /// Set when the display was blank before this line: the screen
        /// must be switched back on. Carries the blank cycle count.
        woke: Option<u16>,
    },
    /// Blank display while a program runs: clear, keep the panel on.
    Clear,
    /// Blank display, calculator idle: panel off.
    ScreenOff,
    /// No scan activity for the watchdog timeout.
    PowerDown,
}

pub struct Presenter {
    blank: bool,
    seen_overruns: u32,
}

impl Presenter {
    pub const fn new() -> Self {
        Self {
            blank: false,
            seen_overruns: 0,
        }
    }

    pub fn handle(&mut self, event: LineEvent, history: &HistoryReader<'_>) -> Action {
        match event {
            LineEvent::Normal { slot, executing } => {
                let line = history.read(slot);
                let woke = core::mem::replace(&mut self.blank, false).then_some(line.idle_cycles);
                if let Some(cycles) = woke {
                    debug!("display woke after {} blank cycles", cycles);
                }
                Action::Show {
                    frame: Frame::from_line(&line),
                    line,
                    dim: executing,
                    woke,
                }
            }
            LineEvent::Idle { executing } => {
                self.blank = true;
                if executing {
                    Action::Clear
                } else {
                    Action::ScreenOff
                }
            }
        }
    }

    /// Advance the watchdog by one tick.
    ///
    /// Powers the display down once when the timeout is reached. The next
    /// line then wakes it like after a blank run.
    pub fn watchdog_tick(&mut self, watchdog: &Watchdog) -> Option<Action> {
        if !watchdog.tick() {
            return None;
        }
        info!("no scan for {} ticks, display off", watchdog.timeout());
        self.blank = true;
        Some(Action::PowerDown)
    }

    /// Report events the scanner had to drop since the last call.
    pub fn check_overruns(&mut self, stats: &ScanStats) -> Result<(), Error> {
        let total = stats.overruns();
        let dropped = total.wrapping_sub(self.seen_overruns);
        if dropped == 0 {
            return Ok(());
        }
        self.seen_overruns = total;
        let err = Error::QueueOverrun(dropped);
        warn!("{}", err);
        Err(err)
    }

    pub fn is_blank(&self) -> bool {
        self.blank
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{EventQueue, LineHistory};
    use crate::symbols::Symbol;

    fn line(digit: u8, idle_cycles: u16) -> ScanLine {
        let mut line = ScanLine::blank();
        line.segments[1] = digit;
        line.idle_cycles = idle_cycles;
        line
    }

    #[test]
    fn normal_line_is_drawn() {
        let mut history = LineHistory::new();
        let (mut writer, reader) = history.split();
        let slot = writer.publish(&line(0x06, 0));

        let mut presenter = Presenter::new();
        let action = presenter.handle(LineEvent::Normal { slot, executing: false }, &reader);

        let Action::Show { frame, line, dim, woke } = action else {
            panic!("unexpected {:?}", action);
        };
        assert_eq!(frame.glyphs()[1].symbol, Symbol::One);
        assert_eq!(line.segments[1], 0x06);
        assert!(!dim);
        assert_eq!(woke, None);
    }

    #[test]
    fn executing_line_is_dimmed() {
        let mut history = LineHistory::new();
        let (mut writer, reader) = history.split();
        let slot = writer.publish(&line(0x5B, 0));

        let mut presenter = Presenter::new();
        let action = presenter.handle(LineEvent::Normal { slot, executing: true }, &reader);
        assert!(matches!(action, Action::Show { dim: true, .. }));
    }

    #[test]
    fn idle_turns_screen_off_or_clears() {
        let mut history = LineHistory::new();
        let (_, reader) = history.split();
        let mut presenter = Presenter::new();

        assert_eq!(
            presenter.handle(LineEvent::Idle { executing: false }, &reader),
            Action::ScreenOff
        );
        assert!(presenter.is_blank());
        assert_eq!(
            presenter.handle(LineEvent::Idle { executing: true }, &reader),
            Action::Clear
        );
    }

    #[test]
    fn first_line_after_blank_wakes_with_cycle_count() {
        let mut history = LineHistory::new();
        let (mut writer, reader) = history.split();
        let mut presenter = Presenter::new();

        presenter.handle(LineEvent::Idle { executing: false }, &reader);
        let slot = writer.publish(&line(0x66, 42));
        let first = presenter.handle(LineEvent::Normal { slot, executing: false }, &reader);
        assert!(matches!(first, Action::Show { woke: Some(42), .. }));
        assert!(!presenter.is_blank());

        let slot = writer.publish(&line(0x6D, 0));
        let second = presenter.handle(LineEvent::Normal { slot, executing: false }, &reader);
        assert!(matches!(second, Action::Show { woke: None, .. }));
    }

    #[test]
    fn watchdog_powers_down_once() {
        let watchdog = Watchdog::with_timeout(3);
        let mut presenter = Presenter::new();

        assert_eq!(presenter.watchdog_tick(&watchdog), None);
        assert_eq!(presenter.watchdog_tick(&watchdog), None);
        assert_eq!(presenter.watchdog_tick(&watchdog), Some(Action::PowerDown));
        for _ in 0..10 {
            assert_eq!(presenter.watchdog_tick(&watchdog), None);
        }
        assert!(presenter.is_blank());

        watchdog.reset();
        presenter.watchdog_tick(&watchdog);
        presenter.watchdog_tick(&watchdog);
        assert_eq!(presenter.watchdog_tick(&watchdog), Some(Action::PowerDown));
    }

    #[test]
    fn overruns_reported_as_delta() {
        let stats = ScanStats::new();
        let mut queue = EventQueue::new();
        let (mut tx, _rx) = queue.split(&stats);
        let mut presenter = Presenter::new();

        assert_eq!(presenter.check_overruns(&stats), Ok(()));

        let event = LineEvent::Idle { executing: false };
        while tx.push(event) {}
        tx.push(event);
        assert_eq!(presenter.check_overruns(&stats), Err(Error::QueueOverrun(2)));
        assert_eq!(presenter.check_overruns(&stats), Ok(()));

        tx.push(event);
        assert_eq!(presenter.check_overruns(&stats), Err(Error::QueueOverrun(1)));
    }
}
