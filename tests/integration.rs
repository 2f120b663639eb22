//! Integration tests for mk52-scan host-testable logic.
//!
//! Drives the whole pipeline through the public API: interrupt handlers
//! on one side, presenter and console on the other.

use std::cell::Cell;

use heapless::String;
use mk52_scan::config::{NUM_SCAN_POS, SCAN_ORDER, SEG_DOT};
use mk52_scan::console::{self, Command, IDLE_TEXT};
use mk52_scan::presenter::{Action, Presenter};
use mk52_scan::scan::{
    CycleCounter, EventQueue, LineEvent, LineHistory, MicrosClock, ScanFlags, ScanMachine,
    ScanShared, ScanTimer, SegmentBus,
};
use mk52_scan::symbols::Symbol;
use mk52_scan::Error;

/// Microsecond counter, set by the test before each edge.
struct Clock(Cell<u32>);

impl CycleCounter for Clock {
    fn now(&self) -> u32 {
        let t = self.0.get();
        self.0.set(t.wrapping_add(1));
        t
    }
}

struct Timer(Cell<bool>);

impl ScanTimer for &Timer {
    fn set_period(&mut self, _reload_usec: u32) {}

    fn enable(&mut self) {
        self.0.set(true);
    }

    fn disable(&mut self) {
        self.0.set(false);
    }
}

/// Replays one cycle of display-order bytes in bus order.
struct Bus {
    cycle: Cell<[u8; NUM_SCAN_POS]>,
    next: Cell<usize>,
}

impl Bus {
    fn load(&self, line: [u8; NUM_SCAN_POS]) {
        self.cycle.set(line);
        self.next.set(0);
    }
}

impl SegmentBus for &Bus {
    fn read(&mut self) -> u8 {
        let n = self.next.get();
        self.next.set(n + 1);
        self.cycle.get()[SCAN_ORDER[n % NUM_SCAN_POS]]
    }
}

const PERIOD: u32 = 14_000;

fn display(text: &[u8]) -> [u8; NUM_SCAN_POS] {
    let mut line = [0u8; NUM_SCAN_POS];
    line[..text.len()].copy_from_slice(text);
    line
}

#[test]
fn calculator_session_end_to_end() {
    let clock = Clock(Cell::new(0));
    let timer = Timer(Cell::new(false));
    let bus = Bus {
        cycle: Cell::new([0; NUM_SCAN_POS]),
        next: Cell::new(0),
    };
    let shared = ScanShared::new(ScanFlags::PRINT_SCAN);
    let mut queue = EventQueue::new();
    let mut history = LineHistory::new();
    let (tx, mut rx) = queue.split(&shared.stats);
    let (writer, reader) = history.split();
    let mut machine = ScanMachine::new(
        MicrosClock::calibrate(&clock, 1_000_000),
        &timer,
        &bus,
        tx,
        writer,
        &shared,
    );

    let mut now = 0;
    let mut cycle = |line: [u8; NUM_SCAN_POS]| {
        bus.load(line);
        clock.0.set(now);
        machine.on_cycle_start();
        for _ in 1..NUM_SCAN_POS {
            machine.on_timer_tick();
        }
        now += PERIOD;
    };

    // Power-up: first edge, then "0." on the display twice, then blank
    // three times, then "-12" while a program runs.
    cycle(display(&[]));
    cycle(display(&[0, 0x3F | SEG_DOT]));
    cycle(display(&[0, 0x3F | SEG_DOT]));
    cycle(display(&[]));
    cycle(display(&[]));
    cycle(display(&[]));
    let mut running = display(&[0x40, 0x06, 0x5B]);
    running[12] = 0x6F;
    cycle(running);
    drop(cycle);
    assert!(!timer.0.get());
    assert_eq!(shared.stats.period_usec(), PERIOD);
    assert_eq!(shared.stats.reload_usec(), PERIOD / 14);

    let mut presenter = Presenter::new();
    let mut log: String<512> = String::new();
    let mut actions = Vec::new();
    while let Some(event) = rx.try_pop() {
        let action = presenter.handle(event, &reader);
        console::report(&mut log, &action, shared.flags(), 99).unwrap();
        actions.push(action);
    }

    assert_eq!(actions.len(), 3);
    let Action::Show { frame, woke, dim, .. } = actions[0] else {
        panic!("expected first line, got {:?}", actions[0]);
    };
    assert_eq!(frame.glyphs()[1].symbol, Symbol::Zero);
    assert!(frame.glyphs()[1].dot);
    assert_eq!((woke, dim), (None, false));

    assert_eq!(actions[1], Action::ScreenOff);

    let Action::Show { frame, woke, dim, .. } = actions[2] else {
        panic!("expected running line, got {:?}", actions[2]);
    };
    assert_eq!(frame.glyphs()[0].symbol, Symbol::Minus);
    assert_eq!(woke, Some(2));
    assert!(dim);

    let expected = format!(
        "' 0.          ' [  ]\n{} 2 cycles (2.800 ms)\n'-12         ' [9 ] RUNNING\n",
        IDLE_TEXT
    );
    assert_eq!(log.as_str(), expected);
    assert_eq!(presenter.check_overruns(&shared.stats), Ok(()));
}

#[test]
fn console_session_changes_scan_flags() {
    let shared = ScanShared::new(ScanFlags::PRINT_SCAN);
    let mut editor = console::LineEditor::new();
    let mut echo: String<256> = String::new();

    let mut results = Vec::new();
    for &byte in b"print key on\r\nprint bogus on\r\nfoo\r\n".iter() {
        if let Some(line) = editor.feed(byte, &mut echo).unwrap() {
            let result = Command::parse(&line).map(|cmd| shared.set_flags(cmd.apply(shared.flags())));
            results.push(result);
        }
    }

    assert_eq!(
        results,
        [Ok(()), Err(Error::BadArgument), Err(Error::UnknownCommand)]
    );
    assert_eq!(
        shared.flags(),
        ScanFlags::PRINT_SCAN.union(ScanFlags::PRINT_KEYS)
    );
}

#[test]
fn watchdog_expires_without_edges_and_rearms_on_scan() {
    let clock = Clock(Cell::new(0));
    let timer = Timer(Cell::new(false));
    let bus = Bus {
        cycle: Cell::new([0; NUM_SCAN_POS]),
        next: Cell::new(0),
    };
    let shared = ScanShared::new(ScanFlags::empty());
    let mut queue = EventQueue::new();
    let mut history = LineHistory::new();
    let (tx, _rx) = queue.split(&shared.stats);
    let (writer, _reader) = history.split();
    let mut machine = ScanMachine::new(
        MicrosClock::calibrate(&clock, 1_000_000),
        &timer,
        &bus,
        tx,
        writer,
        &shared,
    );
    let mut presenter = Presenter::new();

    let power_downs = (0..shared.watchdog.timeout() * 2)
        .filter_map(|_| presenter.watchdog_tick(&shared.watchdog))
        .count();
    assert_eq!(power_downs, 1);

    machine.on_cycle_start();
    assert!(!shared.watchdog.is_expired());
    assert_eq!(shared.watchdog.ticks(), 0);
}

#[test]
fn queue_overrun_is_echoed_once_on_the_console() {
    let shared = ScanShared::new(ScanFlags::PRINT_SCAN);
    let mut queue = EventQueue::new();
    let capacity = queue.capacity();
    let (mut tx, mut rx) = queue.split(&shared.stats);
    for _ in 0..capacity + 3 {
        tx.push(LineEvent::Idle { executing: false });
    }

    let mut presenter = Presenter::new();
    let mut log: String<128> = String::new();
    while rx.try_pop().is_some() {}
    if let Err(err) = presenter.check_overruns(&shared.stats) {
        console::format_error(&mut log, err).unwrap();
    }
    if let Err(err) = presenter.check_overruns(&shared.stats) {
        console::format_error(&mut log, err).unwrap();
    }

    assert_eq!(log.as_str(), "event queue overrun (3 dropped)\n");
}
