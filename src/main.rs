//! mk52-scan firmware entry point (nRF52840).
//!
//! ```text
//!  GPIOTE ─┐                       ┌─► presenter_task ─► OLED
//!          ├─► ScanMachine ─► queue┤        │
//!  TIMER1 ─┘        │       history┘        └─► OUTPUT pipe ─► writer_task ─► UART
//!                   └─ watchdog ◄── 10 ms ticker           ▲
//!                                      console_task ───────┘ (flags, oled cmds)
//! ```

#![no_std]
#![no_main]

mod display;
mod hw;
mod serial;

use core::cell::RefCell;

use defmt::{error, info, warn};
use embassy_executor::Spawner;
use embassy_futures::select::{select3, Either3};
use embassy_nrf::gpio::Pin;
use embassy_nrf::interrupt;
use embassy_nrf::{bind_interrupts, peripherals, twim, uarte};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::{Channel, Receiver};
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Ticker};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use mk52_scan::config::{CONSOLE_BAUD, CORE_CLOCK_HZ, WATCHDOG_TICK_MS};
use mk52_scan::console;
use mk52_scan::presenter::{Action, Presenter};
use mk52_scan::scan::{
    EventConsumer, EventQueue, HistoryReader, LineHistory, MicrosClock, ScanFlags, ScanMachine,
    ScanShared,
};
use mk52_scan::Error;

use crate::display::{Display, DisplayCommand};

bind_interrupts!(struct Irqs {
    UARTE0_UART0 => uarte::InterruptHandler<peripherals::UARTE0>;
    SPIM0_SPIS0_TWIM0_TWIS0_SPI0_TWI0 => twim::InterruptHandler<peripherals::TWISPI0>;
});

type Machine = ScanMachine<'static, hw::DwtCounter, hw::Timer1, hw::SegmentPort>;
type I2c = twim::Twim<'static, peripherals::TWISPI0>;

static SHARED: ScanShared = ScanShared::new(ScanFlags::PRINT_SCAN);
static QUEUE: StaticCell<EventQueue> = StaticCell::new();
static HISTORY: StaticCell<LineHistory> = StaticCell::new();

/// Touched only by the two scan handlers, which share one priority.
static MACHINE: Mutex<CriticalSectionRawMutex, RefCell<Option<Machine>>> =
    Mutex::new(RefCell::new(None));

/// Raised by TIMER1 after it queued an event.
static EVENT_SIGNAL: Signal<CriticalSectionRawMutex, ()> = Signal::new();

static DISPLAY_COMMANDS: Channel<CriticalSectionRawMutex, DisplayCommand, 4> = Channel::new();

// ═══════════════════════════════════════════════════════════════════════════
// Scan interrupts
// ═══════════════════════════════════════════════════════════════════════════

#[interrupt]
fn GPIOTE() {
    if !hw::acknowledge_cycle_start() {
        return;
    }
    MACHINE.lock(|machine| {
        if let Some(machine) = machine.borrow_mut().as_mut() {
            machine.on_cycle_start();
        }
    });
}

#[interrupt]
fn TIMER1() {
    hw::Timer1::acknowledge();
    let event = MACHINE.lock(|machine| {
        machine
            .borrow_mut()
            .as_mut()
            .and_then(|machine| machine.on_timer_tick())
    });
    if event.is_some() {
        EVENT_SIGNAL.signal(());
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Presenter
// ═══════════════════════════════════════════════════════════════════════════

#[embassy_executor::task]
async fn presenter_task(
    mut events: EventConsumer<'static>,
    history: HistoryReader<'static>,
    mut oled: Option<Display<I2c>>,
    commands: Receiver<'static, CriticalSectionRawMutex, DisplayCommand, 4>,
) -> ! {
    let mut presenter = Presenter::new();
    let mut out = serial::Output;
    let mut ticker = Ticker::every(Duration::from_millis(WATCHDOG_TICK_MS));

    loop {
        match select3(EVENT_SIGNAL.wait(), ticker.next(), commands.receive()).await {
            Either3::First(()) => {
                while let Some(event) = events.try_pop() {
                    let action = presenter.handle(event, &history);
                    let reported = console::report(
                        &mut out,
                        &action,
                        SHARED.flags(),
                        SHARED.stats.reload_usec(),
                    );
                    if reported.is_err() {
                        warn!("console output full, line dropped");
                    }
                    apply(&mut oled, &action);
                }
                if let Err(err) = presenter.check_overruns(&SHARED.stats) {
                    serial::report_error(&mut out, err);
                }
            }
            Either3::Second(()) => {
                if let Some(action) = presenter.watchdog_tick(&SHARED.watchdog) {
                    apply(&mut oled, &action);
                }
            }
            Either3::Third(command) => {
                let result = match oled.as_mut() {
                    Some(panel) => run_display_command(panel, command),
                    None => Err(Error::Display),
                };
                if let Err(err) = result {
                    warn!("oled: {}", err);
                    serial::report_error(&mut out, err);
                }
            }
        }
    }
}

fn apply(oled: &mut Option<Display<I2c>>, action: &Action) {
    let Some(panel) = oled.as_mut() else {
        return;
    };
    let result = match *action {
        Action::Show {
            ref frame,
            dim,
            woke,
            ..
        } => display::set_dim(panel, dim)
            .and_then(|()| display::draw_frame(panel, frame))
            .and_then(|()| match woke {
                Some(_) => display::set_power(panel, true),
                None => Ok(()),
            }),
        Action::Clear => display::clear(panel),
        Action::ScreenOff => display::set_power(panel, false),
        Action::PowerDown => display::clear(panel).and_then(|()| display::set_power(panel, false)),
    };
    if let Err(err) = result {
        warn!("oled: {}", err);
    }
}

fn run_display_command(panel: &mut Display<I2c>, command: DisplayCommand) -> Result<(), Error> {
    match command {
        DisplayCommand::Power(on) => display::set_power(panel, on),
        DisplayCommand::Reset => display::reset(panel),
        DisplayCommand::Clear => display::clear(panel),
        DisplayCommand::Dim(on) => display::set_dim(panel, on),
        DisplayCommand::Show(frame) => display::draw_frame(panel, &frame),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Entry point
// ═══════════════════════════════════════════════════════════════════════════

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    info!("mk52-scan {} starting", mk52_scan::config::VERSION);

    // Console first so start-up errors reach the operator.
    let mut uart_config = uarte::Config::default();
    uart_config.baudrate = uarte::Baudrate::BAUD38400;
    let uart = uarte::Uarte::new(p.UARTE0, Irqs, p.P0_08, p.P0_06, uart_config);
    let (tx, rx) = uart.split();
    info!("console at {} baud", CONSOLE_BAUD);

    // OLED is optional: the scanner and console work without it.
    let i2c = twim::Twim::new(p.TWISPI0, Irqs, p.P0_26, p.P0_27, twim::Config::default());
    let oled = match display::init(i2c) {
        Ok(oled) => Some(oled),
        Err(err) => {
            error!("oled init failed: {}", err);
            None
        }
    };

    // Scan pipeline.
    let Some(mut core) = cortex_m::Peripherals::take() else {
        defmt::panic!("core peripherals already taken");
    };
    let counter = hw::DwtCounter::enable(&mut core.DCB, &mut core.DWT);
    let clock = MicrosClock::calibrate(counter, CORE_CLOCK_HZ);
    if !clock.is_calibrated() {
        error!("{}", Error::ClockNotRunning);
        serial::report_error(&mut serial::Output, Error::ClockNotRunning);
    }

    let segments = hw::SegmentPort::new([
        p.P1_01.degrade(),
        p.P1_02.degrade(),
        p.P1_03.degrade(),
        p.P1_04.degrade(),
        p.P1_05.degrade(),
        p.P1_06.degrade(),
        p.P1_07.degrade(),
        p.P1_08.degrade(),
    ]);
    let (producer, consumer) = QUEUE.init(EventQueue::new()).split(&SHARED.stats);
    let (writer, reader) = HISTORY.init(LineHistory::new()).split();
    let machine = ScanMachine::new(clock, hw::Timer1::init(), segments, producer, writer, &SHARED);
    MACHINE.lock(|cell| *cell.borrow_mut() = Some(machine));

    spawner.spawn(serial::writer_task(tx)).unwrap();
    spawner
        .spawn(serial::console_task(rx, &SHARED, DISPLAY_COMMANDS.sender()))
        .unwrap();
    spawner
        .spawn(presenter_task(consumer, reader, oled, DISPLAY_COMMANDS.receiver()))
        .unwrap();

    // Last: edges before this point would find no machine.
    hw::enable_cycle_start_irq();
    info!("scanning");
}
