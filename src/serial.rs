//! UART console: command input and the shared output pipe.
//!
//! Both the console and the presenter write text into [`OUTPUT`]; a single
//! task drains it to UARTE0. Writers never block: when the pipe is full
//! the rest of the message is dropped.

use core::fmt::{self, Write as _};

use defmt::{info, warn};
use embassy_nrf::uarte::{UarteRx, UarteTx};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Sender;
use embassy_sync::pipe::Pipe;
use embassy_time::{Duration, Timer};
use mk52_scan::config::CORE_CLOCK_HZ;
use mk52_scan::console::{self, Command, LineEditor, OledCommand, PROMPT};
use mk52_scan::render::Frame;
use mk52_scan::scan::ScanShared;
use mk52_scan::Error;

use crate::display::DisplayCommand;
use crate::hw;

const OUTPUT_LEN: usize = 1024;

pub static OUTPUT: Pipe<CriticalSectionRawMutex, OUTPUT_LEN> = Pipe::new();

/// `fmt::Write` into [`OUTPUT`].
pub struct Output;

impl fmt::Write for Output {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut bytes = s.as_bytes();
        while !bytes.is_empty() {
            match OUTPUT.try_write(bytes) {
                Ok(n) => bytes = &bytes[n..],
                Err(_) => return Err(fmt::Error),
            }
        }
        Ok(())
    }
}

#[embassy_executor::task]
pub async fn writer_task(mut tx: UarteTx<'static, embassy_nrf::peripherals::UARTE0>) -> ! {
    let mut buf = [0u8; 64];
    loop {
        let n = OUTPUT.read(&mut buf).await;
        if tx.write(&buf[..n]).await.is_err() {
            warn!("{}", Error::Serial);
        }
    }
}

#[embassy_executor::task]
pub async fn console_task(
    mut rx: UarteRx<'static, embassy_nrf::peripherals::UARTE0>,
    shared: &'static ScanShared,
    display: Sender<'static, CriticalSectionRawMutex, DisplayCommand, 4>,
) -> ! {
    let mut out = Output;
    let mut editor = LineEditor::new();
    let _ = console::format_help(&mut out, hw::device_id(), CORE_CLOCK_HZ);
    let _ = out.write_str(PROMPT);

    let mut byte = [0u8; 1];
    loop {
        if rx.read(&mut byte).await.is_err() {
            warn!("{}", Error::Serial);
            continue;
        }

        let line = match editor.feed(byte[0], &mut out) {
            Ok(Some(line)) => line,
            Ok(None) => continue,
            Err(err) => {
                warn!("console: {}", err);
                report_error(&mut out, err);
                continue;
            }
        };

        if !line.is_empty() {
            if let Err(err) = run(&line, &mut out, shared, &display).await {
                report_error(&mut out, err);
            }
        }
        let _ = out.write_str(PROMPT);
    }
}

pub fn report_error(out: &mut Output, err: Error) {
    let _ = console::format_error(out, err);
}

async fn run(
    line: &str,
    out: &mut Output,
    shared: &ScanShared,
    display: &Sender<'static, CriticalSectionRawMutex, DisplayCommand, 4>,
) -> Result<(), Error> {
    let cmd = Command::parse(line)?;
    info!("console: {}", line);

    match cmd {
        Command::Help => {
            let _ = console::format_help(out, hw::device_id(), CORE_CLOCK_HZ);
        }
        Command::Info => {
            let _ = console::format_info(out, &shared.stats, shared.flags());
        }
        Command::Reset { extra_args } => {
            if extra_args {
                let _ = out.write_str("ignoring arguments\n");
            }
            let _ = out.write_str("resetting...\n");
            // Let the writer task drain the pipe.
            Timer::after(Duration::from_millis(50)).await;
            cortex_m::peripheral::SCB::sys_reset();
        }
        Command::Print { .. } => shared.set_flags(cmd.apply(shared.flags())),
        Command::Oled(oled) => {
            let request = match oled {
                OledCommand::Power(on) => DisplayCommand::Power(on),
                OledCommand::Reset => DisplayCommand::Reset,
                OledCommand::Clear => DisplayCommand::Clear,
                OledCommand::Dim(on) => DisplayCommand::Dim(on),
                OledCommand::Print(text) => DisplayCommand::Show(Frame::from_text(text)),
            };
            display.send(request).await;
        }
    }
    Ok(())
}
