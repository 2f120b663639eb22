//! Line-oriented diagnostic console.
//!
//! Parsing and formatting only; the embedded binary moves the bytes. All
//! output goes through `core::fmt::Write`, so a `heapless::String` works
//! as well as the UART pipe.

use core::fmt::{self, Write};

use heapless::String;

use crate::config::{CMD_LEN, NUM_DIGITS, NUM_SCAN_POS, SEG_DOT, VERSION};
use crate::error::Error;
use crate::presenter::Action;
use crate::scan::{ScanFlags, ScanLine, ScanStats};
use crate::symbols::Symbol;

pub const PROMPT: &str = "> ";

/// Printed instead of a line when the display goes blank. No newline:
/// the wake-up report finishes it.
pub const IDLE_TEXT: &str = "'             '";

const COMMANDS: &[&str] = &[
    "help",
    "reset",
    "info",
    "print scan on|off",
    "print hex on|off",
    "print key on|off",
    "oled on|off",
    "oled reset",
    "oled clear",
    "oled dim on|off",
    "oled print $str",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Help,
    Info,
    /// `extra_args` is set when something followed the command word.
    Reset { extra_args: bool },
    Print { flag: ScanFlags, on: bool },
    Oled(OledCommand<'a>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OledCommand<'a> {
    Power(bool),
    Reset,
    Clear,
    Dim(bool),
    Print(&'a str),
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a str) -> Result<Self, Error> {
        let (cmd, args) = next_word(line);
        match cmd {
            "help" => Ok(Command::Help),
            "info" => Ok(Command::Info),
            "reset" => Ok(Command::Reset {
                extra_args: !args.trim().is_empty(),
            }),
            "print" => {
                let (what, rest) = next_word(args);
                let flag = match what {
                    "scan" => ScanFlags::PRINT_SCAN,
                    "hex" => ScanFlags::PRINT_HEX,
                    "key" => ScanFlags::PRINT_KEYS,
                    _ => return Err(Error::BadArgument),
                };
                Ok(Command::Print {
                    flag,
                    on: parse_switch(rest)?,
                })
            }
            "oled" => {
                let (what, rest) = next_word(args);
                let oled = match what {
                    "on" => OledCommand::Power(true),
                    "off" => OledCommand::Power(false),
                    "reset" => OledCommand::Reset,
                    "clear" => OledCommand::Clear,
                    "dim" => OledCommand::Dim(parse_switch(rest)?),
                    "print" => OledCommand::Print(rest),
                    _ => return Err(Error::BadArgument),
                };
                Ok(Command::Oled(oled))
            }
            _ => Err(Error::UnknownCommand),
        }
    }

    /// Flags after running this command.
    pub fn apply(&self, mut flags: ScanFlags) -> ScanFlags {
        if let Command::Print { flag, on } = *self {
            flags.set(flag, on);
        }
        flags
    }
}

fn next_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    s.split_once(' ').unwrap_or((s, ""))
}

fn parse_switch(s: &str) -> Result<bool, Error> {
    match next_word(s).0 {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err(Error::BadArgument),
    }
}

pub type Line = String<CMD_LEN>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Escape {
    None,
    Esc,
    Csi,
}

/// Echoing line editor with backspace and one-entry recall (arrow up).
pub struct LineEditor {
    line: Line,
    last: Line,
    escape: Escape,
    after_cr: bool,
}

impl LineEditor {
    pub const fn new() -> Self {
        Self {
            line: String::new(),
            last: String::new(),
            escape: Escape::None,
            after_cr: false,
        }
    }

    /// Feed one received byte, writing the echo to `echo`.
    ///
    /// Returns the finished line on Enter (possibly empty). An overlong
    /// line is discarded with [`Error::LineTooLong`].
    pub fn feed<W: Write>(&mut self, byte: u8, echo: &mut W) -> Result<Option<Line>, Error> {
        let after_cr = core::mem::replace(&mut self.after_cr, byte == b'\r');

        match (self.escape, byte) {
            (Escape::Esc, b'[') => {
                self.escape = Escape::Csi;
                return Ok(None);
            }
            (Escape::Csi, b'A') => {
                self.escape = Escape::None;
                if self.line.is_empty() && !self.last.is_empty() {
                    self.line = self.last.clone();
                    echo.write_str(&self.line).map_err(|_| Error::Serial)?;
                }
                return Ok(None);
            }
            (Escape::Esc | Escape::Csi, _) => {
                self.escape = Escape::None;
                return Ok(None);
            }
            (Escape::None, _) => {}
        }

        match byte {
            0x1B => self.escape = Escape::Esc,
            b'\n' if after_cr => {}
            b'\r' | b'\n' => {
                echo.write_char('\n').map_err(|_| Error::Serial)?;
                let line = core::mem::take(&mut self.line);
                if !line.is_empty() {
                    self.last = line.clone();
                }
                return Ok(Some(line));
            }
            0x08 | 0x7F => {
                if self.line.pop().is_some() {
                    echo.write_str("\x08 \x08").map_err(|_| Error::Serial)?;
                }
            }
            b' '..=b'~' => {
                if self.line.push(byte as char).is_err() {
                    self.line.clear();
                    return Err(Error::LineTooLong);
                }
                echo.write_char(byte as char).map_err(|_| Error::Serial)?;
            }
            _ => {}
        }
        Ok(None)
    }
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "ON"
    } else {
        "OFF"
    }
}

pub fn format_help<W: Write>(out: &mut W, device_id: [u32; 2], core_clock_hz: u32) -> fmt::Result {
    writeln!(out, "Device ID: {:08X}-{:08X}", device_id[0], device_id[1])?;
    writeln!(out, "Running at: {}", core_clock_hz)?;
    writeln!(out, "Version: {}", VERSION)?;
    out.write_str("Commands:")?;
    for cmd in COMMANDS {
        write!(out, "\n    {}", cmd)?;
    }
    out.write_char('\n')
}

pub fn format_info<W: Write>(out: &mut W, stats: &ScanStats, flags: ScanFlags) -> fmt::Result {
    let period = stats.period_usec();
    writeln!(
        out,
        "DWT counter is running at {} clocks per usec",
        stats.clocks_per_usec()
    )?;
    writeln!(out, "Scan cycle {}.{:03} msec", period / 1000, period % 1000)?;
    writeln!(out, "Timer period {} usec", stats.reload_usec())?;
    writeln!(
        out,
        "Printing of scan lines is {}",
        on_off(flags.contains(ScanFlags::PRINT_SCAN))
    )?;
    writeln!(
        out,
        "Printing of hex scan codes is {}",
        on_off(flags.contains(ScanFlags::PRINT_HEX))
    )?;
    writeln!(
        out,
        "Printing of key scan codes is {}",
        on_off(flags.contains(ScanFlags::PRINT_KEYS))
    )?;
    writeln!(out, "Event queue overruns {}", stats.overruns())
}

/// `XX XX .. 'digits' [keys] RUNNING`
pub fn format_line<W: Write>(
    out: &mut W,
    line: &ScanLine,
    flags: ScanFlags,
    executing: bool,
) -> fmt::Result {
    if flags.contains(ScanFlags::PRINT_HEX) {
        for raw in line.segments {
            write!(out, "{:02X} ", raw)?;
        }
    }

    out.write_char('\'')?;
    for (pos, &raw) in line.segments.iter().enumerate() {
        match Symbol::from_segments(raw) {
            Some(symbol) => {
                out.write_char(symbol.as_char())?;
                if raw & SEG_DOT != 0 {
                    out.write_char('.')?;
                }
            }
            None => write!(out, "({:02X})", raw)?,
        }
        if pos == NUM_DIGITS - 1 {
            out.write_str("' [")?;
        }
    }
    out.write_char(']')?;

    if executing {
        out.write_str(" RUNNING")?;
    }
    out.write_char('\n')
}

/// ` N cycles (ms.frac ms)` after a blank run, estimated from the
/// current timer reload.
pub fn format_wake<W: Write>(out: &mut W, idle_cycles: u16, reload_usec: u32) -> fmt::Result {
    let cycle_usec = (u64::from(reload_usec) + 1) * NUM_SCAN_POS as u64;
    let total = u64::from(idle_cycles) * cycle_usec;
    writeln!(
        out,
        " {} cycles ({}.{:03} ms)",
        idle_cycles,
        total / 1000,
        total % 1000
    )
}

/// Error echo, one per line.
pub fn format_error<W: Write>(out: &mut W, err: Error) -> fmt::Result {
    writeln!(out, "{}", err)
}

/// Serial log for one presenter action.
pub fn report<W: Write>(
    out: &mut W,
    action: &Action,
    flags: ScanFlags,
    reload_usec: u32,
) -> fmt::Result {
    if !flags.contains(ScanFlags::PRINT_SCAN) {
        return Ok(());
    }
    match action {
        Action::Show {
            line, dim, woke, ..
        } => {
            if let Some(cycles) = *woke {
                format_wake(out, cycles, reload_usec)?;
            }
            format_line(out, line, flags, *dim)
        }
        Action::Clear | Action::ScreenOff => out.write_str(IDLE_TEXT),
        Action::PowerDown => Ok(()),
    }
}
