//! Unified error type for mk52-scan.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` for efficient on-target logging and
//! `Display` so the console can echo it back to the operator.

use core::fmt;

/// Top-level error type used across the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Scan pipeline
    /// The cycle counter did not advance during calibration.
    ClockNotRunning,

    /// Events were dropped because the consumer fell behind.
    QueueOverrun(u32),

    // Console
    /// First word of a command line is not a known command.
    UnknownCommand,

    /// Command is known but an argument is missing or invalid.
    BadArgument,

    /// Input line exceeded the command buffer.
    LineTooLong,

    // Peripherals
    /// I²C transaction to the display failed.
    Display,

    /// UART transfer failed.
    Serial,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ClockNotRunning => f.write_str("DWT init failed!"),
            Error::QueueOverrun(n) => write!(f, "event queue overrun ({} dropped)", n),
            Error::UnknownCommand => f.write_str("unknown command"),
            Error::BadArgument => f.write_str("invalid argument"),
            Error::LineTooLong => f.write_str("line too long"),
            Error::Display => f.write_str("display error"),
            Error::Serial => f.write_str("serial error"),
        }
    }
}
