//! Application-wide constants and compile-time configuration.
//!
//! Pin assignments, scan timing parameters and buffer sizes live here so
//! they can be tuned in one place.

// Calculator display geometry

/// Real digit positions (sign + 11 digits).
pub const NUM_DIGITS: usize = 12;

/// Virtual key positions multiplexed after the digits.
pub const NUM_VIRT: usize = 2;

/// Positions sampled per scan cycle.
pub const NUM_SCAN_POS: usize = NUM_DIGITS + NUM_VIRT;

/// Order in which positions appear on the bus, starting from the digit-8
/// grid edge that triggers the cycle-start interrupt.
pub const SCAN_ORDER: [usize; NUM_SCAN_POS] = [8, 7, 6, 5, 4, 3, 2, 1, 0, 11, 10, 9, 12, 13];

/// Change/non-blank mask bits of the real digits.
pub const DIGIT_MASK: u16 = (1 << NUM_DIGITS) - 1;

/// Key position 0 showing '9' means the calculator is running a program.
pub const PROGRAM_RUNNING: u8 = 0x6F;

// Segment bus bits

pub const SEG_A: u8 = 0x01;
pub const SEG_B: u8 = 0x02;
pub const SEG_C: u8 = 0x04;
pub const SEG_D: u8 = 0x08;
pub const SEG_E: u8 = 0x10;
pub const SEG_F: u8 = 0x20;
pub const SEG_G: u8 = 0x40;
pub const SEG_DOT: u8 = 0x80;

/// Only the G segment ('-') is meaningful at the sign position.
pub const SIGN_SEGMENT_MASK: u8 = SEG_G;

// Scan timing (microseconds)

/// Shorter cycles are power-up noise from the calculator and are dropped.
pub const MIN_SCAN_PERIOD_USEC: u32 = 1000;

/// Settling time for the segment lines after the cycle-start edge.
pub const SCAN_START_DELAY_USEC: u32 = 2;

/// Extra delay before the first timer tick of a cycle.
pub const FIRST_TICK_EXTRA_USEC: u32 = 2;

/// Subtracted from the timer reload every fourth sample to compensate for
/// interrupt entry latency. Measured with an oscilloscope; re-measure when
/// porting to a core with different interrupt latency.
pub const TICK_CORRECTION_USEC: u32 = 2;

/// Core clock feeding the DWT cycle counter (nRF52840).
pub const CORE_CLOCK_HZ: u32 = 64_000_000;

// Buffers

/// Scan line history depth. Power of two, at most 32 (5-bit slot field).
pub const NUM_LINES: usize = 16;

/// Event queue storage. `heapless::spsc::Queue` keeps one slot free, so
/// 31 events fit between two consumer wake-ups.
pub const EVENT_QUEUE_LEN: usize = 32;

const _: () = assert!(NUM_LINES.is_power_of_two() && NUM_LINES <= 32);
const _: () = assert!(EVENT_QUEUE_LEN.is_power_of_two() && EVENT_QUEUE_LEN > NUM_LINES);

// Watchdog

/// Watchdog tick interval (ms).
pub const WATCHDOG_TICK_MS: u64 = 10;

/// No cycle-start edge for this long means the calculator stopped
/// scanning (ms).
pub const WATCHDOG_TIMEOUT_MS: u32 = 500;

/// Timeout expressed in watchdog ticks.
pub const WATCHDOG_TIMEOUT_TICKS: u32 = WATCHDOG_TIMEOUT_MS / WATCHDOG_TICK_MS as u32;

// GPIO pin assignments (nRF52840-DK)
//
//   Segment A..DP  → P1.01 .. P1.08 (contiguous, read as one port word)
//   Digit-8 grid   → P0.11 (GPIOTE channel 0, rising edge)
//   Console UART   → RX P0.08, TX P0.06
//   I²C SDA        → P0.26
//   I²C SCL        → P0.27

/// Bit offset of segment A inside the P1 input register.
pub const SEG_PIN_SHIFT: u32 = 1;

/// Pin number of the digit-8 grid line on port 0.
pub const SCAN_PIN: u8 = 11;

/// GPIOTE channel used for the cycle-start edge.
pub const SCAN_GPIOTE_CHANNEL: usize = 0;

// Console

/// Console baud rate.
pub const CONSOLE_BAUD: u32 = 38_400;

/// Longest accepted console command line.
pub const CMD_LEN: usize = 64;

/// Firmware version reported by `help`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Display

/// SSD1306 width in pixels.
pub const DISPLAY_WIDTH: i32 = 128;

/// Horizontal pitch of one digit cell.
pub const DISPLAY_CELL_WIDTH: i32 = 10;
