//! SSD1306 OLED mirror of the calculator display.
//!
//! One row of twelve cells: sign, then eleven digits, each with its own
//! decimal point drawn as a small square under the baseline.

use embedded_graphics::mono_font::ascii::FONT_10X20;
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use mk52_scan::config::{DISPLAY_CELL_WIDTH, DISPLAY_WIDTH, NUM_DIGITS};
use mk52_scan::render::Frame;
use mk52_scan::Error;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::I2CDisplayInterface;
use ssd1306::Ssd1306;

/// Type alias for the concrete display driver.
///
/// Generic over the I²C implementation so callers pass in their HAL's
/// I²C peripheral.
pub type Display<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

/// Requests from the console for the presenter task, which owns the panel.
#[derive(Clone, Copy, defmt::Format)]
pub enum DisplayCommand {
    Power(bool),
    Reset,
    Clear,
    Dim(bool),
    Show(Frame),
}

const TOP: i32 = 20;
const DOT_SIZE: u32 = 2;
const LEFT: i32 = (DISPLAY_WIDTH - NUM_DIGITS as i32 * DISPLAY_CELL_WIDTH) / 2;

/// Initialise the SSD1306 display and clear the screen.
pub fn init<I2C>(i2c: I2C) -> Result<Display<I2C>, Error>
where
    I2C: embedded_hal::i2c::I2c,
{
    let interface = I2CDisplayInterface::new(i2c);
    let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
        .into_buffered_graphics_mode();
    display.init().map_err(|_| Error::Display)?;
    clear(&mut display)?;
    Ok(display)
}

/// Re-run the controller init sequence, e.g. after a brown-out.
pub fn reset<I2C>(display: &mut Display<I2C>) -> Result<(), Error>
where
    I2C: embedded_hal::i2c::I2c,
{
    display.init().map_err(|_| Error::Display)?;
    clear(display)
}

fn text_style() -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyleBuilder::new()
        .font(&FONT_10X20)
        .text_color(BinaryColor::On)
        .build()
}

/// Render a frame and push it to the panel.
pub fn draw_frame<I2C>(display: &mut Display<I2C>, frame: &Frame) -> Result<(), Error>
where
    I2C: embedded_hal::i2c::I2c,
{
    display.clear_buffer();

    let style = text_style();
    let dot = PrimitiveStyle::with_fill(BinaryColor::On);
    let mut cell = [0u8; 4];

    for (i, glyph) in frame.glyphs().iter().enumerate() {
        let x = LEFT + i as i32 * DISPLAY_CELL_WIDTH;
        let ch = glyph.symbol.as_char().encode_utf8(&mut cell);
        let _ = Text::with_baseline(ch, Point::new(x, TOP), style, Baseline::Top).draw(display);

        if glyph.dot {
            let corner = Point::new(x + DISPLAY_CELL_WIDTH - DOT_SIZE as i32, TOP + 16);
            let _ = Rectangle::new(corner, Size::new(DOT_SIZE, DOT_SIZE))
                .into_styled(dot)
                .draw(display);
        }
    }

    display.flush().map_err(|_| Error::Display)
}

/// Blank frame, panel stays on.
pub fn clear<I2C>(display: &mut Display<I2C>) -> Result<(), Error>
where
    I2C: embedded_hal::i2c::I2c,
{
    display.clear_buffer();
    display.flush().map_err(|_| Error::Display)
}

pub fn set_power<I2C>(display: &mut Display<I2C>, on: bool) -> Result<(), Error>
where
    I2C: embedded_hal::i2c::I2c,
{
    display.set_display_on(on).map_err(|_| Error::Display)
}

/// Dimmest contrast while a program runs on the calculator.
pub fn set_dim<I2C>(display: &mut Display<I2C>, dim: bool) -> Result<(), Error>
where
    I2C: embedded_hal::i2c::I2c,
{
    let brightness = if dim {
        Brightness::DIMMEST
    } else {
        Brightness::NORMAL
    };
    display.set_brightness(brightness).map_err(|_| Error::Display)
}
