//! Scan line → displayable frame.

use crate::config::{NUM_DIGITS, SEG_DOT, SEG_G};
use crate::scan::ScanLine;
use crate::symbols::Symbol;

/// One digit cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Glyph {
    pub symbol: Symbol,
    pub dot: bool,
}

impl Glyph {
    pub const BLANK: Self = Self {
        symbol: Symbol::Space,
        dot: false,
    };
}

/// Sign cell followed by eleven digit cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    glyphs: [Glyph; NUM_DIGITS],
}

impl Frame {
    pub const fn blank() -> Self {
        Self {
            glyphs: [Glyph::BLANK; NUM_DIGITS],
        }
    }

    /// Build from the digit positions of a scanned line.
    ///
    /// Only segment G counts at the sign position. Elsewhere an unknown
    /// pattern is drawn as a space, keeping its decimal point.
    pub fn from_line(line: &ScanLine) -> Self {
        let mut frame = Self::blank();
        let digits = line.digits();

        if digits[0] & SEG_G != 0 {
            frame.glyphs[0].symbol = Symbol::Minus;
        }
        for (glyph, &raw) in frame.glyphs.iter_mut().zip(digits).skip(1) {
            glyph.symbol = Symbol::from_segments(raw).unwrap_or(Symbol::Space);
            glyph.dot = raw & SEG_DOT != 0;
        }
        frame
    }

    /// Build from console text such as `-1.5E 08`.
    ///
    /// A leading `-` lights the sign, a `.` sets the dot of the character
    /// before it, and characters without a symbol are drawn as spaces.
    /// Text stops at the first control character or when the cells run
    /// out.
    pub fn from_text(text: &str) -> Self {
        let mut frame = Self::blank();
        let mut chars = text.chars().peekable();

        if chars.next_if_eq(&'-').is_some() {
            frame.glyphs[0].symbol = Symbol::Minus;
        }

        for glyph in frame.glyphs.iter_mut().skip(1) {
            let Some(c) = chars.next_if(|c| !c.is_control()) else {
                break;
            };
            glyph.symbol = Symbol::from_char(c).unwrap_or(Symbol::Space);
            glyph.dot = chars.next_if_eq(&'.').is_some();
        }
        frame
    }

    pub fn glyphs(&self) -> &[Glyph; NUM_DIGITS] {
        &self.glyphs
    }

    pub fn is_blank(&self) -> bool {
        self.glyphs.iter().all(|g| *g == Glyph::BLANK)
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::blank()
    }
}
