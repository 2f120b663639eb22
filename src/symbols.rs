//! Seven-segment patterns the calculator can show.
//!
//! The MK-52 only ever lights a small fixed set of patterns: digits, a
//! few letters used in error and program-mode messages, and the sign.
//! Anything else seen on the bus is a glitch or a partially switched
//! segment and maps to `None`.

use crate::config::{SEG_A, SEG_B, SEG_C, SEG_D, SEG_DOT, SEG_E, SEG_F, SEG_G};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Symbol {
    Space,
    Minus,
    Zero,
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    C,
    E,
    L,
    R,
    /// Shown as `{` (segments B, C, G).
    Brace,
    F,
    P,
}

/// `(symbol, segments without DOT, printable char)`
const TABLE: [(Symbol, u8, char); 19] = [
    (Symbol::Space, 0, ' '),
    (Symbol::Minus, SEG_G, '-'),
    (Symbol::Zero, SEG_A | SEG_B | SEG_C | SEG_D | SEG_E | SEG_F, '0'),
    (Symbol::One, SEG_B | SEG_C, '1'),
    (Symbol::Two, SEG_A | SEG_B | SEG_D | SEG_E | SEG_G, '2'),
    (Symbol::Three, SEG_A | SEG_B | SEG_C | SEG_D | SEG_G, '3'),
    (Symbol::Four, SEG_B | SEG_C | SEG_F | SEG_G, '4'),
    (Symbol::Five, SEG_A | SEG_C | SEG_D | SEG_F | SEG_G, '5'),
    (Symbol::Six, SEG_A | SEG_C | SEG_D | SEG_E | SEG_F | SEG_G, '6'),
    (Symbol::Seven, SEG_A | SEG_B | SEG_C, '7'),
    (Symbol::Eight, 0x7F, '8'),
    (Symbol::Nine, SEG_A | SEG_B | SEG_C | SEG_D | SEG_F | SEG_G, '9'),
    (Symbol::C, SEG_A | SEG_D | SEG_E | SEG_F, 'C'),
    (Symbol::E, SEG_A | SEG_D | SEG_E | SEG_F | SEG_G, 'E'),
    (Symbol::L, SEG_D | SEG_E | SEG_F, 'L'),
    (Symbol::R, SEG_A | SEG_E | SEG_F, 'R'),
    (Symbol::Brace, SEG_B | SEG_C | SEG_G, '{'),
    (Symbol::F, SEG_A | SEG_B | SEG_C | SEG_G, 'F'),
    (Symbol::P, SEG_A | SEG_B | SEG_C | SEG_F | SEG_G, 'P'),
];

impl Symbol {
    /// Decode a raw bus byte. The decimal point is ignored.
    pub fn from_segments(raw: u8) -> Option<Self> {
        let pattern = raw & !SEG_DOT;
        TABLE
            .iter()
            .find(|&&(_, segments, _)| segments == pattern)
            .map(|&(symbol, _, _)| symbol)
    }

    pub fn from_char(c: char) -> Option<Self> {
        TABLE
            .iter()
            .find(|&&(_, _, ch)| ch == c)
            .map(|&(symbol, _, _)| symbol)
    }

    pub fn segments(self) -> u8 {
        TABLE[self as usize].1
    }

    pub fn as_char(self) -> char {
        TABLE[self as usize].2
    }
}
