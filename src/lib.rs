//! Library interface for mk52-scan.
//!
//! Holds everything that does not touch a register: the scan pipeline
//! driven by the two interrupts, symbol decoding, frame rendering, the
//! presenter and the console. Hardware reaches it through the small traits
//! in [`scan`] (`CycleCounter`, `ScanTimer`, `SegmentBus`), so the whole
//! pipeline runs on the host under `cargo test`.
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main]
//! and only builds with `--features embedded` for `thumbv7em-none-eabihf`.

#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

// ═══════════════════════════════════════════════════════════════════════════
// Configuration and errors
// ═══════════════════════════════════════════════════════════════════════════

pub mod config;
pub mod error;

pub use error::Error;

// ═══════════════════════════════════════════════════════════════════════════
// Acquisition (interrupt side)
// ═══════════════════════════════════════════════════════════════════════════

pub mod scan;

// ═══════════════════════════════════════════════════════════════════════════
// Presentation (main-loop side)
// ═══════════════════════════════════════════════════════════════════════════

pub mod console;
pub mod presenter;
pub mod render;
pub mod symbols;
