//! Dot-accurate Game Boy / Game Boy Color picture pipeline and system bus.
//!
//! This crate contains the platform-agnostic core: the PPU with its pixel
//! fetcher and FIFOs, OAM/VRAM DMA, and the memory bus that clocks them
//! together with the timer, serial port, joypad and cartridge. An instruction
//! core plugs in through [`cpu::Cpu`]; frontends drive the machine via the
//! [`gameboy`] facade or the threaded [`runner`].

#[cfg(feature = "ppu-trace")]
macro_rules! ppu_trace {
    ($($arg:tt)*) => {
        log::trace!(target: "dotboy::ppu", $($arg)*);
    };
}
#[cfg(not(feature = "ppu-trace"))]
macro_rules! ppu_trace {
    ($($arg:tt)*) => {};
}

/// Cartridge header parsing, diagnostics and bank controllers.
pub mod cartridge;

/// Emulator settings loaded from TOML.
pub mod config;

/// Instruction-core seam.
pub mod cpu;

/// OAM DMA and CGB VRAM DMA engines.
pub mod dma;

pub mod error;

/// Background tile fetcher state machine.
pub mod fetcher;

/// Fixed-capacity pixel FIFOs.
pub mod fifo;

/// High-level facade that wires the CPU and MMU into a single machine.
pub mod gameboy;

/// Console models and color modes.
pub mod hardware;

/// Joypad input register and edge-triggered interrupt behavior.
pub mod input;

pub mod interrupt;

/// Memory map and hardware plumbing.
pub mod mmu;

/// DMG shades and CGB palette memory.
pub mod palette;

/// Pixel Processing Unit (PPU) emulation.
pub mod ppu;

/// I/O register read/write masks.
pub mod registers;

/// Threaded host for a running machine.
pub mod runner;

/// Serial unit and link cable plumbing.
pub mod serial;

/// Sound register file.
pub mod sound;

/// OAM entries and sprite row decoding.
pub mod sprite;

/// Divider/timer unit.
pub mod timer;

pub use error::{Error, Result};
