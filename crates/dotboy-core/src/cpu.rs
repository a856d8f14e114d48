//! Seam for an instruction core.
//!
//! The bus is clocked by whoever executes instructions: each bus access or
//! internal delay costs one M-cycle, i.e. four calls to [`Mmu::tick`].

use crate::mmu::Mmu;

/// Dots per machine cycle at normal speed.
pub const DOTS_PER_M_CYCLE: u32 = 4;

/// An instruction core that drives the bus.
pub trait Cpu: Send {
    /// Execute one instruction (or one interrupt dispatch, or one halted
    /// M-cycle), ticking `mmu` once per dot it spends.
    fn step(&mut self, mmu: &mut Mmu);

    /// Put the core back in its post-boot state.
    fn reset(&mut self) {}
}

/// A CPU that never executes anything: every step is one halted M-cycle.
/// Enough to watch the PPU render whatever is placed in VRAM.
#[derive(Debug, Default)]
pub struct IdleCpu {
    pub cycles: u64,
}

impl IdleCpu {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cpu for IdleCpu {
    fn step(&mut self, mmu: &mut Mmu) {
        for _ in 0..DOTS_PER_M_CYCLE {
            mmu.tick();
        }
        self.cycles += 1;
    }

    fn reset(&mut self) {
        self.cycles = 0;
    }
}
