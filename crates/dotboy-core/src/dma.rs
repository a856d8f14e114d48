//! OAM DMA and CGB VRAM DMA state machines.
//!
//! Neither engine touches memory directly: they report which transfer is due
//! and the bus performs it with bypass reads.

const OAM_DMA_BYTES: u16 = 0xA0;
const OAM_DMA_DOTS_PER_BYTE: u16 = 4;
const HDMA_BLOCK_LEN: u16 = 0x10;
/// CPU stall per 16-byte block, in dots.
const HDMA_BLOCK_DOTS: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OamDmaState {
    Idle,
    /// Armed by a write to FF46; the first byte moves after this delay.
    Starting,
    Active { elapsed: u16 },
}

/// Sprite-table DMA driven by FF46.
#[derive(Debug)]
pub struct OamDma {
    /// Last value written to FF46.
    reg: u8,
    source: u16,
    state: OamDmaState,
}

impl OamDma {
    pub fn new() -> Self {
        Self {
            reg: 0xFF,
            source: 0,
            state: OamDmaState::Idle,
        }
    }

    pub fn read(&self) -> u8 {
        self.reg
    }

    pub fn start(&mut self, val: u8) {
        self.reg = val;
        self.source = (val as u16) << 8;
        self.state = OamDmaState::Starting;
        log::debug!("OAM DMA armed src={:04X}", self.source);
    }

    /// True from the FF46 write until the last byte lands.
    pub fn is_active(&self) -> bool {
        self.state != OamDmaState::Idle
    }

    /// Advance one dot. Returns `(source address, OAM index)` when a byte
    /// should be copied on this dot.
    pub fn tick(&mut self) -> Option<(u16, usize)> {
        match self.state {
            OamDmaState::Idle => None,
            OamDmaState::Starting => {
                self.state = OamDmaState::Active { elapsed: 0 };
                None
            }
            OamDmaState::Active { elapsed } => {
                let done = elapsed + 1 == OAM_DMA_BYTES * OAM_DMA_DOTS_PER_BYTE;
                self.state = if done {
                    OamDmaState::Idle
                } else {
                    OamDmaState::Active {
                        elapsed: elapsed + 1,
                    }
                };
                if elapsed % OAM_DMA_DOTS_PER_BYTE == OAM_DMA_DOTS_PER_BYTE - 1 {
                    let index = elapsed / OAM_DMA_DOTS_PER_BYTE;
                    Some((Self::mirror(self.source + index), index as usize))
                } else {
                    None
                }
            }
        }
    }

    /// Sources past the echo region fold back onto work RAM.
    fn mirror(addr: u16) -> u16 {
        if addr >= 0xE000 { addr - 0x2000 } else { addr }
    }
}

impl Default for OamDma {
    fn default() -> Self {
        Self::new()
    }
}

/// Transfer mode for CGB DMA operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaMode {
    /// General DMA (immediate)
    Gdma,
    /// HBlank DMA
    Hdma,
}

/// What a write to HDMA5 asks the bus to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HdmaRequest {
    /// Copy `blocks` blocks right away.
    General { blocks: u8 },
    /// HBlank transfer armed; copy a block now if already in HBlank.
    HBlank,
    Cancelled,
}

/// A single 16-byte block the bus should copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HdmaBlock {
    pub src: u16,
    pub dst: u16,
}

impl HdmaBlock {
    pub const LEN: u16 = HDMA_BLOCK_LEN;
}

/// CGB VRAM DMA registers (FF51-FF55).
#[derive(Debug)]
pub struct Hdma {
    /// 16-bit source pointer (upper 12 bits writable)
    src: u16,
    /// Destination in VRAM (0x8000 | (dst & 0x1FF0))
    dst: u16,
    /// Remaining 0x10-byte blocks
    blocks: u8,
    mode: DmaMode,
    active: bool,
    /// Whether the previous transfer was explicitly cancelled (FF55 <- 0)
    cancelled: bool,
    /// `(frame, line)` of the last HBlank block, so a line never gets two.
    last_block: Option<(u64, u8)>,
    /// Remaining CPU stall in dots.
    stall: u32,
}

impl Hdma {
    pub fn new() -> Self {
        Self {
            src: 0,
            dst: Self::sanitize_dest(0),
            blocks: 0,
            mode: DmaMode::Gdma,
            active: false,
            cancelled: false,
            last_block: None,
            stall: 0,
        }
    }

    #[inline]
    fn sanitize_dest(addr: u16) -> u16 {
        0x8000 | (addr & 0x1FF0)
    }

    pub fn write_source_hi(&mut self, val: u8) {
        self.src = (val as u16) << 8 | (self.src & 0x00FF);
    }

    pub fn write_source_lo(&mut self, val: u8) {
        self.src = (self.src & 0xFF00) | (val & 0xF0) as u16;
    }

    pub fn write_dest_hi(&mut self, val: u8) {
        let raw = ((val & 0x1F) as u16) << 8 | (self.dst & 0x00F0);
        self.dst = Self::sanitize_dest(raw);
    }

    pub fn write_dest_lo(&mut self, val: u8) {
        let raw = (self.dst & 0x1F00) | (val & 0xF0) as u16;
        self.dst = Self::sanitize_dest(raw);
    }

    /// HDMA5 write.
    pub fn write_control(&mut self, val: u8) -> HdmaRequest {
        let requested = (val & 0x7F) + 1;
        if self.active && val & 0x80 == 0 {
            log::debug!("HDMA cancelled with {} blocks left", self.blocks);
            self.active = false;
            self.blocks = 0;
            self.cancelled = true;
            HdmaRequest::Cancelled
        } else if val & 0x80 == 0 {
            self.mode = DmaMode::Gdma;
            self.cancelled = false;
            log::debug!(
                "GDMA {:04X}->{:04X} blocks={}",
                self.src,
                self.dst,
                requested
            );
            HdmaRequest::General { blocks: requested }
        } else {
            self.mode = DmaMode::Hdma;
            self.blocks = requested;
            self.active = true;
            self.cancelled = false;
            log::debug!(
                "HDMA {:04X}->{:04X} blocks={}",
                self.src,
                self.dst,
                requested
            );
            HdmaRequest::HBlank
        }
    }

    /// HDMA5 read-back.
    pub fn read_control(&self) -> u8 {
        if self.active {
            self.blocks.saturating_sub(1) & 0x7F
        } else if self.cancelled {
            0x80
        } else {
            0xFF
        }
    }

    pub fn hblank_active(&self) -> bool {
        self.active && self.mode == DmaMode::Hdma
    }

    /// Claim the next block of an HBlank transfer for line `line` of frame
    /// `frame`. Returns `None` if idle or this line already had its block.
    pub fn next_hblank_block(&mut self, frame: u64, line: u8) -> Option<HdmaBlock> {
        if !self.hblank_active() || self.last_block == Some((frame, line)) {
            return None;
        }
        self.last_block = Some((frame, line));
        Some(self.take_block())
    }

    /// Claim the next block with no per-line limit (GDMA, LCD switched off).
    pub fn next_block(&mut self) -> HdmaBlock {
        self.take_block()
    }

    fn take_block(&mut self) -> HdmaBlock {
        let block = HdmaBlock {
            src: self.src,
            dst: self.dst,
        };
        self.src = self.src.wrapping_add(HDMA_BLOCK_LEN);
        self.dst = 0x8000 | (self.dst.wrapping_add(HDMA_BLOCK_LEN) & 0x1FF0);
        if self.mode == DmaMode::Hdma {
            self.blocks = self.blocks.saturating_sub(1);
            if self.blocks == 0 {
                self.active = false;
            }
        }
        self.stall += HDMA_BLOCK_DOTS;
        block
    }

    pub fn stall_dots(&self) -> u32 {
        self.stall
    }

    /// CPU-side stall bookkeeping; one call per dot the CPU sat out.
    pub fn consume_stall(&mut self, dots: u32) {
        self.stall = self.stall.saturating_sub(dots);
    }
}

impl Default for Hdma {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hdma_addresses_are_aligned() {
        let mut hdma = Hdma::new();
        hdma.write_source_hi(0xC1);
        hdma.write_source_lo(0x2F);
        hdma.write_dest_hi(0xFF);
        hdma.write_dest_lo(0xFF);
        hdma.write_control(0x00);
        let block = hdma.next_block();
        assert_eq!(block.src, 0xC120);
        assert_eq!(block.dst, 0x9FF0);
    }

    #[test]
    fn one_hblank_block_per_line() {
        let mut hdma = Hdma::new();
        assert_eq!(hdma.write_control(0x81), HdmaRequest::HBlank);
        assert!(hdma.next_hblank_block(0, 10).is_some());
        assert!(hdma.next_hblank_block(0, 10).is_none());
        assert!(hdma.next_hblank_block(0, 11).is_some());
        assert!(!hdma.hblank_active());
        assert_eq!(hdma.read_control(), 0xFF);
    }

    #[test]
    fn oam_dma_reports_one_copy_every_four_dots() {
        let mut dma = OamDma::new();
        dma.start(0x80);
        let copies: Vec<_> = (0..645).filter_map(|_| dma.tick()).collect();
        assert_eq!(copies.len(), 160);
        assert_eq!(copies[0], (0x8000, 0));
        assert_eq!(copies[159], (0x809F, 159));
        assert!(!dma.is_active());
    }
}
