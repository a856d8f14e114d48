//! Write/read masks for the memory-mapped I/O registers.
//!
//! Storage lives with each owning subsystem; this table only describes which
//! bits a write may change and which bits a read reports. Bits outside the
//! read mask come back as `fixed`.

/// Per-register bit masks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegMask {
    pub write: u8,
    pub read: u8,
    pub fixed: u8,
}

impl RegMask {
    pub const fn new(write: u8, read: u8, fixed: u8) -> Self {
        Self { write, read, fixed }
    }

    /// Plain read/write byte.
    pub const FULL: RegMask = RegMask::new(0xFF, 0xFF, 0x00);
    /// Unmapped or write-only register: ignores writes, reads all ones.
    pub const OPEN: RegMask = RegMask::new(0x00, 0x00, 0xFF);

    /// Merge `val` into `old`, touching only writable bits.
    #[inline]
    pub const fn apply_write(self, old: u8, val: u8) -> u8 {
        (old & !self.write) | (val & self.write)
    }

    #[inline]
    pub const fn apply_read(self, stored: u8) -> u8 {
        (stored & self.read) | self.fixed
    }
}

pub const P1: u16 = 0xFF00;
pub const SB: u16 = 0xFF01;
pub const SC: u16 = 0xFF02;
pub const DIV: u16 = 0xFF04;
pub const TIMA: u16 = 0xFF05;
pub const TMA: u16 = 0xFF06;
pub const TAC: u16 = 0xFF07;
pub const IF: u16 = 0xFF0F;
pub const NR52: u16 = 0xFF26;
pub const LCDC: u16 = 0xFF40;
pub const STAT: u16 = 0xFF41;
pub const SCY: u16 = 0xFF42;
pub const SCX: u16 = 0xFF43;
pub const LY: u16 = 0xFF44;
pub const LYC: u16 = 0xFF45;
pub const DMA: u16 = 0xFF46;
pub const BGP: u16 = 0xFF47;
pub const OBP0: u16 = 0xFF48;
pub const OBP1: u16 = 0xFF49;
pub const WY: u16 = 0xFF4A;
pub const WX: u16 = 0xFF4B;
pub const VBK: u16 = 0xFF4F;
pub const BOOT: u16 = 0xFF50;
pub const HDMA1: u16 = 0xFF51;
pub const HDMA2: u16 = 0xFF52;
pub const HDMA3: u16 = 0xFF53;
pub const HDMA4: u16 = 0xFF54;
pub const HDMA5: u16 = 0xFF55;
pub const BCPS: u16 = 0xFF68;
pub const BCPD: u16 = 0xFF69;
pub const OCPS: u16 = 0xFF6A;
pub const OCPD: u16 = 0xFF6B;
pub const SVBK: u16 = 0xFF70;
pub const IE: u16 = 0xFFFF;

/// Sound register read-back OR values, FF10..=FF2F.
const SOUND_FIXED: [u8; 0x20] = [
    0x80, 0x3F, 0x00, 0xFF, 0xBF, 0xFF, 0x3F, 0x00, 0xFF, 0xBF, 0x7F, 0xFF, 0x9F, 0xFF, 0xBF, 0xFF,
    0xFF, 0x00, 0x00, 0xBF, 0x00, 0x00, 0x70, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

/// Sound register write masks, FF10..=FF2F.
const SOUND_WRITE: [u8; 0x20] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xC7, 0x00, 0xFF, 0xFF, 0xFF, 0xC7, 0x80, 0xFF, 0x60, 0xFF, 0xC7, 0x00,
    0x3F, 0xFF, 0xFF, 0xC0, 0xFF, 0xFF, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Mask table entry for `addr`, or `None` for addresses that are not
/// masked registers (wave RAM, palette data ports, HDMA5, HRAM).
pub const fn mask_for(addr: u16) -> Option<RegMask> {
    let mask = match addr {
        P1 => RegMask::new(0x30, 0x3F, 0xC0),
        SB => RegMask::FULL,
        SC => RegMask::new(0x81, 0x81, 0x7E),
        DIV => RegMask::new(0x00, 0xFF, 0x00),
        TIMA | TMA => RegMask::FULL,
        TAC => RegMask::new(0x07, 0x07, 0xF8),
        IF => RegMask::new(0x1F, 0x1F, 0xE0),
        0xFF10..=0xFF2F => {
            let i = (addr - 0xFF10) as usize;
            RegMask::new(SOUND_WRITE[i], !SOUND_FIXED[i], SOUND_FIXED[i])
        }
        LCDC => RegMask::FULL,
        STAT => RegMask::new(0x78, 0x7F, 0x80),
        SCY | SCX => RegMask::FULL,
        LY => RegMask::new(0x00, 0xFF, 0x00),
        LYC | DMA | BGP | OBP0 | OBP1 | WY | WX => RegMask::FULL,
        VBK => RegMask::new(0x01, 0x01, 0xFE),
        BOOT => RegMask::OPEN,
        HDMA1..=HDMA4 => RegMask::OPEN,
        BCPS | OCPS => RegMask::new(0xBF, 0xBF, 0x40),
        SVBK => RegMask::new(0x07, 0x07, 0xF8),
        IE => RegMask::FULL,
        _ => return None,
    };
    Some(mask)
}

/// Registers that only exist on the color model.
pub const fn is_cgb_only(addr: u16) -> bool {
    matches!(
        addr,
        VBK | HDMA1 | HDMA2 | HDMA3 | HDMA4 | HDMA5 | BCPS | BCPD | OCPS | OCPD | SVBK
    )
}
