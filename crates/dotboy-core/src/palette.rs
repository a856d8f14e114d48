//! Monochrome shade mapping and CGB palette RAM.

const PAL_RAM_SIZE: usize = 0x40;
const PAL_INDEX_MASK: u8 = 0x3F;
const PAL_UNUSED_BIT: u8 = 0x40;
const PAL_AUTO_INCREMENT_BIT: u8 = 0x80;

/// Default DMG palette colors in 0x00RRGGBB order.
pub const DMG_PALETTE: [u32; 4] = [0x009BBC0F, 0x008BAC0F, 0x00306230, 0x000F380F];

/// Shade (0-3) that a BGP/OBP register assigns to a 2-bit color index.
#[inline(always)]
pub fn dmg_shade(palette: u8, color_id: u8) -> u8 {
    (palette >> (color_id * 2)) & 0x03
}

/// Expand a little-endian RGB555 pair to 0x00RRGGBB.
pub fn decode_cgb_color(lo: u8, hi: u8) -> u32 {
    let raw = ((hi as u16) << 8) | lo as u16;
    let expand = |c: u16| -> u32 {
        let c = (c & 0x1F) as u8;
        (c << 3 | c >> 2) as u32
    };
    (expand(raw) << 16) | (expand(raw >> 5) << 8) | expand(raw >> 10)
}

/// One bank of CGB palette memory (BCPS/BCPD or OCPS/OCPD).
#[derive(Clone, Debug)]
pub struct PaletteRam {
    index: u8,
    data: [u8; PAL_RAM_SIZE],
}

impl PaletteRam {
    pub fn new() -> Self {
        Self {
            index: PAL_UNUSED_BIT,
            data: [0; PAL_RAM_SIZE],
        }
    }

    pub fn read_index(&self) -> u8 {
        self.index
    }

    pub fn write_index(&mut self, value: u8) {
        self.index = (value & (PAL_AUTO_INCREMENT_BIT | PAL_INDEX_MASK)) | PAL_UNUSED_BIT;
    }

    /// Data port read. Palette RAM is inaccessible while pixels are being
    /// drawn (`locked`).
    pub fn read_data(&self, locked: bool) -> u8 {
        if locked {
            0xFF
        } else {
            self.data[(self.index & PAL_INDEX_MASK) as usize]
        }
    }

    /// Data port write. A locked write is dropped but still advances the
    /// index when auto-increment is set.
    pub fn write_data(&mut self, value: u8, locked: bool) {
        if !locked {
            self.data[(self.index & PAL_INDEX_MASK) as usize] = value;
        }
        if self.index & PAL_AUTO_INCREMENT_BIT != 0 {
            let next = (self.index & PAL_INDEX_MASK).wrapping_add(1) & PAL_INDEX_MASK;
            self.index = PAL_AUTO_INCREMENT_BIT | PAL_UNUSED_BIT | next;
        }
    }

    /// Color `color_id` of `palette` (0-7) as 0x00RRGGBB.
    pub fn color(&self, palette: usize, color_id: usize) -> u32 {
        let off = (palette & 7) * 8 + (color_id & 3) * 2;
        decode_cgb_color(self.data[off], self.data[off + 1])
    }

    fn load(&mut self, palette: usize, colors: [u16; 4]) {
        for (i, &c) in colors.iter().enumerate() {
            let off = palette * 8 + i * 2;
            self.data[off] = (c & 0xFF) as u8;
            self.data[off + 1] = (c >> 8) as u8;
        }
    }
}

impl Default for PaletteRam {
    fn default() -> Self {
        Self::new()
    }
}

/// Background and object palette memory of the color model.
#[derive(Clone, Debug, Default)]
pub struct CgbPalettes {
    pub bg: PaletteRam,
    pub obj: PaletteRam,
}

impl CgbPalettes {
    /// Colors the CGB boot ROM installs when it starts a DMG cartridge.
    pub fn load_compatibility_colors(&mut self) {
        const OBJ_PAL: [u16; 4] = [0x7FFF, 0x421F, 0x1CF2, 0x0000];
        const BG_PAL: [u16; 4] = [0x7FFF, 0x1BEF, 0x6180, 0x0000];

        self.bg.load(0, BG_PAL);
        self.obj.load(0, OBJ_PAL);
        self.obj.load(1, OBJ_PAL);
    }
}
