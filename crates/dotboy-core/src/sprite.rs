use crate::fifo::SpritePixel;

pub const TOTAL_SPRITES: usize = 40;
pub const MAX_SPRITES_PER_LINE: usize = 10;

const ATTR_BEHIND_BG: u8 = 0x80;
const ATTR_Y_FLIP: u8 = 0x40;
const ATTR_X_FLIP: u8 = 0x20;
const ATTR_DMG_PALETTE: u8 = 0x10;
const ATTR_CGB_BANK: u8 = 0x08;
const ATTR_CGB_PALETTE: u8 = 0x07;

/// One OAM entry, in raw hardware coordinates (y + 16, x + 8).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sprite {
    pub y: u8,
    pub x: u8,
    pub tile: u8,
    pub attrs: u8,
    pub oam_index: u8,
}

impl Sprite {
    pub fn from_oam(oam: &[u8], index: usize) -> Self {
        let base = index * 4;
        Self {
            y: oam[base],
            x: oam[base + 1],
            tile: oam[base + 2],
            attrs: oam[base + 3],
            oam_index: index as u8,
        }
    }

    /// Whether the OAM scan selects this sprite for line `ly`.
    pub fn is_visible_on(&self, ly: u8, height: u8) -> bool {
        let line = ly as u16 + 16;
        let top = self.y as u16;
        self.x != 0 && line >= top && line < top + height as u16
    }

    #[inline]
    pub fn behind_bg(&self) -> bool {
        self.attrs & ATTR_BEHIND_BG != 0
    }

    /// VRAM bank and bank-relative address of the tile row drawn on `ly`.
    pub fn row_address(&self, ly: u8, height: u8, cgb: bool) -> (usize, usize) {
        // LCDC.2 may change between OAM scan and the fetch.
        let mut row = (ly as u16 + 16 - self.y as u16) as u8 & (height - 1);
        if self.attrs & ATTR_Y_FLIP != 0 {
            row = height - 1 - row;
        }
        let tile = if height == 16 {
            self.tile & 0xFE
        } else {
            self.tile
        };
        let bank = if cgb && self.attrs & ATTR_CGB_BANK != 0 {
            1
        } else {
            0
        };
        (bank, tile as usize * 16 + row as usize * 2)
    }

    /// Decode one 8-pixel row, leftmost pixel first.
    pub fn decode_row(&self, lo: u8, hi: u8, cgb: bool) -> [SpritePixel; 8] {
        let palette = if cgb {
            self.attrs & ATTR_CGB_PALETTE
        } else {
            (self.attrs & ATTR_DMG_PALETTE) >> 4
        };
        let mut out = [SpritePixel::default(); 8];
        for (i, px) in out.iter_mut().enumerate() {
            let bit = if self.attrs & ATTR_X_FLIP != 0 {
                i
            } else {
                7 - i
            };
            *px = SpritePixel {
                color: ((hi >> bit) & 1) << 1 | ((lo >> bit) & 1),
                palette,
                behind_bg: self.behind_bg(),
                oam_index: self.oam_index,
            };
        }
        out
    }
}
