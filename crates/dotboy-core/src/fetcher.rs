//! Background/window tile fetcher.
//!
//! Every step takes two dots. A full tile is map, low byte, high byte, then
//! an idle pair, so a steady pipeline delivers 8 pixels every 8 dots.

use crate::fifo::{BgPixel, PixelFifo};

const BG_MAP_0_BASE: usize = 0x1800;
const BG_MAP_1_BASE: usize = 0x1C00;

const LCDC_BG_MAP: u8 = 0x08;
const LCDC_TILE_DATA: u8 = 0x10;
const LCDC_WINDOW_MAP: u8 = 0x40;

const ATTR_PRIORITY: u8 = 0x80;
const ATTR_Y_FLIP: u8 = 0x40;
const ATTR_X_FLIP: u8 = 0x20;
const ATTR_BANK: u8 = 0x08;
const ATTR_PALETTE: u8 = 0x07;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dot {
    First,
    Second,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    BackgroundMap,
    WindowMap,
    TileLow,
    TileHigh,
    Idle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchState {
    Fetch {
        phase: Phase,
        dot: Dot,
    },
    /// Background fetching is suspended while a sprite row is read.
    SpriteOverlay {
        dot: Dot,
        resume: Phase,
        resume_dot: Dot,
    },
}

impl FetchState {
    const fn at(phase: Phase) -> Self {
        FetchState::Fetch {
            phase,
            dot: Dot::First,
        }
    }
}

/// Inputs the fetcher samples. Scroll values are the per-line latched ones.
pub struct FetchContext<'a> {
    pub vram: &'a [[u8; 0x2000]; 2],
    pub lcdc: u8,
    pub scx: u8,
    pub scy: u8,
    pub ly: u8,
    pub window_line: u8,
    pub cgb: bool,
}

pub struct Fetcher {
    pub state: FetchState,
    window: bool,
    /// Tile column relative to the line's start (or to the window's left edge).
    tile_x: u8,
    /// The first fetch of a line is repeated; the duplicate is dropped by the
    /// mixer's 8-pixel discard.
    first_fetch: bool,
    tile_no: u8,
    attrs: u8,
    lo: u8,
    hi: u8,
}

impl Fetcher {
    pub fn new() -> Self {
        Self {
            state: FetchState::at(Phase::BackgroundMap),
            window: false,
            tile_x: 0,
            first_fetch: true,
            tile_no: 0,
            attrs: 0,
            lo: 0,
            hi: 0,
        }
    }

    pub fn start_line(&mut self) {
        *self = Self::new();
    }

    /// Restart from the window tile map at its left edge.
    pub fn start_window(&mut self) {
        self.state = FetchState::at(Phase::WindowMap);
        self.window = true;
        self.tile_x = 0;
        self.first_fetch = false;
    }

    pub fn in_window(&self) -> bool {
        self.window
    }

    /// Suspend for a sprite fetch, remembering where to pick up again.
    pub fn pause_for_sprite(&mut self) {
        if let FetchState::Fetch { phase, dot } = self.state {
            self.state = FetchState::SpriteOverlay {
                dot: Dot::First,
                resume: phase,
                resume_dot: dot,
            };
        }
    }

    fn map_phase(&self) -> Phase {
        if self.window {
            Phase::WindowMap
        } else {
            Phase::BackgroundMap
        }
    }

    /// Advance one dot. Overlay dots are driven by the PPU, not here.
    pub fn step(&mut self, ctx: &FetchContext<'_>, fifo: &mut PixelFifo<BgPixel>) {
        let FetchState::Fetch { phase, dot } = self.state else {
            return;
        };

        let next = match (phase, dot) {
            (Phase::BackgroundMap | Phase::WindowMap, Dot::First) => {
                self.fetch_map_entry(ctx, phase == Phase::WindowMap);
                FetchState::Fetch {
                    phase,
                    dot: Dot::Second,
                }
            }
            (Phase::BackgroundMap | Phase::WindowMap, Dot::Second) => {
                FetchState::at(Phase::TileLow)
            }
            (Phase::TileLow, Dot::First) => {
                self.lo = ctx.vram[self.bank()][self.tile_row_address(ctx)];
                FetchState::Fetch {
                    phase,
                    dot: Dot::Second,
                }
            }
            (Phase::TileLow, Dot::Second) => FetchState::at(Phase::TileHigh),
            (Phase::TileHigh, Dot::First) => {
                self.hi = ctx.vram[self.bank()][self.tile_row_address(ctx) + 1];
                FetchState::Fetch {
                    phase,
                    dot: Dot::Second,
                }
            }
            (Phase::TileHigh, Dot::Second) => {
                if fifo.is_empty() {
                    self.push_row(ctx.cgb, fifo);
                    if self.first_fetch {
                        self.first_fetch = false;
                    } else {
                        self.tile_x = self.tile_x.wrapping_add(1);
                    }
                    FetchState::at(Phase::Idle)
                } else {
                    // Pipeline still draining: throw the row away and refetch.
                    FetchState::at(self.map_phase())
                }
            }
            (Phase::Idle, Dot::First) => FetchState::Fetch {
                phase,
                dot: Dot::Second,
            },
            (Phase::Idle, Dot::Second) => FetchState::at(self.map_phase()),
        };
        self.state = next;
    }

    fn fetch_map_entry(&mut self, ctx: &FetchContext<'_>, window: bool) {
        let (base, row, col) = if window {
            let base = if ctx.lcdc & LCDC_WINDOW_MAP != 0 {
                BG_MAP_1_BASE
            } else {
                BG_MAP_0_BASE
            };
            (base, ctx.window_line as usize / 8, (self.tile_x & 0x1F) as usize)
        } else {
            let base = if ctx.lcdc & LCDC_BG_MAP != 0 {
                BG_MAP_1_BASE
            } else {
                BG_MAP_0_BASE
            };
            let y = ctx.ly.wrapping_add(ctx.scy);
            let col = ((ctx.scx >> 3).wrapping_add(self.tile_x) & 0x1F) as usize;
            (base, y as usize / 8, col)
        };
        let addr = base + row * 32 + col;
        self.tile_no = ctx.vram[0][addr];
        self.attrs = if ctx.cgb { ctx.vram[1][addr] } else { 0 };
    }

    fn bank(&self) -> usize {
        if self.attrs & ATTR_BANK != 0 { 1 } else { 0 }
    }

    fn tile_row_address(&self, ctx: &FetchContext<'_>) -> usize {
        let mut row = if self.window {
            ctx.window_line & 7
        } else {
            ctx.ly.wrapping_add(ctx.scy) & 7
        };
        if self.attrs & ATTR_Y_FLIP != 0 {
            row = 7 - row;
        }
        let tile_base = if ctx.lcdc & LCDC_TILE_DATA != 0 {
            self.tile_no as usize * 16
        } else {
            (0x1000 + (self.tile_no as i8 as isize) * 16) as usize
        };
        tile_base + row as usize * 2
    }

    fn push_row(&self, cgb: bool, fifo: &mut PixelFifo<BgPixel>) {
        let x_flip = self.attrs & ATTR_X_FLIP != 0;
        for i in 0..8 {
            let bit = if x_flip { i } else { 7 - i };
            fifo.push(BgPixel {
                color: ((self.hi >> bit) & 1) << 1 | ((self.lo >> bit) & 1),
                palette: if cgb { self.attrs & ATTR_PALETTE } else { 0 },
                priority: self.attrs & ATTR_PRIORITY != 0,
            });
        }
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}
