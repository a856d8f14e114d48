use crate::{
    fetcher::{Dot, FetchContext, FetchState, Fetcher},
    fifo::{BgPixel, PixelFifo, SpritePixel},
    hardware::ColorMode,
    interrupt::{Interrupt, InterruptFlags},
    palette::{CgbPalettes, DMG_PALETTE, dmg_shade},
    sprite::{MAX_SPRITES_PER_LINE, Sprite, TOTAL_SPRITES},
};

// Screen resolution used by the Game Boy PPU
pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 144;

// Timing in dots
pub const LINE_DOTS: u16 = 456;
pub const LINES_PER_FRAME: u8 = 154;
pub const FRAME_DOTS: u32 = LINE_DOTS as u32 * LINES_PER_FRAME as u32;
const OAM_SCAN_DOTS: u16 = 80;

// Internal memory sizes
const VRAM_BANK_SIZE: usize = 0x2000;
const OAM_SIZE: usize = 0xA0;

// LCD modes as reported in STAT
const MODE_HBLANK: u8 = 0;
const MODE_VBLANK: u8 = 1;
const MODE_OAM: u8 = 2;
const MODE_TRANSFER: u8 = 3;

const LCDC_ENABLE: u8 = 0x80;
const LCDC_WINDOW_ENABLE: u8 = 0x20;
const LCDC_TALL_SPRITES: u8 = 0x04;
const LCDC_SPRITE_ENABLE: u8 = 0x02;
const LCDC_BG_ENABLE: u8 = 0x01;

const STAT_LYC_INT: u8 = 0x40;
const STAT_MODE2_INT: u8 = 0x20;
const STAT_MODE1_INT: u8 = 0x10;
const STAT_MODE0_INT: u8 = 0x08;

/// Color shown for every pixel of a suppressed frame on the color model.
const CGB_BLANK: u32 = 0x00FFFFFF;

/// Outer scanline state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineState {
    OamScan,
    PixelTransfer,
    HBlank,
    VBlank,
}

impl LineState {
    pub const fn mode(self) -> u8 {
        match self {
            LineState::OamScan => MODE_OAM,
            LineState::PixelTransfer => MODE_TRANSFER,
            LineState::HBlank => MODE_HBLANK,
            LineState::VBlank => MODE_VBLANK,
        }
    }
}

/// Notable transitions reported back to the bus by [`Ppu::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PpuEvent {
    None,
    /// Pixel transfer finished on a visible line.
    HBlankStarted,
    /// The last visible line was drawn; the frame buffer is complete.
    FrameCompleted,
}

pub struct Ppu {
    pub vram: [[u8; VRAM_BANK_SIZE]; 2],
    pub vram_bank: usize,
    pub oam: [u8; OAM_SIZE],

    color_mode: ColorMode,
    dmg_colors: [u32; 4],

    lcdc: u8,
    stat: u8,
    scy: u8,
    scx: u8,
    ly: u8,
    lyc: u8,
    lyc_eq_ly: bool,
    bgp: u8,
    obp0: u8,
    obp1: u8,
    wy: u8,
    wx: u8,
    palettes: CgbPalettes,

    state: LineState,
    /// Mode bits as exposed through STAT.
    mode: u8,
    line_dot: u16,
    line_scx: u8,
    line_scy: u8,

    /// Internal window line counter
    win_line_counter: u8,
    /// LY matched WY at some point this frame.
    wy_triggered: bool,

    fetcher: Fetcher,
    bg_fifo: PixelFifo<BgPixel>,
    sprite_fifo: PixelFifo<SpritePixel>,
    /// Sprites selected by the OAM scan, in OAM order.
    line_sprites: [Sprite; MAX_SPRITES_PER_LINE],
    sprite_count: usize,
    /// Sprites whose left edge was reached and still need an overlay fetch.
    pending_sprites: PixelFifo<u8, MAX_SPRITES_PER_LINE>,
    /// Pixels popped from the BG FIFO this line, discarded ones included.
    popped: u8,
    /// Pixels committed to the current output line.
    pixel_x: u8,

    pub framebuffer: [u32; SCREEN_WIDTH * SCREEN_HEIGHT],
    /// Indicates a completed frame is available in `framebuffer`
    frame_ready: bool,
    /// The next frame after LCD enable is computed but not shown.
    blank_next_frame: bool,
    blank_frame: bool,
    vblank_requested: bool,
    stat_irq_line: bool,
    frame_counter: u64,
}

impl Ppu {
    pub fn new(color_mode: ColorMode) -> Self {
        let mut ppu = Self {
            vram: [[0; VRAM_BANK_SIZE]; 2],
            vram_bank: 0,
            oam: [0; OAM_SIZE],
            color_mode,
            dmg_colors: DMG_PALETTE,
            lcdc: 0,
            stat: 0,
            scy: 0,
            scx: 0,
            ly: 0,
            lyc: 0,
            lyc_eq_ly: false,
            bgp: 0,
            obp0: 0,
            obp1: 0,
            wy: 0,
            wx: 0,
            palettes: CgbPalettes::default(),
            state: LineState::HBlank,
            mode: MODE_HBLANK,
            line_dot: 0,
            line_scx: 0,
            line_scy: 0,
            win_line_counter: 0,
            wy_triggered: false,
            fetcher: Fetcher::new(),
            bg_fifo: PixelFifo::new(),
            sprite_fifo: PixelFifo::new(),
            line_sprites: [Sprite::default(); MAX_SPRITES_PER_LINE],
            sprite_count: 0,
            pending_sprites: PixelFifo::new(),
            popped: 0,
            pixel_x: 0,
            framebuffer: [0; SCREEN_WIDTH * SCREEN_HEIGHT],
            frame_ready: false,
            blank_next_frame: true,
            blank_frame: false,
            vblank_requested: false,
            stat_irq_line: false,
            frame_counter: 0,
        };
        if color_mode == ColorMode::Compat {
            ppu.apply_dmg_compatibility_palettes();
        }
        let blank = ppu.blank_color();
        ppu.framebuffer.fill(blank);
        ppu
    }

    /// Initialize registers to the state expected after the boot ROM
    /// has finished executing. The LCD is left running without a blanked
    /// first frame.
    pub fn apply_boot_state(&mut self) {
        self.lcdc = 0x91;
        self.bgp = 0xFC;
        self.stat = 0;
        self.ly = 0;
        self.line_dot = 0;
        self.win_line_counter = 0;
        self.blank_next_frame = false;
        self.lyc_eq_ly = self.ly == self.lyc;
        self.stat_irq_line = false;
        if self.color_mode == ColorMode::Compat {
            self.apply_dmg_compatibility_palettes();
        }
    }

    /// Switch how pixels are resolved, e.g. when a DMG cartridge is inserted
    /// into a CGB.
    pub fn set_color_mode(&mut self, color_mode: ColorMode) {
        self.color_mode = color_mode;
        if color_mode == ColorMode::Compat {
            self.apply_dmg_compatibility_palettes();
        }
        if !self.lcd_enabled() {
            let blank = self.blank_color();
            self.framebuffer.fill(blank);
        }
    }

    /// Load the palettes the CGB boot ROM selects for a DMG cartridge.
    pub fn apply_dmg_compatibility_palettes(&mut self) {
        self.palettes.load_compatibility_colors();
        self.bgp = 0xE4;
        self.obp0 = 0xD0;
        self.obp1 = 0xE0;
    }

    /// Replace the RGB colors used for the four DMG shades.
    pub fn set_dmg_colors(&mut self, colors: [u32; 4]) {
        self.dmg_colors = colors;
        if !self.lcd_enabled() {
            let blank = self.blank_color();
            self.framebuffer.fill(blank);
        }
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    fn is_cgb(&self) -> bool {
        self.color_mode == ColorMode::Cgb
    }

    fn blank_color(&self) -> u32 {
        match self.color_mode {
            ColorMode::Dmg => self.dmg_colors[0],
            ColorMode::Cgb | ColorMode::Compat => CGB_BLANK,
        }
    }

    pub fn lcd_enabled(&self) -> bool {
        self.lcdc & LCDC_ENABLE != 0
    }

    pub fn in_hblank(&self) -> bool {
        self.state == LineState::HBlank
    }

    pub fn state(&self) -> LineState {
        self.state
    }

    pub fn ly(&self) -> u8 {
        self.ly
    }

    /// Dot within the current line (0-455).
    pub fn line_dot(&self) -> u16 {
        self.line_dot
    }

    /// Dot within the current frame (0-70223).
    pub fn frame_dot(&self) -> u32 {
        self.ly as u32 * LINE_DOTS as u32 + self.line_dot as u32
    }

    /// CPU access to VRAM is cut off while pixels are being fetched.
    pub fn vram_blocked(&self) -> bool {
        self.lcd_enabled() && self.state == LineState::PixelTransfer
    }

    pub fn oam_blocked(&self) -> bool {
        self.lcd_enabled()
            && matches!(self.state, LineState::OamScan | LineState::PixelTransfer)
    }

    /// Returns true if a full frame has been rendered and is ready to display.
    pub fn frame_ready(&self) -> bool {
        self.frame_ready
    }

    /// Returns the current framebuffer. Call `frame_ready()` to check if a
    /// frame is complete. After presenting, call `clear_frame_flag()`.
    pub fn framebuffer(&self) -> &[u32; SCREEN_WIDTH * SCREEN_HEIGHT] {
        &self.framebuffer
    }

    /// Clears the frame ready flag after a frame has been consumed.
    pub fn clear_frame_flag(&mut self) {
        self.frame_ready = false;
    }

    /// Returns the number of frames that have been completed since power on.
    pub fn frames(&self) -> u64 {
        self.frame_counter
    }

    /// Returns the current value of the internal window line counter.
    pub fn window_line_counter(&self) -> u8 {
        self.win_line_counter
    }

    pub fn bg_fifo_len(&self) -> usize {
        self.bg_fifo.len()
    }

    pub fn sprite_fifo_len(&self) -> usize {
        self.sprite_fifo.len()
    }

    pub fn fetch_state(&self) -> FetchState {
        self.fetcher.state
    }

    /// Get a CGB background palette color as 0x00RRGGBB.
    pub fn bg_palette_color(&self, palette: usize, color_id: usize) -> u32 {
        self.palettes.bg.color(palette, color_id)
    }

    /// Get a CGB object palette color as 0x00RRGGBB.
    pub fn ob_palette_color(&self, palette: usize, color_id: usize) -> u32 {
        self.palettes.obj.color(palette, color_id)
    }

    /// Raw register contents. The bus applies the read masks.
    pub fn read_reg(&self, addr: u16) -> u8 {
        let locked = self.vram_blocked();
        match addr {
            0xFF40 => self.lcdc,
            0xFF41 => self.stat | self.mode | if self.lyc_eq_ly { 0x04 } else { 0 },
            0xFF42 => self.scy,
            0xFF43 => self.scx,
            0xFF44 => self.ly,
            0xFF45 => self.lyc,
            0xFF47 => self.bgp,
            0xFF48 => self.obp0,
            0xFF49 => self.obp1,
            0xFF4A => self.wy,
            0xFF4B => self.wx,
            0xFF4F => self.vram_bank as u8,
            0xFF68 => self.palettes.bg.read_index(),
            0xFF69 => self.palettes.bg.read_data(locked),
            0xFF6A => self.palettes.obj.read_index(),
            0xFF6B => self.palettes.obj.read_data(locked),
            _ => 0xFF,
        }
    }

    pub fn write_reg(&mut self, addr: u16, val: u8) {
        let locked = self.vram_blocked();
        match addr {
            0xFF40 => self.write_lcdc(val),
            0xFF41 => self.stat = val & 0x78,
            0xFF42 => self.scy = val,
            0xFF43 => self.scx = val,
            0xFF44 => {}
            0xFF45 => self.lyc = val,
            0xFF47 => self.bgp = val,
            0xFF48 => self.obp0 = val,
            0xFF49 => self.obp1 = val,
            0xFF4A => self.wy = val,
            0xFF4B => self.wx = val,
            0xFF4F => self.vram_bank = (val & 0x01) as usize,
            0xFF68 => self.palettes.bg.write_index(val),
            0xFF69 => self.palettes.bg.write_data(val, locked),
            0xFF6A => self.palettes.obj.write_index(val),
            0xFF6B => self.palettes.obj.write_data(val, locked),
            _ => {}
        }
    }

    fn write_lcdc(&mut self, val: u8) {
        let was_on = self.lcd_enabled();
        self.lcdc = val;
        let is_on = self.lcd_enabled();
        if was_on && !is_on {
            log::debug!("LCD disabled at LY={} dot={}", self.ly, self.line_dot);
            self.ly = 0;
            self.line_dot = 0;
            self.mode = MODE_HBLANK;
            self.state = LineState::HBlank;
            self.win_line_counter = 0;
            self.bg_fifo.clear();
            self.sprite_fifo.clear();
            self.stat_irq_line = false;
            self.blank_next_frame = true;
        } else if !was_on && is_on {
            log::debug!("LCD enabled");
            self.ly = 0;
            self.line_dot = 0;
        }
    }

    /// Advance the PPU by one dot.
    pub fn tick(&mut self, irq: &mut InterruptFlags) -> PpuEvent {
        if !self.lcd_enabled() {
            return PpuEvent::None;
        }

        if self.line_dot == 0 {
            if self.ly == 0 {
                self.begin_frame();
            }
            self.begin_line();
        }

        self.mode = if self.blank_frame && self.ly == 0 && self.state == LineState::OamScan {
            MODE_HBLANK
        } else {
            self.state.mode()
        };
        self.lyc_eq_ly = self.ly == self.lyc;
        self.update_stat_irq(irq);

        let event = match self.state {
            LineState::OamScan => {
                self.oam_scan_dot();
                PpuEvent::None
            }
            LineState::PixelTransfer => {
                self.transfer_dot();
                if self.state == LineState::HBlank {
                    PpuEvent::HBlankStarted
                } else {
                    PpuEvent::None
                }
            }
            LineState::HBlank => PpuEvent::None,
            LineState::VBlank => {
                if !self.vblank_requested {
                    self.vblank_requested = true;
                    irq.request(Interrupt::VBlank);
                    self.frame_ready = true;
                    self.frame_counter = self.frame_counter.wrapping_add(1);
                    PpuEvent::FrameCompleted
                } else {
                    PpuEvent::None
                }
            }
        };

        self.line_dot += 1;
        if self.line_dot == LINE_DOTS {
            self.line_dot = 0;
            self.ly += 1;
            if self.ly == LINES_PER_FRAME {
                self.ly = 0;
            }
        }
        event
    }

    fn begin_frame(&mut self) {
        self.blank_frame = self.blank_next_frame;
        self.blank_next_frame = false;
        if self.blank_frame {
            let blank = self.blank_color();
            self.framebuffer.fill(blank);
        }
        self.win_line_counter = 0;
        self.wy_triggered = false;
        self.vblank_requested = false;
    }

    fn begin_line(&mut self) {
        self.line_scx = self.scx;
        self.line_scy = self.scy;
        self.fetcher.start_line();
        self.bg_fifo.clear();
        self.sprite_fifo.clear();
        self.pending_sprites.clear();
        self.sprite_count = 0;
        self.popped = 0;
        self.pixel_x = 0;
        if self.ly == self.wy {
            self.wy_triggered = true;
        }
        self.state = if (self.ly as usize) < SCREEN_HEIGHT {
            LineState::OamScan
        } else {
            LineState::VBlank
        };
    }

    fn sprite_height(&self) -> u8 {
        if self.lcdc & LCDC_TALL_SPRITES != 0 {
            16
        } else {
            8
        }
    }

    /// One candidate is examined every two dots.
    fn oam_scan_dot(&mut self) {
        if self.line_dot & 1 == 1 {
            let index = (self.line_dot / 2) as usize;
            if index < TOTAL_SPRITES && self.sprite_count < MAX_SPRITES_PER_LINE {
                let sprite = Sprite::from_oam(&self.oam, index);
                if sprite.is_visible_on(self.ly, self.sprite_height()) {
                    self.line_sprites[self.sprite_count] = sprite;
                    self.sprite_count += 1;
                }
            }
        }
        if self.line_dot + 1 == OAM_SCAN_DOTS {
            self.state = LineState::PixelTransfer;
        }
    }

    fn transfer_dot(&mut self) {
        if let FetchState::SpriteOverlay {
            dot,
            resume,
            resume_dot,
        } = self.fetcher.state
        {
            self.fetcher.state = match dot {
                Dot::First => {
                    if let Some(slot) = self.pending_sprites.pop() {
                        self.merge_sprite(slot as usize);
                    }
                    FetchState::SpriteOverlay {
                        dot: Dot::Second,
                        resume,
                        resume_dot,
                    }
                }
                Dot::Second if self.pending_sprites.is_empty() => FetchState::Fetch {
                    phase: resume,
                    dot: resume_dot,
                },
                Dot::Second => FetchState::SpriteOverlay {
                    dot: Dot::First,
                    resume,
                    resume_dot,
                },
            };
            return;
        }

        let ctx = FetchContext {
            vram: &self.vram,
            lcdc: self.lcdc,
            scx: self.line_scx,
            scy: self.line_scy,
            ly: self.ly,
            window_line: self.win_line_counter,
            cgb: self.is_cgb(),
        };
        self.fetcher.step(&ctx, &mut self.bg_fifo);

        let Some(bg) = self.bg_fifo.pop() else {
            return;
        };
        let sprite = self.sprite_fifo.pop();
        let color = self.mix(bg, sprite);

        let fine = self.line_scx & 7;
        if self.popped >= 8 + fine {
            if !self.blank_frame {
                let idx = self.ly as usize * SCREEN_WIDTH + self.pixel_x as usize;
                self.framebuffer[idx] = color;
            }
            self.pixel_x += 1;
        }
        self.popped += 1;

        if self.pixel_x as usize == SCREEN_WIDTH {
            if self.fetcher.in_window() {
                self.win_line_counter = self.win_line_counter.wrapping_add(1);
            }
            self.state = LineState::HBlank;
            return;
        }

        // Next output column once the discard window is taken into account.
        let next_col = self.popped as i16 - 8 - fine as i16;

        if !self.fetcher.in_window()
            && self.lcdc & LCDC_WINDOW_ENABLE != 0
            && self.wy_triggered
            && next_col + 7 >= self.wx as i16
        {
            ppu_trace!("window start LY={} col={}", self.ly, next_col);
            self.bg_fifo.clear();
            self.fetcher.start_window();
        }

        if self.lcdc & LCDC_SPRITE_ENABLE != 0 {
            let x = next_col + 8;
            for slot in 0..self.sprite_count {
                if self.line_sprites[slot].x as i16 == x {
                    self.pending_sprites.push(slot as u8);
                }
            }
            if !self.pending_sprites.is_empty() {
                self.fetcher.pause_for_sprite();
            }
        }
    }

    /// Fold one sprite row into the sprite FIFO. Queued opaque pixels are
    /// kept; transparent ones give way to the newcomer.
    fn merge_sprite(&mut self, slot: usize) {
        let sprite = self.line_sprites[slot];
        let height = self.sprite_height();
        let cgb = self.is_cgb();
        let (bank, addr) = sprite.row_address(self.ly, height, cgb);
        let lo = self.vram[bank][addr];
        let hi = self.vram[bank][addr + 1];
        ppu_trace!(
            "sprite {} fetch LY={} x={}",
            sprite.oam_index,
            self.ly,
            sprite.x
        );
        for (i, px) in sprite.decode_row(lo, hi, cgb).into_iter().enumerate() {
            match self.sprite_fifo.get_mut(i) {
                Some(queued) => {
                    if queued.is_transparent() && !px.is_transparent() {
                        *queued = px;
                    }
                }
                None => {
                    self.sprite_fifo.push(px);
                }
            }
        }
    }

    fn mix(&self, mut bg: BgPixel, sprite: Option<SpritePixel>) -> u32 {
        let bg_enabled = self.lcdc & LCDC_BG_ENABLE != 0;
        if !bg_enabled && !self.is_cgb() {
            bg.color = 0;
        }

        if let Some(sp) = sprite.filter(|sp| !sp.is_transparent()) {
            let sprite_wins = if self.is_cgb() && !bg_enabled {
                true
            } else {
                let bg_priority = self.is_cgb() && bg.priority;
                bg.color == 0 || (!sp.behind_bg && !bg_priority)
            };
            if sprite_wins {
                return self.sprite_color(sp);
            }
        }
        self.bg_color(bg)
    }

    fn bg_color(&self, bg: BgPixel) -> u32 {
        match self.color_mode {
            ColorMode::Dmg => self.dmg_colors[dmg_shade(self.bgp, bg.color) as usize],
            ColorMode::Cgb => self.palettes.bg.color(bg.palette as usize, bg.color as usize),
            ColorMode::Compat => self
                .palettes
                .bg
                .color(0, dmg_shade(self.bgp, bg.color) as usize),
        }
    }

    fn sprite_color(&self, sp: SpritePixel) -> u32 {
        let obp = if sp.palette & 1 != 0 {
            self.obp1
        } else {
            self.obp0
        };
        match self.color_mode {
            ColorMode::Dmg => self.dmg_colors[dmg_shade(obp, sp.color) as usize],
            ColorMode::Cgb => self
                .palettes
                .obj
                .color(sp.palette as usize, sp.color as usize),
            ColorMode::Compat => self
                .palettes
                .obj
                .color((sp.palette & 1) as usize, dmg_shade(obp, sp.color) as usize),
        }
    }

    fn update_stat_irq(&mut self, irq: &mut InterruptFlags) {
        let coincidence = self.lyc_eq_ly && self.stat & STAT_LYC_INT != 0;
        let mode_signal = match self.mode {
            MODE_HBLANK => self.stat & STAT_MODE0_INT != 0,
            MODE_VBLANK => self.stat & STAT_MODE1_INT != 0,
            MODE_OAM => self.stat & STAT_MODE2_INT != 0,
            _ => false,
        };
        let current = coincidence || mode_signal;
        if current && !self.stat_irq_line {
            irq.request(Interrupt::LcdStat);
        }
        self.stat_irq_line = current;
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new(ColorMode::Dmg)
    }
}
