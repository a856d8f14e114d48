#![allow(dead_code)]

use dotboy_core::{
    cartridge::Header,
    hardware::Model,
    mmu::Mmu,
    palette::DMG_PALETTE,
    ppu::{FRAME_DOTS, PpuEvent, SCREEN_WIDTH},
};

pub const LCDC: u16 = 0xFF40;
pub const STAT: u16 = 0xFF41;
pub const LY: u16 = 0xFF44;

pub const WHITE: u32 = DMG_PALETTE[0];
pub const LIGHT: u32 = DMG_PALETTE[1];
pub const DARK: u32 = DMG_PALETTE[2];
pub const BLACK: u32 = DMG_PALETTE[3];

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A post-boot bus with the LCD switched off, so VRAM and OAM are freely
/// writable and the next enable starts a fresh frame.
pub fn lcd_off(model: Model) -> Mmu {
    init_logger();
    let mut mmu = Mmu::new(model);
    mmu.write_byte(LCDC, 0x00);
    mmu
}

/// Tick until `event` is reported or a frame's worth of dots passes.
/// Returns the number of dots spent.
pub fn tick_until(mmu: &mut Mmu, event: PpuEvent) -> u32 {
    for dots in 1..=FRAME_DOTS {
        if mmu.tick() == event {
            return dots;
        }
    }
    panic!("{event:?} not seen within one frame");
}

pub fn tick_n(mmu: &mut Mmu, dots: u32) {
    for _ in 0..dots {
        mmu.tick();
    }
}

/// Run until the start of line `ly`.
pub fn run_to_line(mmu: &mut Mmu, ly: u8) {
    for _ in 0..FRAME_DOTS {
        if mmu.ppu.ly() == ly && mmu.ppu.line_dot() == 0 {
            return;
        }
        mmu.tick();
    }
    panic!("line {ly} not reached");
}

/// Fill tile `tile` of the 0x8000 tile data block with one color.
pub fn solid_tile(mmu: &mut Mmu, tile: u16, color: u8) {
    let lo = if color & 1 != 0 { 0xFF } else { 0x00 };
    let hi = if color & 2 != 0 { 0xFF } else { 0x00 };
    let base = 0x8000 + tile * 16;
    for row in 0..8 {
        mmu.write_byte(base + row * 2, lo);
        mmu.write_byte(base + row * 2 + 1, hi);
    }
}

pub fn pixel(mmu: &Mmu, x: usize, y: usize) -> u32 {
    mmu.ppu.framebuffer()[y * SCREEN_WIDTH + x]
}

pub fn row(mmu: &Mmu, y: usize) -> &[u32] {
    &mmu.ppu.framebuffer()[y * SCREEN_WIDTH..(y + 1) * SCREEN_WIDTH]
}

/// Dots of mode 3 on the current line, measured from the next line start.
pub fn mode3_length(mmu: &mut Mmu, ly: u8) -> u32 {
    run_to_line(mmu, ly);
    let mut dots = 0;
    for _ in 0..456 {
        if mmu.read_byte(STAT) & 0x03 == 3 {
            dots += 1;
        }
        mmu.tick();
    }
    dots
}

/// A ROM image with a valid header checksum.
pub fn rom_image(cart_type: u8, rom_code: u8, ram_code: u8) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000 << rom_code];
    rom[0x0134..0x0138].copy_from_slice(b"TEST");
    rom[0x0147] = cart_type;
    rom[0x0148] = rom_code;
    rom[0x0149] = ram_code;
    rom[0x014D] = Header::parse(&rom).computed_checksum();
    rom
}
