mod common;

use std::fs;

use common::*;
use dotboy_core::{
    Error,
    cartridge::Cartridge,
    config::{EmulationModel, EmulatorConfig},
    cpu::IdleCpu,
    gameboy::GameBoy,
    hardware::{ColorMode, Model},
    ppu::FRAME_DOTS,
};
use tempfile::tempdir;

fn cgb_rom() -> Vec<u8> {
    let mut rom = rom_image(0x00, 0x00, 0x00);
    rom[0x0143] = 0x80;
    rom[0x014D] = dotboy_core::cartridge::Header::parse(&rom).computed_checksum();
    rom
}

#[test]
fn run_frame_returns_one_frame_at_a_time() {
    init_logger();
    let mut gb = GameBoy::new(Model::Dmg);
    assert!(gb.run_frame());
    let first = gb.mmu.ppu.frames();
    assert!(gb.run_frame());
    assert_eq!(gb.mmu.ppu.frames(), first + 1);
}

#[test]
fn run_frame_gives_up_with_the_lcd_off() {
    init_logger();
    let mut gb = GameBoy::new(Model::Dmg);
    gb.mmu.write_byte(LCDC, 0x00);
    let start = gb.mmu.dots();
    assert!(!gb.run_frame());
    let spent = gb.mmu.dots() - start;
    assert!(spent >= FRAME_DOTS as u64 && spent < FRAME_DOTS as u64 + 4);
}

#[test]
fn auto_model_picks_cgb_for_color_cartridges() {
    init_logger();
    let cfg = EmulatorConfig::default();
    let cart = Cartridge::load(cgb_rom());
    let gb = GameBoy::from_config(&cfg, Some(cart), Box::new(IdleCpu::new())).unwrap();
    assert_eq!(gb.model, Model::Cgb);
    assert_eq!(gb.mmu.ppu.color_mode(), ColorMode::Cgb);

    let cart = Cartridge::load(rom_image(0x00, 0x00, 0x00));
    let gb = GameBoy::from_config(&cfg, Some(cart), Box::new(IdleCpu::new())).unwrap();
    assert_eq!(gb.model, Model::Dmg);
}

#[test]
fn forced_cgb_runs_dmg_cartridges_in_compatibility_mode() {
    init_logger();
    let cfg = EmulatorConfig {
        model: EmulationModel::Cgb,
        ..EmulatorConfig::default()
    };
    let cart = Cartridge::load(rom_image(0x00, 0x00, 0x00));
    let gb = GameBoy::from_config(&cfg, Some(cart), Box::new(IdleCpu::new())).unwrap();
    assert_eq!(gb.mmu.ppu.color_mode(), ColorMode::Compat);
}

#[test]
fn configured_palette_is_used_for_dmg_shades() {
    init_logger();
    let colors = [0x00E0F8D0, 0x0088C070, 0x00346856, 0x00081820];
    let cfg = EmulatorConfig {
        model: EmulationModel::Dmg,
        dmg_palette: colors,
        ..EmulatorConfig::default()
    };
    let mut gb = GameBoy::from_config(&cfg, None, Box::new(IdleCpu::new())).unwrap();
    assert!(gb.run_frame());
    // BGP 0xFC maps an empty tile map to shade 0.
    assert!(gb.framebuffer().iter().all(|&p| p == colors[0]));

    gb.reset();
    assert!(gb.run_frame());
    assert!(gb.framebuffer().iter().all(|&p| p == colors[0]));
}

#[test]
fn boot_rom_from_config_starts_powered_down() {
    init_logger();
    let dir = tempdir().unwrap();
    let boot = dir.path().join("dmg_boot.bin");
    fs::write(&boot, vec![0x31; 0x100]).unwrap();
    let cfg = EmulatorConfig {
        model: EmulationModel::Dmg,
        dmg_bootrom_path: Some(boot),
        ..EmulatorConfig::default()
    };
    let cart = Cartridge::load(rom_image(0x00, 0x00, 0x00));
    let mut gb = GameBoy::from_config(&cfg, Some(cart), Box::new(IdleCpu::new())).unwrap();

    assert_eq!(gb.mmu.read_byte(0x0000), 0x31);
    assert!(!gb.mmu.ppu.lcd_enabled());

    // Reset maps the boot ROM again.
    gb.mmu.write_byte(0xFF50, 1);
    assert_eq!(gb.mmu.read_byte(0x0000), 0x00);
    gb.reset();
    assert_eq!(gb.mmu.read_byte(0x0000), 0x31);
    assert!(gb.mmu.cart.is_some());
}

#[test]
fn missing_boot_rom_fails_construction() {
    init_logger();
    let dir = tempdir().unwrap();
    let cfg = EmulatorConfig {
        model: EmulationModel::Cgb,
        cgb_bootrom_path: Some(dir.path().join("cgb_boot.bin")),
        ..EmulatorConfig::default()
    };
    let result = GameBoy::from_config(&cfg, None, Box::new(IdleCpu::new()));
    assert!(matches!(result, Err(Error::Io { .. })));
}

#[test]
fn reset_keeps_the_cartridge() {
    init_logger();
    let mut gb = GameBoy::new(Model::Dmg);
    gb.load_cart(Cartridge::load(rom_image(0x00, 0x00, 0x00)));
    gb.mmu.write_byte(0xC000, 0x42);
    gb.run_frame();
    gb.reset();
    assert!(gb.mmu.cart.is_some());
    assert_eq!(gb.mmu.read_byte(0xC000), 0x00);
    assert_eq!(gb.mmu.dots(), 0);
    assert_eq!(gb.mmu.read_byte(0x0147), 0x00);
}
