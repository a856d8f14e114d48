mod common;

use common::*;
use dotboy_core::{
    Error,
    cartridge::Cartridge,
    hardware::Model,
    mmu::{Access, Mmu},
};

#[test]
fn wram_echo_and_bank_switch() {
    let mut mmu = Mmu::new(Model::Cgb);
    mmu.write_byte(0xC000, 0xAA);
    assert_eq!(mmu.read_byte(0xC000), 0xAA);
    mmu.write_byte(0xE000, 0xBB);
    assert_eq!(mmu.read_byte(0xC000), 0xBB);

    mmu.write_byte(0xFF70, 0x02);
    mmu.write_byte(0xD000, 0xCC);
    assert_eq!(mmu.read_byte(0xD000), 0xCC);
    assert_eq!(mmu.read_byte(0xF000), 0xCC);

    mmu.write_byte(0xFF70, 0x03);
    assert_eq!(mmu.read_byte(0xD000), 0x00);
    mmu.write_byte(0xD000, 0xDD);
    assert_eq!(mmu.read_byte(0xD000), 0xDD);

    mmu.write_byte(0xFF70, 0x02);
    assert_eq!(mmu.read_byte(0xD000), 0xCC);
    assert_eq!(mmu.read_byte(0xFF70), 0xFA);
}

#[test]
fn dmg_ignores_wram_bank_register() {
    let mut mmu = Mmu::new(Model::Dmg);
    mmu.write_byte(0xD000, 0x11);
    mmu.write_byte(0xFF70, 0x03);
    assert_eq!(mmu.read_byte(0xD000), 0x11);
    assert_eq!(mmu.read_byte(0xFF70), 0xFF);
    assert_eq!(mmu.wram_bank(), 1);
}

#[test]
fn vram_bank_switch() {
    let mut mmu = lcd_off(Model::Cgb);
    mmu.write_byte(0x8000, 0x11);
    assert_eq!(mmu.read_byte(0x8000), 0x11);

    mmu.write_byte(0xFF4F, 0x01);
    assert_eq!(mmu.read_byte(0x8000), 0x00);
    mmu.write_byte(0x8000, 0x22);
    assert_eq!(mmu.read_byte(0x8000), 0x22);
    assert_eq!(mmu.read_byte(0xFF4F), 0xFF);

    mmu.write_byte(0xFF4F, 0x00);
    assert_eq!(mmu.read_byte(0x8000), 0x11);
    assert_eq!(mmu.read_byte(0xFF4F), 0xFE);
}

#[test]
fn boot_rom_disable() {
    let mut mmu = Mmu::new_power_on(Model::Dmg);
    mmu.load_boot_rom(vec![0xAA; 0x100]).unwrap();
    mmu.load_cart(Cartridge::from_bytes_with_ram(vec![0xBB; 0x200], 0x2000));
    assert_eq!(mmu.read_byte(0x00), 0xAA);
    assert_eq!(mmu.read_byte(0x100), 0xBB);
    mmu.write_byte(0xFF50, 1);
    assert_eq!(mmu.read_byte(0x00), 0xBB);

    // Unmapping is one-way.
    mmu.write_byte(0xFF50, 0);
    assert_eq!(mmu.read_byte(0x00), 0xBB);
}

#[test]
fn cgb_boot_rom_mapping() {
    // CGB bus with a cartridge and a synthetic 0x900-byte boot ROM.
    let mut rom = vec![0u8; 0x8000];
    rom[0x0000] = 0xC0;
    rom[0x00FF] = 0xC1;
    rom[0x0100] = 0xC2;
    rom[0x01FF] = 0xC3;
    rom[0x0200] = 0xC4;
    rom[0x08FF] = 0xC5;
    let cart = Cartridge::from_bytes_with_ram(rom, 0);

    let mut mmu = Mmu::new_power_on(Model::Cgb);
    mmu.load_cart(cart);

    let mut boot = vec![0u8; 0x900];
    boot[0x0000] = 0xA0;
    boot[0x00FF] = 0xA1;
    boot[0x0100] = 0xA2; // hidden behind the cartridge header
    boot[0x01FF] = 0xA3;
    boot[0x0200] = 0xA4;
    boot[0x08FF] = 0xA5;
    mmu.load_boot_rom(boot).unwrap();

    assert_eq!(mmu.read_byte(0x0000), 0xA0);
    assert_eq!(mmu.read_byte(0x00FF), 0xA1);

    // The header window stays on the cartridge.
    assert_eq!(mmu.read_byte(0x0100), 0xC2);
    assert_eq!(mmu.read_byte(0x01FF), 0xC3);

    assert_eq!(mmu.read_byte(0x0200), 0xA4);
    assert_eq!(mmu.read_byte(0x08FF), 0xA5);

    mmu.write_byte(0xFF50, 1);
    assert_eq!(mmu.read_byte(0x0000), 0xC0);
    assert_eq!(mmu.read_byte(0x00FF), 0xC1);
    assert_eq!(mmu.read_byte(0x0200), 0xC4);
    assert_eq!(mmu.read_byte(0x08FF), 0xC5);
}

#[test]
fn wrong_size_boot_rom_is_rejected() {
    let mut mmu = Mmu::new_power_on(Model::Cgb);
    let err = mmu.load_boot_rom(vec![0; 0x100]).unwrap_err();
    assert!(matches!(
        err,
        Error::BootRomSize {
            expected: 0x900,
            actual: 0x100
        }
    ));
    assert_eq!(mmu.read_byte(0x0000), 0xFF);
}

#[test]
fn missing_boot_rom_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dmg_boot.bin");
    let mut mmu = Mmu::new_power_on(Model::Dmg);
    match mmu.load_boot_rom_file(&path) {
        Err(Error::Io { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected io error, got {other:?}"),
    }
}

#[test]
fn cartridge_ram_access() {
    let mut mmu = Mmu::new(Model::Dmg);
    mmu.load_cart(Cartridge::from_bytes_with_ram(vec![0; 0x200], 0x2000));

    mmu.write_byte(0xA000, 0x55);
    assert_eq!(mmu.read_byte(0xA000), 0x55);

    mmu.write_byte(0xBFFF, 0xAA);
    assert_eq!(mmu.read_byte(0xBFFF), 0xAA);
}

#[test]
fn empty_slot_reads_open_bus() {
    let mmu = Mmu::new(Model::Dmg);
    assert_eq!(mmu.read_byte(0x0000), 0xFF);
    assert_eq!(mmu.read_byte(0x4000), 0xFF);
    assert_eq!(mmu.read_byte(0xA000), 0xFF);
    assert_eq!(mmu.read_byte(0xFEA0), 0xFF);
}

#[test]
fn cgb_registers_read_open_on_dmg() {
    let mut mmu = lcd_off(Model::Dmg);
    for addr in [0xFF4F, 0xFF55, 0xFF68, 0xFF69, 0xFF6A, 0xFF6B, 0xFF70] {
        mmu.write_byte(addr, 0x00);
        assert_eq!(mmu.read_byte(addr), 0xFF, "{addr:04X}");
    }
}

#[test]
fn unused_bits_read_as_set() {
    let mut mmu = lcd_off(Model::Dmg);
    mmu.write_byte(0xFF41, 0x00);
    assert_eq!(mmu.read_byte(0xFF41) & 0x80, 0x80);
    mmu.write_byte(0xFF0F, 0x00);
    assert_eq!(mmu.read_byte(0xFF0F), 0xE0);
    mmu.write_byte(0xFF07, 0x00);
    assert_eq!(mmu.read_byte(0xFF07), 0xF8);
    assert_eq!(mmu.read_byte(0xFF03), 0xFF);
}

#[test]
fn ly_ignores_writes() {
    let mut mmu = Mmu::new(Model::Dmg);
    run_to_line(&mut mmu, 5);
    mmu.write_byte(LY, 0x00);
    assert_eq!(mmu.read_byte(LY), 5);
}

#[test]
fn vram_oam_access_blocking() {
    let mut mmu = lcd_off(Model::Dmg);
    mmu.write_byte(0x8000, 0x12);
    mmu.write_byte(0xFE00, 0x34);
    mmu.write_byte(LCDC, 0x80);

    // The first line after enabling skips OAM scan, so wait for line 1.
    run_to_line(&mut mmu, 1);
    mmu.tick();
    assert_eq!(mmu.read_byte(0xFE00), 0xFF);
    assert_eq!(mmu.read_byte(0x8000), 0x12);
    mmu.write_byte(0xFE00, 0x56);

    tick_n(&mut mmu, 80);
    assert_eq!(mmu.read_byte(0x8000), 0xFF);
    mmu.write_byte(0x8000, 0x78);

    // Bypass accesses ignore the mode.
    assert_eq!(mmu.read(0x8000, Access::Bypass), 0x12);
    assert_eq!(mmu.read(0xFE00, Access::Bypass), 0x34);
}

#[test]
fn joypad_press_requests_interrupt() {
    use dotboy_core::{input::Button, interrupt::Interrupt};

    let mut mmu = Mmu::new(Model::Dmg);
    mmu.irq.write(0);
    mmu.write_byte(0xFF00, 0x20);
    mmu.set_button(Button::Down, true);
    assert!(mmu.irq.is_requested(Interrupt::Joypad));
    assert_eq!(mmu.read_byte(0xFF00) & 0x0F, 0x07);
}
