use std::{fs, path::Path};

use crate::{
    cartridge::Cartridge,
    dma::{Hdma, HdmaBlock, HdmaRequest, OamDma},
    error::{Error, Result},
    hardware::{ColorMode, Model},
    input::{Button, Input},
    interrupt::InterruptFlags,
    ppu::{Ppu, PpuEvent},
    registers::{self, RegMask},
    serial::Serial,
    sound::Sound,
    timer::Timer,
};

const WRAM_BANK_SIZE: usize = 0x1000;
/// Divider value left behind by the boot ROM.
const POST_BOOT_DIV: u16 = 0xABCC;

/// Who is driving a bus access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Instruction fetches and loads/stores. Subject to PPU locks and OAM DMA.
    Cpu,
    /// DMA engine reads. Ignore every lock.
    Bypass,
}

pub struct Mmu {
    pub wram: [[u8; WRAM_BANK_SIZE]; 8],
    svbk: u8,
    pub hram: [u8; 0x7F],
    pub cart: Option<Cartridge>,
    pub boot_rom: Option<Vec<u8>>,
    pub boot_mapped: bool,
    pub irq: InterruptFlags,
    pub ie: u8,
    pub ppu: Ppu,
    pub timer: Timer,
    pub serial: Serial,
    pub input: Input,
    pub sound: Sound,
    pub oam_dma: OamDma,
    pub hdma: Hdma,
    model: Model,
    /// Dots elapsed since construction.
    dots: u64,
}

impl Mmu {
    /// Machine state as the boot ROM leaves it: LCD on, registers at their
    /// post-boot values.
    pub fn new(model: Model) -> Self {
        let mut mmu = Self::new_power_on(model);
        mmu.timer.div = POST_BOOT_DIV;
        mmu.irq.write(0x01);
        mmu.ppu.apply_boot_state();
        mmu.sound.apply_boot_state();
        mmu
    }

    /// Cold power-on state for running a real boot ROM: LCD off, registers
    /// cleared.
    pub fn new_power_on(model: Model) -> Self {
        let color_mode = match model {
            Model::Dmg => ColorMode::Dmg,
            Model::Cgb => ColorMode::Cgb,
        };
        Self {
            wram: [[0; WRAM_BANK_SIZE]; 8],
            svbk: 0,
            hram: [0; 0x7F],
            cart: None,
            boot_rom: None,
            boot_mapped: false,
            irq: InterruptFlags::default(),
            ie: 0,
            ppu: Ppu::new(color_mode),
            timer: Timer::new(),
            serial: Serial::new(),
            input: Input::new(),
            sound: Sound::new(),
            oam_dma: OamDma::new(),
            hdma: Hdma::new(),
            model,
            dots: 0,
        }
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn dots(&self) -> u64 {
        self.dots
    }

    pub fn load_cart(&mut self, cart: Cartridge) {
        let color_mode = ColorMode::resolve(self.model, cart.cgb);
        if color_mode != self.ppu.color_mode() {
            log::info!("color mode {:?} for {:?}", color_mode, cart.title);
            self.ppu.set_color_mode(color_mode);
        }
        self.cart = Some(cart);
    }

    pub fn save_cart_ram(&self) -> Result<()> {
        match &self.cart {
            Some(cart) => cart.save_ram(),
            None => Ok(()),
        }
    }

    /// Map a boot ROM over the bottom of the address space until FF50 is
    /// written.
    pub fn load_boot_rom(&mut self, data: Vec<u8>) -> Result<()> {
        let expected = self.model.boot_rom_len();
        if data.len() != expected {
            return Err(Error::BootRomSize {
                expected,
                actual: data.len(),
            });
        }
        self.boot_rom = Some(data);
        self.boot_mapped = true;
        Ok(())
    }

    pub fn load_boot_rom_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| Error::io(path, e))?;
        self.load_boot_rom(data)
    }

    /// Currently selected switchable WRAM bank (1-7).
    pub fn wram_bank(&self) -> usize {
        (self.svbk as usize & 0x07).clamp(1, self.model.wram_banks())
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.input.set_button(button, pressed, &mut self.irq);
    }

    pub fn take_serial(&mut self) -> Vec<u8> {
        self.serial.take_output()
    }

    /// Return true while an OAM DMA holds the bus.
    pub fn dma_active(&self) -> bool {
        self.oam_dma.is_active()
    }

    /// While OAM DMA runs the CPU only reaches HRAM.
    fn dma_blocks(&self, addr: u16, access: Access) -> bool {
        access == Access::Cpu && self.oam_dma.is_active() && !(0xFF80..=0xFFFE).contains(&addr)
    }

    fn boot_rom_byte(&self, addr: u16) -> Option<u8> {
        if !self.boot_mapped {
            return None;
        }
        let overlaid = match addr {
            0x0000..=0x00FF => true,
            // The CGB boot ROM leaves the cartridge header visible.
            0x0200..=0x08FF => self.model.is_cgb(),
            _ => false,
        };
        if !overlaid {
            return None;
        }
        self.boot_rom
            .as_ref()
            .and_then(|b| b.get(addr as usize).copied())
    }

    pub fn read(&self, addr: u16, access: Access) -> u8 {
        if self.dma_blocks(addr, access) {
            ppu_trace!("DMA blocked read {:04X}", addr);
            return 0xFF;
        }
        match addr {
            0x0000..=0x7FFF => self
                .boot_rom_byte(addr)
                .or_else(|| self.cart.as_ref().map(|c| c.read(addr)))
                .unwrap_or(0xFF),
            0x8000..=0x9FFF => {
                if access == Access::Cpu && self.ppu.vram_blocked() {
                    ppu_trace!("VRAM read blocked {:04X} LY={}", addr, self.ppu.ly());
                    0xFF
                } else {
                    self.ppu.vram[self.ppu.vram_bank][(addr - 0x8000) as usize]
                }
            }
            0xA000..=0xBFFF => self.cart.as_ref().map(|c| c.read(addr)).unwrap_or(0xFF),
            0xC000..=0xCFFF => self.wram[0][(addr - 0xC000) as usize],
            0xD000..=0xDFFF => self.wram[self.wram_bank()][(addr - 0xD000) as usize],
            0xE000..=0xEFFF => self.wram[0][(addr - 0xE000) as usize],
            0xF000..=0xFDFF => self.wram[self.wram_bank()][(addr - 0xF000) as usize],
            0xFE00..=0xFE9F => {
                if access == Access::Cpu && self.ppu.oam_blocked() {
                    0xFF
                } else {
                    self.ppu.oam[(addr - 0xFE00) as usize]
                }
            }
            0xFEA0..=0xFEFF => 0xFF,
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize],
            _ => self.read_io(addr),
        }
    }

    pub fn read_byte(&self, addr: u16) -> u8 {
        self.read(addr, Access::Cpu)
    }

    /// Register read with the read mask and fixed bits applied.
    fn read_io(&self, addr: u16) -> u8 {
        if registers::is_cgb_only(addr) && !self.model.is_cgb() {
            return 0xFF;
        }
        let raw = match addr {
            registers::P1 => self.input.read(),
            registers::SB | registers::SC => self.serial.read(addr),
            registers::DIV..=registers::TAC => self.timer.read(addr),
            registers::IF => self.irq.read(),
            0xFF10..=0xFF3F => self.sound.read(addr),
            registers::DMA => self.oam_dma.read(),
            registers::LCDC..=registers::WX
            | registers::VBK
            | registers::BCPS..=registers::OCPD => self.ppu.read_reg(addr),
            registers::HDMA5 => self.hdma.read_control(),
            registers::SVBK => self.svbk,
            registers::IE => self.ie,
            _ => 0xFF,
        };
        registers::mask_for(addr).map_or(raw, |m| m.apply_read(raw))
    }

    pub fn write(&mut self, addr: u16, val: u8, access: Access) {
        if self.dma_blocks(addr, access) {
            ppu_trace!("DMA blocked write {:04X}={:02X}", addr, val);
            return;
        }
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                if let Some(cart) = self.cart.as_mut() {
                    cart.write(addr, val);
                }
            }
            0x8000..=0x9FFF => {
                if access == Access::Cpu && self.ppu.vram_blocked() {
                    ppu_trace!("VRAM write blocked {:04X}={:02X}", addr, val);
                } else {
                    self.ppu.vram[self.ppu.vram_bank][(addr - 0x8000) as usize] = val;
                }
            }
            0xC000..=0xCFFF => self.wram[0][(addr - 0xC000) as usize] = val,
            0xD000..=0xDFFF => {
                let bank = self.wram_bank();
                self.wram[bank][(addr - 0xD000) as usize] = val;
            }
            0xE000..=0xEFFF => self.wram[0][(addr - 0xE000) as usize] = val,
            0xF000..=0xFDFF => {
                let bank = self.wram_bank();
                self.wram[bank][(addr - 0xF000) as usize] = val;
            }
            0xFE00..=0xFE9F => {
                if access == Access::Bypass || !self.ppu.oam_blocked() {
                    self.ppu.oam[(addr - 0xFE00) as usize] = val;
                }
            }
            0xFEA0..=0xFEFF => {}
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize] = val,
            _ => self.write_io(addr, val),
        }
    }

    pub fn write_byte(&mut self, addr: u16, val: u8) {
        self.write(addr, val, Access::Cpu);
    }

    fn write_io(&mut self, addr: u16, val: u8) {
        if registers::is_cgb_only(addr) && !self.model.is_cgb() {
            return;
        }
        match addr {
            registers::P1 => self.input.write(val),
            registers::SB | registers::SC => self.serial.write(addr, val),
            registers::DIV..=registers::TAC => self.timer.write(addr, val),
            registers::IF => self.irq.write(val),
            0xFF10..=0xFF2F => {
                let mask = registers::mask_for(addr).unwrap_or(RegMask::FULL);
                let merged = mask.apply_write(self.sound.read(addr), val);
                self.sound.write(addr, merged);
            }
            0xFF30..=0xFF3F => self.sound.write(addr, val),
            registers::LCDC => {
                let was_on = self.ppu.lcd_enabled();
                self.ppu.write_reg(addr, val);
                if was_on && !self.ppu.lcd_enabled() {
                    self.complete_hblank_dma();
                }
            }
            registers::DMA => self.oam_dma.start(val),
            registers::STAT..=registers::WX
            | registers::VBK
            | registers::BCPS..=registers::OCPD => self.ppu.write_reg(addr, val),
            registers::BOOT => {
                if self.boot_mapped {
                    log::debug!("boot ROM unmapped");
                }
                self.boot_mapped = false;
            }
            registers::HDMA1..=registers::HDMA4 if self.hdma.hblank_active() => {}
            registers::HDMA1 => self.hdma.write_source_hi(val),
            registers::HDMA2 => self.hdma.write_source_lo(val),
            registers::HDMA3 => self.hdma.write_dest_hi(val),
            registers::HDMA4 => self.hdma.write_dest_lo(val),
            registers::HDMA5 => self.write_hdma_control(val),
            registers::SVBK => self.svbk = val & 0x07,
            registers::IE => self.ie = val,
            _ => {}
        }
    }

    fn write_hdma_control(&mut self, val: u8) {
        match self.hdma.write_control(val) {
            HdmaRequest::General { blocks } => {
                for _ in 0..blocks {
                    let block = self.hdma.next_block();
                    self.copy_hdma_block(block);
                }
            }
            HdmaRequest::HBlank => {
                if !self.ppu.lcd_enabled() {
                    let block = self.hdma.next_block();
                    self.copy_hdma_block(block);
                } else if self.ppu.in_hblank() {
                    self.service_hblank_dma();
                }
            }
            HdmaRequest::Cancelled => {}
        }
    }

    fn service_hblank_dma(&mut self) {
        let frame = self.ppu.frames();
        let line = self.ppu.ly();
        if let Some(block) = self.hdma.next_hblank_block(frame, line) {
            self.copy_hdma_block(block);
        }
    }

    /// Finish a pending HBlank transfer in one go, as happens when the LCD
    /// is switched off.
    fn complete_hblank_dma(&mut self) {
        while self.hdma.hblank_active() {
            let block = self.hdma.next_block();
            self.copy_hdma_block(block);
        }
    }

    fn copy_hdma_block(&mut self, block: HdmaBlock) {
        let bank = self.ppu.vram_bank;
        for i in 0..HdmaBlock::LEN {
            let byte = self.read(block.src.wrapping_add(i), Access::Bypass);
            let dst = (block.dst.wrapping_add(i) & 0x1FFF) as usize;
            self.ppu.vram[bank][dst] = byte;
        }
    }

    /// Advance every subsystem by one dot.
    pub fn tick(&mut self) -> PpuEvent {
        self.dots += 1;
        self.timer.tick(&mut self.irq);
        self.serial.tick(&mut self.irq);

        if let Some((src, index)) = self.oam_dma.tick() {
            let byte = self.read(src, Access::Bypass);
            self.ppu.oam[index] = byte;
        }

        let event = self.ppu.tick(&mut self.irq);
        if event == PpuEvent::HBlankStarted && self.model.is_cgb() {
            self.service_hblank_dma();
        }
        event
    }
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new(Model::Dmg)
    }
}
