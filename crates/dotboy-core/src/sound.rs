//! Sound register file.
//!
//! Synthesis lives outside the core; this keeps NR10-NR52 and wave RAM so
//! software sees the registers behave, including NR52 power-off clearing.

const NR52: u16 = 0xFF26;
const WAVE_RAM_START: u16 = 0xFF30;

pub struct Sound {
    regs: [u8; 0x20],
    wave_ram: [u8; 0x10],
}

impl Sound {
    pub fn new() -> Self {
        Self {
            regs: [0; 0x20],
            wave_ram: [0; 0x10],
        }
    }

    /// Power-on register contents left behind by the boot ROM.
    pub fn apply_boot_state(&mut self) {
        const POWER_ON_REGS: [u8; 0x17] = [
            0x80, 0xBF, 0xF3, 0xFF, 0xBF, 0xFF, 0x3F, 0x00, 0xFF, 0xBF, 0x7F, 0xFF, 0x9F, 0xFF,
            0xBF, 0xFF, 0xFF, 0x00, 0x00, 0xBF, 0x77, 0xF3, 0xF1,
        ];
        self.regs[..POWER_ON_REGS.len()].copy_from_slice(&POWER_ON_REGS);
    }

    fn powered(&self) -> bool {
        self.regs[(NR52 - 0xFF10) as usize] & 0x80 != 0
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF10..=0xFF2F => self.regs[(addr - 0xFF10) as usize],
            0xFF30..=0xFF3F => self.wave_ram[(addr - WAVE_RAM_START) as usize],
            _ => 0xFF,
        }
    }

    /// `val` arrives already masked by the bus.
    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            NR52 => {
                let was_on = self.powered();
                self.regs[(NR52 - 0xFF10) as usize] = val & 0x80;
                if was_on && val & 0x80 == 0 {
                    log::debug!("sound powered off");
                    self.regs.fill(0);
                }
            }
            // Registers are read-only while the unit is off.
            0xFF10..=0xFF2F if self.powered() => self.regs[(addr - 0xFF10) as usize] = val,
            0xFF10..=0xFF2F => {}
            0xFF30..=0xFF3F => self.wave_ram[(addr - WAVE_RAM_START) as usize] = val,
            _ => {}
        }
    }
}

impl Default for Sound {
    fn default() -> Self {
        Self::new()
    }
}
