use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{Error, Result};

const ROM_BANK_SIZE: usize = 0x4000;
const RAM_BANK_SIZE: usize = 0x2000;
const HEADER_END: usize = 0x0150;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbcType {
    NoMbc,
    Mbc1,
    Mbc2,
    Mbc3,
    Mbc5,
    /// Cartridge type byte the core has no mapper for.
    Unsupported(u8),
}

/// Header problems reported to the front-end. None of these stop a
/// cartridge from loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartridgeIssue {
    /// The image is shorter than the 0x150-byte header.
    Truncated,
    HeaderChecksumMismatch { expected: u8, computed: u8 },
    UnsupportedMbc(u8),
    /// Header ROM size disagrees with the image length.
    RomSizeMismatch { declared: usize, actual: usize },
    UnknownRamSize(u8),
}

/// Read-only view over the cartridge header at 0x0100-0x014F.
pub struct Header<'a> {
    data: &'a [u8],
}

impl<'a> Header<'a> {
    pub fn parse(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn byte(&self, addr: usize) -> u8 {
        self.data.get(addr).copied().unwrap_or(0)
    }

    pub fn is_complete(&self) -> bool {
        self.data.len() >= HEADER_END
    }

    pub fn title(&self) -> String {
        let end = 0x0143.min(self.data.len());
        let mut slice = &self.data[0x0134.min(end)..end];
        if let Some(pos) = slice.iter().position(|&b| b == 0) {
            slice = &slice[..pos];
        }
        String::from_utf8_lossy(slice).trim().to_string()
    }

    pub fn cgb_supported(&self) -> bool {
        self.byte(0x0143) & 0x80 != 0
    }

    pub fn cart_type(&self) -> u8 {
        if self.is_complete() {
            self.byte(0x0147)
        } else {
            0x00
        }
    }

    pub fn mbc_type(&self) -> MbcType {
        match self.cart_type() {
            0x00 | 0x08 | 0x09 => MbcType::NoMbc,
            0x01..=0x03 => MbcType::Mbc1,
            0x05 | 0x06 => MbcType::Mbc2,
            0x0F..=0x13 => MbcType::Mbc3,
            0x19..=0x1E => MbcType::Mbc5,
            other => MbcType::Unsupported(other),
        }
    }

    pub fn has_battery(&self) -> bool {
        matches!(
            self.cart_type(),
            0x03 | 0x06 | 0x09 | 0x0F | 0x10 | 0x13 | 0x1B | 0x1E
        )
    }

    /// Declared ROM size in bytes, if the code is a known one.
    pub fn rom_size(&self) -> Option<usize> {
        match self.byte(0x0148) {
            code @ 0x00..=0x08 => Some(0x8000 << code),
            _ => None,
        }
    }

    /// Declared external RAM size, or `None` for an unknown code.
    pub fn ram_size(&self) -> Option<usize> {
        // MBC2 has 512x4-bit internal RAM regardless of header RAM size.
        if matches!(self.cart_type(), 0x05 | 0x06) {
            return Some(0x200);
        }
        match self.byte(0x0149) {
            0x00 => Some(0),
            0x01 => Some(0x800),
            0x02 => Some(0x2000),
            0x03 => Some(0x8000),
            0x04 => Some(0x20000),
            0x05 => Some(0x10000),
            _ => None,
        }
    }

    /// Checksum over 0x0134-0x014C as computed by the boot ROM.
    pub fn computed_checksum(&self) -> u8 {
        self.data
            .get(0x0134..=0x014C)
            .unwrap_or(&[])
            .iter()
            .fold(0u8, |acc, &b| acc.wrapping_sub(b).wrapping_sub(1))
    }

    pub fn issues(&self) -> Vec<CartridgeIssue> {
        if !self.is_complete() {
            return vec![CartridgeIssue::Truncated];
        }
        let mut issues = Vec::new();
        let expected = self.byte(0x014D);
        let computed = self.computed_checksum();
        if expected != computed {
            issues.push(CartridgeIssue::HeaderChecksumMismatch { expected, computed });
        }
        if let MbcType::Unsupported(code) = self.mbc_type() {
            issues.push(CartridgeIssue::UnsupportedMbc(code));
        }
        match self.rom_size() {
            Some(declared) if declared != self.data.len() => {
                issues.push(CartridgeIssue::RomSizeMismatch {
                    declared,
                    actual: self.data.len(),
                });
            }
            _ => {}
        }
        if self.ram_size().is_none() {
            issues.push(CartridgeIssue::UnknownRamSize(self.byte(0x0149)));
        }
        issues
    }
}

#[derive(Debug)]
enum MbcState {
    NoMbc,
    Mbc1 {
        rom_bank: u8,
        ram_bank: u8,
        mode: u8,
        ram_enable: bool,
    },
    Mbc2 {
        rom_bank: u8,
        ram_enable: bool,
    },
    Mbc3 {
        rom_bank: u8,
        ram_bank: u8,
        ram_enable: bool,
    },
    Mbc5 {
        rom_bank: u16,
        ram_bank: u8,
        ram_enable: bool,
    },
}

#[derive(Debug)]
pub struct Cartridge {
    pub rom: Vec<u8>,
    pub ram: Vec<u8>,
    pub mbc: MbcType,
    pub cgb: bool,
    pub title: String,
    battery: bool,
    issues: Vec<CartridgeIssue>,
    save_path: Option<PathBuf>,
    state: MbcState,
}

impl Cartridge {
    pub fn load(data: Vec<u8>) -> Self {
        let header = Header::parse(&data);
        let mbc = header.mbc_type();
        let ram_size = header.ram_size().unwrap_or(RAM_BANK_SIZE);
        let issues = header.issues();
        let cgb = header.cgb_supported();
        let title = header.title();
        let battery = header.has_battery();

        for issue in &issues {
            log::warn!("cartridge {title:?}: {issue:?}");
        }

        let state = match mbc {
            MbcType::NoMbc | MbcType::Unsupported(_) => MbcState::NoMbc,
            MbcType::Mbc1 => MbcState::Mbc1 {
                rom_bank: 1,
                ram_bank: 0,
                mode: 0,
                ram_enable: false,
            },
            MbcType::Mbc2 => MbcState::Mbc2 {
                rom_bank: 1,
                ram_enable: false,
            },
            MbcType::Mbc3 => MbcState::Mbc3 {
                rom_bank: 1,
                ram_bank: 0,
                ram_enable: false,
            },
            MbcType::Mbc5 => MbcState::Mbc5 {
                rom_bank: 1,
                ram_bank: 0,
                ram_enable: false,
            },
        };

        Self {
            rom: data,
            ram: vec![0; ram_size],
            mbc,
            cgb,
            title,
            battery,
            issues,
            save_path: None,
            state,
        }
    }

    pub fn from_bytes_with_ram(data: Vec<u8>, ram_size: usize) -> Self {
        let mut c = Self::load(data);
        c.ram = vec![0; ram_size];
        c
    }

    /// Load a ROM image, picking up `<rom>.sav` next to it for battery-backed
    /// cartridges.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| Error::io(path, e))?;
        let mut cart = Self::load(data);

        if cart.battery {
            let save = path.with_extension("sav");
            match fs::read(&save) {
                Ok(bytes) => cart.restore_ram(&bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::io(&save, e)),
            }
            cart.save_path = Some(save);
        }

        log::info!(
            "Loaded ROM: {} (MBC: {:?}, CGB: {})",
            cart.title,
            cart.mbc,
            if cart.cgb { "yes" } else { "no" }
        );
        Ok(cart)
    }

    /// Copy a raw RAM dump in, truncating or zero-padding to the header size.
    pub fn restore_ram(&mut self, bytes: &[u8]) {
        if bytes.len() != self.ram.len() {
            log::warn!(
                "save size {} differs from cartridge RAM size {}",
                bytes.len(),
                self.ram.len()
            );
        }
        for (d, s) in self.ram.iter_mut().zip(bytes.iter()) {
            *d = *s;
        }
    }

    pub fn has_battery(&self) -> bool {
        self.battery
    }

    pub fn issues(&self) -> &[CartridgeIssue] {
        &self.issues
    }

    pub fn save_path(&self) -> Option<&Path> {
        self.save_path.as_deref()
    }

    /// Write battery RAM verbatim to `<rom>.sav`. A no-op for cartridges
    /// without a battery or without RAM.
    pub fn save_ram(&self) -> Result<()> {
        let path = match &self.save_path {
            Some(path) if self.battery && !self.ram.is_empty() => path,
            _ => return Ok(()),
        };
        fs::write(path, &self.ram).map_err(|e| Error::io(path, e))?;
        log::debug!(
            "saved {} bytes of cartridge RAM to {}",
            self.ram.len(),
            path.display()
        );
        Ok(())
    }

    fn rom_bank_count(&self) -> usize {
        (self.rom.len() / ROM_BANK_SIZE).max(1)
    }

    fn ram_bank_count(&self) -> usize {
        self.ram.len().div_ceil(RAM_BANK_SIZE).max(1)
    }

    /// ROM bank visible at 0x0000 and at 0x4000.
    fn rom_banks(&self) -> (usize, usize) {
        let (low, high) = match self.state {
            MbcState::NoMbc => (0, 1),
            MbcState::Mbc1 {
                rom_bank,
                ram_bank,
                mode,
                ..
            } => {
                let upper = ((ram_bank & 0x03) as usize) << 5;
                let low = if mode == 0 { 0 } else { upper };
                (low, upper | rom_bank.max(1) as usize)
            }
            MbcState::Mbc2 { rom_bank, .. } => (0, (rom_bank & 0x0F).max(1) as usize),
            MbcState::Mbc3 { rom_bank, .. } => (0, rom_bank.max(1) as usize),
            MbcState::Mbc5 { rom_bank, .. } => (0, rom_bank as usize),
        };
        let count = self.rom_bank_count();
        (low % count, high % count)
    }

    /// Offset into `ram` for an A000-BFFF access, or `None` when RAM is
    /// disabled or absent.
    fn ram_offset(&self, addr: u16) -> Option<usize> {
        let local = addr as usize - 0xA000;
        let (enabled, bank) = match self.state {
            MbcState::NoMbc => (true, 0),
            MbcState::Mbc1 {
                ram_bank,
                mode,
                ram_enable,
                ..
            } => (ram_enable, if mode == 0 { 0 } else { ram_bank as usize }),
            MbcState::Mbc2 { ram_enable, .. } => {
                return ram_enable.then_some(local & 0x01FF);
            }
            MbcState::Mbc3 {
                ram_bank,
                ram_enable,
                ..
            } => (ram_enable && ram_bank <= 0x03, ram_bank as usize),
            MbcState::Mbc5 {
                ram_bank,
                ram_enable,
                ..
            } => (ram_enable, ram_bank as usize),
        };
        if !enabled || self.ram.is_empty() {
            return None;
        }
        let offset = (bank % self.ram_bank_count()) * RAM_BANK_SIZE + local;
        Some(offset % self.ram.len())
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x3FFF => {
                let (bank, _) = self.rom_banks();
                let offset = bank * ROM_BANK_SIZE + addr as usize;
                self.rom.get(offset).copied().unwrap_or(0xFF)
            }
            0x4000..=0x7FFF => {
                let (_, bank) = self.rom_banks();
                let offset = bank * ROM_BANK_SIZE + (addr as usize - 0x4000);
                self.rom.get(offset).copied().unwrap_or(0xFF)
            }
            0xA000..=0xBFFF => match self.ram_offset(addr) {
                Some(i) if self.mbc == MbcType::Mbc2 => 0xF0 | (self.ram[i] & 0x0F),
                Some(i) => self.ram[i],
                None => 0xFF,
            },
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        if let 0xA000..=0xBFFF = addr {
            if let Some(i) = self.ram_offset(addr) {
                self.ram[i] = if self.mbc == MbcType::Mbc2 {
                    val & 0x0F
                } else {
                    val
                };
            }
            return;
        }

        match (&mut self.state, addr) {
            (MbcState::NoMbc, _) => {}
            (MbcState::Mbc1 { ram_enable, .. }, 0x0000..=0x1FFF)
            | (MbcState::Mbc3 { ram_enable, .. }, 0x0000..=0x1FFF)
            | (MbcState::Mbc5 { ram_enable, .. }, 0x0000..=0x1FFF) => {
                *ram_enable = val & 0x0F == 0x0A;
            }
            (
                MbcState::Mbc2 {
                    rom_bank,
                    ram_enable,
                },
                0x0000..=0x3FFF,
            ) => {
                // Address bit 8 selects between RAM enable and ROM bank.
                if addr & 0x0100 == 0 {
                    *ram_enable = val & 0x0F == 0x0A;
                } else {
                    *rom_bank = (val & 0x0F).max(1);
                }
            }
            (MbcState::Mbc1 { rom_bank, .. }, 0x2000..=0x3FFF) => {
                *rom_bank = (val & 0x1F).max(1);
            }
            (MbcState::Mbc1 { ram_bank, .. }, 0x4000..=0x5FFF) => *ram_bank = val & 0x03,
            (MbcState::Mbc1 { mode, .. }, 0x6000..=0x7FFF) => *mode = val & 0x01,
            (MbcState::Mbc3 { rom_bank, .. }, 0x2000..=0x3FFF) => {
                *rom_bank = (val & 0x7F).max(1);
            }
            (MbcState::Mbc3 { ram_bank, .. }, 0x4000..=0x5FFF) => *ram_bank = val,
            (MbcState::Mbc5 { rom_bank, .. }, 0x2000..=0x2FFF) => {
                *rom_bank = (*rom_bank & 0x100) | val as u16;
            }
            (MbcState::Mbc5 { rom_bank, .. }, 0x3000..=0x3FFF) => {
                *rom_bank = (*rom_bank & 0xFF) | (((val & 0x01) as u16) << 8);
            }
            (MbcState::Mbc5 { ram_bank, .. }, 0x4000..=0x5FFF) => *ram_bank = val & 0x0F,
            _ => {}
        }
    }
}
