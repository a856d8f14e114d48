#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
/// Console family being emulated.
///
/// Selects which registers exist (VBK, SVBK, HDMA, color palettes) and how
/// pixels are resolved to RGB.
pub enum Model {
    #[default]
    Dmg,
    Cgb,
}

impl Model {
    #[inline]
    pub const fn is_cgb(self) -> bool {
        matches!(self, Model::Cgb)
    }

    /// Number of switchable 4 KiB work RAM banks addressable at D000.
    pub const fn wram_banks(self) -> usize {
        match self {
            Model::Dmg => 1,
            Model::Cgb => 7,
        }
    }

    /// Size of the boot ROM image this model maps at 0000.
    pub const fn boot_rom_len(self) -> usize {
        match self {
            Model::Dmg => 0x100,
            Model::Cgb => 0x900,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
/// How a DMG cartridge is presented when running on CGB hardware.
pub enum ColorMode {
    /// Monochrome hardware; shades from the configured DMG palette.
    #[default]
    Dmg,
    /// Full color: CGB cartridge on CGB hardware.
    Cgb,
    /// DMG cartridge on CGB hardware: DMG palette registers index into
    /// CGB palette RAM.
    Compat,
}

impl ColorMode {
    pub const fn resolve(model: Model, cart_supports_cgb: bool) -> Self {
        match (model, cart_supports_cgb) {
            (Model::Dmg, _) => ColorMode::Dmg,
            (Model::Cgb, true) => ColorMode::Cgb,
            (Model::Cgb, false) => ColorMode::Compat,
        }
    }
}
