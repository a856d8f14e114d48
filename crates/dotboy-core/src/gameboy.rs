use crate::{
    cartridge::Cartridge,
    config::EmulatorConfig,
    cpu::{Cpu, IdleCpu},
    error::Result,
    hardware::Model,
    input::Button,
    mmu::Mmu,
    palette::DMG_PALETTE,
    ppu::{FRAME_DOTS, SCREEN_HEIGHT, SCREEN_WIDTH},
};

pub struct GameBoy {
    pub cpu: Box<dyn Cpu>,
    pub mmu: Mmu,
    pub model: Model,
    /// Write battery RAM back to disk when a runner stops this machine.
    pub autosave: bool,
    dmg_colors: [u32; 4],
}

impl GameBoy {
    /// A post-boot machine driven by an [`IdleCpu`].
    pub fn new(model: Model) -> Self {
        Self::with_cpu(model, Box::new(IdleCpu::new()))
    }

    pub fn with_cpu(model: Model, cpu: Box<dyn Cpu>) -> Self {
        Self {
            cpu,
            mmu: Mmu::new(model),
            model,
            autosave: false,
            dmg_colors: DMG_PALETTE,
        }
    }

    /// Build a machine for `cart` as `config` describes: model selection,
    /// DMG shades, boot ROM.
    pub fn from_config(
        config: &EmulatorConfig,
        cart: Option<Cartridge>,
        cpu: Box<dyn Cpu>,
    ) -> Result<Self> {
        let cgb_cart = cart.as_ref().is_some_and(|c| c.cgb);
        let model = config.model.resolve(cgb_cart);
        let mut gb = Self {
            cpu,
            mmu: Mmu::new(model),
            model,
            autosave: config.autosave,
            dmg_colors: config.dmg_palette,
        };
        if let Some(path) = config.bootrom_path(model) {
            gb.mmu = Mmu::new_power_on(model);
            gb.mmu.load_boot_rom_file(path)?;
            log::info!("boot ROM {} mapped", path.display());
        }
        gb.mmu.ppu.set_dmg_colors(gb.dmg_colors);
        if let Some(cart) = cart {
            gb.mmu.load_cart(cart);
        }
        Ok(gb)
    }

    pub fn load_cart(&mut self, cart: Cartridge) {
        self.mmu.load_cart(cart);
    }

    /// One CPU step, or one stalled dot while a VRAM DMA owns the bus.
    pub fn step(&mut self) {
        if self.mmu.hdma.stall_dots() > 0 {
            self.mmu.tick();
            self.mmu.hdma.consume_stall(1);
        } else {
            self.cpu.step(&mut self.mmu);
        }
    }

    /// Run until the PPU finishes a frame. With the LCD off no frame is ever
    /// produced, so give up after one frame's worth of dots. Returns whether
    /// a frame completed.
    pub fn run_frame(&mut self) -> bool {
        self.mmu.ppu.clear_frame_flag();
        let start = self.mmu.dots();
        while !self.mmu.ppu.frame_ready() {
            if self.mmu.dots() - start >= FRAME_DOTS as u64 {
                return false;
            }
            self.step();
        }
        true
    }

    pub fn framebuffer(&self) -> &[u32; SCREEN_WIDTH * SCREEN_HEIGHT] {
        self.mmu.ppu.framebuffer()
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.mmu.set_button(button, pressed);
    }

    pub fn save_ram(&self) -> Result<()> {
        self.mmu.save_cart_ram()
    }

    /// Reset the Game Boy to its initial power-on state while
    /// preserving the loaded cartridge and boot ROM.
    pub fn reset(&mut self) {
        let cart = self.mmu.cart.take();
        let boot = self.mmu.boot_rom.take();
        self.cpu.reset();
        self.mmu = match boot {
            Some(data) => {
                let mut mmu = Mmu::new_power_on(self.model);
                mmu.boot_rom = Some(data);
                mmu.boot_mapped = true;
                mmu
            }
            None => Mmu::new(self.model),
        };
        self.mmu.ppu.set_dmg_colors(self.dmg_colors);
        if let Some(c) = cart {
            self.mmu.load_cart(c);
        }
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new(Model::Dmg)
    }
}
