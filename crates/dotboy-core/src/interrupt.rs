/// Pending interrupt requests (the IF register).
///
/// Producers only ever set bits; the CPU clears them through the IF write
/// path once serviced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InterruptFlags(u8);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Interrupt {
    VBlank = 0x01,
    LcdStat = 0x02,
    Timer = 0x04,
    Serial = 0x08,
    Joypad = 0x10,
}

impl Interrupt {
    pub const ALL: [Interrupt; 5] = [
        Interrupt::VBlank,
        Interrupt::LcdStat,
        Interrupt::Timer,
        Interrupt::Serial,
        Interrupt::Joypad,
    ];

    #[inline]
    pub const fn mask(self) -> u8 {
        self as u8
    }

    /// Address of the handler the CPU jumps to.
    pub const fn vector(self) -> u16 {
        match self {
            Interrupt::VBlank => 0x40,
            Interrupt::LcdStat => 0x48,
            Interrupt::Timer => 0x50,
            Interrupt::Serial => 0x58,
            Interrupt::Joypad => 0x60,
        }
    }
}

impl InterruptFlags {
    const MASK: u8 = 0x1F;

    pub const fn new() -> Self {
        Self(0)
    }

    #[inline]
    pub fn request(&mut self, irq: Interrupt) {
        self.0 |= irq.mask();
    }

    #[inline]
    pub fn is_requested(&self, irq: Interrupt) -> bool {
        self.0 & irq.mask() != 0
    }

    pub fn acknowledge(&mut self, irq: Interrupt) {
        self.0 &= !irq.mask();
    }

    /// Value seen on FF0F; the upper three bits are unwired and read high.
    pub fn read(&self) -> u8 {
        self.0 | 0xE0
    }

    pub fn write(&mut self, val: u8) {
        self.0 = val & Self::MASK;
    }

    /// Highest-priority interrupt both requested and enabled by `ie`.
    pub fn highest_pending(&self, ie: u8) -> Option<Interrupt> {
        let pending = self.0 & ie & Self::MASK;
        Interrupt::ALL
            .into_iter()
            .find(|irq| pending & irq.mask() != 0)
    }
}
