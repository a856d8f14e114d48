use crate::interrupt::{Interrupt, InterruptFlags};

const SELECT_DPAD: u8 = 0x10;
const SELECT_BUTTONS: u8 = 0x20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Button {
    Right,
    Left,
    Up,
    Down,
    A,
    B,
    Select,
    Start,
}

impl Button {
    /// Bit in the combined pressed mask: d-pad in the low nibble, action
    /// buttons in the high nibble.
    const fn bit(self) -> u8 {
        match self {
            Button::Right => 0x01,
            Button::Left => 0x02,
            Button::Up => 0x04,
            Button::Down => 0x08,
            Button::A => 0x10,
            Button::B => 0x20,
            Button::Select => 0x40,
            Button::Start => 0x80,
        }
    }
}

/// Joypad matrix behind P1 (FF00).
#[derive(Debug)]
pub struct Input {
    /// P1 bits 4-5 as last written (0 = group selected).
    select: u8,
    pressed: u8,
}

impl Input {
    pub fn new() -> Self {
        Self {
            select: 0x30,
            pressed: 0,
        }
    }

    /// Low nibble of the selected rows, active low.
    fn lines(&self) -> u8 {
        let mut low = 0;
        if self.select & SELECT_DPAD == 0 {
            low |= self.pressed & 0x0F;
        }
        if self.select & SELECT_BUTTONS == 0 {
            low |= self.pressed >> 4;
        }
        !low & 0x0F
    }

    pub fn read(&self) -> u8 {
        self.select | self.lines()
    }

    pub fn write(&mut self, val: u8) {
        self.select = val & 0x30;
    }

    /// Update one button. A line going low raises the joypad interrupt.
    pub fn set_button(&mut self, button: Button, down: bool, irq: &mut InterruptFlags) {
        let before = self.lines();
        if down {
            self.pressed |= button.bit();
        } else {
            self.pressed &= !button.bit();
        }
        if before & !self.lines() != 0 {
            irq.request(Interrupt::Joypad);
        }
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::new()
    }
}
