use crate::interrupt::{Interrupt, InterruptFlags};

/// Dots between a TIMA overflow and the TMA reload.
const RELOAD_DELAY: u8 = 4;

pub struct Timer {
    /// 16-bit internal divider counter. DIV register is the upper 8 bits.
    pub div: u16,
    /// Timer counter
    pub tima: u8,
    /// Timer modulo
    pub tma: u8,
    /// Timer control
    pub tac: u8,
    last_signal: bool,
    /// Dots left until TIMA is reloaded after an overflow
    pending_reload: Option<u8>,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            div: 0,
            tima: 0,
            tma: 0,
            tac: 0,
            last_signal: false,
            pending_reload: None,
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF04 => (self.div >> 8) as u8,
            0xFF05 => self.tima,
            0xFF06 => self.tma,
            0xFF07 => self.tac,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF04 => {
                self.div = 0;
                self.sync_signal();
            }
            0xFF05 => {
                // writing during the reload window cancels it
                self.tima = val;
                self.pending_reload = None;
            }
            0xFF06 => self.tma = val,
            0xFF07 => {
                self.tac = val & 0x07;
                self.sync_signal();
            }
            _ => {}
        }
    }

    /// Advance by one dot.
    pub fn tick(&mut self, irq: &mut InterruptFlags) {
        if let Some(delay) = self.pending_reload {
            if delay <= 1 {
                self.tima = self.tma;
                irq.request(Interrupt::Timer);
                self.pending_reload = None;
            } else {
                self.pending_reload = Some(delay - 1);
            }
        }
        self.div = self.div.wrapping_add(1);
        self.sync_signal();
    }

    /// TIMA counts on a falling edge of the selected divider bit ANDed with
    /// the enable bit, which is why DIV resets and TAC writes can tick it.
    fn sync_signal(&mut self) {
        let new = Self::signal_with(self.div, self.tac);
        if self.last_signal && !new {
            self.increment();
        }
        self.last_signal = new;
    }

    fn increment(&mut self) {
        if self.tima == 0xFF {
            self.tima = 0;
            self.pending_reload = Some(RELOAD_DELAY);
        } else {
            self.tima = self.tima.wrapping_add(1);
        }
    }

    fn signal_with(div: u16, tac: u8) -> bool {
        if tac & 0x04 == 0 {
            return false;
        }
        let bit = match tac & 0x03 {
            0x00 => 9,
            0x01 => 3,
            0x02 => 5,
            _ => 7,
        };
        (div >> bit) & 1 != 0
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
