use crate::interrupt::{Interrupt, InterruptFlags};

/// Dots per shifted bit with the internal 8192 Hz clock.
const DOTS_PER_BIT: u16 = 512;

pub trait LinkPort: Send {
    /// Transfer a byte over the link. Returns the byte received from the
    /// partner. Implementations may perform the transfer immediately.
    fn transfer(&mut self, byte: u8) -> u8;
}

/// A stub link port used when no cable is attached.
/// By default incoming bits are all 1, so any transfer receives 0xFF. When
/// `loopback` is true the sent byte is echoed back instead.
#[derive(Default)]
pub struct NullLinkPort {
    loopback: bool,
}

impl NullLinkPort {
    pub fn new(loopback: bool) -> Self {
        Self { loopback }
    }
}

impl LinkPort for NullLinkPort {
    fn transfer(&mut self, byte: u8) -> u8 {
        if self.loopback { byte } else { 0xFF }
    }
}

/// Serial registers SB/SC. Raises the serial interrupt when an internally
/// clocked transfer finishes.
pub struct Serial {
    sb: u8,
    sc: u8,
    pub(crate) out_buf: Vec<u8>,
    port: Box<dyn LinkPort>,
    transfer: Option<TransferState>,
}

struct TransferState {
    remaining_bits: u8,
    incoming: u8,
    dots: u16,
}

impl Serial {
    pub fn new() -> Self {
        Self {
            sb: 0,
            sc: 0,
            out_buf: Vec::new(),
            port: Box::new(NullLinkPort::default()),
            transfer: None,
        }
    }

    pub fn connect(&mut self, port: Box<dyn LinkPort>) {
        self.port = port;
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF01 => self.sb,
            0xFF02 => self.sc,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF01 => self.sb = val,
            0xFF02 => {
                self.sc = val;
                self.transfer = None;
                if val & 0x81 == 0x81 {
                    self.out_buf.push(self.sb);
                    let incoming = self.port.transfer(self.sb);
                    self.transfer = Some(TransferState {
                        remaining_bits: 8,
                        incoming,
                        dots: 0,
                    });
                }
            }
            _ => {}
        }
    }

    /// Advance by one dot.
    pub fn tick(&mut self, irq: &mut InterruptFlags) {
        let Some(state) = self.transfer.as_mut() else {
            return;
        };
        state.dots += 1;
        if state.dots < DOTS_PER_BIT {
            return;
        }
        state.dots = 0;
        let bit = (state.incoming & 0x80) != 0;
        state.incoming <<= 1;
        self.sb = (self.sb << 1) | bit as u8;
        state.remaining_bits -= 1;
        if state.remaining_bits == 0 {
            self.transfer = None;
            self.sc &= 0x7F;
            irq.request(Interrupt::Serial);
        }
    }

    /// Bytes sent since the last call, oldest first.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.out_buf)
    }
}

impl Default for Serial {
    fn default() -> Self {
        Self::new()
    }
}
