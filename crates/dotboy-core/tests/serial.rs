//! Serial port behavior as seen through the bus.

mod common;

use std::collections::VecDeque;

use common::*;
use dotboy_core::{
    hardware::Model,
    interrupt::{Interrupt, InterruptFlags},
    serial::{LinkPort, NullLinkPort, Serial},
};

/// Records bytes sent and answers from a script.
struct ScriptedPort {
    responses: VecDeque<u8>,
}

impl LinkPort for ScriptedPort {
    fn transfer(&mut self, _byte: u8) -> u8 {
        self.responses.pop_front().unwrap_or(0xFF)
    }
}

#[test]
fn null_link_port_returns_ff_unless_looped_back() {
    assert_eq!(NullLinkPort::new(false).transfer(0x42), 0xFF);
    assert_eq!(NullLinkPort::new(true).transfer(0x42), 0x42);
}

#[test]
fn internal_clock_transfer_takes_4096_dots() {
    let mut mmu = lcd_off(Model::Dmg);
    mmu.irq.write(0);
    mmu.write_byte(0xFF01, 0x5A);
    mmu.write_byte(0xFF02, 0x81);

    tick_n(&mut mmu, 8 * 512 - 1);
    assert!(!mmu.irq.is_requested(Interrupt::Serial));
    assert_eq!(mmu.read_byte(0xFF02), 0xFF);

    mmu.tick();
    assert!(mmu.irq.is_requested(Interrupt::Serial));
    assert_eq!(mmu.read_byte(0xFF02), 0x7F);
    // Nothing attached: all ones shifted in.
    assert_eq!(mmu.read_byte(0xFF01), 0xFF);
    assert_eq!(mmu.take_serial(), vec![0x5A]);
    assert!(mmu.take_serial().is_empty());
}

#[test]
fn external_clock_waits_for_a_partner() {
    let mut mmu = lcd_off(Model::Dmg);
    mmu.irq.write(0);
    mmu.write_byte(0xFF01, 0x11);
    mmu.write_byte(0xFF02, 0x80);
    tick_n(&mut mmu, 10_000);
    assert!(!mmu.irq.is_requested(Interrupt::Serial));
    assert_eq!(mmu.read_byte(0xFF02), 0xFE);
    assert_eq!(mmu.read_byte(0xFF01), 0x11);
}

#[test]
fn connected_port_supplies_incoming_byte() {
    let mut serial = Serial::new();
    serial.connect(Box::new(ScriptedPort {
        responses: VecDeque::from([0xC3]),
    }));
    let mut irq = InterruptFlags::new();
    serial.write(0xFF01, 0x01);
    serial.write(0xFF02, 0x81);
    for _ in 0..8 * 512 {
        serial.tick(&mut irq);
    }
    assert_eq!(serial.read(0xFF01), 0xC3);
    assert!(irq.is_requested(Interrupt::Serial));
    assert_eq!(serial.take_output(), vec![0x01]);
}
