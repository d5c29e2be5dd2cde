// This file is part of oxide64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;
use log::LogLevel;

use crate::util::{IoPort, IrqControl, IrqLine, Pin, Shared};

// SPEC: MOS 6522 VERSATILE INTERFACE ADAPTER (VIA) Datasheet

pub mod reg {
    pub const ORB: u8 = 0x0;
    pub const ORA: u8 = 0x1;
    pub const DDRB: u8 = 0x2;
    pub const DDRA: u8 = 0x3;
    pub const T1C_L: u8 = 0x4;
    pub const T1C_H: u8 = 0x5;
    pub const T1L_L: u8 = 0x6;
    pub const T1L_H: u8 = 0x7;
    pub const T2C_L: u8 = 0x8;
    pub const T2C_H: u8 = 0x9;
    pub const SR: u8 = 0xa;
    pub const ACR: u8 = 0xb;
    pub const PCR: u8 = 0xc;
    pub const IFR: u8 = 0xd;
    pub const IER: u8 = 0xe;
    pub const ORA_NH: u8 = 0xf;
}

mod irq {
    pub const CA2: usize = 0;
    pub const CA1: usize = 1;
    pub const SR: usize = 2;
    pub const CB2: usize = 3;
    pub const CB1: usize = 4;
    pub const T2: usize = 5;
    pub const T1: usize = 6;
}

/// MOS 6522 VIA, the disk controller/bus-interface chip used by the 1541.
///
/// Port A/B data direction and output registers are modeled with `IoPort`,
/// the same abstraction used by the CIA port registers; callers drive the
/// input side of each port directly (`port.borrow_mut().set_input(..)`)
/// from whatever the port is wired to on the drive board.
pub struct Via {
    name: &'static str,
    // I/O
    port_a: Shared<IoPort>,
    port_b: Shared<IoPort>,
    ca1_pin: Shared<Pin>,
    ca2_pin: Shared<Pin>,
    cb1_pin: Shared<Pin>,
    cb2_pin: Shared<Pin>,
    irq_line: Shared<IrqLine>,
    // Two VIAs share the drive's single IRQ input, so each is assigned a
    // distinct bit position on the shared line.
    irq_source: usize,
    // Registers
    acr: u8,
    pcr: u8,
    sr: u8,
    t1_latch: u16,
    t1_counter: u16,
    t1_armed: bool,
    t2_latch_lo: u8,
    t2_counter: u16,
    t2_armed: bool,
    irq_control: IrqControl,
}

impl Via {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &'static str,
        port_a: Shared<IoPort>,
        port_b: Shared<IoPort>,
        ca1_pin: Shared<Pin>,
        ca2_pin: Shared<Pin>,
        cb1_pin: Shared<Pin>,
        cb2_pin: Shared<Pin>,
        irq_line: Shared<IrqLine>,
    ) -> Self {
        Self::new_with_irq_source(
            name, port_a, port_b, ca1_pin, ca2_pin, cb1_pin, cb2_pin, irq_line, 0,
        )
    }

    /// Like `new`, but lets the IRQ line bit position be chosen explicitly so
    /// two VIAs (e.g. the 1541's VIA1 and VIA2) can share one wired-OR IRQ
    /// input without clobbering each other's asserted bit.
    #[allow(clippy::too_many_arguments)]
    pub fn new_with_irq_source(
        name: &'static str,
        port_a: Shared<IoPort>,
        port_b: Shared<IoPort>,
        ca1_pin: Shared<Pin>,
        ca2_pin: Shared<Pin>,
        cb1_pin: Shared<Pin>,
        cb2_pin: Shared<Pin>,
        irq_line: Shared<IrqLine>,
        irq_source: usize,
    ) -> Self {
        let mut via = Via {
            name,
            port_a,
            port_b,
            ca1_pin,
            ca2_pin,
            cb1_pin,
            cb2_pin,
            irq_line,
            irq_source,
            acr: 0,
            pcr: 0,
            sr: 0,
            t1_latch: 0xffff,
            t1_counter: 0xffff,
            t1_armed: false,
            t2_latch_lo: 0xff,
            t2_counter: 0xffff,
            t2_armed: false,
            irq_control: IrqControl::default(),
        };
        via.reset();
        via
    }

    pub fn reset(&mut self) {
        self.port_a.borrow_mut().reset();
        self.port_b.borrow_mut().reset();
        self.acr = 0;
        self.pcr = 0;
        self.sr = 0;
        self.t1_latch = 0xffff;
        self.t1_counter = 0xffff;
        self.t1_armed = false;
        self.t2_latch_lo = 0xff;
        self.t2_counter = 0xffff;
        self.t2_armed = false;
        self.irq_control.reset();
        self.irq_line.borrow_mut().set_low(0, false);
    }

    pub fn clock(&mut self) {
        if self.ca1_pin.borrow().is_rising() && self.ca1_control_is_positive()
            || self.ca1_pin.borrow().is_falling() && !self.ca1_control_is_positive()
        {
            self.irq_control.set_event(irq::CA1);
        }
        if !self.cb2_is_output() {
            if self.cb1_pin.borrow().is_rising() && self.cb1_control_is_positive()
                || self.cb1_pin.borrow().is_falling() && !self.cb1_control_is_positive()
            {
                self.irq_control.set_event(irq::CB1);
            }
        }
        if self.t1_armed {
            if self.t1_counter == 0 {
                self.irq_control.set_event(irq::T1);
                self.t1_counter = self.t1_latch;
                if !self.t1_continuous() {
                    self.t1_armed = false;
                }
            } else {
                self.t1_counter -= 1;
            }
        }
        if self.t2_armed && !self.t2_counts_pb6() {
            if self.t2_counter == 0 {
                self.irq_control.set_event(irq::T2);
                self.t2_armed = false;
            } else {
                self.t2_counter -= 1;
            }
        }
        let triggered = self.irq_control.is_triggered();
        self.irq_line.borrow_mut().set_low(self.irq_source, triggered);
        if log_enabled!(LogLevel::Trace) && triggered {
            trace!(target: "via::irq", "{} irq asserted, ifr=0x{:02x}", self.name, self.irq_control.get_data());
        }
    }

    pub fn clock_delta(&mut self, delta: u32) {
        for _ in 0..delta {
            self.clock();
        }
    }

    pub fn process_vsync(&mut self) {}

    pub fn read(&mut self, reg: u8) -> u8 {
        let value = match reg & 0x0f {
            reg::ORB => {
                self.irq_control.clear_events((1 << irq::CB1) | (1 << irq::CB2));
                self.port_b.borrow().get_value()
            }
            reg::ORA => {
                self.irq_control.clear_events((1 << irq::CA1) | (1 << irq::CA2));
                self.port_a.borrow().get_value()
            }
            reg::DDRB => self.port_b.borrow().get_direction(),
            reg::DDRA => self.port_a.borrow().get_direction(),
            reg::T1C_L => {
                self.irq_control.clear_events(1 << irq::T1);
                self.t1_counter as u8
            }
            reg::T1C_H => (self.t1_counter >> 8) as u8,
            reg::T1L_L => self.t1_latch as u8,
            reg::T1L_H => (self.t1_latch >> 8) as u8,
            reg::T2C_L => {
                self.irq_control.clear_events(1 << irq::T2);
                self.t2_counter as u8
            }
            reg::T2C_H => (self.t2_counter >> 8) as u8,
            reg::SR => {
                self.irq_control.clear_events(1 << irq::SR);
                self.sr
            }
            reg::ACR => self.acr,
            reg::PCR => self.pcr,
            reg::IFR => self.irq_control.get_data(),
            reg::IER => self.irq_control.get_mask() | 0x80,
            reg::ORA_NH => self.port_a.borrow().get_value(),
            _ => unreachable!(),
        };
        if log_enabled!(LogLevel::Trace) {
            trace!(target: "via::reg", "{} read 0x{:02x} = 0x{:02x}", self.name, reg, value);
        }
        value
    }

    pub fn write(&mut self, reg: u8, value: u8) {
        if log_enabled!(LogLevel::Trace) {
            trace!(target: "via::reg", "{} write 0x{:02x} = 0x{:02x}", self.name, reg, value);
        }
        match reg & 0x0f {
            reg::ORB => {
                self.irq_control.clear_events((1 << irq::CB1) | (1 << irq::CB2));
                self.port_b.borrow_mut().set_value(value);
            }
            reg::ORA | reg::ORA_NH => {
                self.irq_control.clear_events((1 << irq::CA1) | (1 << irq::CA2));
                self.port_a.borrow_mut().set_value(value);
            }
            reg::DDRB => self.port_b.borrow_mut().set_direction(value),
            reg::DDRA => self.port_a.borrow_mut().set_direction(value),
            reg::T1C_L => self.t1_latch = (self.t1_latch & 0xff00) | u16::from(value),
            reg::T1C_H => {
                self.t1_latch = (u16::from(value) << 8) | (self.t1_latch & 0x00ff);
                self.t1_counter = self.t1_latch;
                self.t1_armed = true;
                self.irq_control.clear_events(1 << irq::T1);
            }
            reg::T1L_L => self.t1_latch = (self.t1_latch & 0xff00) | u16::from(value),
            reg::T1L_H => {
                self.t1_latch = (u16::from(value) << 8) | (self.t1_latch & 0x00ff);
                self.irq_control.clear_events(1 << irq::T1);
            }
            reg::T2C_L => self.t2_latch_lo = value,
            reg::T2C_H => {
                self.t2_counter = (u16::from(value) << 8) | u16::from(self.t2_latch_lo);
                self.t2_armed = true;
                self.irq_control.clear_events(1 << irq::T2);
            }
            reg::SR => {
                self.sr = value;
                self.irq_control.clear_events(1 << irq::SR);
            }
            reg::ACR => self.acr = value,
            reg::PCR => self.pcr = value,
            reg::IFR => self.irq_control.clear_events(value & 0x7f),
            reg::IER => self.irq_control.update_mask(value),
            _ => unreachable!(),
        }
    }

    // -- Direct line access for devices wired to this VIA outside the bus

    pub fn port_a_output(&self) -> u8 {
        self.port_a.borrow().get_value()
    }

    pub fn port_b_output(&self) -> u8 {
        self.port_b.borrow().get_value()
    }

    pub fn set_sr(&mut self, value: u8) {
        self.sr = value;
        self.irq_control.set_event(irq::SR);
    }

    /// Whether CB2 is configured as a manual-output low level, i.e. bits 7-5
    /// of PCR are `110` or `111`. The 1541 disk controller uses this to
    /// select write mode on VIA2's CB2 line.
    pub fn cb2_manual_low(&self) -> bool {
        (self.pcr & 0xe0) == 0xc0
    }

    fn cb2_is_output(&self) -> bool {
        self.pcr.get_bit(7)
    }

    fn ca1_control_is_positive(&self) -> bool {
        self.pcr.get_bit(0)
    }

    fn cb1_control_is_positive(&self) -> bool {
        self.pcr.get_bit(4)
    }

    fn t1_continuous(&self) -> bool {
        self.acr.get_bit(6)
    }

    fn t2_counts_pb6(&self) -> bool {
        self.acr.get_bit(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::new_shared;

    fn new_via() -> Via {
        Via::new(
            "via-test",
            new_shared(IoPort::new(0x00, 0xff)),
            new_shared(IoPort::new(0x00, 0xff)),
            new_shared(Pin::new_low()),
            new_shared(Pin::new_low()),
            new_shared(Pin::new_low()),
            new_shared(Pin::new_low()),
            new_shared(IrqLine::new("via")),
        )
    }

    #[test]
    fn port_a_round_trips_through_ddr_and_or() {
        let mut via = new_via();
        via.write(reg::DDRA, 0xff);
        via.write(reg::ORA, 0xab);
        assert_eq!(0xab, via.read(reg::ORA));
    }

    #[test]
    fn timer1_fires_irq_on_underflow() {
        let mut via = new_via();
        via.write(reg::IER, 0xc0); // SET, enable T1
        via.write(reg::T1C_L, 0x02);
        via.write(reg::T1C_H, 0x00);
        for _ in 0..3 {
            via.clock();
        }
        assert_ne!(0, via.read(reg::IFR) & 0x40);
    }

    #[test]
    fn ca1_edge_sets_ifr_and_clears_on_ora_read() {
        let mut via = new_via();
        via.write(reg::PCR, 0x01); // CA1 positive edge
        via.write(reg::IER, 0x82); // enable CA1
        via.ca1_pin.borrow_mut().set_active(true);
        via.clock();
        assert_ne!(0, via.read(reg::IFR) & 0x02);
        assert_eq!(0, via.read(reg::IFR) & 0x02);
    }

    #[test]
    fn cb2_manual_low_detects_write_mode() {
        let mut via = new_via();
        via.write(reg::PCR, 0xc0);
        assert!(via.cb2_manual_low());
        via.write(reg::PCR, 0xe0);
        assert!(!via.cb2_manual_low());
    }
}
