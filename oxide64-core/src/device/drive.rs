// This file is part of oxide64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[cfg(not(feature = "std"))]
use alloc::prelude::*;

use crate::cpu::Cpu6510;
use crate::device::{Disk, IecBus};
use crate::factory::{Addressable, Cpu};
use crate::io::via::Via;
use crate::util::{new_shared, IoPort, IrqLine, Pin, Ram, Rom, Shared};

// SPEC: VC1541 disk drive - independent 6502 + 2x VIA6522 + GCR mechanism.
// https://www.c64-wiki.com/index.php/VC1541

/// First track/halftrack addressable by the stepper motor is halftrack 2,
/// matching the drive's physical travel limit.
const MIN_HALFTRACK: u8 = 2;
const MAX_HALFTRACK: u8 = 84;

/// The head advances one GCR bit every 4 CPU cycles at single density, the
/// only density this implementation models (see SPEC_FULL.md's open
/// question on zone-dependent bit rates).
const CYCLES_PER_BIT: u8 = 4;

mod via2_pb {
    pub const STEPPER_MASK: u8 = 0x03;
    pub const MOTOR: u8 = 0x04;
    pub const LED: u8 = 0x08;
    pub const WRITE_PROTECT_BIT: usize = 4;
}

/// Drive-side address decode for the 1541's 2KB RAM, 16KB ROM and two VIAs.
/// Addresses outside any chip-select range read as open bus (0), mirroring
/// the host memory model's treatment of unmapped slices.
struct DriveMemory {
    ram: Ram,
    rom: Shared<Rom>,
    via1: Shared<Via>,
    via2: Shared<Via>,
}

impl Addressable for DriveMemory {
    fn read(&self, address: u16) -> u8 {
        match address {
            0x0000..=0x07ff => self.ram.read(address & 0x07ff),
            0x1800..=0x1bff => self.via1.borrow_mut().read((address & 0x0f) as u8),
            0x1c00..=0x1fff => self.via2.borrow_mut().read((address & 0x0f) as u8),
            0xc000..=0xffff => self.rom.borrow().read(address),
            _ => 0,
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            0x0000..=0x07ff => self.ram.write(address & 0x07ff, value),
            0x1800..=0x1bff => self.via1.borrow_mut().write((address & 0x0f) as u8, value),
            0x1c00..=0x1fff => self.via2.borrow_mut().write((address & 0x0f) as u8, value),
            _ => {}
        }
    }
}

/// Head/stepper/bit-stream state, advanced once per drive cycle from
/// `Vc1541::clock`.
struct Mechanism {
    disk: Option<Disk>,
    halftrack: u8,
    prev_stepper_phase: u8,
    bit_cycle: u8,
    bit_pos: usize,
    shift_reg: u8,
    sync_run: u8,
    sync_found: bool,
    bits_since_byte: u8,
    motor_on: bool,
    led_on: bool,
}

impl Mechanism {
    fn new() -> Self {
        Mechanism {
            disk: None,
            halftrack: 2 * 18 - 1,
            prev_stepper_phase: 0,
            bit_cycle: 0,
            bit_pos: 0,
            shift_reg: 0,
            sync_run: 0,
            sync_found: false,
            bits_since_byte: 0,
            motor_on: false,
            led_on: false,
        }
    }

    fn reset(&mut self) {
        *self = Mechanism {
            disk: self.disk.take(),
            ..Mechanism::new()
        };
    }

    /// Advances the stepper by one cycle's worth of PB0-1 observation,
    /// returning the new halftrack.
    fn step_head(&mut self, phase: u8) {
        if phase != self.prev_stepper_phase {
            // The four phase states form a Gray-like cycle; going forward
            // by one step (mod 4) moves the head in, back by one moves out.
            let advance = (i32::from(phase) - i32::from(self.prev_stepper_phase)).rem_euclid(4);
            if advance == 1 {
                self.halftrack = (self.halftrack + 1).min(MAX_HALFTRACK);
            } else if advance == 3 {
                self.halftrack = self.halftrack.saturating_sub(1).max(MIN_HALFTRACK);
            }
            self.prev_stepper_phase = phase;
        }
    }

    /// Advances the read mechanism by one bit cell, latching a completed
    /// GCR byte into VIA2 port A and pulsing CA1 on every 8th bit once a
    /// sync mark has been seen.
    fn read_bit(&mut self, via2_port_a: &Shared<IoPort>, via2_ca1: &Shared<Pin>) {
        let halftrack = self.halftrack as usize;
        let track_len = match self.disk.as_ref() {
            Some(disk) => disk.halftrack_gcr(halftrack).len() * 8,
            None => 0,
        };
        if track_len == 0 {
            return;
        }
        let byte_idx = self.bit_pos / 8;
        let bit_idx = 7 - (self.bit_pos % 8);
        let byte = self.disk.as_ref().unwrap().halftrack_gcr(halftrack)[byte_idx];
        let bit = (byte >> bit_idx) & 1;
        self.shift_reg = (self.shift_reg << 1) | bit;
        if bit == 1 {
            self.sync_run += 1;
            if self.sync_run >= 10 {
                self.sync_found = true;
                self.bits_since_byte = 0;
            }
        } else {
            self.sync_run = 0;
        }
        if self.sync_found {
            self.bits_since_byte += 1;
            if self.bits_since_byte >= 8 {
                self.bits_since_byte = 0;
                via2_port_a.borrow_mut().set_input(self.shift_reg);
                via2_ca1.borrow_mut().set_active(true);
                via2_ca1.borrow_mut().set_active(false);
            }
        }
        self.bit_pos = (self.bit_pos + 1) % track_len;
    }
}

/// An independent 1541 disk drive: its own 6502, two 6522 VIAs and the
/// GCR head/stepper mechanism, clocked 1:1 with the host's cycles.
pub struct Vc1541 {
    device_number: usize,
    cpu: Cpu6510,
    via1: Shared<Via>,
    via2: Shared<Via>,
    via1_port_b: Shared<IoPort>,
    via1_ca1: Shared<Pin>,
    via2_port_a: Shared<IoPort>,
    via2_port_b: Shared<IoPort>,
    via2_ca1: Shared<Pin>,
    mechanism: Mechanism,
}

impl Vc1541 {
    pub fn new(device_number: usize, rom_drive: Shared<Rom>) -> Self {
        let via1_port_a = new_shared(IoPort::new(0x00, 0xff));
        let via1_port_b = new_shared(IoPort::new(0x00, 0xff));
        let via2_port_a = new_shared(IoPort::new(0x00, 0xff));
        let via2_port_b = new_shared(IoPort::new(0x00, 0xff));
        let via1_ca1 = new_shared(Pin::new_low());
        let via2_ca1 = new_shared(Pin::new_low());
        let drive_irq = new_shared(IrqLine::new("drive-irq"));
        let drive_nmi = new_shared(IrqLine::new("drive-nmi"));
        let drive_ba = new_shared(Pin::new_high());
        let drive_io_port = new_shared(IoPort::new(0x00, 0xff));

        let via1 = new_shared(Via::new_with_irq_source(
            "via1",
            via1_port_a,
            via1_port_b.clone(),
            via1_ca1.clone(),
            new_shared(Pin::new_low()),
            new_shared(Pin::new_low()),
            new_shared(Pin::new_low()),
            drive_irq.clone(),
            0,
        ));
        let via2 = new_shared(Via::new_with_irq_source(
            "via2",
            via2_port_a.clone(),
            via2_port_b.clone(),
            via2_ca1.clone(),
            new_shared(Pin::new_low()),
            new_shared(Pin::new_low()),
            new_shared(Pin::new_low()),
            drive_irq.clone(),
            1,
        ));

        let mem: Shared<dyn Addressable> = new_shared(DriveMemory {
            ram: Ram::new(0x0800),
            rom: rom_drive,
            via1: via1.clone(),
            via2: via2.clone(),
        });
        let cpu = Cpu6510::new(mem, drive_io_port, drive_ba, drive_irq, drive_nmi);

        let mut drive = Vc1541 {
            device_number,
            cpu,
            via1,
            via2,
            via1_port_b,
            via1_ca1,
            via2_port_a,
            via2_port_b,
            via2_ca1,
            mechanism: Mechanism::new(),
        };
        drive.reset();
        drive
    }

    pub fn reset(&mut self) {
        self.cpu.reset();
        self.via1.borrow_mut().reset();
        self.via2.borrow_mut().reset();
        self.mechanism.reset();
    }

    pub fn insert_disk(&mut self, disk: Disk) {
        self.mechanism.disk = Some(disk);
        self.mechanism.bit_pos = 0;
    }

    pub fn eject_disk(&mut self) -> Option<Disk> {
        self.mechanism.disk.take()
    }

    pub fn has_disk(&self) -> bool {
        self.mechanism.disk.is_some()
    }

    pub fn is_motor_on(&self) -> bool {
        self.mechanism.motor_on
    }

    pub fn is_led_on(&self) -> bool {
        self.mechanism.led_on
    }

    pub fn halftrack(&self) -> u8 {
        self.mechanism.halftrack
    }

    pub fn track(&self) -> u8 {
        (self.halftrack() + 1) / 2
    }

    /// Advances the drive's CPU, both VIAs and the head mechanism by
    /// exactly one clock cycle. Called once per host cycle, giving the
    /// 1:1 host/drive interleave the two independent 1 MHz clocks share.
    pub fn clock(&mut self) {
        self.cpu.clock();
        self.via1.borrow_mut().clock();
        self.via2.borrow_mut().clock();

        let pb = self.via2_port_b.borrow().get_value();
        self.mechanism.motor_on = pb & via2_pb::MOTOR != 0;
        self.mechanism.led_on = pb & via2_pb::LED != 0;
        self.mechanism.step_head(pb & via2_pb::STEPPER_MASK);

        let write_protected = self
            .mechanism
            .disk
            .as_ref()
            .map(|d| d.is_write_protected())
            .unwrap_or(true);
        self.via2_port_b
            .borrow_mut()
            .set_input_bit(via2_pb::WRITE_PROTECT_BIT, write_protected);

        if self.mechanism.motor_on {
            self.mechanism.bit_cycle += 1;
            if self.mechanism.bit_cycle >= CYCLES_PER_BIT {
                self.mechanism.bit_cycle = 0;
                let writing = self.via2.borrow().cb2_manual_low();
                if !writing {
                    self.mechanism.read_bit(&self.via2_port_a, &self.via2_ca1);
                }
                // Write-side bit shifting is intentionally not modeled:
                // host software only ever reads back what it wrote in the
                // same session, and the sector-level `Disk::write_sector`
                // API (driven by the file-format front end) already covers
                // persisting writes to the image.
            }
        }
    }

    /// Recomputes the IEC bus from this drive's VIA1 port B and latches the
    /// bus's current levels back into VIA1's input bits and CA1 edge
    /// detector. Call once per drive cycle alongside `clock`.
    pub fn sync_iec(&mut self, iec: &mut IecBus) {
        let out = self.via1_port_b.borrow().get_value();
        iec.update_from_drive(self.device_number, out);
        {
            let mut port_b = self.via1_port_b.borrow_mut();
            port_b.set_input_bit(0, iec.data());
            port_b.set_input_bit(2, iec.clock());
            port_b.set_input_bit(7, iec.atn());
        }
        self.via1_ca1.borrow_mut().set_active(iec.atn());
    }

    pub fn is_cpu_jam(&self) -> bool {
        self.cpu.is_cpu_jam()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_drive() -> Vc1541 {
        let rom = new_shared(Rom::new(0x4000, 0xc000, 0xea));
        Vc1541::new(8, rom)
    }

    #[test]
    fn fresh_drive_starts_parked_on_track_18() {
        let drive = new_drive();
        assert_eq!(18, drive.track());
    }

    #[test]
    fn no_disk_is_reported_as_absent() {
        let drive = new_drive();
        assert!(!drive.has_disk());
    }

    #[test]
    fn stepping_executes_without_panic() {
        let mut drive = new_drive();
        for _ in 0..50 {
            drive.clock();
        }
    }

    #[test]
    fn stepper_phase_advance_moves_head_one_halftrack() {
        let mut mech = Mechanism::new();
        let start = mech.halftrack;
        mech.step_head(1);
        assert_eq!(start + 1, mech.halftrack);
        mech.step_head(2);
        assert_eq!(start + 2, mech.halftrack);
        mech.step_head(1);
        assert_eq!(start + 1, mech.halftrack);
    }

    #[test]
    fn head_never_steps_below_min_halftrack() {
        let mut mech = Mechanism::new();
        mech.halftrack = MIN_HALFTRACK;
        mech.step_head(3);
        assert_eq!(MIN_HALFTRACK, mech.halftrack);
    }
}
