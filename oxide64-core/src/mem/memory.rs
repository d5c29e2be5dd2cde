// This file is part of oxide64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[cfg(not(feature = "std"))]
use alloc::prelude::*;
use crate::factory::{Addressable, AddressableFaded, Bank, Mmu};
use crate::util::{Ram, Rom, Shared};

use super::Mmio;

// Spec: COMMODORE 64 MEMORY MAPS p. 263
// Design:
//   Inspired by UAE memory address64k/bank concepts.
//   We define Addressable trait to represent a bank of memory. Bank switching itself is
//   delegated to an injected Mmu (normally Pla) so the CPU's io port and the memory controller
//   can share a single source of truth for the current configuration.

pub struct Memory {
    mmu: Shared<dyn Mmu>,
    // Addressable
    basic: Shared<Rom>,
    charset: Shared<Rom>,
    expansion_port: Shared<dyn AddressableFaded>,
    io: Mmio,
    kernal: Shared<Rom>,
    ram: Shared<Ram>,
}

#[allow(dead_code)]
#[derive(Copy, Clone)]
enum BaseAddr {
    Basic = 0xa000,
    Charset = 0xd000,
    Kernal = 0xe000,
}

impl BaseAddr {
    pub fn addr(self) -> u16 {
        self as u16
    }
}

impl Memory {
    pub fn new(
        mmu: Shared<dyn Mmu>,
        expansion_port: Shared<dyn AddressableFaded>,
        io: Mmio,
        ram: Shared<Ram>,
        rom_basic: Shared<Rom>,
        rom_charset: Shared<Rom>,
        rom_kernal: Shared<Rom>,
    ) -> Self {
        Memory {
            mmu,
            basic: rom_basic,
            charset: rom_charset,
            expansion_port,
            io,
            kernal: rom_kernal,
            ram,
        }
    }
}

impl Addressable for Memory {
    fn read(&self, address: u16) -> u8 {
        match self.mmu.borrow().map(address) {
            Bank::Ram => self.ram.borrow().read(address),
            Bank::Basic => self.basic.borrow().read(address),
            Bank::Charset => self
                .charset
                .borrow()
                .read(address - BaseAddr::Charset.addr()),
            Bank::Kernal => self.kernal.borrow().read(address),
            Bank::RomL | Bank::RomH => self
                .expansion_port
                .borrow_mut()
                .read(address)
                .unwrap_or_else(|| self.ram.borrow().read(address)),
            Bank::Io => self.io.read(address),
            Bank::Disabled => 0,
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match self.mmu.borrow().map(address) {
            Bank::Io => self.io.write(address, value),
            Bank::RomL | Bank::RomH => self.expansion_port.borrow_mut().write(address, value),
            Bank::Disabled => {}
            _ => self.ram.borrow_mut().write(address, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::{ExpansionPort, Mmio};
    use crate::util::{new_shared, IoPort};
    use crate::factory::Chip;

    struct FixedBank(Bank);

    impl Mmu for FixedBank {
        fn map(&self, _address: u16) -> Bank {
            self.0
        }
        fn switch_banks(&mut self, _mode: u8) {}
    }

    struct NoopChip;

    impl Chip for NoopChip {
        fn clock(&mut self) {}
        fn clock_delta(&mut self, _delta: u32) {}
        fn process_vsync(&mut self) {}
        fn reset(&mut self) {}
        fn read(&mut self, _reg: u8) -> u8 {
            0x22
        }
        fn write(&mut self, _reg: u8, _value: u8) {}
        fn as_any(&self) -> &dyn core::any::Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn core::any::Any {
            self
        }
    }

    fn setup_memory(mode: Bank) -> Memory {
        let basic = new_shared(Rom::new_with_data(&[0x10; 0x2000], BaseAddr::Basic.addr()));
        let charset = new_shared(Rom::new_with_data(&[0x11; 0x1000], 0x0000));
        let kernal = new_shared(Rom::new_with_data(&[0x12; 0x2000], BaseAddr::Kernal.addr()));
        let ram = new_shared(Ram::new(0x10000));
        ram.borrow_mut().fill(0x44);
        let color_ram = new_shared(Ram::new(0x400));
        let expansion_port: Shared<dyn AddressableFaded> =
            new_shared(ExpansionPort::new(new_shared(IoPort::new(0, 0))));
        let io = Mmio::new(
            new_shared(NoopChip) as Shared<dyn Chip>,
            new_shared(NoopChip) as Shared<dyn Chip>,
            color_ram,
            expansion_port.clone(),
            new_shared(NoopChip) as Shared<dyn Chip>,
            new_shared(NoopChip) as Shared<dyn Chip>,
        );
        let mmu: Shared<dyn Mmu> = new_shared(FixedBank(mode));
        Memory::new(mmu, expansion_port, io, ram, basic, charset, kernal)
    }

    #[test]
    fn read_basic() {
        let mem = setup_memory(Bank::Basic);
        assert_eq!(0x10, mem.read(BaseAddr::Basic.addr()));
    }

    #[test]
    fn read_charset() {
        let mem = setup_memory(Bank::Charset);
        assert_eq!(0x11, mem.read(BaseAddr::Charset.addr()));
    }

    #[test]
    fn read_io() {
        let mem = setup_memory(Bank::Io);
        assert_eq!(0x22, mem.read(0xd000));
    }

    #[test]
    fn read_kernal() {
        let mem = setup_memory(Bank::Kernal);
        assert_eq!(0x12, mem.read(BaseAddr::Kernal.addr()));
    }

    #[test]
    fn write_ram_goes_through_regardless_of_configured_bank() {
        let mut mem = setup_memory(Bank::Basic);
        mem.write(0x00f0, 0xff);
        assert_eq!(0xff, mem.ram.borrow().read(0x00f0));
    }

    #[test]
    fn write_disabled_bank_is_discarded() {
        let mut mem = setup_memory(Bank::Disabled);
        mem.write(0x00f0, 0xff);
        assert_eq!(0x44, mem.ram.borrow().read(0x00f0));
    }
}
