//! The banked address space behind the bus.
//!
//! Memory is itself an address register: the `MEMADDR` latch selects the
//! byte the `MEM` data port serves. Banks are disjoint, possibly sparse, and
//! either RAM or ROM. Tooling reaches past the bus with [`Memory::peek`] and
//! [`Memory::poke`].

use crate::bus::{
    BusCommand, SystemBus, OP_DEC, OP_IDX, OP_INC, OP_IO_IN, OP_IO_OUT, OP_MSB,
};
use crate::component::{MEM, MEMADDR};
use crate::fault::Fault;

/// One contiguous RAM or ROM region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryBank {
    start: u16,
    size: u16,
    writable: bool,
    image: Vec<u8>,
}

impl MemoryBank {
    /// Creates a zero-filled bank.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InvalidBank`] when the region is empty or does not
    /// fit the address space.
    pub fn new(start: u16, size: u16, writable: bool) -> Result<Self, Fault> {
        if size == 0 || u32::from(start) + u32::from(size) > 0xFFFF {
            return Err(Fault::InvalidBank { start, size });
        }
        Ok(Self {
            start,
            size,
            writable,
            image: vec![0; usize::from(size)],
        })
    }

    /// First mapped address.
    #[must_use]
    pub const fn start(&self) -> u16 {
        self.start
    }

    /// Size in bytes.
    #[must_use]
    pub const fn size(&self) -> u16 {
        self.size
    }

    /// One past the last mapped address.
    #[must_use]
    pub const fn end(&self) -> u16 {
        self.start + self.size
    }

    /// Whether the bank is RAM.
    #[must_use]
    pub const fn writable(&self) -> bool {
        self.writable
    }

    /// Display name, `RAM 2000-4000` style.
    #[must_use]
    pub fn name(&self) -> String {
        format!(
            "{} {:04x}-{:04x}",
            if self.writable { "RAM" } else { "ROM" },
            self.start(),
            self.end()
        )
    }

    /// Whether `addr` falls inside this bank.
    #[must_use]
    pub const fn mapped(&self, addr: u16) -> bool {
        self.start <= addr && addr < self.end()
    }

    /// Whether the whole block `[addr, addr + size)` falls inside this bank.
    #[must_use]
    pub fn fits(&self, addr: u16, size: u16) -> bool {
        size > 0
            && self.mapped(addr)
            && u32::from(addr) + u32::from(size) <= u32::from(self.end())
    }

    /// Whether the block `[addr, addr + size)` shares no address with this
    /// bank.
    #[must_use]
    pub fn disjoint_from(&self, addr: u16, size: u16) -> bool {
        u32::from(addr) + u32::from(size) <= u32::from(self.start)
            || addr >= self.end()
    }

    /// Zero-fills the bank.
    pub fn erase(&mut self) {
        self.image.fill(0);
    }

    /// Copies `contents` into the bank at `addr`; ignored when the block
    /// does not fit.
    pub fn copy(&mut self, addr: u16, contents: &[u8]) {
        let Ok(size) = u16::try_from(contents.len()) else {
            return;
        };
        if self.fits(addr, size) {
            let offset = usize::from(addr - self.start);
            self.image[offset..offset + contents.len()].copy_from_slice(contents);
        }
    }

    fn peek(&self, addr: u16) -> u8 {
        self.image[usize::from(addr - self.start)]
    }

    fn poke(&mut self, addr: u16, value: u8) {
        self.image[usize::from(addr - self.start)] = value;
    }
}

/// The memory component: bank set plus the `MEMADDR` latch.
#[derive(Debug, Default)]
pub struct Memory {
    value: u16,
    banks: Vec<MemoryBank>,
}

impl Memory {
    /// Creates a memory with no banks mapped.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            value: 0,
            banks: Vec::new(),
        }
    }

    /// Creates a memory with one RAM and one ROM bank, the conventional
    /// machine layout.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InvalidBank`] or [`Fault::BankOverlap`] when the
    /// regions are malformed.
    pub fn with_banks(
        ram_start: u16,
        ram_size: u16,
        rom_start: u16,
        rom_size: u16,
    ) -> Result<Self, Fault> {
        let mut memory = Self::new();
        memory.add(ram_start, ram_size, true)?;
        memory.add(rom_start, rom_size, false)?;
        Ok(memory)
    }

    /// Current value of the `MEMADDR` latch.
    #[must_use]
    pub const fn value(&self) -> u16 {
        self.value
    }

    /// Overwrites the `MEMADDR` latch out-of-band.
    pub const fn set_value(&mut self, value: u16) {
        self.value = value;
    }

    /// Zeroes the `MEMADDR` latch. Banks and contents survive, as on real
    /// hardware.
    pub const fn reset(&mut self) {
        self.value = 0;
    }

    /// Registers a new zero-filled bank.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::BankOverlap`] when the region intersects an existing
    /// bank, or [`Fault::InvalidBank`] when it is malformed.
    pub fn add(&mut self, start: u16, size: u16, writable: bool) -> Result<(), Fault> {
        if !self.disjoint_from_all(start, size) {
            return Err(Fault::BankOverlap { start, size });
        }
        self.banks.push(MemoryBank::new(start, size, writable)?);
        Ok(())
    }

    /// Installs an image: copied into the bank that already maps the block,
    /// or registered as a new bank of exactly the image's size.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::BankOverlap`] when a new bank would intersect an
    /// existing one without fitting inside it, or [`Fault::InvalidBank`] when
    /// the region is malformed.
    pub fn install(
        &mut self,
        start: u16,
        contents: &[u8],
        writable: bool,
    ) -> Result<(), Fault> {
        let size = u16::try_from(contents.len()).map_err(|_| Fault::InvalidBank {
            start,
            size: u16::MAX,
        })?;
        if let Some(bank) = self.banks.iter_mut().find(|b| b.fits(start, size)) {
            bank.copy(start, contents);
            return Ok(());
        }
        self.add(start, size, writable)?;
        if let Some(bank) = self.banks.iter_mut().find(|b| b.fits(start, size)) {
            bank.copy(start, contents);
        }
        Ok(())
    }

    /// Removes the bank that starts at `addr` with exactly `size` bytes.
    /// Returns whether a bank was removed.
    pub fn remove(&mut self, addr: u16, size: u16) -> bool {
        let before = self.banks.len();
        self.banks
            .retain(|b| !(b.start() == addr && b.size() == size));
        self.banks.len() != before
    }

    /// Whether the block `[addr, addr + size)` intersects no bank.
    #[must_use]
    pub fn disjoint_from_all(&self, addr: u16, size: u16) -> bool {
        self.banks.iter().all(|b| b.disjoint_from(addr, size))
    }

    /// The bank mapping `addr`, for display and management tooling.
    #[must_use]
    pub fn bank(&self, addr: u16) -> Option<&MemoryBank> {
        self.banks.iter().find(|b| b.mapped(addr))
    }

    /// All banks, in registration order.
    #[must_use]
    pub fn banks(&self) -> &[MemoryBank] {
        &self.banks
    }

    /// Whether any bank maps `addr`.
    #[must_use]
    pub fn is_mapped(&self, addr: u16) -> bool {
        self.bank(addr).is_some()
    }

    /// Whether `addr` is mapped and writable.
    #[must_use]
    pub fn in_ram(&self, addr: u16) -> bool {
        self.bank(addr).is_some_and(MemoryBank::writable)
    }

    /// Whether `addr` is mapped read-only.
    #[must_use]
    pub fn in_rom(&self, addr: u16) -> bool {
        self.bank(addr).is_some_and(|b| !b.writable())
    }

    /// Zero-fills every RAM bank.
    pub fn erase(&mut self) {
        for bank in &mut self.banks {
            if bank.writable() {
                bank.erase();
            }
        }
    }

    /// Reads a byte past the bus, without touching machine state.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnmappedAddress`] when no bank maps `addr`.
    pub fn peek(&self, addr: u16) -> Result<u8, Fault> {
        self.bank(addr)
            .map(|b| b.peek(addr))
            .ok_or(Fault::UnmappedAddress { addr })
    }

    /// Writes a byte past the bus, without touching machine state.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnmappedAddress`] when no bank maps `addr`, or
    /// [`Fault::ReadOnly`] when the bank is ROM.
    pub fn poke(&mut self, addr: u16, value: u8) -> Result<(), Fault> {
        let bank = self
            .banks
            .iter_mut()
            .find(|b| b.mapped(addr))
            .ok_or(Fault::UnmappedAddress { addr })?;
        if !bank.writable() {
            return Err(Fault::ReadOnly { addr });
        }
        bank.poke(addr, value);
        Ok(())
    }

    /// Serves reads: drives the byte at `MEMADDR` when addressed as the
    /// source, then applies `INC`/`DEC` to the latch.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnmappedAddress`] when `MEMADDR` is unmapped.
    pub fn on_rising_edge(&mut self, bus: &mut SystemBus) -> Result<(), Fault> {
        let serving = match bus.command() {
            BusCommand::Data | BusCommand::Addr => true,
            BusCommand::Io => bus.opflags() & OP_IO_OUT != 0,
            BusCommand::Idle => false,
        };
        if !serving || bus.get_id() != MEM {
            // The address latch itself can be read out over a 16-bit
            // transfer, which microcode uses to park the effective address
            // while a stack access borrows the latch.
            if bus.get_id() == MEMADDR && bus.command() == BusCommand::Addr {
                let [lsb, msb] = self.value.to_le_bytes();
                bus.put_on_data_bus(lsb);
                bus.put_on_addr_bus(msb);
            }
            return Ok(());
        }
        let byte = self.peek(self.value)?;
        bus.put_on_addr_bus(0x00);
        bus.put_on_data_bus(byte);
        if bus.opflags() & OP_INC != 0 {
            self.value = self.value.wrapping_add(1);
        }
        if bus.opflags() & OP_DEC != 0 {
            self.value = self.value.wrapping_sub(1);
        }
        Ok(())
    }

    /// Serves writes into the mapped space and latches of the `MEMADDR`
    /// register.
    ///
    /// Bus-driven stores to ROM are dropped silently, as the write line of a
    /// ROM chip simply is not connected; only unmapped targets fault.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnmappedAddress`] when a store targets an unmapped
    /// address.
    pub fn on_high_clock(&mut self, bus: &mut SystemBus) -> Result<(), Fault> {
        let storing = match bus.command() {
            BusCommand::Data | BusCommand::Addr => bus.put_id() == MEM,
            BusCommand::Io => bus.opflags() & OP_IO_IN != 0 && bus.get_id() == MEM,
            BusCommand::Idle => false,
        };
        if storing {
            match self.poke(self.value, bus.read_data_bus()) {
                Ok(()) | Err(Fault::ReadOnly { .. }) => {}
                Err(fault) => return Err(fault),
            }
            if bus.opflags() & OP_INC != 0 {
                self.value = self.value.wrapping_add(1);
            }
            if bus.opflags() & OP_DEC != 0 {
                self.value = self.value.wrapping_sub(1);
            }
        } else if bus.put_id() == MEMADDR {
            match bus.command() {
                BusCommand::Addr => {
                    self.value = u16::from_le_bytes([
                        bus.read_data_bus(),
                        bus.read_addr_bus(),
                    ]);
                }
                BusCommand::Data => {
                    let data = bus.read_data_bus();
                    if bus.opflags() & OP_IDX != 0 {
                        let displacement = i8::from_ne_bytes([data]);
                        self.value =
                            self.value.wrapping_add_signed(i16::from(displacement));
                    } else if bus.opflags() & OP_MSB != 0 {
                        let [lsb, _] = self.value.to_le_bytes();
                        self.value = u16::from_le_bytes([lsb, data]);
                    } else {
                        let [_, msb] = self.value.to_le_bytes();
                        self.value = u16::from_le_bytes([data, msb]);
                    }
                }
                BusCommand::Idle | BusCommand::Io => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Memory;
    use crate::bus::{BusCommand, SystemBus, OP_MSB, OP_NONE};
    use crate::component::{MEM, MEMADDR};
    use crate::fault::Fault;
    use proptest::prelude::*;

    fn test_memory() -> Memory {
        let mut mem = Memory::with_banks(0x0000, 0x2000, 0x8000, 0x2000)
            .expect("disjoint layout");
        mem.install(0x0000, &[0x42, 0x37, 0x55], true).expect("fits in RAM");
        mem.install(0x8000, &[0x82, 0x77, 0x95], false).expect("fits in ROM");
        mem
    }

    #[test]
    fn install_copies_into_an_existing_bank() {
        let mem = test_memory();
        assert_eq!(mem.peek(0x0000), Ok(0x42));
        assert_eq!(mem.peek(0x8002), Ok(0x95));
        assert_eq!(mem.banks().len(), 2);
    }

    #[test]
    fn overlapping_banks_are_rejected() {
        let mut mem = test_memory();
        assert_eq!(
            mem.add(0x1FFF, 0x10, true),
            Err(Fault::BankOverlap { start: 0x1FFF, size: 0x10 })
        );
        assert!(mem.add(0x4000, 0x100, true).is_ok());
    }

    #[test]
    fn remove_matches_start_and_size_exactly() {
        let mut mem = test_memory();
        assert!(!mem.remove(0x0000, 0x1000));
        assert!(mem.remove(0x0000, 0x2000));
        assert!(!mem.is_mapped(0x0000));
    }

    #[test]
    fn peek_and_poke_respect_the_bank_map() {
        let mut mem = test_memory();
        assert!(mem.poke(0x0001, 0x99).is_ok());
        assert_eq!(mem.peek(0x0001), Ok(0x99));
        assert_eq!(
            mem.poke(0x8000, 0x00),
            Err(Fault::ReadOnly { addr: 0x8000 })
        );
        assert_eq!(
            mem.peek(0x5000),
            Err(Fault::UnmappedAddress { addr: 0x5000 })
        );
    }

    #[test]
    fn ram_and_rom_classification() {
        let mem = test_memory();
        assert!(mem.in_ram(0x0001));
        assert!(mem.in_rom(0x8001));
        assert!(!mem.in_ram(0x8001));
        assert!(!mem.in_rom(0x4000));
    }

    #[test]
    fn address_latch_assembles_from_bus_halves() {
        let mut mem = test_memory();
        let mut bus = SystemBus::new();

        bus.initialize(BusCommand::Addr, 0x8, MEMADDR, OP_NONE, 0x01, 0x80);
        mem.on_high_clock(&mut bus).expect("latch only");
        assert_eq!(mem.value(), 0x8001);

        bus.initialize(BusCommand::Data, 0x0, MEMADDR, OP_NONE, 0x55, 0x00);
        mem.on_high_clock(&mut bus).expect("latch only");
        assert_eq!(mem.value(), 0x8055);

        bus.initialize(BusCommand::Data, 0x0, MEMADDR, OP_MSB, 0x20, 0x00);
        mem.on_high_clock(&mut bus).expect("latch only");
        assert_eq!(mem.value(), 0x2055);
    }

    #[test]
    fn bus_read_serves_the_latched_address() {
        let mut mem = test_memory();
        let mut bus = SystemBus::new();
        mem.set_value(0x8001);

        bus.initialize(BusCommand::Data, MEM, 0x0, OP_NONE, 0, 0);
        mem.on_rising_edge(&mut bus).expect("mapped read");
        assert_eq!(bus.read_data_bus(), 0x77);
    }

    #[test]
    fn bus_read_of_unmapped_space_faults() {
        let mut mem = test_memory();
        let mut bus = SystemBus::new();
        mem.set_value(0x5000);

        bus.initialize(BusCommand::Data, MEM, 0x0, OP_NONE, 0, 0);
        assert_eq!(
            mem.on_rising_edge(&mut bus),
            Err(Fault::UnmappedAddress { addr: 0x5000 })
        );
    }

    #[test]
    fn bus_write_to_rom_is_silently_dropped() {
        let mut mem = test_memory();
        let mut bus = SystemBus::new();
        mem.set_value(0x8001);

        bus.initialize(BusCommand::Data, 0x0, MEM, OP_NONE, 0x13, 0);
        mem.on_high_clock(&mut bus).expect("write is dropped, not a fault");
        assert_eq!(mem.peek(0x8001), Ok(0x77));
    }

    #[test]
    fn bus_write_to_ram_lands() {
        let mut mem = test_memory();
        let mut bus = SystemBus::new();
        mem.set_value(0x0002);

        bus.initialize(BusCommand::Data, 0x0, MEM, OP_NONE, 0x13, 0);
        mem.on_high_clock(&mut bus).expect("mapped write");
        assert_eq!(mem.peek(0x0002), Ok(0x13));
    }

    proptest! {
        /// Any probe intersecting an existing bank must be reported
        /// non-disjoint and rejected by `add`.
        #[test]
        fn overlap_probes_never_register(
            start in 0x0000_u16..0x9FFF,
            size in 1_u16..0x2000,
        ) {
            let mut mem = test_memory();
            let overlaps = |s: u16, len: u16| {
                let (s, e) = (u32::from(s), u32::from(s) + u32::from(len));
                let ranges = [(0x0000_u32, 0x2000_u32), (0x8000, 0xA000)];
                ranges.iter().any(|&(bs, be)| s < be && bs < e)
            };
            prop_assume!(u32::from(start) + u32::from(size) <= 0xFFFF);

            let disjoint = mem.disjoint_from_all(start, size);
            prop_assert_eq!(disjoint, !overlaps(start, size));
            prop_assert_eq!(mem.add(start, size, true).is_ok(), disjoint);
        }
    }
}
