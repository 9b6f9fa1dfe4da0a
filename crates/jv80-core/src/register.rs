//! Bus-connected storage cells.

use crate::bus::{
    BusCommand, SystemBus, FLAG_C, FLAG_Z, OP_DEC, OP_FLAGS, OP_IDX, OP_INC,
    OP_IO_IN, OP_IO_OUT, OP_MSB,
};

/// An 8-bit general-purpose register.
///
/// The cell is byte-wide on data transfers but latches a full 16-bit value
/// when addressed as the target of an `xaddr` transfer; microcode uses that
/// to park an address in a byte register for one step. Only the low byte is
/// ever driven back onto the data lines.
#[derive(Debug)]
pub struct Register {
    id: u8,
    name: &'static str,
    value: u16,
}

impl Register {
    /// Creates a zeroed register at bus address `id`.
    #[must_use]
    pub const fn new(id: u8, name: &'static str) -> Self {
        Self { id, name, value: 0 }
    }

    /// Bus address of this register.
    #[must_use]
    pub const fn id(&self) -> u8 {
        self.id
    }

    /// Display name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Current value. Byte-wide unless a 16-bit transfer parked an address
    /// here.
    #[must_use]
    pub const fn value(&self) -> u16 {
        self.value
    }

    /// Low byte of the current value.
    #[must_use]
    pub const fn byte(&self) -> u8 {
        let [lsb, _] = self.value.to_le_bytes();
        lsb
    }

    /// Overwrites the value out-of-band (tooling, test setup).
    pub const fn set_value(&mut self, value: u16) {
        self.value = value;
    }

    /// Zeroes the cell.
    pub const fn reset(&mut self) {
        self.value = 0;
    }

    /// Drives the bus when addressed as the transfer source.
    pub const fn on_rising_edge(&mut self, bus: &mut SystemBus) {
        if bus.get_id() != self.id {
            return;
        }
        match bus.command() {
            BusCommand::Data => bus.put_on_data_bus(self.byte()),
            BusCommand::Addr => {
                let [lsb, msb] = self.value.to_le_bytes();
                bus.put_on_data_bus(lsb);
                bus.put_on_addr_bus(msb);
            }
            BusCommand::Io if bus.opflags() & OP_IO_OUT != 0 => {
                bus.put_on_data_bus(self.byte());
            }
            BusCommand::Idle | BusCommand::Io => {}
        }
    }

    /// Latches the bus when addressed as the transfer target (or, for input
    /// I/O transfers, as the receiving register).
    pub fn on_high_clock(&mut self, bus: &mut SystemBus) {
        match bus.command() {
            BusCommand::Data if bus.put_id() == self.id => {
                self.value = u16::from(bus.read_data_bus());
            }
            BusCommand::Addr if bus.put_id() == self.id => {
                self.value =
                    u16::from_le_bytes([bus.read_data_bus(), bus.read_addr_bus()]);
            }
            BusCommand::Io
                if bus.get_id() == self.id && bus.opflags() & OP_IO_IN != 0 =>
            {
                self.value = u16::from(bus.read_data_bus());
            }
            _ => {}
        }
    }
}

/// A 16-bit address register.
///
/// Transfers 16 bits in one `xaddr` step (LSB over the data lines, MSB over
/// the address lines) or one byte half per `xdata` step selected by the `MSB`
/// op-flag. Supports the stack discipline (post-increment on `INC`,
/// pre-decrement on `DEC`), signed-displacement latching (`IDX`) and the
/// `FLAGS` op-flag that turns a step into a flag-setting count.
#[derive(Debug)]
pub struct AddressRegister {
    id: u8,
    name: &'static str,
    value: u16,
}

impl AddressRegister {
    /// Creates a zeroed address register at bus address `id`.
    #[must_use]
    pub const fn new(id: u8, name: &'static str) -> Self {
        Self { id, name, value: 0 }
    }

    /// Bus address of this register.
    #[must_use]
    pub const fn id(&self) -> u8 {
        self.id
    }

    /// Display name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Current 16-bit value.
    #[must_use]
    pub const fn value(&self) -> u16 {
        self.value
    }

    /// Overwrites the value out-of-band (tooling, test setup).
    pub const fn set_value(&mut self, value: u16) {
        self.value = value;
    }

    /// Zeroes the cell.
    pub const fn reset(&mut self) {
        self.value = 0;
    }

    /// Drives the bus when addressed as the transfer source. `DEC` steps the
    /// register down before driving, so stack pops read below the pointer.
    pub const fn on_rising_edge(&mut self, bus: &mut SystemBus) {
        if bus.get_id() != self.id {
            return;
        }
        match bus.command() {
            BusCommand::Addr => {
                if bus.opflags() & OP_DEC != 0 {
                    self.value = self.value.wrapping_sub(1);
                    if bus.opflags() & OP_FLAGS != 0 {
                        bus.set_flag(FLAG_Z, self.value == 0);
                        bus.set_flag(FLAG_C, self.value == 0xFFFF);
                    }
                }
                let [lsb, msb] = self.value.to_le_bytes();
                bus.put_on_data_bus(lsb);
                bus.put_on_addr_bus(msb);
            }
            BusCommand::Data => {
                let [lsb, msb] = self.value.to_le_bytes();
                let driven = if bus.opflags() & OP_MSB != 0 { msb } else { lsb };
                bus.put_on_data_bus(driven);
            }
            BusCommand::Idle | BusCommand::Io => {}
        }
    }

    /// Latches the bus when addressed as the transfer target, and steps the
    /// register up after the target latched when this register drove an
    /// `INC` transfer.
    pub fn on_high_clock(&mut self, bus: &mut SystemBus) {
        if bus.put_id() == self.id {
            match bus.command() {
                BusCommand::Addr => {
                    self.value = u16::from_le_bytes([
                        bus.read_data_bus(),
                        bus.read_addr_bus(),
                    ]);
                }
                BusCommand::Data => self.latch_byte(bus),
                BusCommand::Idle | BusCommand::Io => {}
            }
        }
        if bus.get_id() == self.id
            && matches!(bus.command(), BusCommand::Addr)
            && bus.opflags() & OP_INC != 0
        {
            self.value = self.value.wrapping_add(1);
            if bus.opflags() & OP_FLAGS != 0 {
                bus.set_flag(FLAG_Z, self.value == 0);
                bus.set_flag(FLAG_C, self.value == 0);
            }
        }
    }

    fn latch_byte(&mut self, bus: &mut SystemBus) {
        let data = bus.read_data_bus();
        if bus.opflags() & OP_IDX != 0 {
            // Signed displacement: `MOV SI,BP[$xx]` style indexing.
            let displacement = i8::from_ne_bytes([data]);
            self.value = self.value.wrapping_add_signed(i16::from(displacement));
        } else if bus.opflags() & OP_MSB != 0 {
            let [lsb, _] = self.value.to_le_bytes();
            self.value = u16::from_le_bytes([lsb, data]);
        } else {
            let [_, msb] = self.value.to_le_bytes();
            self.value = u16::from_le_bytes([data, msb]);
        }
    }
}
