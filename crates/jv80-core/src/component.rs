//! Component addressing and clock-edge dispatch.
//!
//! Every component hangs off the bus under a 4-bit address. A component may
//! answer under a second address (its alias) when it plays two roles: the
//! controller is both the instruction register `IR` and the `CONTROLLER`
//! interrupt-vector port, and memory is both the `MEM` data port and the
//! `MEMADDR` address latch.

use crate::alu::Alu;
use crate::bus::SystemBus;
use crate::controller::Controller;
use crate::fault::Fault;
use crate::memory::Memory;
use crate::register::{AddressRegister, Register};

/// General-purpose register A.
pub const GP_A: u8 = 0x00;
/// General-purpose register B.
pub const GP_B: u8 = 0x01;
/// General-purpose register C.
pub const GP_C: u8 = 0x02;
/// General-purpose register D.
pub const GP_D: u8 = 0x03;
/// The ALU's left-hand operand and result cell.
pub const LHS: u8 = 0x04;
/// The ALU itself; latching here with an operation selector computes.
pub const RHS: u8 = 0x05;
/// The instruction register inside the controller.
pub const IR: u8 = 0x06;
/// Memory data port: drives or latches the byte at the current `MEMADDR`.
pub const MEM: u8 = 0x07;
/// Program counter.
pub const PC: u8 = 0x08;
/// Stack pointer.
pub const SP: u8 = 0x09;
/// Frame base pointer.
pub const BP: u8 = 0x0A;
/// Source index register.
pub const SI: u8 = 0x0B;
/// Destination index register.
pub const DI: u8 = 0x0C;
/// Transfer scratch register used by addressing-mode expansion.
pub const TX: u8 = 0x0D;
/// Controller port: scratch byte over data transfers, interrupt vector over
/// 16-bit transfers.
pub const CONTROLLER: u8 = 0x0E;
/// Memory address latch.
pub const MEMADDR: u8 = 0x0F;

/// Number of component addresses on the backplane.
pub const COMPONENTS: usize = 16;

/// One bus-connected component, dispatched by kind.
#[derive(Debug)]
pub enum Component {
    /// An 8-bit storage cell.
    Register(Register),
    /// A 16-bit storage cell with increment/decrement/index support.
    AddressRegister(AddressRegister),
    /// The arithmetic/logic unit.
    Alu(Alu),
    /// The instruction controller.
    Controller(Controller),
    /// The banked address space.
    Memory(Memory),
}

impl Component {
    /// Primary bus address of this component.
    #[must_use]
    pub const fn id(&self) -> u8 {
        match self {
            Self::Register(r) => r.id(),
            Self::AddressRegister(r) => r.id(),
            Self::Alu(_) => RHS,
            Self::Controller(_) => IR,
            Self::Memory(_) => MEMADDR,
        }
    }

    /// Secondary bus address, equal to [`id`](Self::id) for single-role
    /// components.
    #[must_use]
    pub const fn alias(&self) -> u8 {
        match self {
            Self::Register(r) => r.id(),
            Self::AddressRegister(r) => r.id(),
            Self::Alu(_) => LHS,
            Self::Controller(_) => CONTROLLER,
            Self::Memory(_) => MEM,
        }
    }

    /// Restores power-on state. Memory banks and their contents survive.
    pub fn reset(&mut self) {
        match self {
            Self::Register(r) => r.reset(),
            Self::AddressRegister(r) => r.reset(),
            Self::Alu(a) => a.reset(),
            Self::Controller(c) => c.reset(),
            Self::Memory(m) => m.reset(),
        }
    }

    /// Rising clock edge: the addressed source drives the bus.
    ///
    /// # Errors
    ///
    /// Propagates [`Fault::UnmappedAddress`] when memory is asked to drive
    /// from an unmapped location.
    pub fn on_rising_edge(&mut self, bus: &mut SystemBus) -> Result<(), Fault> {
        match self {
            Self::Register(r) => {
                r.on_rising_edge(bus);
                Ok(())
            }
            Self::AddressRegister(r) => {
                r.on_rising_edge(bus);
                Ok(())
            }
            Self::Alu(a) => {
                a.on_rising_edge(bus);
                Ok(())
            }
            Self::Controller(c) => {
                c.on_rising_edge(bus);
                Ok(())
            }
            Self::Memory(m) => m.on_rising_edge(bus),
        }
    }

    /// High clock phase: the addressed target latches the bus.
    ///
    /// # Errors
    ///
    /// Propagates [`Fault::UnmappedAddress`] when memory is asked to latch
    /// into an unmapped location.
    pub fn on_high_clock(&mut self, bus: &mut SystemBus) -> Result<(), Fault> {
        match self {
            Self::Register(r) => {
                r.on_high_clock(bus);
                Ok(())
            }
            Self::AddressRegister(r) => {
                r.on_high_clock(bus);
                Ok(())
            }
            Self::Alu(a) => {
                a.on_high_clock(bus);
                Ok(())
            }
            Self::Controller(c) => {
                c.on_high_clock(bus);
                Ok(())
            }
            Self::Memory(m) => m.on_high_clock(bus),
        }
    }

    /// Low clock phase: sequencing logic settles. Only the controller does
    /// work here.
    ///
    /// # Errors
    ///
    /// Propagates microcode faults raised by the controller's step machine.
    pub fn on_low_clock(&mut self, bus: &mut SystemBus) -> Result<(), Fault> {
        match self {
            Self::Controller(c) => c.on_low_clock(bus),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Component, CONTROLLER, GP_A, IR, LHS, MEM, MEMADDR, RHS};
    use crate::alu::Alu;
    use crate::controller::Controller;
    use crate::memory::Memory;
    use crate::microcode::table::MICROCODE;
    use crate::register::Register;

    #[test]
    fn single_role_components_alias_themselves() {
        let c = Component::Register(Register::new(GP_A, "A"));
        assert_eq!(c.id(), GP_A);
        assert_eq!(c.alias(), GP_A);
    }

    #[test]
    fn dual_role_components_answer_under_two_addresses() {
        let alu = Component::Alu(Alu::new());
        assert_eq!(alu.id(), RHS);
        assert_eq!(alu.alias(), LHS);

        let controller = Component::Controller(Controller::new(&MICROCODE));
        assert_eq!(controller.id(), IR);
        assert_eq!(controller.alias(), CONTROLLER);

        let memory = Component::Memory(Memory::new());
        assert_eq!(memory.id(), MEMADDR);
        assert_eq!(memory.alias(), MEM);
    }
}
