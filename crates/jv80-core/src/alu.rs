//! The arithmetic/logic unit.
//!
//! The ALU is wired as a pair of bus-addressable cells: `LHS` holds the left
//! operand and receives the result, `RHS` is the ALU proper. Latching a byte
//! into `RHS` with an operation selector in the op-flag nibble computes
//! combinationally on the same high clock, updates the processor flags, and
//! writes the result back into `LHS` — which is why results are read back out
//! of `LHS` rather than a dedicated accumulator.
//!
//! Addressed over `xaddr`, the ALU is also the machine's flags port: as a
//! source it drives the flags byte (used to push flags), as a target it
//! replaces them (used to pop flags).

use crate::bus::{
    BusCommand, SystemBus, FLAG_C, FLAG_N, FLAG_V, FLAG_Z,
};
use crate::component::{LHS, RHS};

/// ALU operation selector, carried in the op-flag nibble of the microcode
/// step that latches the right-hand operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum AluOp {
    /// `LHS + RHS`.
    Add = 0x0,
    /// `LHS + RHS + C`.
    Adc = 0x1,
    /// `LHS - RHS`.
    Sub = 0x2,
    /// `LHS - RHS - C`.
    Sbb = 0x3,
    /// Bitwise and.
    And = 0x4,
    /// Bitwise or.
    Or = 0x5,
    /// Bitwise exclusive or.
    Xor = 0x6,
    /// `RHS + 1`. Wrapping `0xFF` sets both Zero and Carry.
    Inc = 0x7,
    /// `RHS - 1`.
    Dec = 0x8,
    /// Bitwise complement of `RHS`.
    Not = 0x9,
    /// Shift `RHS` left one bit, rotating the carry flag in and the high bit
    /// out.
    Shl = 0xA,
    /// Shift `RHS` right one bit, rotating the carry flag in and the low bit
    /// out.
    Shr = 0xB,
    /// Produce zero.
    Clr = 0xE,
}

impl AluOp {
    /// The selector value as carried in a microcode step's op-flags.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decodes an op-flag nibble into an operation. `0xC`, `0xD` and `0xF`
    /// are unassigned selectors.
    #[must_use]
    pub const fn from_u8(bits: u8) -> Option<Self> {
        match bits {
            0x0 => Some(Self::Add),
            0x1 => Some(Self::Adc),
            0x2 => Some(Self::Sub),
            0x3 => Some(Self::Sbb),
            0x4 => Some(Self::And),
            0x5 => Some(Self::Or),
            0x6 => Some(Self::Xor),
            0x7 => Some(Self::Inc),
            0x8 => Some(Self::Dec),
            0x9 => Some(Self::Not),
            0xA => Some(Self::Shl),
            0xB => Some(Self::Shr),
            0xE => Some(Self::Clr),
            _ => None,
        }
    }
}

/// The ALU component, owning both operand cells.
#[derive(Debug, Default)]
pub struct Alu {
    lhs: u16,
    rhs: u16,
}

impl Alu {
    /// Creates an ALU with both cells zeroed.
    #[must_use]
    pub const fn new() -> Self {
        Self { lhs: 0, rhs: 0 }
    }

    /// Value of the left-hand cell (operand in, result out).
    #[must_use]
    pub const fn lhs(&self) -> u8 {
        let [lsb, _] = self.lhs.to_le_bytes();
        lsb
    }

    /// Value of the right-hand cell.
    #[must_use]
    pub const fn rhs(&self) -> u8 {
        let [lsb, _] = self.rhs.to_le_bytes();
        lsb
    }

    /// Overwrites the left-hand cell out-of-band.
    pub fn set_lhs(&mut self, value: u8) {
        self.lhs = u16::from(value);
    }

    /// Zeroes both cells.
    pub const fn reset(&mut self) {
        self.lhs = 0;
        self.rhs = 0;
    }

    /// Drives the bus: either operand cell over data transfers, the flags
    /// byte over 16-bit transfers.
    pub fn on_rising_edge(&mut self, bus: &mut SystemBus) {
        match bus.command() {
            BusCommand::Data if bus.get_id() == LHS => {
                bus.put_on_data_bus(self.lhs());
            }
            BusCommand::Data if bus.get_id() == RHS => {
                bus.put_on_data_bus(self.rhs());
            }
            BusCommand::Addr if bus.get_id() == RHS => {
                bus.put_on_addr_bus(0x00);
                bus.put_on_data_bus(bus.flags());
            }
            _ => {}
        }
    }

    /// Latches operands; latching `RHS` with an operation selector computes.
    /// A 16-bit transfer into `RHS` instead replaces the processor flags.
    pub fn on_high_clock(&mut self, bus: &mut SystemBus) {
        match bus.command() {
            BusCommand::Data if bus.put_id() == LHS => {
                self.lhs = u16::from(bus.read_data_bus());
            }
            BusCommand::Data if bus.put_id() == RHS => {
                self.rhs = u16::from(bus.read_data_bus());
                if let Some(op) = AluOp::from_u8(bus.opflags()) {
                    self.apply(op, bus);
                }
            }
            BusCommand::Addr if bus.put_id() == RHS => {
                bus.set_flags(bus.read_data_bus());
            }
            _ => {}
        }
    }

    /// Runs one operation: 9-bit arithmetic with bit 8 as the carry out.
    fn apply(&mut self, op: AluOp, bus: &mut SystemBus) {
        let lhs = self.lhs;
        let rhs = self.rhs;
        let carry_in = u16::from(bus.is_set(FLAG_C));

        let result: u16 = match op {
            AluOp::Add => lhs + rhs,
            AluOp::Adc => lhs + rhs + carry_in,
            AluOp::Sub => lhs.wrapping_sub(rhs),
            AluOp::Sbb => lhs.wrapping_sub(rhs).wrapping_sub(carry_in),
            AluOp::And => lhs & rhs,
            AluOp::Or => lhs | rhs,
            AluOp::Xor => lhs ^ rhs,
            AluOp::Inc => rhs + 1,
            AluOp::Dec => rhs.wrapping_sub(1),
            AluOp::Not => !rhs & 0x00FF,
            AluOp::Shl => ((rhs << 1) | carry_in) & 0x01FF,
            AluOp::Shr => {
                let mut shifted = (rhs >> 1) | (carry_in << 7);
                shifted &= 0x00FF;
                if rhs & 0x0001 != 0 {
                    shifted |= 0x0100;
                }
                shifted
            }
            AluOp::Clr => 0,
        };

        let [value, _] = result.to_le_bytes();
        bus.clear_flags();
        bus.set_flag(FLAG_Z, value == 0);
        bus.set_flag(FLAG_C, result & 0x0100 != 0);
        bus.set_flag(FLAG_N, value & 0x80 != 0);
        self.set_overflow(op, result, bus);
        self.lhs = u16::from(value);
    }

    /// Signed-overflow rule: adding two same-signed operands must keep the
    /// sign; subtracting follows from sub = add of the negation. Only the
    /// four carry-family operations are judged.
    fn set_overflow(&self, op: AluOp, result: u16, bus: &mut SystemBus) {
        let s1 = self.lhs & 0x80 != 0;
        let s2 = self.rhs & 0x80 != 0;
        let sr = result & 0x80 != 0;
        match op {
            AluOp::Add | AluOp::Adc => {
                bus.set_flag(FLAG_V, (s1 == s2) && (sr != s1));
            }
            AluOp::Sub | AluOp::Sbb => {
                bus.set_flag(FLAG_V, (s1 != s2) && (sr != s1));
            }
            _ => {}
        }
    }
}
