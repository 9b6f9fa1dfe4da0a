//! Per-instruction expansion and execution of a microcode entry.

use super::{Action, AddressingMode, Condition, MicroCode, MicroCodeStep};
use crate::bus::{OP_DONE, OP_HALT, OP_INC, OP_MASK, OP_MSB, OP_NONE, SystemBus};
use crate::component::{MEM, MEMADDR, PC, TX};
use crate::fault::Fault;

/// The concrete step program for one occurrence of one instruction.
///
/// Built once when the controller decodes an opcode: the condition is
/// evaluated against the flags as they stand, the addressing-mode fetch
/// steps are prepended, and the opcode body is appended through its first
/// `DONE` step. Execution afterwards is a pure index walk; nothing is
/// re-evaluated.
#[derive(Debug)]
pub struct MicroCodeRunner {
    mc: &'static MicroCode,
    steps: Vec<MicroCodeStep>,
    valid: bool,
    constant: u16,
    complete: bool,
}

impl MicroCodeRunner {
    /// Expands `mc` against the current flag state.
    #[must_use]
    pub fn new(mc: &'static MicroCode, bus: &SystemBus) -> Self {
        let valid = match mc.condition {
            Condition::Always => true,
            Condition::Set(flag) => bus.is_set(flag),
            Condition::Clear(flag) => !bus.is_set(flag),
        };
        let mut runner = Self {
            mc,
            steps: Vec::new(),
            valid,
            constant: 0,
            complete: false,
        };
        runner.fetch_steps();
        if !mc.fetch_only {
            for step in mc.steps {
                runner.steps.push(*step);
                if step.opflags & OP_DONE != 0 {
                    break;
                }
            }
        }
        runner
    }

    /// Whether the expanded program has a step at `index`.
    #[must_use]
    pub fn has_step(&self, index: usize) -> bool {
        self.steps.len() > index
    }

    /// The expanded program, in execution order.
    #[must_use]
    pub fn steps(&self) -> &[MicroCodeStep] {
        &self.steps
    }

    /// Whether the condition held when the runner was built.
    #[must_use]
    pub const fn valid(&self) -> bool {
        self.valid
    }

    /// Whether the display constant has fully resolved.
    #[must_use]
    pub const fn complete(&self) -> bool {
        self.complete
    }

    /// The operand constant assembled so far, for display only.
    #[must_use]
    pub const fn constant(&self) -> u16 {
        self.constant
    }

    /// Mnemonic with the `$xx` / `$xxxx` placeholder substituted once the
    /// constant is known, lowercased for display.
    #[must_use]
    pub fn instruction(&self) -> String {
        let template = self.mc.instruction;
        let formatted = if template.contains("$xxxx") {
            template.replace("$xxxx", &format!("${:04x}", self.constant))
        } else if template.contains("$xx") {
            template.replace("$xx", &format!("${:02x}", self.constant))
        } else {
            template.to_string()
        };
        formatted.to_lowercase()
    }

    /// Executes the step at `index`, resolving scratch indirections through
    /// the controller's `scratch` byte.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InvalidMicroCode`] for an action/op-flag pairing the
    /// bus cannot execute.
    pub fn execute_step(
        &self,
        index: usize,
        scratch: u8,
        bus: &mut SystemBus,
    ) -> Result<(), Fault> {
        let step = self.steps[index];
        let src = step.src.resolve(scratch);
        let target = step.target.resolve(scratch);
        match step.action {
            Action::XData => bus.xdata(src, target, step.opflags & OP_MASK),
            Action::XAddr => bus.xaddr(src, target, step.opflags & OP_MASK),
            Action::Io => bus.io(src, target, step.opflags & OP_MASK),
            Action::Other => match step.opflags & OP_MASK {
                OP_HALT => bus.stop(),
                _ => {
                    return Err(Fault::InvalidMicroCode {
                        opcode: self.mc.opcode,
                        step: index,
                    })
                }
            },
        }
        Ok(())
    }

    /// Assembles the display constant from bus traffic. Called on every high
    /// clock with the controller's step counter; returns whether the
    /// constant just became complete. Feeds disassembly only, never control
    /// flow.
    pub fn grab_constant(&mut self, step: i32, bus: &SystemBus) -> bool {
        match self.mc.addressing_mode {
            AddressingMode::Implied => {
                self.complete = step == 1;
            }
            AddressingMode::ImmediateByte
            | AddressingMode::ImpliedByte
            | AddressingMode::IndexedByte
            | AddressingMode::IndexedWord => {
                if step == 2 {
                    self.constant = u16::from(bus.read_data_bus());
                    self.complete = true;
                }
            }
            AddressingMode::ImmediateWord
            | AddressingMode::ImpliedWord
            | AddressingMode::IndirectByte
            | AddressingMode::IndirectWord => {
                if step == 2 {
                    self.constant = u16::from(bus.read_data_bus());
                } else if step == 4 {
                    self.constant |= u16::from(bus.read_data_bus()) << 8;
                    self.complete = true;
                }
            }
        }
        self.complete
    }

    fn fetch_steps(&mut self) {
        match self.mc.addressing_mode {
            AddressingMode::ImmediateByte => self.fetch_immediate_byte(),
            AddressingMode::ImmediateWord => self.fetch_immediate_word(),
            AddressingMode::IndirectByte => self.fetch_indirect_byte(),
            AddressingMode::IndirectWord => self.fetch_indirect_word(),
            AddressingMode::IndexedByte | AddressingMode::IndexedWord => {
                self.fetch_indexed();
            }
            AddressingMode::Implied
            | AddressingMode::ImpliedByte
            | AddressingMode::ImpliedWord => {}
        }
    }

    /// One byte at `[PC++]`. An invalidated instruction still consumes its
    /// operand, into the TX scratch instead of the subject.
    fn fetch_immediate_byte(&mut self) {
        let target = if self.valid { self.mc.subject } else { TX };
        self.push(MicroCodeStep::xaddr(PC, MEMADDR, OP_INC));
        self.push(MicroCodeStep::xdata(MEM, target, OP_NONE));
    }

    /// Two bytes at `[PC++]`, LSB first. Subjects that are themselves part
    /// of the fetch path (`PC`, `MEMADDR`) stage through TX and get one
    /// copy step at the end.
    fn fetch_immediate_word(&mut self) {
        let subject = self.mc.subject;
        let target = if self.valid && subject != PC && subject != MEMADDR {
            subject
        } else {
            TX
        };
        self.push(MicroCodeStep::xaddr(PC, MEMADDR, OP_INC));
        self.push(MicroCodeStep::xdata(MEM, target, OP_NONE));
        self.push(MicroCodeStep::xaddr(PC, MEMADDR, OP_INC));
        self.push(MicroCodeStep::xdata(MEM, target, OP_MSB));
        if self.valid && subject != target {
            self.push(MicroCodeStep::xaddr(TX, subject, OP_NONE));
        }
    }

    /// A pointer word at `[PC++]`, then the addressed byte. The dereference
    /// happens only when the condition held.
    fn fetch_indirect_byte(&mut self) {
        self.push(MicroCodeStep::xaddr(PC, MEMADDR, OP_INC));
        self.push(MicroCodeStep::xdata(MEM, TX, OP_NONE));
        self.push(MicroCodeStep::xaddr(PC, MEMADDR, OP_INC));
        self.push(MicroCodeStep::xdata(MEM, TX, OP_MSB));
        if self.valid {
            self.push(MicroCodeStep::xaddr(TX, MEMADDR, OP_NONE));
            self.push(MicroCodeStep::xdata(MEM, self.mc.subject, OP_NONE));
        }
    }

    /// A pointer word at `[PC++]`, then the addressed word.
    fn fetch_indirect_word(&mut self) {
        self.push(MicroCodeStep::xaddr(PC, MEMADDR, OP_INC));
        self.push(MicroCodeStep::xdata(MEM, TX, OP_NONE));
        self.push(MicroCodeStep::xaddr(PC, MEMADDR, OP_INC));
        self.push(MicroCodeStep::xdata(MEM, TX, OP_MSB));
        if self.valid {
            self.push(MicroCodeStep::xaddr(TX, MEMADDR, OP_NONE));
            self.push(MicroCodeStep::xdata(MEM, self.mc.subject, OP_INC));
            self.push(MicroCodeStep::xdata(MEM, self.mc.subject, OP_MSB));
        }
    }

    /// A signed displacement byte at `[PC++]`, folded into `MEMADDR` after
    /// the subject register was driven there.
    fn fetch_indexed(&mut self) {
        self.push(MicroCodeStep::xaddr(PC, MEMADDR, OP_INC));
        self.push(MicroCodeStep::xdata(MEM, TX, OP_NONE));
        self.push(MicroCodeStep::xaddr(self.mc.subject, MEMADDR, OP_NONE));
        self.push(MicroCodeStep::xdata(TX, MEMADDR, crate::bus::OP_IDX));
    }

    fn push(&mut self, step: MicroCodeStep) {
        self.steps.push(step);
    }
}
