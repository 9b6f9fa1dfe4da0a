//! The microcode-driven instruction controller.
//!
//! The controller is itself a register: its cell is the instruction register
//! `IR`, and under its `CONTROLLER` alias it serves the scratch byte (data
//! transfers) and the interrupt vector (16-bit transfers). Its low-clock
//! handler is the machine's sequencer: fetch, decode, execute one expanded
//! microcode step per pulse.

use crate::bus::{
    BusCommand, Event, RunMode, SystemBus, OP_INC, OP_MSB, OP_NONE,
};
use crate::component::{CONTROLLER, IR, MEM, MEMADDR, PC, RHS, SP};
use crate::fault::Fault;
use crate::microcode::runner::MicroCodeRunner;
use crate::microcode::{opcodes, AddressingMode, Condition, MicroCode, MicroCodeStep};

/// The fixed interrupt-servicing micro-program: push flags, push the resume
/// address, load `PC` from the controller's interrupt vector.
static MC_NMI: MicroCode = MicroCode {
    opcode: opcodes::NMIVEC,
    instruction: "__nmi",
    addressing_mode: AddressingMode::Implied,
    fetch_only: false,
    subject: 0,
    condition: Condition::Always,
    steps: &[
        MicroCodeStep::xaddr(SP, MEMADDR, OP_INC),
        MicroCodeStep::xaddr(RHS, MEM, OP_NONE),
        MicroCodeStep::xaddr(SP, MEMADDR, OP_INC),
        MicroCodeStep::xdata(PC, MEM, OP_NONE),
        MicroCodeStep::xaddr(SP, MEMADDR, OP_INC),
        MicroCodeStep::xdata(PC, MEM, OP_MSB),
        MicroCodeStep::xaddr(CONTROLLER, PC, crate::bus::OP_DONE),
    ],
};

/// Sentinel meaning "no interrupt vector configured".
const NO_VECTOR: u16 = 0xFFFF;

/// How far the suspend counter rewinds when a break-at-instruction hits, so
/// the gate does not retrigger while the stopped instruction drains.
const SUSPEND_REWIND: i32 = -16;

/// The instruction-sequencing state machine.
#[derive(Debug)]
pub struct Controller {
    value: u16,
    step: u8,
    scratch: u8,
    interrupt_vector: u16,
    servicing_nmi: bool,
    microcode: &'static [MicroCode; 256],
    runner: Option<MicroCodeRunner>,
    suspended: i32,
}

impl Controller {
    /// Creates a controller decoding against `microcode`.
    #[must_use]
    pub const fn new(microcode: &'static [MicroCode; 256]) -> Self {
        Self {
            value: 0,
            step: 0,
            scratch: 0,
            interrupt_vector: NO_VECTOR,
            servicing_nmi: false,
            microcode,
            runner: None,
            suspended: 0,
        }
    }

    /// Current instruction-register value.
    #[must_use]
    pub const fn ir(&self) -> u8 {
        let [lsb, _] = self.value.to_le_bytes();
        lsb
    }

    /// Micro-step counter within the current instruction.
    #[must_use]
    pub const fn step(&self) -> u8 {
        self.step
    }

    /// The internal scratch byte used for `DEREF`-style indirection.
    #[must_use]
    pub const fn scratch(&self) -> u8 {
        self.scratch
    }

    /// The configured NMI service vector, `0xFFFF` when unset.
    #[must_use]
    pub const fn interrupt_vector(&self) -> u16 {
        self.interrupt_vector
    }

    /// Whether an NMI is currently being serviced.
    #[must_use]
    pub const fn servicing_nmi(&self) -> bool {
        self.servicing_nmi
    }

    /// Mnemonic of the executing instruction, operand substituted once
    /// known; `"----"` between instructions.
    #[must_use]
    pub fn instruction(&self) -> String {
        self.runner
            .as_ref()
            .map_or_else(|| "----".to_string(), MicroCodeRunner::instruction)
    }

    /// Operand constant of the executing instruction, for display.
    #[must_use]
    pub fn constant(&self) -> u16 {
        self.runner.as_ref().map_or(0, MicroCodeRunner::constant)
    }

    /// Static mnemonic lookup by opcode byte; undefined opcodes read as
    /// `"NOP"`.
    #[must_use]
    pub fn mnemonic_for_opcode(&self, opcode: u8) -> &'static str {
        let mc = &self.microcode[usize::from(opcode)];
        if mc.opcode == opcode {
            mc.instruction
        } else {
            "NOP"
        }
    }

    /// Reverse mnemonic lookup over the whole table, for assemblers.
    #[must_use]
    pub fn opcode_for_mnemonic(&self, mnemonic: &str) -> Option<u8> {
        (0..=u8::MAX).find(|&opcode| {
            let mc = &self.microcode[usize::from(opcode)];
            mc.opcode == opcode && mc.instruction == mnemonic
        })
    }

    /// Zeroes the sequencer: step counter, instruction register, runner,
    /// and interrupt bookkeeping. A fixed instruction stream replays
    /// identically after this, no matter what ran before.
    pub fn reset(&mut self) {
        self.value = 0;
        self.step = 0;
        self.scratch = 0;
        self.servicing_nmi = false;
        self.runner = None;
        self.suspended = 0;
    }

    /// Serves the controller's bus-source roles: the scratch byte on data
    /// transfers, the interrupt vector on 16-bit transfers. Otherwise
    /// behaves as the plain `IR` register.
    pub fn on_rising_edge(&mut self, bus: &mut SystemBus) {
        if bus.get_id() == CONTROLLER {
            match bus.command() {
                BusCommand::Data => bus.put_on_data_bus(self.scratch),
                BusCommand::Addr => {
                    let [lsb, msb] = self.interrupt_vector.to_le_bytes();
                    bus.put_on_data_bus(lsb);
                    bus.put_on_addr_bus(msb);
                }
                BusCommand::Idle | BusCommand::Io => {}
            }
        } else if bus.get_id() == IR
            && matches!(bus.command(), BusCommand::Data)
        {
            bus.put_on_data_bus(self.ir());
        }
    }

    /// Latches the controller's bus-target roles and advances the constant
    /// grabber of the active runner.
    pub fn on_high_clock(&mut self, bus: &mut SystemBus) {
        if bus.put_id() == CONTROLLER {
            match bus.command() {
                BusCommand::Data => self.scratch = bus.read_data_bus(),
                BusCommand::Addr => {
                    self.interrupt_vector = u16::from_le_bytes([
                        bus.read_data_bus(),
                        bus.read_addr_bus(),
                    ]);
                }
                BusCommand::Idle | BusCommand::Io => {}
            }
        } else if bus.put_id() == IR {
            match bus.command() {
                BusCommand::Data => self.value = u16::from(bus.read_data_bus()),
                BusCommand::Addr => {
                    self.value = u16::from_le_bytes([
                        bus.read_data_bus(),
                        bus.read_addr_bus(),
                    ]);
                }
                BusCommand::Idle | BusCommand::Io => {}
            }
        }
        self.suspended += 1;
        let step = i32::from(self.step) - 2;
        if let Some(runner) = self.runner.as_mut() {
            if runner.grab_constant(step, bus) {
                bus.push_event(Event::ValueChanged);
            }
        }
    }

    /// One sequencer step: fetch address, fetch opcode, decode (with NMI
    /// gating), execute the next expanded microcode step, or close out the
    /// instruction and start the next fetch.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::MicroCodeMismatch`] when the decoded table entry is
    /// inconsistent, or [`Fault::InvalidMicroCode`] from step execution.
    /// Either fault aborts the pulse with all state left as it stands.
    pub fn on_low_clock(&mut self, bus: &mut SystemBus) -> Result<(), Fault> {
        if self.suspended >= 1
            && bus.run_mode() == RunMode::BreakAtInstruction
            && self.runner.as_ref().is_some_and(MicroCodeRunner::complete)
        {
            self.suspended = SUSPEND_REWIND;
            bus.suspend();
            return Ok(());
        }

        match self.step {
            0 => bus.xaddr(PC, MEMADDR, OP_INC),
            1 => {
                bus.xdata(MEM, IR, OP_NONE);
                self.suspended = 0;
            }
            _ => {
                if self.step == 2 {
                    self.decode(bus)?;
                }
                let index = usize::from(self.step) - 2;
                if let Some(runner) =
                    self.runner.as_ref().filter(|r| r.has_step(index))
                {
                    runner.execute_step(index, self.scratch, bus)?;
                    if bus.halted() {
                        bus.push_event(Event::AfterInstruction);
                    }
                } else {
                    self.finish_instruction(bus);
                }
            }
        }

        self.step = self.step.wrapping_add(1);
        bus.push_event(Event::StepChanged);
        if bus.run_mode() == RunMode::BreakAtClock {
            bus.suspend();
        }
        Ok(())
    }

    /// Decode phase. A pending NMI preempts the table lookup and switches to
    /// the interrupt micro-program unless one is already in service or no
    /// vector is configured.
    fn decode(&mut self, bus: &mut SystemBus) -> Result<(), Fault> {
        let mc: Option<&'static MicroCode> = if bus.nmi_pending() {
            let mut service = None;
            if self.interrupt_vector != NO_VECTOR && !self.servicing_nmi {
                self.servicing_nmi = true;
                service = Some(&MC_NMI);
            }
            bus.clear_nmi();
            service
        } else {
            let opcode = self.ir();
            let mc = &self.microcode[usize::from(opcode)];
            if !mc.defined() {
                None
            } else if mc.opcode == opcode {
                Some(mc)
            } else {
                return Err(Fault::MicroCodeMismatch {
                    index: opcode,
                    found: mc.opcode,
                });
            }
        };
        self.runner = mc.map(|mc| MicroCodeRunner::new(mc, bus));
        Ok(())
    }

    /// Instruction boundary: report completion, clear the runner, and start
    /// the next fetch. When no NMI is pending the fetch-address transfer is
    /// issued right here and the step counter lands on the opcode-fetch
    /// phase; a pending NMI instead short-cuts straight to decode, where the
    /// interrupt micro-program takes over.
    fn finish_instruction(&mut self, bus: &mut SystemBus) {
        if self.ir() == opcodes::RTI {
            self.servicing_nmi = false;
        }
        bus.push_event(Event::AfterInstruction);
        self.runner = None;
        self.value = 0;
        if bus.nmi_pending() {
            self.step = 1;
        } else {
            self.step = 0;
            bus.xaddr(PC, MEMADDR, OP_INC);
        }
    }
}
