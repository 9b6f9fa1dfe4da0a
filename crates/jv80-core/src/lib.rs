//! Cycle-level emulator core for the JV80, a small 8/16-bit microcoded CPU
//! built from discrete parts: registers, an ALU, address registers, banked
//! memory, and a microcode-driven instruction controller sharing one system
//! bus.
//!
//! The crate models the hardware's semantics, not an abstract instruction
//! set: components react to clock edges, transfers ride a shared bus with
//! one driver per line, and every instruction is a fixed sequence of bus
//! micro-operations expanded from a static per-opcode table. Front-ends
//! (assembler, GUI, loaders) live elsewhere and consume this core by
//! installing bytes into memory, pulsing the clock, and reading state back.

/// Fault taxonomy shared by the whole core.
pub mod fault;
pub use fault::Fault;

/// The shared system bus, processor flags, and control lines.
pub mod bus;
pub use bus::{BusCommand, Event, RunMode, SystemBus};

/// Component addressing and clock-edge dispatch.
pub mod component;
pub use component::Component;

/// Bus-connected storage cells.
pub mod register;
pub use register::{AddressRegister, Register};

/// The arithmetic/logic unit.
pub mod alu;
pub use alu::{Alu, AluOp};

/// The banked address space.
pub mod memory;
pub use memory::{Memory, MemoryBank};

/// Peripheral I/O channels.
pub mod io;
pub use io::IoChannel;

/// Microcode model, the static opcode table, and the per-instruction
/// runner.
pub mod microcode;
pub use microcode::runner::MicroCodeRunner;
pub use microcode::{AddressingMode, Condition, MicroCode, MicroCodeStep, Operand};

/// The instruction controller.
pub mod controller;
pub use controller::Controller;

/// The machine assembly and clock driver.
pub mod backplane;
pub use backplane::Backplane;
