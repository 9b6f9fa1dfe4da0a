//! Boots the machine with the Fibonacci countdown program and prints what
//! it computes: `DI` ends holding fib(24).
//!
//! Run with `cargo run --example fibonacci`.

use jv80_core::component::DI;
use jv80_core::microcode::opcodes::{
    ADD_AB_CD, CLR_A, CLR_B, CLR_D, DEC_SI, HLT, JNZ, MOV_C_IMM, MOV_DI_CD,
    MOV_SI_IMM, SWP_A_C, SWP_B_D,
};
use jv80_core::{Backplane, Fault};

// Dev-dependencies are linked into examples but only used by the test
// harness; silence `unused_crate_dependencies` for this binary.
use proptest as _;
use rstest as _;
use thiserror as _;

const PROGRAM: [u8; 17] = [
    /* 0000 */ CLR_A,
    /* 0001 */ CLR_B,
    /* 0002 */ MOV_C_IMM, 0x01,
    /* 0004 */ CLR_D,
    /* 0005 */ MOV_SI_IMM, 0x17, 0x00,
    /* 0008 */ ADD_AB_CD,
    /* 0009 */ SWP_A_C,
    /* 000A */ SWP_B_D,
    /* 000B */ DEC_SI,
    /* 000C */ JNZ, 0x08, 0x00,
    /* 000F */ MOV_DI_CD,
    /* 0010 */ HLT,
];

fn main() -> Result<(), Fault> {
    let mut machine = Backplane::standard();
    machine
        .memory_mut()
        .expect("standard machine has memory")
        .add(0xC000, 0x2000, true)?;
    machine.load_image(0x0000, &PROGRAM, false)?;

    let cycles = machine.run()?;
    let result = machine
        .address_register(DI)
        .expect("standard machine has DI")
        .value();

    println!(
        "halted after {cycles} cycles / {} instructions, DI = {result}",
        machine.instructions()
    );
    Ok(())
}
