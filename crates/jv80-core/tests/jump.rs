//! Jump, call, and interrupt scenarios.

mod common;

use common::{check_cycles, load, machine, peek, RAM_START, ROM_START};
use jv80_core::component::{DI, GP_A, GP_B, GP_C, GP_D, PC, SI, SP};
use jv80_core::microcode::opcodes::{
    CALL, CALL_IND, HLT, JC, JC_IND, JMP, JMP_IND, JNC, JNZ, JNZ_IND, JV,
    JV_IND, JZ, JZ_IND, MOV_A_IMM, MOV_B_IMM, MOV_C_IMM, MOV_DI_IMM,
    MOV_D_IMM, MOV_SI_IMM, NMIVEC, NOP, RET, RTI,
};
use jv80_core::bus::{Event, FLAG_C, FLAG_V, FLAG_Z};
use jv80_core::Backplane;
use rstest::rstest;

use proptest as _;
use thiserror as _;

fn gp(plane: &Backplane, id: u8) -> u8 {
    plane.register(id).expect("register wired").byte()
}

/// Runs the immediate-jump probe: the taken path loads `A = 0x42`, the
/// fall-through path loads `A = 0x37`.
fn probe_jump_immediate(opcode: u8, flags: u8, taken: bool) {
    let mut plane = machine();
    load(
        &mut plane,
        RAM_START,
        &[
            opcode, 0x06, 0x20,
            MOV_A_IMM, 0x37,
            HLT,
            MOV_A_IMM, 0x42,
            HLT,
        ],
    );
    plane.bus_mut().set_flags(flags);

    check_cycles(&mut plane, if taken { 14 } else { 13 });
    assert_eq!(gp(&plane, GP_A), if taken { 0x42 } else { 0x37 });
}

/// As [`probe_jump_immediate`] for the indirect jumps, with the target
/// address stored behind a pointer.
fn probe_jump_indirect(opcode: u8, flags: u8, taken: bool) {
    let mut plane = machine();
    load(
        &mut plane,
        RAM_START,
        &[
            opcode, 0x09, 0x20,
            MOV_A_IMM, 0x37,
            HLT,
            MOV_A_IMM, 0x42,
            HLT,
            0x06, 0x20,
        ],
    );
    plane.bus_mut().set_flags(flags);

    check_cycles(&mut plane, if taken { 16 } else { 13 });
    assert_eq!(gp(&plane, GP_A), if taken { 0x42 } else { 0x37 });
}

#[rstest]
#[case::jmp(JMP, 0, true)]
#[case::jc_carry_set(JC, FLAG_C, true)]
#[case::jc_carry_clear(JC, 0, false)]
#[case::jnc_carry_clear(JNC, 0, true)]
#[case::jnc_carry_set(JNC, FLAG_C, false)]
#[case::jnz_zero_clear(JNZ, 0, true)]
#[case::jnz_zero_set(JNZ, FLAG_Z, false)]
#[case::jz_zero_set(JZ, FLAG_Z, true)]
#[case::jz_zero_clear(JZ, 0, false)]
#[case::jv_overflow_set(JV, FLAG_V, true)]
#[case::jv_overflow_clear(JV, 0, false)]
fn immediate_jumps_follow_the_flags(
    #[case] opcode: u8,
    #[case] flags: u8,
    #[case] taken: bool,
) {
    probe_jump_immediate(opcode, flags, taken);
}

#[rstest]
#[case::jmp(JMP_IND, 0, true)]
#[case::jc_carry_set(JC_IND, FLAG_C, true)]
#[case::jc_carry_clear(JC_IND, 0, false)]
#[case::jnz_zero_clear(JNZ_IND, 0, true)]
#[case::jnz_zero_set(JNZ_IND, FLAG_Z, false)]
#[case::jz_zero_set(JZ_IND, FLAG_Z, true)]
#[case::jz_zero_clear(JZ_IND, 0, false)]
#[case::jv_overflow_set(JV_IND, FLAG_V, true)]
#[case::jv_overflow_clear(JV_IND, 0, false)]
fn indirect_jumps_follow_the_flags(
    #[case] opcode: u8,
    #[case] flags: u8,
    #[case] taken: bool,
) {
    probe_jump_indirect(opcode, flags, taken);
}

#[test]
fn call_pushes_the_return_address_and_ret_pops_it() {
    let mut plane = machine();
    load(
        &mut plane,
        ROM_START,
        &[
            MOV_A_IMM, 0x37,
            CALL, 0x06, 0x80,
            HLT,
            MOV_A_IMM, 0x42,
            RET,
        ],
    );
    plane
        .address_register_mut(SP)
        .expect("SP wired")
        .set_value(RAM_START);

    check_cycles(&mut plane, 28);
    assert_eq!(gp(&plane, GP_A), 0x42);
    // The return address (0x8005) went through the stack.
    assert_eq!(peek(&plane, 0x2000), 0x05);
    assert_eq!(peek(&plane, 0x2001), 0x80);
}

#[test]
fn call_indirect_reads_the_target_through_a_pointer() {
    let mut plane = machine();
    load(
        &mut plane,
        ROM_START,
        &[
            MOV_A_IMM, 0x37,
            CALL_IND, 0x09, 0x80,
            HLT,
            MOV_A_IMM, 0x42,
            RET,
            0x06, 0x80,
        ],
    );
    plane
        .address_register_mut(SP)
        .expect("SP wired")
        .set_value(RAM_START);

    check_cycles(&mut plane, 31);
    assert_eq!(gp(&plane, GP_A), 0x42);
}

#[test]
fn nmi_services_through_the_vector_and_rti_returns() {
    let mut plane = machine();
    load(
        &mut plane,
        ROM_START,
        &[
            /* 8000 */ NMIVEC, 0x13, 0x80,
            /* 8003 */ MOV_A_IMM, 0x30,
            /* 8005 */ MOV_B_IMM, 0x31,
            /* 8007 */ MOV_C_IMM, 0x32,
            /* 8009 */ MOV_D_IMM, 0x33,
            /* 800B */ MOV_SI_IMM, 0x34, 0x35,
            /* 800E */ MOV_DI_IMM, 0x36, 0x37,
            /* 8011 */ NOP,
            /* 8012 */ HLT,
            /* 8013 */ NOP, // NMI service routine
            /* 8014 */ RTI,
        ],
    );
    plane
        .address_register_mut(SP)
        .expect("SP wired")
        .set_value(RAM_START);

    // Assert the NMI line at the boundary after the last register load.
    let mut cycles = 0_u64;
    while !plane.bus().halted() {
        plane.cycle().expect("clean pulse");
        cycles += 1;
        assert!(cycles < 1000, "program must halt");
        let at_boundary = plane
            .drain_events()
            .contains(&Event::AfterInstruction);
        if at_boundary
            && plane.address_register(PC).expect("PC wired").value() == 0x8011
        {
            plane.bus_mut().set_nmi();
        }
    }

    assert_eq!(cycles, 57);
    assert_eq!(gp(&plane, GP_A), 0x30);
    assert_eq!(gp(&plane, GP_B), 0x31);
    assert_eq!(gp(&plane, GP_C), 0x32);
    assert_eq!(gp(&plane, GP_D), 0x33);
    assert_eq!(
        plane.address_register(SI).expect("SI wired").value(),
        0x3534
    );
    assert_eq!(
        plane.address_register(DI).expect("DI wired").value(),
        0x3736
    );
    // The stack unwound completely.
    assert_eq!(
        plane.address_register(SP).expect("SP wired").value(),
        RAM_START
    );
    assert!(!plane.controller().expect("controller wired").servicing_nmi());
}
