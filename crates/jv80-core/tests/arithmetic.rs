//! Arithmetic scenarios: full fetch-execute round trips through the ALU,
//! flag-driven loops, and the flags stack.

mod common;

use common::{check_cycles, load, machine, RAM_START, ROM_START};
use jv80_core::bus::{FLAG_C, FLAG_V, FLAG_Z};
use jv80_core::component::{DI, GP_A, GP_B, GP_C, GP_D};
use jv80_core::microcode::opcodes::{
    ADD_AB_CD, ADD_A_B, ADC_A_B, AND_A_B, AND_A_IMM, CLR_A, CLR_B, CLR_D,
    CMP_A_B, CMP_A_IMM, DEC_A, DEC_SI, HLT, INC_A, JNZ, MOV_A_IMM, MOV_B_IMM,
    MOV_C_IMM, MOV_DI_CD, MOV_D_IMM, MOV_SI_IMM, NOT_A, OR_A_B, POP_FL,
    PUSH_FL, SBB_A_B, SHL_A, SHR_A, SUB_A_B, SWP_A_B, SWP_A_C, SWP_B_D,
    XOR_A_B,
};
use jv80_core::Backplane;
use rstest::rstest;

use proptest as _;
use thiserror as _;

fn gp(plane: &Backplane, id: u8) -> u8 {
    plane.register(id).expect("register wired").byte()
}

fn flags(plane: &Backplane) -> (bool, bool, bool) {
    let bus = plane.bus();
    (bus.is_set(FLAG_Z), bus.is_set(FLAG_C), bus.is_set(FLAG_V))
}

/// `MOV A,#a; MOV B,#b; <op>; HLT` and the resulting A plus Z/C/V.
fn probe_binary(op: u8, a: u8, b: u8) -> (u8, (bool, bool, bool)) {
    let mut plane = machine();
    load(
        &mut plane,
        RAM_START,
        &[MOV_A_IMM, a, MOV_B_IMM, b, op, HLT],
    );
    check_cycles(&mut plane, 16);
    (gp(&plane, GP_A), flags(&plane))
}

#[rstest]
#[case::add(ADD_A_B, 0x03, 0x02, 0x05, (false, false, false))]
#[case::add_zero(ADD_A_B, 0x00, 0x00, 0x00, (true, false, false))]
#[case::add_carry(ADD_A_B, 0xFE, 0x03, 0x01, (false, true, false))]
#[case::add_overflow_pos(ADD_A_B, 0x50, 0x50, 0xA0, (false, false, true))]
#[case::add_overflow_neg(ADD_A_B, 0xB0, 0xB0, 0x60, (false, true, true))]
#[case::sub(SUB_A_B, 0x14, 0x0F, 0x05, (false, false, false))]
#[case::sub_overflow(SUB_A_B, 0x64, 0xDF, 0x85, (false, true, true))]
#[case::and(AND_A_B, 0x1F, 0xF8, 0x18, (false, false, false))]
#[case::or(OR_A_B, 0x2A, 0x1C, 0x3E, (false, false, false))]
#[case::xor(XOR_A_B, 0x2A, 0x1C, 0x36, (false, false, false))]
#[case::xor_self(XOR_A_B, 0x55, 0x55, 0x00, (true, false, false))]
fn binary_alu_instructions(
    #[case] op: u8,
    #[case] a: u8,
    #[case] b: u8,
    #[case] expected: u8,
    #[case] zcv: (bool, bool, bool),
) {
    assert_eq!(probe_binary(op, a, b), (expected, zcv));
}

#[test]
fn adc_and_sbb_consume_the_carry_left_by_the_previous_op() {
    // ADD 0xFE+0x03 leaves carry set; ADC then adds it back in.
    let mut plane = machine();
    load(
        &mut plane,
        RAM_START,
        &[
            MOV_A_IMM, 0xFE,
            MOV_B_IMM, 0x03,
            ADD_A_B, // A = 0x01, carry set
            MOV_B_IMM, 0x02,
            ADC_A_B, // A = 0x01 + 0x02 + 1
            HLT,
        ],
    );
    check_cycles(&mut plane, 25);
    assert_eq!(gp(&plane, GP_A), 0x04);

    let mut plane = machine();
    load(
        &mut plane,
        RAM_START,
        &[
            MOV_A_IMM, 0x00,
            MOV_B_IMM, 0x01,
            SUB_A_B, // A = 0xFF, borrow sets carry
            MOV_A_IMM, 0x14,
            MOV_B_IMM, 0x0F,
            SBB_A_B, // A = 0x14 - 0x0F - 1
            HLT,
        ],
    );
    check_cycles(&mut plane, 29);
    assert_eq!(gp(&plane, GP_A), 0x04);
}

#[rstest]
#[case::not(NOT_A, 0x1C, 0xE3, (false, false))]
#[case::shl(SHL_A, 0b0101_0101, 0b1010_1010, (false, false))]
#[case::shl_carry(SHL_A, 0b1010_1010, 0b0101_0100, (false, true))]
#[case::shr(SHR_A, 0b1010_1010, 0b0101_0101, (false, false))]
#[case::shr_carry(SHR_A, 0b0101_0101, 0b0010_1010, (false, true))]
#[case::inc(INC_A, 0x03, 0x04, (false, false))]
#[case::inc_wrap(INC_A, 0xFF, 0x00, (true, true))]
#[case::dec(DEC_A, 0x03, 0x02, (false, false))]
#[case::dec_zero(DEC_A, 0x01, 0x00, (true, false))]
fn unary_alu_instructions(
    #[case] op: u8,
    #[case] a: u8,
    #[case] expected: u8,
    #[case] zc: (bool, bool),
) {
    let mut plane = machine();
    load(&mut plane, RAM_START, &[MOV_A_IMM, a, op, HLT]);
    check_cycles(&mut plane, 11);
    assert_eq!(gp(&plane, GP_A), expected);
    let (z, c, _) = flags(&plane);
    assert_eq!((z, c), zc);
}

#[test]
fn clr_zeroes_the_register_and_sets_zero() {
    let mut plane = machine();
    load(&mut plane, RAM_START, &[MOV_A_IMM, 0x42, CLR_A, HLT]);
    check_cycles(&mut plane, 12);
    assert_eq!(gp(&plane, GP_A), 0x00);
    assert!(plane.bus().is_set(FLAG_Z));
}

#[test]
fn swap_exchanges_register_contents() {
    let mut plane = machine();
    load(
        &mut plane,
        RAM_START,
        &[MOV_A_IMM, 0x42, MOV_B_IMM, 0x37, SWP_A_B, HLT],
    );
    check_cycles(&mut plane, 16);
    assert_eq!(gp(&plane, GP_A), 0x37);
    assert_eq!(gp(&plane, GP_B), 0x42);
}

#[test]
fn cmp_updates_flags_without_touching_the_register() {
    let mut plane = machine();
    load(
        &mut plane,
        RAM_START,
        &[MOV_A_IMM, 0x42, MOV_B_IMM, 0x42, CMP_A_B, HLT],
    );
    check_cycles(&mut plane, 15);
    assert_eq!(gp(&plane, GP_A), 0x42);
    assert!(plane.bus().is_set(FLAG_Z));

    let mut plane = machine();
    load(
        &mut plane,
        RAM_START,
        &[MOV_A_IMM, 0x42, CMP_A_IMM, 0x43, HLT],
    );
    check_cycles(&mut plane, 12);
    assert_eq!(gp(&plane, GP_A), 0x42);
    let (z, c, _) = flags(&plane);
    assert!(!z);
    assert!(c);
}

#[test]
fn and_with_an_immediate_operand() {
    let mut plane = machine();
    load(
        &mut plane,
        RAM_START,
        &[MOV_A_IMM, 0x5F, AND_A_IMM, 0xF0, HLT],
    );
    check_cycles(&mut plane, 13);
    assert_eq!(gp(&plane, GP_A), 0x50);
}

#[test]
fn wide_add_carries_between_the_register_pairs() {
    let mut plane = machine();
    load(
        &mut plane,
        RAM_START,
        &[
            MOV_A_IMM, 0xFF,
            MOV_B_IMM, 0x00,
            MOV_C_IMM, 0x01,
            MOV_D_IMM, 0x00,
            ADD_AB_CD, // AB = 0x00FF + 0x0001 = 0x0100
            HLT,
        ],
    );
    check_cycles(&mut plane, 27);
    assert_eq!(gp(&plane, GP_A), 0x00);
    assert_eq!(gp(&plane, GP_B), 0x01);
}

#[test]
fn flags_survive_a_push_pop_round_trip() {
    let mut plane = machine();
    load(
        &mut plane,
        ROM_START,
        &[
            jv80_core::microcode::opcodes::MOV_SP_IMM, 0x00, 0x20,
            MOV_A_IMM, 0xFF,
            INC_A, // zero and carry set
            PUSH_FL,
            MOV_A_IMM, 0x01,
            INC_A, // flags cleared again
            POP_FL,
            HLT,
        ],
    );
    check_cycles(&mut plane, 33);
    let (z, c, _) = flags(&plane);
    assert!(z);
    assert!(c);
}

#[test]
fn countdown_loop_terminates_through_the_zero_flag() {
    // The Fibonacci countdown demo program.
    let mut plane = machine();
    load(
        &mut plane,
        RAM_START,
        &[
            /* 2000 */ CLR_A,
            /* 2001 */ CLR_B,
            /* 2002 */ MOV_C_IMM, 0x01,
            /* 2004 */ CLR_D,
            /* 2005 */ MOV_SI_IMM, 0x17, 0x00,
            /* 2008 */ ADD_AB_CD,
            /* 2009 */ SWP_A_C,
            /* 200A */ SWP_B_D,
            /* 200B */ DEC_SI,
            /* 200C */ JNZ, 0x08, 0x20,
            /* 200F */ MOV_DI_CD,
            /* 2010 */ HLT,
        ],
    );

    plane.run().expect("loop terminates");
    assert!(plane.bus().halted());
    // 23 countdown iterations leave fib(24) in CD.
    let cd = u16::from_le_bytes([gp(&plane, GP_C), gp(&plane, GP_D)]);
    assert_eq!(cd, 46368);
    assert_eq!(
        plane.address_register(DI).expect("DI wired").value(),
        46368
    );
}
