//! IN/OUT scenarios against closure-backed I/O channels.

mod common;

use common::{check_cycles, load, machine, ROM_START};
use jv80_core::component::{GP_A, GP_B};
use jv80_core::microcode::opcodes::{HLT, IN_B, MOV_A_IMM, OUT_A};
use jv80_core::IoChannel;
use std::cell::Cell;
use std::rc::Rc;

use proptest as _;
use rstest as _;
use thiserror as _;

#[test]
fn out_writes_the_register_to_the_addressed_channel() {
    let mut plane = machine();
    let seen = Rc::new(Cell::new(0_u8));
    let sink = Rc::clone(&seen);
    plane.insert_io(IoChannel::writer(0x5, "OUT", Box::new(move |b| sink.set(b))));

    load(
        &mut plane,
        ROM_START,
        &[MOV_A_IMM, 0x2A, OUT_A, 0x05, HLT],
    );

    check_cycles(&mut plane, 12);
    assert_eq!(seen.get(), 0x2A);
}

#[test]
fn in_reads_the_addressed_channel_into_the_register() {
    let mut plane = machine();
    plane.insert_io(IoChannel::reader(0x3, "IN", Box::new(|| 0x5A)));

    load(&mut plane, ROM_START, &[IN_B, 0x03, HLT]);

    check_cycles(&mut plane, 8);
    assert_eq!(plane.register(GP_B).expect("register wired").byte(), 0x5A);
}

#[test]
fn out_to_an_unconnected_port_is_a_no_op() {
    let mut plane = machine();
    load(
        &mut plane,
        ROM_START,
        &[MOV_A_IMM, 0x2A, OUT_A, 0x07, HLT],
    );

    check_cycles(&mut plane, 12);
    assert_eq!(plane.register(GP_A).expect("register wired").byte(), 0x2A);
}
