//! Shared whole-machine harness for the scenario tests: the conventional
//! RAM + ROM layout, image loading, and cycle-counted runs.

// Not every scenario file exercises every helper.
#![allow(dead_code)]

use jv80_core::component::PC;
use jv80_core::Backplane;

/// Start of the RAM bank.
pub const RAM_START: u16 = 0x2000;
/// Size of the RAM bank.
pub const RAM_SIZE: u16 = 0x2000;
/// Start of the ROM bank.
pub const ROM_START: u16 = 0x8000;
/// Size of the ROM bank.
pub const ROM_SIZE: u16 = 0x2000;

/// A standard machine with the conventional RAM and ROM banks mapped.
pub fn machine() -> Backplane {
    let mut plane = Backplane::standard();
    let memory = plane.memory_mut().expect("standard machine has memory");
    memory.add(RAM_START, RAM_SIZE, true).expect("empty bank map");
    memory.add(ROM_START, ROM_SIZE, false).expect("disjoint from RAM");
    plane
}

/// Copies a program image into the mapped banks and points `PC` at it.
pub fn load(plane: &mut Backplane, addr: u16, image: &[u8]) {
    plane
        .memory_mut()
        .expect("standard machine has memory")
        .install(addr, image, true)
        .expect("image fits a mapped bank");
    plane
        .address_register_mut(PC)
        .expect("standard machine has a PC")
        .set_value(addr);
}

/// Runs to the halt and asserts the exact pulse count.
pub fn check_cycles(plane: &mut Backplane, expected: u64) {
    let cycles = plane.run().expect("program runs without faults");
    assert_eq!(cycles, expected, "cycle count mismatch");
    assert!(plane.bus().halted(), "program must end on HLT");
}

/// Reads a byte out of memory, panicking on unmapped addresses.
pub fn peek(plane: &Backplane, addr: u16) -> u8 {
    plane
        .memory()
        .expect("standard machine has memory")
        .peek(addr)
        .expect("address is mapped")
}
