//! The static per-opcode microcode table.
//!
//! One entry per implemented opcode, at the index equal to its opcode byte.
//! Unassigned slots hold [`MicroCode::UNDEFINED`] and execute as `NOP`. The
//! table is immutable for the process lifetime; the controller cross-checks
//! `entry.opcode == index` on every decode.

use super::opcodes::*;
use super::{AddressingMode, Condition, MicroCode, MicroCodeStep};
use crate::alu::AluOp;
use crate::bus::{
    FLAG_C, FLAG_V, FLAG_Z, OP_DEC, OP_DONE, OP_FLAGS, OP_HALT, OP_INC,
    OP_IO_IN, OP_IO_OUT, OP_MSB, OP_NONE,
};
use crate::component::{
    BP, DI, GP_A, GP_B, GP_C, GP_D, LHS, MEM, MEMADDR, PC, RHS, SI, SP, TX,
};

const fn xdata(src: u8, target: u8, opflags: u8) -> MicroCodeStep {
    MicroCodeStep::xdata(src, target, opflags)
}

const fn xaddr(src: u8, target: u8, opflags: u8) -> MicroCodeStep {
    MicroCodeStep::xaddr(src, target, opflags)
}

#[allow(clippy::cast_lossless)]
const fn at(opcode: u8) -> usize {
    opcode as usize
}

macro_rules! entry {
    ($opcode:expr, $instr:expr, $mode:ident, $fetch_only:expr, $subject:expr,
     $cond:expr, [$($step:expr),* $(,)?]) => {
        MicroCode {
            opcode: $opcode,
            instruction: $instr,
            addressing_mode: AddressingMode::$mode,
            fetch_only: $fetch_only,
            subject: $subject,
            condition: $cond,
            steps: {
                const STEPS: &[MicroCodeStep] = &[$($step),*];
                STEPS
            },
        }
    };
}

/// Instruction whose operand fetch is the whole story (`MOV r,#imm`, jumps).
macro_rules! fetch_only {
    ($opcode:expr, $instr:expr, $mode:ident, $subject:expr) => {
        fetch_only!($opcode, $instr, $mode, $subject, Condition::Always)
    };
    ($opcode:expr, $instr:expr, $mode:ident, $subject:expr, $cond:expr) => {
        entry!($opcode, $instr, $mode, true, $subject, $cond, [])
    };
}

/// Implied-mode instruction: body steps only.
macro_rules! implied {
    ($opcode:expr, $instr:expr, [$($step:expr),* $(,)?]) => {
        entry!($opcode, $instr, Implied, false, 0, Condition::Always, [$($step),*])
    };
}

/// Addressing-mode fetch followed by body steps.
macro_rules! with_body {
    ($opcode:expr, $instr:expr, $mode:ident, $subject:expr, [$($step:expr),* $(,)?]) => {
        entry!($opcode, $instr, $mode, false, $subject, Condition::Always, [$($step),*])
    };
}

macro_rules! byte_xfer {
    ($opcode:expr, $instr:expr, $dst:expr, $src:expr) => {
        implied!($opcode, $instr, [xdata($src, $dst, OP_DONE)])
    };
}

macro_rules! word_xfer {
    ($opcode:expr, $instr:expr, $dst:expr, $src:expr) => {
        implied!($opcode, $instr, [xaddr($src, $dst, OP_DONE)])
    };
}

macro_rules! byte_xfer_ind {
    ($opcode:expr, $instr:expr, $dst:expr, $ptr:expr) => {
        implied!($opcode, $instr, [
            xaddr($ptr, MEMADDR, OP_INC),
            xdata(MEM, $dst, OP_DONE),
        ])
    };
}

/// `MOV *$xxxx,r`: immediate word straight into the memory address latch.
macro_rules! byte_into_imm_ind {
    ($opcode:expr, $instr:expr, $src:expr) => {
        with_body!($opcode, $instr, ImmediateWord, MEMADDR, [
            xdata($src, MEM, OP_DONE),
        ])
    };
}

macro_rules! push_reg {
    ($opcode:expr, $instr:expr, $reg:expr) => {
        implied!($opcode, $instr, [
            xaddr(SP, MEMADDR, OP_INC),
            xdata($reg, MEM, OP_DONE),
        ])
    };
}

macro_rules! pop_reg {
    ($opcode:expr, $instr:expr, $reg:expr) => {
        implied!($opcode, $instr, [
            xaddr(SP, MEMADDR, OP_DEC),
            xdata(MEM, $reg, OP_DONE),
        ])
    };
}

macro_rules! push_addr {
    ($opcode:expr, $instr:expr, $reg:expr) => {
        implied!($opcode, $instr, [
            xaddr(SP, MEMADDR, OP_INC),
            xdata($reg, MEM, OP_NONE),
            xaddr(SP, MEMADDR, OP_INC),
            xdata($reg, MEM, OP_MSB | OP_DONE),
        ])
    };
}

macro_rules! pop_addr {
    ($opcode:expr, $instr:expr, $reg:expr) => {
        implied!($opcode, $instr, [
            xaddr(SP, MEMADDR, OP_DEC),
            xdata(MEM, $reg, OP_MSB),
            xaddr(SP, MEMADDR, OP_DEC),
            xdata(MEM, $reg, OP_DONE),
        ])
    };
}

macro_rules! jump_imm {
    ($opcode:expr, $instr:expr) => {
        fetch_only!($opcode, $instr, ImmediateWord, PC)
    };
    ($opcode:expr, $instr:expr, $cond:expr) => {
        fetch_only!($opcode, $instr, ImmediateWord, PC, $cond)
    };
}

macro_rules! jump_ind {
    ($opcode:expr, $instr:expr) => {
        fetch_only!($opcode, $instr, IndirectWord, PC)
    };
    ($opcode:expr, $instr:expr, $cond:expr) => {
        fetch_only!($opcode, $instr, IndirectWord, PC, $cond)
    };
}

macro_rules! alu_op {
    ($opcode:expr, $instr:expr, $lhs:expr, $rhs:expr, $op:ident) => {
        implied!($opcode, $instr, [
            xdata($lhs, LHS, OP_NONE),
            xdata($rhs, RHS, AluOp::$op.as_u8()),
            xdata(LHS, $lhs, OP_DONE),
        ])
    };
}

macro_rules! alu_unary {
    ($opcode:expr, $instr:expr, $reg:expr, $op:ident) => {
        implied!($opcode, $instr, [
            xdata($reg, RHS, AluOp::$op.as_u8()),
            xdata(LHS, $reg, OP_DONE),
        ])
    };
}

/// Address-register count with flag update; the old value lands in TX.
macro_rules! addr_count {
    ($opcode:expr, $instr:expr, $reg:expr, $dir:expr) => {
        implied!($opcode, $instr, [
            xaddr($reg, TX, $dir | OP_FLAGS | OP_DONE),
        ])
    };
}

macro_rules! clr {
    ($opcode:expr, $instr:expr, $reg:expr) => {
        implied!($opcode, $instr, [
            xdata($reg, LHS, OP_NONE),
            xdata($reg, RHS, AluOp::Xor.as_u8()),
            xdata(LHS, $reg, OP_DONE),
        ])
    };
}

macro_rules! swap {
    ($opcode:expr, $instr:expr, $r1:expr, $r2:expr) => {
        implied!($opcode, $instr, [
            xdata($r1, TX, OP_NONE),
            xdata($r2, $r1, OP_NONE),
            xdata(TX, $r2, OP_DONE),
        ])
    };
}

/// 16-bit ALU operation over the AB / CD register pairs.
macro_rules! alu_wide {
    ($opcode:expr, $instr:expr, $lo:ident, $hi:ident) => {
        implied!($opcode, $instr, [
            xdata(GP_A, LHS, OP_NONE),
            xdata(GP_C, RHS, AluOp::$lo.as_u8()),
            xdata(LHS, GP_A, OP_NONE),
            xdata(GP_B, LHS, OP_NONE),
            xdata(GP_D, RHS, AluOp::$hi.as_u8()),
            xdata(LHS, GP_B, OP_DONE),
        ])
    };
}

macro_rules! cmp {
    ($opcode:expr, $instr:expr, $lhs:expr, $rhs:expr) => {
        implied!($opcode, $instr, [
            xdata($lhs, LHS, OP_NONE),
            xdata($rhs, RHS, AluOp::Sub.as_u8() | OP_DONE),
        ])
    };
}

macro_rules! cmp_imm {
    ($opcode:expr, $instr:expr, $reg:expr) => {
        implied!($opcode, $instr, [
            xdata($reg, LHS, OP_NONE),
            xaddr(PC, MEMADDR, OP_INC),
            xdata(MEM, RHS, AluOp::Sub.as_u8() | OP_DONE),
        ])
    };
}

macro_rules! alu_op_imm {
    ($opcode:expr, $instr:expr, $reg:expr, $op:ident) => {
        implied!($opcode, $instr, [
            xdata($reg, LHS, OP_NONE),
            xaddr(PC, MEMADDR, OP_INC),
            xdata(MEM, RHS, AluOp::$op.as_u8()),
            xdata(LHS, $reg, OP_DONE),
        ])
    };
}

/// `OUT #port,r` / `IN r,#port`: the port byte is fetched into the
/// controller scratch register and names the channel at execution time.
macro_rules! port_io {
    ($opcode:expr, $instr:expr, $reg:expr, $dir:expr) => {
        entry!($opcode, $instr, ImmediateByte, false, crate::component::CONTROLLER,
            Condition::Always, [
                MicroCodeStep::io_scratch($reg, $dir | OP_DONE),
            ])
    };
}

macro_rules! word_from_indexed {
    ($opcode:expr, $instr:expr, $dst:expr, $base:expr) => {
        with_body!($opcode, $instr, IndexedWord, $base, [
            xdata(MEM, $dst, OP_INC),
            xdata(MEM, $dst, OP_MSB | OP_DONE),
        ])
    };
}

macro_rules! byte_from_indexed {
    ($opcode:expr, $instr:expr, $dst:expr, $base:expr) => {
        with_body!($opcode, $instr, IndexedByte, $base, [
            xdata(MEM, $dst, OP_DONE),
        ])
    };
}

macro_rules! word_to_indexed {
    ($opcode:expr, $instr:expr, $base:expr, $src:expr) => {
        with_body!($opcode, $instr, IndexedWord, $base, [
            xdata($src, MEM, OP_INC),
            xdata($src, MEM, OP_MSB | OP_DONE),
        ])
    };
}

macro_rules! byte_to_indexed {
    ($opcode:expr, $instr:expr, $base:expr, $src:expr) => {
        with_body!($opcode, $instr, IndexedByte, $base, [
            xdata($src, MEM, OP_DONE),
        ])
    };
}

/// The microcode table, indexed by opcode.
pub static MICROCODE: [MicroCode; 256] = build();

#[allow(clippy::too_many_lines)]
const fn build() -> [MicroCode; 256] {
    let mut t = [MicroCode::UNDEFINED; 256];

    t[at(NOP)] = fetch_only!(NOP, "NOP", Implied, 0);

    t[at(MOV_A_IMM)] = fetch_only!(MOV_A_IMM, "MOV A,#$xx", ImmediateByte, GP_A);
    t[at(MOV_A_IMM_IND)] = fetch_only!(MOV_A_IMM_IND, "MOV A,*$xxxx", IndirectByte, GP_A);
    t[at(MOV_A_B)] = byte_xfer!(MOV_A_B, "MOV A,B", GP_A, GP_B);
    t[at(MOV_A_C)] = byte_xfer!(MOV_A_C, "MOV A,C", GP_A, GP_C);
    t[at(MOV_A_D)] = byte_xfer!(MOV_A_D, "MOV A,D", GP_A, GP_D);
    t[at(MOV_B_IMM)] = fetch_only!(MOV_B_IMM, "MOV B,#$xx", ImmediateByte, GP_B);
    t[at(MOV_B_IMM_IND)] = fetch_only!(MOV_B_IMM_IND, "MOV B,*$xxxx", IndirectByte, GP_B);
    t[at(MOV_B_A)] = byte_xfer!(MOV_B_A, "MOV B,A", GP_B, GP_A);
    t[at(MOV_B_C)] = byte_xfer!(MOV_B_C, "MOV B,C", GP_B, GP_C);
    t[at(MOV_B_D)] = byte_xfer!(MOV_B_D, "MOV B,D", GP_B, GP_D);
    t[at(MOV_C_IMM)] = fetch_only!(MOV_C_IMM, "MOV C,#$xx", ImmediateByte, GP_C);
    t[at(MOV_C_IMM_IND)] = fetch_only!(MOV_C_IMM_IND, "MOV C,*$xxxx", IndirectByte, GP_C);
    t[at(MOV_C_A)] = byte_xfer!(MOV_C_A, "MOV C,A", GP_C, GP_A);
    t[at(MOV_C_B)] = byte_xfer!(MOV_C_B, "MOV C,B", GP_C, GP_B);
    t[at(MOV_C_D)] = byte_xfer!(MOV_C_D, "MOV C,D", GP_C, GP_D);
    t[at(MOV_D_IMM)] = fetch_only!(MOV_D_IMM, "MOV D,#$xx", ImmediateByte, GP_D);
    t[at(MOV_D_IMM_IND)] = fetch_only!(MOV_D_IMM_IND, "MOV D,*$xxxx", IndirectByte, GP_D);
    t[at(MOV_D_A)] = byte_xfer!(MOV_D_A, "MOV D,A", GP_D, GP_A);
    t[at(MOV_D_B)] = byte_xfer!(MOV_D_B, "MOV D,B", GP_D, GP_B);
    t[at(MOV_D_C)] = byte_xfer!(MOV_D_C, "MOV D,C", GP_D, GP_C);

    t[at(MOV_SP_IMM)] = fetch_only!(MOV_SP_IMM, "MOV SP,#$xxxx", ImmediateWord, SP);
    t[at(MOV_SP_IMM_IND)] = fetch_only!(MOV_SP_IMM_IND, "MOV SP,*$xxxx", IndirectWord, SP);
    t[at(MOV_SP_SI)] = word_xfer!(MOV_SP_SI, "MOV SP,SI", SP, SI);
    t[at(MOV_SI_IMM)] = fetch_only!(MOV_SI_IMM, "MOV SI,#$xxxx", ImmediateWord, SI);
    t[at(MOV_SI_IMM_IND)] = fetch_only!(MOV_SI_IMM_IND, "MOV SI,*$xxxx", IndirectWord, SI);
    t[at(MOV_SI_CD)] = implied!(MOV_SI_CD, "MOV SI,CD", [
        xdata(GP_C, SI, OP_NONE),
        xdata(GP_D, SI, OP_MSB | OP_DONE),
    ]);
    t[at(MOV_DI_IMM)] = fetch_only!(MOV_DI_IMM, "MOV DI,#$xxxx", ImmediateWord, DI);
    t[at(MOV_DI_IMM_IND)] = fetch_only!(MOV_DI_IMM_IND, "MOV DI,*$xxxx", IndirectWord, DI);
    t[at(MOV_DI_CD)] = implied!(MOV_DI_CD, "MOV DI,CD", [
        xdata(GP_C, DI, OP_NONE),
        xdata(GP_D, DI, OP_MSB | OP_DONE),
    ]);

    t[at(MOV_A_SI_IND)] = byte_xfer_ind!(MOV_A_SI_IND, "MOV A,*SI", GP_A, SI);
    t[at(MOV_B_SI_IND)] = byte_xfer_ind!(MOV_B_SI_IND, "MOV B,*SI", GP_B, SI);
    t[at(MOV_C_SI_IND)] = byte_xfer_ind!(MOV_C_SI_IND, "MOV C,*SI", GP_C, SI);
    t[at(MOV_D_SI_IND)] = byte_xfer_ind!(MOV_D_SI_IND, "MOV D,*SI", GP_D, SI);
    t[at(MOV_A_DI_IND)] = byte_xfer_ind!(MOV_A_DI_IND, "MOV A,*DI", GP_A, DI);
    t[at(MOV_B_DI_IND)] = byte_xfer_ind!(MOV_B_DI_IND, "MOV B,*DI", GP_B, DI);
    t[at(MOV_C_DI_IND)] = byte_xfer_ind!(MOV_C_DI_IND, "MOV C,*DI", GP_C, DI);
    t[at(MOV_D_DI_IND)] = byte_xfer_ind!(MOV_D_DI_IND, "MOV D,*DI", GP_D, DI);
    t[at(MOV_DI_IND_SI_IND)] = implied!(MOV_DI_IND_SI_IND, "MOV *DI,*SI", [
        xaddr(SI, MEMADDR, OP_INC),
        xdata(MEM, TX, OP_NONE),
        xaddr(DI, MEMADDR, OP_INC),
        xdata(TX, MEM, OP_DONE),
    ]);

    t[at(JMP)] = jump_imm!(JMP, "JMP #$xxxx");
    t[at(JNZ)] = jump_imm!(JNZ, "JNZ #$xxxx", Condition::Clear(FLAG_Z));
    t[at(JC)] = jump_imm!(JC, "JC #$xxxx", Condition::Set(FLAG_C));
    t[at(JV)] = jump_imm!(JV, "JV #$xxxx", Condition::Set(FLAG_V));
    t[at(CALL)] = with_body!(CALL, "CALL #$xxxx", ImmediateWord, TX, [
        // TX holds the destination; PC the return address.
        xaddr(SP, MEMADDR, OP_INC),
        xdata(PC, MEM, OP_NONE),
        xaddr(SP, MEMADDR, OP_INC),
        xdata(PC, MEM, OP_MSB),
        xaddr(TX, PC, OP_DONE),
    ]);
    t[at(RET)] = pop_addr!(RET, "RET", PC);

    t[at(PUSH_A)] = push_reg!(PUSH_A, "PUSH A", GP_A);
    t[at(PUSH_B)] = push_reg!(PUSH_B, "PUSH B", GP_B);
    t[at(PUSH_C)] = push_reg!(PUSH_C, "PUSH C", GP_C);
    t[at(PUSH_D)] = push_reg!(PUSH_D, "PUSH D", GP_D);
    t[at(PUSH_SI)] = push_addr!(PUSH_SI, "PUSH SI", SI);
    t[at(PUSH_DI)] = push_addr!(PUSH_DI, "PUSH DI", DI);
    t[at(POP_A)] = pop_reg!(POP_A, "POP A", GP_A);
    t[at(POP_B)] = pop_reg!(POP_B, "POP B", GP_B);
    t[at(POP_C)] = pop_reg!(POP_C, "POP C", GP_C);
    t[at(POP_D)] = pop_reg!(POP_D, "POP D", GP_D);
    t[at(POP_SI)] = pop_addr!(POP_SI, "POP SI", SI);
    t[at(POP_DI)] = pop_addr!(POP_DI, "POP DI", DI);

    t[at(MOV_IMM_IND_A)] = byte_into_imm_ind!(MOV_IMM_IND_A, "MOV *$xxxx,A", GP_A);
    t[at(MOV_DI_IND_A)] = implied!(MOV_DI_IND_A, "MOV *DI,A", [
        xaddr(DI, MEMADDR, OP_INC),
        xdata(GP_A, MEM, OP_DONE),
    ]);
    t[at(MOV_IMM_IND_B)] = byte_into_imm_ind!(MOV_IMM_IND_B, "MOV *$xxxx,B", GP_B);
    t[at(MOV_DI_IND_B)] = implied!(MOV_DI_IND_B, "MOV *DI,B", [
        xaddr(DI, MEMADDR, OP_INC),
        xdata(GP_B, MEM, OP_DONE),
    ]);
    t[at(MOV_IMM_IND_C)] = byte_into_imm_ind!(MOV_IMM_IND_C, "MOV *$xxxx,C", GP_C);
    t[at(MOV_DI_IND_C)] = implied!(MOV_DI_IND_C, "MOV *DI,C", [
        xaddr(DI, MEMADDR, OP_INC),
        xdata(GP_C, MEM, OP_DONE),
    ]);
    t[at(MOV_IMM_IND_D)] = byte_into_imm_ind!(MOV_IMM_IND_D, "MOV *$xxxx,D", GP_D);
    t[at(MOV_DI_IND_D)] = implied!(MOV_DI_IND_D, "MOV *DI,D", [
        xaddr(DI, MEMADDR, OP_INC),
        xdata(GP_D, MEM, OP_DONE),
    ]);
    t[at(MOV_IMM_IND_SI)] = with_body!(MOV_IMM_IND_SI, "MOV *$xxxx,SI", ImmediateWord, TX, [
        xaddr(TX, MEMADDR, OP_INC),
        xdata(SI, MEM, OP_NONE),
        xaddr(TX, MEMADDR, OP_NONE),
        xdata(SI, MEM, OP_MSB | OP_DONE),
    ]);
    t[at(MOV_IMM_IND_DI)] = with_body!(MOV_IMM_IND_DI, "MOV *$xxxx,DI", ImmediateWord, TX, [
        xaddr(TX, MEMADDR, OP_INC),
        xdata(DI, MEM, OP_NONE),
        xaddr(TX, MEMADDR, OP_NONE),
        xdata(DI, MEM, OP_MSB | OP_DONE),
    ]);
    t[at(MOV_IMM_IND_CD)] = with_body!(MOV_IMM_IND_CD, "MOV *$xxxx,CD", ImmediateWord, TX, [
        xaddr(TX, MEMADDR, OP_INC),
        xdata(GP_C, MEM, OP_NONE),
        xaddr(TX, MEMADDR, OP_NONE),
        xdata(GP_D, MEM, OP_MSB | OP_DONE),
    ]);
    t[at(MOV_SI_IND_CD)] = implied!(MOV_SI_IND_CD, "MOV *SI,CD", [
        xaddr(SI, MEMADDR, OP_INC),
        xdata(GP_C, MEM, OP_NONE),
        xaddr(SI, MEMADDR, OP_INC),
        xdata(GP_D, MEM, OP_MSB | OP_DONE),
    ]);
    t[at(MOV_DI_IND_CD)] = implied!(MOV_DI_IND_CD, "MOV *DI,CD", [
        xaddr(DI, MEMADDR, OP_INC),
        xdata(GP_C, MEM, OP_NONE),
        xaddr(DI, MEMADDR, OP_INC),
        xdata(GP_D, MEM, OP_MSB | OP_DONE),
    ]);

    t[at(ADD_A_B)] = alu_op!(ADD_A_B, "ADD A,B", GP_A, GP_B, Add);
    t[at(ADC_A_B)] = alu_op!(ADC_A_B, "ADC A,B", GP_A, GP_B, Adc);
    t[at(SUB_A_B)] = alu_op!(SUB_A_B, "SUB A,B", GP_A, GP_B, Sub);
    t[at(SBB_A_B)] = alu_op!(SBB_A_B, "SBB A,B", GP_A, GP_B, Sbb);
    t[at(AND_A_B)] = alu_op!(AND_A_B, "AND A,B", GP_A, GP_B, And);
    t[at(OR_A_B)] = alu_op!(OR_A_B, "OR A,B", GP_A, GP_B, Or);
    t[at(XOR_A_B)] = alu_op!(XOR_A_B, "XOR A,B", GP_A, GP_B, Xor);
    t[at(NOT_A)] = alu_unary!(NOT_A, "NOT A", GP_A, Not);
    t[at(SHL_A)] = alu_unary!(SHL_A, "SHL A", GP_A, Shl);
    t[at(SHR_A)] = alu_unary!(SHR_A, "SHR A", GP_A, Shr);

    t[at(ADD_A_C)] = alu_op!(ADD_A_C, "ADD A,C", GP_A, GP_C, Add);
    t[at(ADC_A_C)] = alu_op!(ADC_A_C, "ADC A,C", GP_A, GP_C, Adc);
    t[at(SUB_A_C)] = alu_op!(SUB_A_C, "SUB A,C", GP_A, GP_C, Sub);
    t[at(SBB_A_C)] = alu_op!(SBB_A_C, "SBB A,C", GP_A, GP_C, Sbb);
    t[at(AND_A_C)] = alu_op!(AND_A_C, "AND A,C", GP_A, GP_C, And);
    t[at(OR_A_C)] = alu_op!(OR_A_C, "OR A,C", GP_A, GP_C, Or);
    t[at(XOR_A_C)] = alu_op!(XOR_A_C, "XOR A,C", GP_A, GP_C, Xor);

    t[at(ADD_A_D)] = alu_op!(ADD_A_D, "ADD A,D", GP_A, GP_D, Add);
    t[at(ADC_A_D)] = alu_op!(ADC_A_D, "ADC A,D", GP_A, GP_D, Adc);
    t[at(SUB_A_D)] = alu_op!(SUB_A_D, "SUB A,D", GP_A, GP_D, Sub);
    t[at(SBB_A_D)] = alu_op!(SBB_A_D, "SBB A,D", GP_A, GP_D, Sbb);
    t[at(AND_A_D)] = alu_op!(AND_A_D, "AND A,D", GP_A, GP_D, And);
    t[at(OR_A_D)] = alu_op!(OR_A_D, "OR A,D", GP_A, GP_D, Or);
    t[at(XOR_A_D)] = alu_op!(XOR_A_D, "XOR A,D", GP_A, GP_D, Xor);

    t[at(ADD_B_C)] = alu_op!(ADD_B_C, "ADD B,C", GP_B, GP_C, Add);
    t[at(ADC_B_C)] = alu_op!(ADC_B_C, "ADC B,C", GP_B, GP_C, Adc);
    t[at(SUB_B_C)] = alu_op!(SUB_B_C, "SUB B,C", GP_B, GP_C, Sub);
    t[at(SBB_B_C)] = alu_op!(SBB_B_C, "SBB B,C", GP_B, GP_C, Sbb);
    t[at(AND_B_C)] = alu_op!(AND_B_C, "AND B,C", GP_B, GP_C, And);
    t[at(OR_B_C)] = alu_op!(OR_B_C, "OR B,C", GP_B, GP_C, Or);
    t[at(XOR_B_C)] = alu_op!(XOR_B_C, "XOR B,C", GP_B, GP_C, Xor);
    t[at(NOT_B)] = alu_unary!(NOT_B, "NOT B", GP_B, Not);
    t[at(SHL_B)] = alu_unary!(SHL_B, "SHL B", GP_B, Shl);
    t[at(SHR_B)] = alu_unary!(SHR_B, "SHR B", GP_B, Shr);

    t[at(ADD_B_D)] = alu_op!(ADD_B_D, "ADD B,D", GP_B, GP_D, Add);
    t[at(ADC_B_D)] = alu_op!(ADC_B_D, "ADC B,D", GP_B, GP_D, Adc);
    t[at(SUB_B_D)] = alu_op!(SUB_B_D, "SUB B,D", GP_B, GP_D, Sub);
    t[at(SBB_B_D)] = alu_op!(SBB_B_D, "SBB B,D", GP_B, GP_D, Sbb);
    t[at(AND_B_D)] = alu_op!(AND_B_D, "AND B,D", GP_B, GP_D, And);
    t[at(OR_B_D)] = alu_op!(OR_B_D, "OR B,D", GP_B, GP_D, Or);
    t[at(XOR_B_D)] = alu_op!(XOR_B_D, "XOR B,D", GP_B, GP_D, Xor);

    t[at(ADD_C_D)] = alu_op!(ADD_C_D, "ADD C,D", GP_C, GP_D, Add);
    t[at(ADC_C_D)] = alu_op!(ADC_C_D, "ADC C,D", GP_C, GP_D, Adc);
    t[at(SUB_C_D)] = alu_op!(SUB_C_D, "SUB C,D", GP_C, GP_D, Sub);
    t[at(SBB_C_D)] = alu_op!(SBB_C_D, "SBB C,D", GP_C, GP_D, Sbb);
    t[at(AND_C_D)] = alu_op!(AND_C_D, "AND C,D", GP_C, GP_D, And);
    t[at(OR_C_D)] = alu_op!(OR_C_D, "OR C,D", GP_C, GP_D, Or);
    t[at(XOR_C_D)] = alu_op!(XOR_C_D, "XOR C,D", GP_C, GP_D, Xor);
    t[at(NOT_C)] = alu_unary!(NOT_C, "NOT C", GP_C, Not);
    t[at(SHL_C)] = alu_unary!(SHL_C, "SHL C", GP_C, Shl);
    t[at(SHR_C)] = alu_unary!(SHR_C, "SHR C", GP_C, Shr);
    t[at(NOT_D)] = alu_unary!(NOT_D, "NOT D", GP_D, Not);
    t[at(SHL_D)] = alu_unary!(SHL_D, "SHL D", GP_D, Shl);
    t[at(SHR_D)] = alu_unary!(SHR_D, "SHR D", GP_D, Shr);

    t[at(CLR_A)] = clr!(CLR_A, "CLR A", GP_A);
    t[at(CLR_B)] = clr!(CLR_B, "CLR B", GP_B);
    t[at(CLR_C)] = clr!(CLR_C, "CLR C", GP_C);
    t[at(CLR_D)] = clr!(CLR_D, "CLR D", GP_D);

    t[at(SWP_A_B)] = swap!(SWP_A_B, "SWP A,B", GP_A, GP_B);
    t[at(SWP_A_C)] = swap!(SWP_A_C, "SWP A,C", GP_A, GP_C);
    t[at(SWP_A_D)] = swap!(SWP_A_D, "SWP A,D", GP_A, GP_D);
    t[at(SWP_B_C)] = swap!(SWP_B_C, "SWP B,C", GP_B, GP_C);
    t[at(SWP_B_D)] = swap!(SWP_B_D, "SWP B,D", GP_B, GP_D);
    t[at(SWP_C_D)] = swap!(SWP_C_D, "SWP C,D", GP_C, GP_D);

    t[at(ADD_AB_CD)] = alu_wide!(ADD_AB_CD, "ADD AB,CD", Add, Adc);
    t[at(ADC_AB_CD)] = alu_wide!(ADC_AB_CD, "ADC AB,CD", Adc, Adc);
    t[at(SUB_AB_CD)] = alu_wide!(SUB_AB_CD, "SUB AB,CD", Sub, Sbb);
    t[at(SBB_AB_CD)] = alu_wide!(SBB_AB_CD, "SBB AB,CD", Sbb, Sbb);

    t[at(JMP_IND)] = jump_ind!(JMP_IND, "JMP *$xxxx");
    t[at(JNZ_IND)] = jump_ind!(JNZ_IND, "JNZ *$xxxx", Condition::Clear(FLAG_Z));
    t[at(JC_IND)] = jump_ind!(JC_IND, "JC *$xxxx", Condition::Set(FLAG_C));
    t[at(JV_IND)] = jump_ind!(JV_IND, "JV *$xxxx", Condition::Set(FLAG_V));
    t[at(CALL_IND)] = with_body!(CALL_IND, "CALL *$xxxx", ImpliedWord, 0, [
        // The pointer must be read before PC is pushed, so IndirectWord
        // addressing cannot be used here.
        xaddr(PC, MEMADDR, OP_INC),
        xdata(MEM, TX, OP_NONE),
        xaddr(PC, MEMADDR, OP_INC),
        xdata(MEM, TX, OP_MSB),
        xaddr(SP, MEMADDR, OP_INC),
        xdata(PC, MEM, OP_NONE),
        xaddr(SP, MEMADDR, OP_INC),
        xdata(PC, MEM, OP_MSB),
        xaddr(TX, MEMADDR, OP_INC),
        xdata(MEM, PC, OP_NONE),
        xaddr(TX, MEMADDR, OP_INC),
        xdata(MEM, PC, OP_MSB | OP_DONE),
    ]);

    t[at(CMP_A_B)] = cmp!(CMP_A_B, "CMP A,B", GP_A, GP_B);
    t[at(CMP_A_C)] = cmp!(CMP_A_C, "CMP A,C", GP_A, GP_C);
    t[at(CMP_A_D)] = cmp!(CMP_A_D, "CMP A,D", GP_A, GP_D);
    t[at(CMP_B_C)] = cmp!(CMP_B_C, "CMP B,C", GP_B, GP_C);
    t[at(CMP_B_D)] = cmp!(CMP_B_D, "CMP B,D", GP_B, GP_D);
    t[at(CMP_C_D)] = cmp!(CMP_C_D, "CMP C,D", GP_C, GP_D);

    t[at(INC_A)] = alu_unary!(INC_A, "INC A", GP_A, Inc);
    t[at(INC_B)] = alu_unary!(INC_B, "INC B", GP_B, Inc);
    t[at(INC_C)] = alu_unary!(INC_C, "INC C", GP_C, Inc);
    t[at(INC_D)] = alu_unary!(INC_D, "INC D", GP_D, Inc);
    t[at(DEC_A)] = alu_unary!(DEC_A, "DEC A", GP_A, Dec);
    t[at(DEC_B)] = alu_unary!(DEC_B, "DEC B", GP_B, Dec);
    t[at(DEC_C)] = alu_unary!(DEC_C, "DEC C", GP_C, Dec);
    t[at(DEC_D)] = alu_unary!(DEC_D, "DEC D", GP_D, Dec);
    t[at(INC_SI)] = addr_count!(INC_SI, "INC SI", SI, OP_INC);
    t[at(INC_DI)] = addr_count!(INC_DI, "INC DI", DI, OP_INC);
    t[at(DEC_SI)] = addr_count!(DEC_SI, "DEC SI", SI, OP_DEC);
    t[at(DEC_DI)] = addr_count!(DEC_DI, "DEC DI", DI, OP_DEC);

    t[at(OUT_A)] = port_io!(OUT_A, "OUT #$xx,A", GP_A, OP_IO_OUT);
    t[at(OUT_B)] = port_io!(OUT_B, "OUT #$xx,B", GP_B, OP_IO_OUT);
    t[at(OUT_C)] = port_io!(OUT_C, "OUT #$xx,C", GP_C, OP_IO_OUT);
    t[at(OUT_D)] = port_io!(OUT_D, "OUT #$xx,D", GP_D, OP_IO_OUT);
    t[at(IN_A)] = port_io!(IN_A, "IN A,#$xx", GP_A, OP_IO_IN);
    t[at(IN_B)] = port_io!(IN_B, "IN B,#$xx", GP_B, OP_IO_IN);
    t[at(IN_C)] = port_io!(IN_C, "IN C,#$xx", GP_C, OP_IO_IN);
    t[at(IN_D)] = port_io!(IN_D, "IN D,#$xx", GP_D, OP_IO_IN);

    t[at(PUSH_FL)] = implied!(PUSH_FL, "PUSHFL", [
        xaddr(SP, MEMADDR, OP_INC),
        xaddr(RHS, MEM, OP_DONE),
    ]);
    t[at(POP_FL)] = implied!(POP_FL, "POPFL", [
        xaddr(SP, MEMADDR, OP_DEC),
        xaddr(MEM, RHS, OP_DONE),
    ]);
    t[at(CLR_FL)] = implied!(CLR_FL, "CLRFL", [
        // Zero the low byte of TX through the ALU, then feed it to the
        // flags port.
        xdata(TX, LHS, OP_NONE),
        xdata(TX, RHS, AluOp::Xor.as_u8()),
        xdata(LHS, TX, OP_NONE),
        xaddr(TX, RHS, OP_DONE),
    ]);
    t[at(JZ)] = jump_imm!(JZ, "JZ #$xxxx", Condition::Set(FLAG_Z));
    t[at(JZ_IND)] = jump_ind!(JZ_IND, "JZ *$xxxx", Condition::Set(FLAG_Z));

    t[at(MOV_CD_IND_A)] = implied!(MOV_CD_IND_A, "MOV *CD,A", [
        xdata(GP_C, MEMADDR, OP_NONE),
        xdata(GP_D, MEMADDR, OP_MSB),
        xdata(GP_A, MEM, OP_DONE),
    ]);
    t[at(MOV_CD_IND_B)] = implied!(MOV_CD_IND_B, "MOV *CD,B", [
        xdata(GP_C, MEMADDR, OP_NONE),
        xdata(GP_D, MEMADDR, OP_MSB),
        xdata(GP_B, MEM, OP_DONE),
    ]);

    t[at(CMP_A_IMM)] = cmp_imm!(CMP_A_IMM, "CMP A,#$xx", GP_A);
    t[at(CMP_B_IMM)] = cmp_imm!(CMP_B_IMM, "CMP B,#$xx", GP_B);
    t[at(CMP_C_IMM)] = cmp_imm!(CMP_C_IMM, "CMP C,#$xx", GP_C);
    t[at(CMP_D_IMM)] = cmp_imm!(CMP_D_IMM, "CMP D,#$xx", GP_D);
    t[at(AND_A_IMM)] = alu_op_imm!(AND_A_IMM, "AND A,#$xx", GP_A, And);
    t[at(AND_B_IMM)] = alu_op_imm!(AND_B_IMM, "AND B,#$xx", GP_B, And);
    t[at(AND_C_IMM)] = alu_op_imm!(AND_C_IMM, "AND C,#$xx", GP_C, And);
    t[at(AND_D_IMM)] = alu_op_imm!(AND_D_IMM, "AND D,#$xx", GP_D, And);
    t[at(OR_A_IMM)] = alu_op_imm!(OR_A_IMM, "OR A,#$xx", GP_A, Or);
    t[at(OR_B_IMM)] = alu_op_imm!(OR_B_IMM, "OR B,#$xx", GP_B, Or);
    t[at(OR_C_IMM)] = alu_op_imm!(OR_C_IMM, "OR C,#$xx", GP_C, Or);
    t[at(OR_D_IMM)] = alu_op_imm!(OR_D_IMM, "OR D,#$xx", GP_D, Or);

    t[at(MOV_A_CD_IND)] = implied!(MOV_A_CD_IND, "MOV A,*CD", [
        xdata(GP_C, MEMADDR, OP_NONE),
        xdata(GP_D, MEMADDR, OP_MSB),
        xdata(MEM, GP_A, OP_DONE),
    ]);
    t[at(MOV_B_CD_IND)] = implied!(MOV_B_CD_IND, "MOV B,*CD", [
        xdata(GP_C, MEMADDR, OP_NONE),
        xdata(GP_D, MEMADDR, OP_MSB),
        xdata(MEM, GP_B, OP_DONE),
    ]);

    t[at(MOV_SI_IND_IMM)] = with_body!(MOV_SI_IND_IMM, "MOV *SI,#$xx", ImmediateByte, TX, [
        xaddr(SI, MEMADDR, OP_NONE),
        xdata(TX, MEM, OP_DONE),
    ]);
    t[at(MOV_DI_IND_IMM)] = with_body!(MOV_DI_IND_IMM, "MOV *DI,#$xx", ImmediateByte, TX, [
        xaddr(DI, MEMADDR, OP_NONE),
        xdata(TX, MEM, OP_DONE),
    ]);
    t[at(MOV_CD_IND_IMM)] = with_body!(MOV_CD_IND_IMM, "MOV *CD,#$xx", ImmediateByte, TX, [
        xdata(GP_C, MEMADDR, OP_NONE),
        xdata(GP_D, MEMADDR, OP_MSB),
        xdata(TX, MEM, OP_DONE),
    ]);
    t[at(MOV_CD_IMM)] = with_body!(MOV_CD_IMM, "MOV CD,#$xxxx", ImmediateWord, TX, [
        xdata(TX, GP_C, OP_NONE),
        xdata(TX, GP_D, OP_MSB | OP_DONE),
    ]);

    t[at(MOV_BP_SP)] = word_xfer!(MOV_BP_SP, "MOV BP,SP", BP, SP);
    t[at(MOV_SP_BP)] = word_xfer!(MOV_SP_BP, "MOV SP,BP", SP, BP);

    t[at(MOV_SI_BP_IDX)] = word_from_indexed!(MOV_SI_BP_IDX, "MOV SI,BP[$xx]", SI, BP);
    t[at(MOV_DI_BP_IDX)] = word_from_indexed!(MOV_DI_BP_IDX, "MOV DI,BP[$xx]", DI, BP);
    t[at(MOV_DI_SI_IDX)] = word_from_indexed!(MOV_DI_SI_IDX, "MOV DI,SI[$xx]", DI, SI);
    t[at(MOV_A_BP_IDX)] = byte_from_indexed!(MOV_A_BP_IDX, "MOV A,BP[$xx]", GP_A, BP);
    t[at(MOV_B_BP_IDX)] = byte_from_indexed!(MOV_B_BP_IDX, "MOV B,BP[$xx]", GP_B, BP);
    t[at(MOV_C_BP_IDX)] = byte_from_indexed!(MOV_C_BP_IDX, "MOV C,BP[$xx]", GP_C, BP);
    t[at(MOV_D_BP_IDX)] = byte_from_indexed!(MOV_D_BP_IDX, "MOV D,BP[$xx]", GP_D, BP);
    t[at(MOV_BP_IDX_SI)] = word_to_indexed!(MOV_BP_IDX_SI, "MOV BP[$xx],SI", BP, SI);
    t[at(MOV_BP_IDX_DI)] = word_to_indexed!(MOV_BP_IDX_DI, "MOV BP[$xx],DI", BP, DI);
    t[at(MOV_SI_IDX_DI)] = word_to_indexed!(MOV_SI_IDX_DI, "MOV SI[$xx],DI", SI, DI);
    t[at(MOV_BP_IDX_A)] = byte_to_indexed!(MOV_BP_IDX_A, "MOV BP[$xx],A", BP, GP_A);
    t[at(MOV_BP_IDX_B)] = byte_to_indexed!(MOV_BP_IDX_B, "MOV BP[$xx],B", BP, GP_B);
    t[at(MOV_BP_IDX_C)] = byte_to_indexed!(MOV_BP_IDX_C, "MOV BP[$xx],C", BP, GP_C);
    t[at(MOV_BP_IDX_D)] = byte_to_indexed!(MOV_BP_IDX_D, "MOV BP[$xx],D", BP, GP_D);

    t[at(PUSH_BP)] = push_addr!(PUSH_BP, "PUSH BP", BP);
    t[at(POP_BP)] = pop_addr!(POP_BP, "POP BP", BP);
    t[at(PUSH_IMM)] = with_body!(PUSH_IMM, "PUSH #$xx", ImmediateByte, TX, [
        xaddr(SP, MEMADDR, OP_INC),
        xdata(TX, MEM, OP_DONE),
    ]);
    t[at(PUSHW_IMM)] = with_body!(PUSHW_IMM, "PUSHW #$xxxx", ImmediateWord, TX, [
        xaddr(SP, MEMADDR, OP_INC),
        xdata(TX, MEM, OP_NONE),
        xaddr(SP, MEMADDR, OP_INC),
        xdata(TX, MEM, OP_MSB | OP_DONE),
    ]);
    t[at(PUSH_AB)] = implied!(PUSH_AB, "PUSH AB", [
        xaddr(SP, MEMADDR, OP_INC),
        xdata(GP_A, MEM, OP_NONE),
        xaddr(SP, MEMADDR, OP_INC),
        xdata(GP_B, MEM, OP_DONE),
    ]);
    t[at(PUSH_CD)] = implied!(PUSH_CD, "PUSH CD", [
        xaddr(SP, MEMADDR, OP_INC),
        xdata(GP_C, MEM, OP_NONE),
        xaddr(SP, MEMADDR, OP_INC),
        xdata(GP_D, MEM, OP_DONE),
    ]);
    t[at(PUSH_BP_IDX)] = with_body!(PUSH_BP_IDX, "PUSH BP[$xx]", IndexedWord, BP, [
        xdata(MEM, TX, OP_INC),
        xdata(MEM, TX, OP_MSB),
        xaddr(SP, MEMADDR, OP_INC),
        xdata(TX, MEM, OP_NONE),
        xaddr(SP, MEMADDR, OP_INC),
        xdata(TX, MEM, OP_MSB | OP_DONE),
    ]);
    t[at(POP_AB)] = implied!(POP_AB, "POP AB", [
        xaddr(SP, MEMADDR, OP_DEC),
        xdata(MEM, GP_B, OP_NONE),
        xaddr(SP, MEMADDR, OP_DEC),
        xdata(MEM, GP_A, OP_DONE),
    ]);
    t[at(POP_CD)] = implied!(POP_CD, "POP CD", [
        xaddr(SP, MEMADDR, OP_DEC),
        xdata(MEM, GP_D, OP_NONE),
        xaddr(SP, MEMADDR, OP_DEC),
        xdata(MEM, GP_C, OP_DONE),
    ]);
    t[at(POP_BP_IDX)] = with_body!(POP_BP_IDX, "POP BP[$xx]", IndexedWord, BP, [
        // Park the effective address in A while the stack pop clobbers the
        // address latch; A holds a full word for the duration.
        xaddr(MEMADDR, GP_A, OP_NONE),
        xaddr(SP, MEMADDR, OP_DEC),
        xdata(MEM, TX, OP_MSB),
        xaddr(SP, MEMADDR, OP_DEC),
        xdata(MEM, TX, OP_NONE),
        xaddr(GP_A, MEMADDR, OP_NONE),
        xdata(TX, MEM, OP_INC),
        xdata(TX, MEM, OP_MSB | OP_DONE),
    ]);

    t[at(JNC)] = jump_imm!(JNC, "JNC #$xxxx", Condition::Clear(FLAG_C));
    t[at(JNC_IND)] = jump_ind!(JNC_IND, "JNC *$xxxx", Condition::Clear(FLAG_C));

    t[at(RTI)] = implied!(RTI, "RTI", [
        xaddr(SP, MEMADDR, OP_DEC),
        xdata(MEM, PC, OP_MSB),
        xaddr(SP, MEMADDR, OP_DEC),
        xdata(MEM, PC, OP_NONE),
        xaddr(SP, MEMADDR, OP_DEC),
        xaddr(MEM, RHS, OP_DONE),
    ]);
    t[at(NMIVEC)] = with_body!(NMIVEC, "NMI #$xxxx", ImmediateWord, TX, [
        xaddr(TX, crate::component::CONTROLLER, OP_DONE),
    ]);
    t[at(HLT)] = implied!(HLT, "HLT", [
        MicroCodeStep::other(OP_HALT | OP_DONE),
    ]);

    t
}

#[cfg(test)]
mod tests {
    use super::super::opcodes;
    use super::MICROCODE;
    use crate::bus::OP_DONE;

    #[test]
    fn every_defined_entry_sits_at_its_own_opcode() {
        for (index, entry) in MICROCODE.iter().enumerate() {
            if entry.defined() {
                assert_eq!(
                    usize::from(entry.opcode),
                    index,
                    "entry {index:#04x} carries opcode {:#04x}",
                    entry.opcode
                );
            }
        }
    }

    #[test]
    fn body_sequences_terminate_with_done() {
        for entry in MICROCODE.iter().filter(|e| e.defined()) {
            if entry.fetch_only {
                assert!(
                    entry.steps.is_empty(),
                    "{}: fetch-only entries carry no body",
                    entry.instruction
                );
            } else {
                let last = entry.steps.last().unwrap_or_else(|| {
                    panic!("{}: body must not be empty", entry.instruction)
                });
                assert_ne!(
                    last.opflags & OP_DONE,
                    0,
                    "{}: body must end with DONE",
                    entry.instruction
                );
            }
        }
    }

    #[test]
    fn done_only_marks_the_final_step() {
        for entry in MICROCODE.iter().filter(|e| e.defined()) {
            for step in &entry.steps[..entry.steps.len().saturating_sub(1)] {
                assert_eq!(
                    step.opflags & OP_DONE,
                    0,
                    "{}: DONE before the last step truncates the body",
                    entry.instruction
                );
            }
        }
    }

    #[test]
    fn spot_check_the_wire_numbering() {
        assert_eq!(MICROCODE[0x01].instruction, "MOV A,#$xx");
        assert_eq!(MICROCODE[0xFF].instruction, "HLT");
        assert_eq!(MICROCODE[0xFD].instruction, "RTI");
        assert_eq!(usize::from(opcodes::JNC_IND), 0xDD);
        assert!(!MICROCODE[0xDE].defined());
        assert!(!MICROCODE[0xFC].defined());
    }
}
