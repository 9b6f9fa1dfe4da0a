//! Opcode numbering of the JV80 instruction set.
//!
//! The values are the wire format of assembled images; the table in
//! [`super::table`] is indexed by them.

#![allow(missing_docs)]

pub const NOP: u8 = 0x00;

pub const MOV_A_IMM: u8 = 0x01;
pub const MOV_A_IMM_IND: u8 = 0x02;
pub const MOV_A_B: u8 = 0x03;
pub const MOV_A_C: u8 = 0x04;
pub const MOV_A_D: u8 = 0x05;
pub const MOV_B_IMM: u8 = 0x06;
pub const MOV_B_IMM_IND: u8 = 0x07;
pub const MOV_B_A: u8 = 0x08;
pub const MOV_B_C: u8 = 0x09;
pub const MOV_B_D: u8 = 0x0A;
pub const MOV_C_IMM: u8 = 0x0B;
pub const MOV_C_IMM_IND: u8 = 0x0C;
pub const MOV_C_A: u8 = 0x0D;
pub const MOV_C_B: u8 = 0x0E;
pub const MOV_C_D: u8 = 0x0F;
pub const MOV_D_IMM: u8 = 0x10;
pub const MOV_D_IMM_IND: u8 = 0x11;
pub const MOV_D_A: u8 = 0x12;
pub const MOV_D_B: u8 = 0x13;
pub const MOV_D_C: u8 = 0x14;

pub const MOV_SP_IMM: u8 = 0x15;
pub const MOV_SP_IMM_IND: u8 = 0x16;
pub const MOV_SP_SI: u8 = 0x17;
pub const MOV_SI_IMM: u8 = 0x18;
pub const MOV_SI_IMM_IND: u8 = 0x19;
pub const MOV_SI_CD: u8 = 0x1A;
pub const MOV_DI_IMM: u8 = 0x1B;
pub const MOV_DI_IMM_IND: u8 = 0x1C;
pub const MOV_DI_CD: u8 = 0x1D;

pub const MOV_A_SI_IND: u8 = 0x1E;
pub const MOV_B_SI_IND: u8 = 0x1F;
pub const MOV_C_SI_IND: u8 = 0x20;
pub const MOV_D_SI_IND: u8 = 0x21;
pub const MOV_A_DI_IND: u8 = 0x22;
pub const MOV_B_DI_IND: u8 = 0x23;
pub const MOV_C_DI_IND: u8 = 0x24;
pub const MOV_D_DI_IND: u8 = 0x25;
pub const MOV_DI_IND_SI_IND: u8 = 0x26;

pub const JMP: u8 = 0x27;
pub const JNZ: u8 = 0x28;
pub const JC: u8 = 0x29;
pub const JV: u8 = 0x2A;
pub const CALL: u8 = 0x2B;
pub const RET: u8 = 0x2C;

pub const PUSH_A: u8 = 0x2D;
pub const PUSH_B: u8 = 0x2E;
pub const PUSH_C: u8 = 0x2F;
pub const PUSH_D: u8 = 0x30;
pub const PUSH_SI: u8 = 0x31;
pub const PUSH_DI: u8 = 0x32;
pub const POP_A: u8 = 0x33;
pub const POP_B: u8 = 0x34;
pub const POP_C: u8 = 0x35;
pub const POP_D: u8 = 0x36;
pub const POP_SI: u8 = 0x37;
pub const POP_DI: u8 = 0x38;

pub const MOV_IMM_IND_A: u8 = 0x39;
pub const MOV_DI_IND_A: u8 = 0x3A;
pub const MOV_IMM_IND_B: u8 = 0x3B;
pub const MOV_DI_IND_B: u8 = 0x3C;
pub const MOV_IMM_IND_C: u8 = 0x3D;
pub const MOV_DI_IND_C: u8 = 0x3E;
pub const MOV_IMM_IND_D: u8 = 0x3F;
pub const MOV_DI_IND_D: u8 = 0x40;
pub const MOV_IMM_IND_SI: u8 = 0x41;
pub const MOV_IMM_IND_DI: u8 = 0x42;
pub const MOV_IMM_IND_CD: u8 = 0x43;
pub const MOV_SI_IND_CD: u8 = 0x44;
pub const MOV_DI_IND_CD: u8 = 0x45;

pub const ADD_A_B: u8 = 0x46;
pub const ADC_A_B: u8 = 0x47;
pub const SUB_A_B: u8 = 0x48;
pub const SBB_A_B: u8 = 0x49;
pub const AND_A_B: u8 = 0x4A;
pub const OR_A_B: u8 = 0x4B;
pub const XOR_A_B: u8 = 0x4C;
pub const NOT_A: u8 = 0x4D;
pub const SHL_A: u8 = 0x4E;
pub const SHR_A: u8 = 0x4F;

pub const ADD_A_C: u8 = 0x50;
pub const ADC_A_C: u8 = 0x51;
pub const SUB_A_C: u8 = 0x52;
pub const SBB_A_C: u8 = 0x53;
pub const AND_A_C: u8 = 0x54;
pub const OR_A_C: u8 = 0x55;
pub const XOR_A_C: u8 = 0x56;

pub const ADD_A_D: u8 = 0x57;
pub const ADC_A_D: u8 = 0x58;
pub const SUB_A_D: u8 = 0x59;
pub const SBB_A_D: u8 = 0x5A;
pub const AND_A_D: u8 = 0x5B;
pub const OR_A_D: u8 = 0x5C;
pub const XOR_A_D: u8 = 0x5D;

pub const ADD_B_C: u8 = 0x5E;
pub const ADC_B_C: u8 = 0x5F;
pub const SUB_B_C: u8 = 0x60;
pub const SBB_B_C: u8 = 0x61;
pub const AND_B_C: u8 = 0x62;
pub const OR_B_C: u8 = 0x63;
pub const XOR_B_C: u8 = 0x64;
pub const NOT_B: u8 = 0x65;
pub const SHL_B: u8 = 0x66;
pub const SHR_B: u8 = 0x67;

pub const ADD_B_D: u8 = 0x68;
pub const ADC_B_D: u8 = 0x69;
pub const SUB_B_D: u8 = 0x6A;
pub const SBB_B_D: u8 = 0x6B;
pub const AND_B_D: u8 = 0x6C;
pub const OR_B_D: u8 = 0x6D;
pub const XOR_B_D: u8 = 0x6E;

pub const ADD_C_D: u8 = 0x6F;
pub const ADC_C_D: u8 = 0x70;
pub const SUB_C_D: u8 = 0x71;
pub const SBB_C_D: u8 = 0x72;
pub const AND_C_D: u8 = 0x73;
pub const OR_C_D: u8 = 0x74;
pub const XOR_C_D: u8 = 0x75;
pub const NOT_C: u8 = 0x76;
pub const SHL_C: u8 = 0x77;
pub const SHR_C: u8 = 0x78;
pub const NOT_D: u8 = 0x79;
pub const SHL_D: u8 = 0x7A;
pub const SHR_D: u8 = 0x7B;

pub const CLR_A: u8 = 0x7C;
pub const CLR_B: u8 = 0x7D;
pub const CLR_C: u8 = 0x7E;
pub const CLR_D: u8 = 0x7F;

pub const SWP_A_B: u8 = 0x80;
pub const SWP_A_C: u8 = 0x81;
pub const SWP_A_D: u8 = 0x82;
pub const SWP_B_C: u8 = 0x83;
pub const SWP_B_D: u8 = 0x84;
pub const SWP_C_D: u8 = 0x85;

pub const ADD_AB_CD: u8 = 0x86;
pub const ADC_AB_CD: u8 = 0x87;
pub const SUB_AB_CD: u8 = 0x88;
pub const SBB_AB_CD: u8 = 0x89;

pub const JMP_IND: u8 = 0x8A;
pub const JNZ_IND: u8 = 0x8B;
pub const JC_IND: u8 = 0x8C;
pub const JV_IND: u8 = 0x8D;
pub const CALL_IND: u8 = 0x8E;

pub const CMP_A_B: u8 = 0x8F;
pub const CMP_A_C: u8 = 0x90;
pub const CMP_A_D: u8 = 0x91;
pub const CMP_B_C: u8 = 0x92;
pub const CMP_B_D: u8 = 0x93;
pub const CMP_C_D: u8 = 0x94;

pub const INC_A: u8 = 0x95;
pub const INC_B: u8 = 0x96;
pub const INC_C: u8 = 0x97;
pub const INC_D: u8 = 0x98;
pub const DEC_A: u8 = 0x99;
pub const DEC_B: u8 = 0x9A;
pub const DEC_C: u8 = 0x9B;
pub const DEC_D: u8 = 0x9C;
pub const INC_SI: u8 = 0x9D;
pub const INC_DI: u8 = 0x9E;
pub const DEC_SI: u8 = 0x9F;
pub const DEC_DI: u8 = 0xA0;

pub const OUT_A: u8 = 0xA1;
pub const OUT_B: u8 = 0xA2;
pub const OUT_C: u8 = 0xA3;
pub const OUT_D: u8 = 0xA4;
pub const IN_A: u8 = 0xA5;
pub const IN_B: u8 = 0xA6;
pub const IN_C: u8 = 0xA7;
pub const IN_D: u8 = 0xA8;

pub const PUSH_FL: u8 = 0xA9;
pub const POP_FL: u8 = 0xAA;
pub const CLR_FL: u8 = 0xAB;
pub const JZ: u8 = 0xAC;
pub const JZ_IND: u8 = 0xAD;

pub const MOV_CD_IND_A: u8 = 0xAE;
pub const MOV_CD_IND_B: u8 = 0xAF;

pub const CMP_A_IMM: u8 = 0xB0;
pub const CMP_B_IMM: u8 = 0xB1;
pub const CMP_C_IMM: u8 = 0xB2;
pub const CMP_D_IMM: u8 = 0xB3;
pub const AND_A_IMM: u8 = 0xB4;
pub const AND_B_IMM: u8 = 0xB5;
pub const AND_C_IMM: u8 = 0xB6;
pub const AND_D_IMM: u8 = 0xB7;
pub const OR_A_IMM: u8 = 0xB8;
pub const OR_B_IMM: u8 = 0xB9;
pub const OR_C_IMM: u8 = 0xBA;
pub const OR_D_IMM: u8 = 0xBB;

pub const MOV_A_CD_IND: u8 = 0xBC;
pub const MOV_B_CD_IND: u8 = 0xBD;
pub const MOV_SI_IND_IMM: u8 = 0xBE;
pub const MOV_DI_IND_IMM: u8 = 0xBF;
pub const MOV_CD_IND_IMM: u8 = 0xC0;
pub const MOV_CD_IMM: u8 = 0xC1;

pub const MOV_BP_SP: u8 = 0xC2;
pub const MOV_SP_BP: u8 = 0xC3;
pub const MOV_SI_BP_IDX: u8 = 0xC4;
pub const MOV_DI_BP_IDX: u8 = 0xC5;
pub const MOV_DI_SI_IDX: u8 = 0xC6;
pub const MOV_A_BP_IDX: u8 = 0xC7;
pub const MOV_B_BP_IDX: u8 = 0xC8;
pub const MOV_C_BP_IDX: u8 = 0xC9;
pub const MOV_D_BP_IDX: u8 = 0xCA;
pub const MOV_BP_IDX_SI: u8 = 0xCB;
pub const MOV_BP_IDX_DI: u8 = 0xCC;
pub const MOV_SI_IDX_DI: u8 = 0xCD;
pub const MOV_BP_IDX_A: u8 = 0xCE;
pub const MOV_BP_IDX_B: u8 = 0xCF;
pub const MOV_BP_IDX_C: u8 = 0xD0;
pub const MOV_BP_IDX_D: u8 = 0xD1;

pub const PUSH_BP: u8 = 0xD2;
pub const POP_BP: u8 = 0xD3;
pub const PUSH_IMM: u8 = 0xD4;
pub const PUSHW_IMM: u8 = 0xD5;
pub const PUSH_AB: u8 = 0xD6;
pub const PUSH_CD: u8 = 0xD7;
pub const PUSH_BP_IDX: u8 = 0xD8;
pub const POP_AB: u8 = 0xD9;
pub const POP_CD: u8 = 0xDA;
pub const POP_BP_IDX: u8 = 0xDB;

pub const JNC: u8 = 0xDC;
pub const JNC_IND: u8 = 0xDD;

pub const RTI: u8 = 0xFD;
pub const NMIVEC: u8 = 0xFE;
pub const HLT: u8 = 0xFF;
