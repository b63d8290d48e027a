use crate::constants::opcodes::*;
use crate::constants::registers::R_EAX;
use crate::error::ExecFault;
use crate::instructions::{Instruction, Mnemonic};
use crate::memory::{MemoryMap, SwAddr};
use log::error;

const MODRM_MOD_REG: u8 = 0b11;

/// Split a ModR/M byte, only accepting the register-direct form
fn decode_modrm_reg(mem: &MemoryMap, eip: SwAddr) -> Result<(usize, usize), ExecFault> {
    let modrm = mem.instr_fetch(eip.wrapping_add(1), 1) as u8;
    if modrm >> 6 != MODRM_MOD_REG {
        error!(
            "Unsupported ModR/M form 0x{:02x} at eip = 0x{:08x}",
            modrm, eip
        );
        return Err(ExecFault::UnsupportedOperand { eip, modrm });
    }
    let reg = ((modrm >> 3) & 0x7) as usize;
    let rm = (modrm & 0x7) as usize;
    Ok((reg, rm))
}

/// Instructions with a trailing 32-bit immediate
fn with_imm32(mem: &MemoryMap, mut i: Instruction) -> Instruction {
    i.imm = mem.instr_fetch(i.eip.wrapping_add(1), 4);
    i.len = 5;
    i
}

/// Instructions with a trailing 8-bit immediate
fn with_imm8(mem: &MemoryMap, mut i: Instruction) -> Instruction {
    i.imm = mem.instr_fetch(i.eip.wrapping_add(1), 1);
    i.len = 2;
    i
}

/// Decode the instruction starting at `eip`
pub fn decoder(mem: &MemoryMap, eip: SwAddr) -> Result<Instruction, ExecFault> {
    let opcode = mem.instr_fetch(eip, 1) as u8;
    let inst = |mnem| Instruction::new(eip, opcode, mnem, 1);

    let i = match opcode {
        OPCODE_NOP => inst(Mnemonic::NOP),
        OPCODE_RET => inst(Mnemonic::RET),
        OPCODE_INT3 => inst(Mnemonic::INT3),
        OPCODE_NEMU_TRAP => inst(Mnemonic::TRAP),

        // Register encoded in the low three opcode bits
        0xB8..=0xBF => {
            let mut i = with_imm32(mem, inst(Mnemonic::MOVI));
            i.dst = (opcode - OPCODE_MOV_R32_IMM) as usize;
            i
        }
        0x40..=0x47 => {
            let mut i = inst(Mnemonic::INC);
            i.dst = (opcode - OPCODE_INC_R32) as usize;
            i
        }
        0x48..=0x4F => {
            let mut i = inst(Mnemonic::DEC);
            i.dst = (opcode - OPCODE_DEC_R32) as usize;
            i
        }
        0x50..=0x57 => {
            let mut i = inst(Mnemonic::PUSH);
            i.src = (opcode - OPCODE_PUSH_R32) as usize;
            i
        }
        0x58..=0x5F => {
            let mut i = inst(Mnemonic::POP);
            i.dst = (opcode - OPCODE_POP_R32) as usize;
            i
        }

        // Accumulator forms
        OPCODE_ADD_EAX_IMM | OPCODE_SUB_EAX_IMM | OPCODE_CMP_EAX_IMM => {
            let mnem = match opcode {
                OPCODE_ADD_EAX_IMM => Mnemonic::ADD,
                OPCODE_SUB_EAX_IMM => Mnemonic::SUB,
                _ => Mnemonic::CMP,
            };
            let mut i = with_imm32(mem, inst(mnem));
            i.dst = R_EAX;
            i
        }
        OPCODE_MOV_EAX_MOFFS => {
            let mut i = with_imm32(mem, inst(Mnemonic::LOAD));
            i.dst = R_EAX;
            i
        }
        OPCODE_MOV_MOFFS_EAX => {
            let mut i = with_imm32(mem, inst(Mnemonic::STORE));
            i.src = R_EAX;
            i
        }

        // ModR/M register forms
        OPCODE_MOV_RM_R => {
            let (reg, rm) = decode_modrm_reg(mem, eip)?;
            let mut i = inst(Mnemonic::MOVR);
            i.len = 2;
            i.dst = rm;
            i.src = reg;
            i
        }
        OPCODE_MOV_R_RM => {
            let (reg, rm) = decode_modrm_reg(mem, eip)?;
            let mut i = inst(Mnemonic::MOVR);
            i.len = 2;
            i.dst = reg;
            i.src = rm;
            i
        }

        // Relative control transfers
        OPCODE_CALL_REL32 => with_imm32(mem, inst(Mnemonic::CALL)),
        OPCODE_JMP_REL32 => with_imm32(mem, inst(Mnemonic::JMP)),
        OPCODE_JMP_REL8 => with_imm8(mem, inst(Mnemonic::JMP)),
        OPCODE_JE_REL8 => with_imm8(mem, inst(Mnemonic::JE)),
        OPCODE_JNE_REL8 => with_imm8(mem, inst(Mnemonic::JNE)),

        _ => {
            error!("Invalid opcode 0x{:02x} at eip = 0x{:08x}", opcode, eip);
            return Err(ExecFault::InvalidOpcode { eip, opcode });
        }
    };

    Ok(i)
}
