mod arith;
mod control;
mod data_mov;
mod system;

// Import trait implementations for CPU instruction categories
pub use arith::Arithmetic;
pub use control::ControlFlow;
pub use data_mov::DataMov;
pub use system::System;

use crate::cpu::{Cpu, Executed, InstructionTable};
use crate::decoder::decoder;
use crate::error::ExecFault;
use crate::memory::SwAddr;

/// Mnemonics understood by the base instruction table.
/// This is a small i386 subset, enough to drive the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    NOP,   // No operation
    MOVI,  // mov $imm32, r32
    MOVR,  // mov r32, r32
    LOAD,  // mov moffs32, %eax
    STORE, // mov %eax, moffs32
    PUSH,  // push r32
    POP,   // pop r32
    ADD,   // add $imm32, %eax
    SUB,   // sub $imm32, %eax
    CMP,   // cmp $imm32, %eax
    INC,   // inc r32
    DEC,   // dec r32
    CALL,  // call rel32
    RET,   // ret
    JMP,   // jmp rel8 / rel32
    JE,    // je rel8
    JNE,   // jne rel8
    INT3,  // Breakpoint
    TRAP,  // nemu_trap, ends the guest program
}

/// A decoded instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub eip: SwAddr,   // Address of the first byte
    pub opcode: u8,    // Primary opcode byte
    pub mnem: Mnemonic,
    pub len: u32,      // Encoded length in bytes
    pub dst: usize,    // Destination register index
    pub src: usize,    // Source register index
    pub imm: u32,      // Immediate, displacement or memory offset
}

impl Instruction {
    pub fn new(eip: SwAddr, opcode: u8, mnem: Mnemonic, len: u32) -> Instruction {
        Instruction {
            eip,
            opcode,
            mnem,
            len,
            dst: 0,
            src: 0,
            imm: 0,
        }
    }
}

/// Instruction table backed by the built-in decoder
#[derive(Debug, Default)]
pub struct BaseTable;

impl InstructionTable for BaseTable {
    fn exec(&mut self, cpu: &mut Cpu, eip: SwAddr) -> Result<Executed, ExecFault> {
        let inst = decoder(&cpu.mem, eip)?;
        let trap = cpu.execute(&inst);
        Ok(Executed {
            len: inst.len,
            trap,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::constants::registers::*;
    use crate::constants::ENTRY_START;
    use crate::cpu::Trap;
    use crate::memory::MemoryMap;

    pub fn init_cpu(program: &[u8]) -> Cpu {
        let mut mem = MemoryMap::with_capacity(0x20_0000);
        mem.load(ENTRY_START, program);
        let mut cpu = Cpu::new(mem);
        cpu.regs.set_reg_l(R_ESP, 0x1F_0000);
        cpu
    }

    /// Run instructions the way the monitor does, returning the last trap
    pub fn run(cpu: &mut Cpu, steps: usize) -> Option<Trap> {
        let mut table = BaseTable;
        let mut trap = None;
        for _ in 0..steps {
            let eip = cpu.regs.eip;
            let executed = table.exec(cpu, eip).unwrap();
            cpu.regs.eip = cpu.regs.eip.wrapping_add(executed.len);
            trap = executed.trap;
        }
        trap
    }

    #[test]
    fn test_mov_and_arith() {
        // mov $0x10,%eax; add $0x5,%eax; sub $0x15,%eax
        let mut cpu = init_cpu(&[
            0xB8, 0x10, 0, 0, 0, 0x05, 0x05, 0, 0, 0, 0x2D, 0x15, 0, 0, 0,
        ]);
        run(&mut cpu, 2);
        assert_eq!(cpu.regs.reg_l(R_EAX), 0x15);
        run(&mut cpu, 1);
        assert_eq!(cpu.regs.reg_l(R_EAX), 0);
        assert!(cpu.regs.eflags.zf());
        assert_eq!(cpu.regs.eip, ENTRY_START + 15);
        assert_eq!(cpu.assembly.as_str(), "sub $0x15,%eax");
    }

    #[test]
    fn test_inc_dec_keep_carry() {
        // mov $-1,%ecx; inc %ecx; dec %ecx
        let mut cpu = init_cpu(&[0xB9, 0xFF, 0xFF, 0xFF, 0xFF, 0x41, 0x49]);
        cpu.regs.eflags.set_cf(true);
        run(&mut cpu, 2);
        assert_eq!(cpu.regs.reg_l(R_ECX), 0);
        assert!(cpu.regs.eflags.zf());
        assert!(cpu.regs.eflags.cf());
        run(&mut cpu, 1);
        assert_eq!(cpu.regs.reg_l(R_ECX), 0xFFFF_FFFF);
        assert!(cpu.regs.eflags.sf());
    }

    #[test]
    fn test_register_moves() {
        // mov $7,%edx; mov %edx,%esi; mov %esi,%edi (8b form)
        let mut cpu = init_cpu(&[0xBA, 7, 0, 0, 0, 0x89, 0xD6, 0x8B, 0xFE]);
        run(&mut cpu, 3);
        assert_eq!(cpu.regs.reg_l(R_ESI), 7);
        assert_eq!(cpu.regs.reg_l(R_EDI), 7);
    }

    #[test]
    fn test_load_store() {
        // mov $0xabcd,%eax; mov %eax,0x2000; mov $0,%eax; mov 0x2000,%eax
        let mut cpu = init_cpu(&[
            0xB8, 0xCD, 0xAB, 0, 0, 0xA3, 0x00, 0x20, 0, 0, 0xB8, 0, 0, 0, 0, 0xA1, 0x00, 0x20, 0,
            0,
        ]);
        run(&mut cpu, 2);
        assert_eq!(cpu.swaddr_read(0x2000, 4), 0xABCD);
        run(&mut cpu, 2);
        assert_eq!(cpu.regs.reg_l(R_EAX), 0xABCD);
    }

    #[test]
    fn test_call_ret() {
        // call +1; int3; ret
        let mut cpu = init_cpu(&[0xE8, 0x01, 0, 0, 0, 0xCC, 0xC3]);
        let esp = cpu.regs.reg_l(R_ESP);
        run(&mut cpu, 1);
        assert_eq!(cpu.regs.eip, ENTRY_START + 6);
        assert_eq!(cpu.regs.reg_l(R_ESP), esp - 4);
        assert_eq!(cpu.swaddr_read(esp - 4, 4), ENTRY_START + 5);
        run(&mut cpu, 1);
        assert_eq!(cpu.regs.eip, ENTRY_START + 5);
        assert_eq!(cpu.regs.reg_l(R_ESP), esp);
        assert_eq!(run(&mut cpu, 1), Some(Trap::Breakpoint));
    }

    #[test]
    fn test_conditional_jumps() {
        // cmp $0,%eax; je +2; nop; nop; jne -2 (not taken); jmp -3
        let mut cpu = init_cpu(&[
            0x3D, 0, 0, 0, 0, 0x74, 0x02, 0x90, 0x90, 0x75, 0xFE, 0xEB, 0xFD,
        ]);
        run(&mut cpu, 2);
        assert_eq!(cpu.regs.eip, ENTRY_START + 9);
        run(&mut cpu, 1);
        assert_eq!(cpu.regs.eip, ENTRY_START + 11);
        run(&mut cpu, 1);
        assert_eq!(cpu.regs.eip, ENTRY_START + 10);
    }

    #[test]
    fn test_push_pop_registers() {
        // mov $3,%ebx; push %ebx; pop %ebp
        let mut cpu = init_cpu(&[0xBB, 3, 0, 0, 0, 0x53, 0x5D]);
        run(&mut cpu, 3);
        assert_eq!(cpu.regs.reg_l(R_EBP), 3);
        assert_eq!(cpu.regs.reg_l(R_ESP), 0x1F_0000);
    }

    #[test]
    fn test_traps() {
        let mut cpu = init_cpu(&[0xCC, 0xD6]);
        assert_eq!(run(&mut cpu, 1), Some(Trap::Breakpoint));
        assert_eq!(run(&mut cpu, 1), Some(Trap::End));
    }

    #[test]
    fn test_invalid_opcode_faults() {
        let mut cpu = init_cpu(&[0x0F, 0x0B]);
        let err = BaseTable.exec(&mut cpu, ENTRY_START).unwrap_err();
        assert_eq!(
            err,
            ExecFault::InvalidOpcode {
                eip: ENTRY_START,
                opcode: 0x0F
            }
        );
        assert_eq!(cpu.regs.eip, ENTRY_START);
    }

    #[test]
    fn test_memory_modrm_unsupported() {
        // mov %eax,(%ebx)
        let mut cpu = init_cpu(&[0x89, 0x03]);
        assert!(matches!(
            BaseTable.exec(&mut cpu, ENTRY_START),
            Err(ExecFault::UnsupportedOperand { modrm: 0x03, .. })
        ));
    }
}
