use super::Instruction;
use crate::constants::registers::REGSL;
use crate::cpu::{Cpu, Trap};

/// Register and memory moves, stack pushes and pops
pub trait DataMov {
    fn movi(&mut self, inst: &Instruction) -> Option<Trap>;
    fn movr(&mut self, inst: &Instruction) -> Option<Trap>;
    fn load(&mut self, inst: &Instruction) -> Option<Trap>;
    fn store(&mut self, inst: &Instruction) -> Option<Trap>;
    fn push_r(&mut self, inst: &Instruction) -> Option<Trap>;
    fn pop_r(&mut self, inst: &Instruction) -> Option<Trap>;
}

impl DataMov for Cpu {
    // Load immediate into register
    fn movi(&mut self, inst: &Instruction) -> Option<Trap> {
        self.regs.set_reg_l(inst.dst, inst.imm);
        self.print_asm(format_args!("mov $0x{:x},%{}", inst.imm, REGSL[inst.dst]));
        None
    }

    // Register to register copy
    fn movr(&mut self, inst: &Instruction) -> Option<Trap> {
        let value = self.regs.reg_l(inst.src);
        self.regs.set_reg_l(inst.dst, value);
        self.print_asm(format_args!("mov %{},%{}", REGSL[inst.src], REGSL[inst.dst]));
        None
    }

    // Load from an absolute address
    fn load(&mut self, inst: &Instruction) -> Option<Trap> {
        let value = self.swaddr_read(inst.imm, 4);
        self.regs.set_reg_l(inst.dst, value);
        self.print_asm(format_args!("mov 0x{:x},%{}", inst.imm, REGSL[inst.dst]));
        None
    }

    // Store to an absolute address
    fn store(&mut self, inst: &Instruction) -> Option<Trap> {
        let value = self.regs.reg_l(inst.src);
        self.swaddr_write(inst.imm, 4, value);
        self.print_asm(format_args!("mov %{},0x{:x}", REGSL[inst.src], inst.imm));
        None
    }

    fn push_r(&mut self, inst: &Instruction) -> Option<Trap> {
        // push %esp stores the value before the decrement
        let value = self.regs.reg_l(inst.src);
        self.push(value);
        self.print_asm(format_args!("push %{}", REGSL[inst.src]));
        None
    }

    fn pop_r(&mut self, inst: &Instruction) -> Option<Trap> {
        let value = self.pop();
        self.regs.set_reg_l(inst.dst, value);
        self.print_asm(format_args!("pop %{}", REGSL[inst.dst]));
        None
    }
}
