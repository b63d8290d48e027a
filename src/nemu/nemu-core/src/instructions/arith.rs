use super::Instruction;
use crate::constants::registers::REGSL;
use crate::cpu::{Cpu, Trap};
use crate::utils::{add_with_flags, set_result_flags, sub_with_flags};

/// Integer arithmetic on 32-bit operands
pub trait Arithmetic {
    fn add(&mut self, inst: &Instruction) -> Option<Trap>; // Add immediate
    fn sub(&mut self, inst: &Instruction) -> Option<Trap>; // Subtract immediate
    fn cmp(&mut self, inst: &Instruction) -> Option<Trap>; // Compare, flags only
    fn inc(&mut self, inst: &Instruction) -> Option<Trap>; // Increment register
    fn dec(&mut self, inst: &Instruction) -> Option<Trap>; // Decrement register
}

impl Arithmetic for Cpu {
    fn add(&mut self, inst: &Instruction) -> Option<Trap> {
        let a = self.regs.reg_l(inst.dst);
        let result = add_with_flags(&mut self.regs.eflags, a, inst.imm);
        self.regs.set_reg_l(inst.dst, result);
        self.print_asm(format_args!("add $0x{:x},%{}", inst.imm, REGSL[inst.dst]));
        None
    }

    fn sub(&mut self, inst: &Instruction) -> Option<Trap> {
        let a = self.regs.reg_l(inst.dst);
        let result = sub_with_flags(&mut self.regs.eflags, a, inst.imm);
        self.regs.set_reg_l(inst.dst, result);
        self.print_asm(format_args!("sub $0x{:x},%{}", inst.imm, REGSL[inst.dst]));
        None
    }

    fn cmp(&mut self, inst: &Instruction) -> Option<Trap> {
        let a = self.regs.reg_l(inst.dst);
        sub_with_flags(&mut self.regs.eflags, a, inst.imm);
        self.print_asm(format_args!("cmp $0x{:x},%{}", inst.imm, REGSL[inst.dst]));
        None
    }

    fn inc(&mut self, inst: &Instruction) -> Option<Trap> {
        // CF is preserved by inc/dec
        let result = self.regs.reg_l(inst.dst).wrapping_add(1);
        self.regs.set_reg_l(inst.dst, result);
        self.regs.eflags.set_of(result == 0x8000_0000);
        self.regs.eflags.set_af(result & 0xF == 0);
        set_result_flags(&mut self.regs.eflags, result);
        self.print_asm(format_args!("inc %{}", REGSL[inst.dst]));
        None
    }

    fn dec(&mut self, inst: &Instruction) -> Option<Trap> {
        let result = self.regs.reg_l(inst.dst).wrapping_sub(1);
        self.regs.set_reg_l(inst.dst, result);
        self.regs.eflags.set_of(result == 0x7FFF_FFFF);
        self.regs.eflags.set_af(result & 0xF == 0xF);
        set_result_flags(&mut self.regs.eflags, result);
        self.print_asm(format_args!("dec %{}", REGSL[inst.dst]));
        None
    }
}
