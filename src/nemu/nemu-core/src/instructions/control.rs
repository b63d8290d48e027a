use super::Instruction;
use crate::cpu::{Cpu, Trap};
use crate::utils::sext8;

/// Control transfer instructions.
///
/// The run loop adds the instruction length to eip after execution, so every
/// taken branch leaves eip at `target - len`.
pub trait ControlFlow {
    fn call(&mut self, inst: &Instruction) -> Option<Trap>; // Near relative call
    fn ret(&mut self, inst: &Instruction) -> Option<Trap>; // Near return
    fn jmp(&mut self, inst: &Instruction) -> Option<Trap>; // Unconditional jump
    fn je(&mut self, inst: &Instruction) -> Option<Trap>; // Jump if ZF
    fn jne(&mut self, inst: &Instruction) -> Option<Trap>; // Jump if !ZF
}

// Branch displacement of a rel8 or rel32 encoding
fn displacement(inst: &Instruction) -> u32 {
    match inst.len {
        2 => sext8(inst.imm as u8),
        _ => inst.imm,
    }
}

fn target(inst: &Instruction) -> u32 {
    inst.eip
        .wrapping_add(inst.len)
        .wrapping_add(displacement(inst))
}

impl Cpu {
    fn branch(&mut self, inst: &Instruction, taken: bool, name: &str) {
        let target = target(inst);
        if taken {
            self.regs.eip = target.wrapping_sub(inst.len);
        }
        self.print_asm(format_args!("{} {:x}", name, target));
    }
}

impl ControlFlow for Cpu {
    fn call(&mut self, inst: &Instruction) -> Option<Trap> {
        let ret_addr = inst.eip.wrapping_add(inst.len);
        self.push(ret_addr);
        self.branch(inst, true, "call");
        None
    }

    fn ret(&mut self, inst: &Instruction) -> Option<Trap> {
        let ret_addr = self.pop();
        self.regs.eip = ret_addr.wrapping_sub(inst.len);
        self.print_asm(format_args!("ret"));
        None
    }

    fn jmp(&mut self, inst: &Instruction) -> Option<Trap> {
        self.branch(inst, true, "jmp");
        None
    }

    fn je(&mut self, inst: &Instruction) -> Option<Trap> {
        let taken = self.regs.eflags.zf();
        self.branch(inst, taken, "je");
        None
    }

    fn jne(&mut self, inst: &Instruction) -> Option<Trap> {
        let taken = !self.regs.eflags.zf();
        self.branch(inst, taken, "jne");
        None
    }
}
