use super::Instruction;
use crate::constants::registers::R_EAX;
use crate::cpu::{Cpu, Trap};
use log::{error, info, warn};

/// Instructions that hand control back to the monitor
pub trait System {
    fn int3(&mut self, inst: &Instruction) -> Option<Trap>;
    fn nemu_trap(&mut self, inst: &Instruction) -> Option<Trap>;
}

impl System for Cpu {
    fn int3(&mut self, inst: &Instruction) -> Option<Trap> {
        warn!("Hit breakpoint at eip = 0x{:08x}", inst.eip);
        self.print_asm(format_args!("int3"));
        Some(Trap::Breakpoint)
    }

    // The guest reports its exit status in %eax
    fn nemu_trap(&mut self, inst: &Instruction) -> Option<Trap> {
        let status = self.regs.reg_l(R_EAX);
        if status == 0 {
            info!("nemu: HIT GOOD TRAP at eip = 0x{:08x}", inst.eip);
        } else {
            error!(
                "nemu: HIT BAD TRAP at eip = 0x{:08x} (eax = 0x{:x})",
                inst.eip, status
            );
        }
        self.print_asm(format_args!("nemu trap"));
        Some(Trap::End)
    }
}
