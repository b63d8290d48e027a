pub mod reg;

pub use reg::{Eflags, Gpr, Registers};

use crate::constants::registers::R_ESP;
use crate::constants::ASM_BUF_LEN;
use crate::error::ExecFault;
use crate::instructions::{Arithmetic, ControlFlow, DataMov, Instruction, Mnemonic, System};
use crate::memory::{MemoryMap, SwAddr};

/// Event raised by an instruction that the run loop has to act on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trap {
    /// `int3`: suspend emulation and hand control back to the monitor
    Breakpoint,
    /// The guest program signalled that it finished
    End,
}

/// Result of executing one instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Executed {
    /// Instruction length in bytes; the run loop advances eip by it
    pub len: u32,
    pub trap: Option<Trap>,
}

/// Instruction decode/execute table.
///
/// `exec` decodes the instruction at `eip`, applies all of its effects to the
/// CPU and memory, and reports how many bytes it occupied. Control transfer
/// instructions adjust `eip` so that adding the returned length lands on the
/// target.
pub trait InstructionTable {
    fn exec(&mut self, cpu: &mut Cpu, eip: SwAddr) -> Result<Executed, ExecFault>;
}

/// Emulated CPU: register file plus the memory it is wired to
pub struct Cpu {
    pub regs: Registers,
    pub mem: MemoryMap,
    /// Disassembly of the most recently executed instruction
    pub assembly: heapless::String<ASM_BUF_LEN>,
}

impl Cpu {
    pub fn new(mem: MemoryMap) -> Cpu {
        Cpu {
            regs: Registers::new(),
            mem,
            assembly: heapless::String::new(),
        }
    }

    /// Reset registers to their power-on values. Memory is left untouched.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.assembly.clear();
    }

    pub fn swaddr_read(&self, addr: SwAddr, len: usize) -> u32 {
        self.mem.swaddr_read(addr, len)
    }

    pub fn swaddr_write(&mut self, addr: SwAddr, len: usize, value: u32) {
        self.mem.swaddr_write(addr, len, value)
    }

    pub fn instr_fetch(&self, addr: SwAddr, len: usize) -> u32 {
        self.mem.instr_fetch(addr, len)
    }

    pub fn push(&mut self, value: u32) {
        let esp = self.regs.reg_l(R_ESP).wrapping_sub(4);
        self.swaddr_write(esp, 4, value);
        self.regs.set_reg_l(R_ESP, esp);
    }

    pub fn pop(&mut self) -> u32 {
        let esp = self.regs.reg_l(R_ESP);
        let value = self.swaddr_read(esp, 4);
        self.regs.set_reg_l(R_ESP, esp.wrapping_add(4));
        value
    }

    /// Record the disassembly of the current instruction, cut at
    /// `ASM_BUF_LEN` bytes
    pub fn print_asm(&mut self, args: core::fmt::Arguments) {
        self.assembly.clear();
        for c in args.to_string().chars() {
            if self.assembly.push(c).is_err() {
                break;
            }
        }
    }

    /// Execute a decoded instruction and report any trap it raised
    pub fn execute(&mut self, inst: &Instruction) -> Option<Trap> {
        match inst.mnem {
            Mnemonic::NOP => {
                self.print_asm(format_args!("nop"));
                None
            }
            Mnemonic::MOVI => self.movi(inst),
            Mnemonic::MOVR => self.movr(inst),
            Mnemonic::LOAD => self.load(inst),
            Mnemonic::STORE => self.store(inst),
            Mnemonic::PUSH => self.push_r(inst),
            Mnemonic::POP => self.pop_r(inst),
            Mnemonic::ADD => self.add(inst),
            Mnemonic::SUB => self.sub(inst),
            Mnemonic::CMP => self.cmp(inst),
            Mnemonic::INC => self.inc(inst),
            Mnemonic::DEC => self.dec(inst),
            Mnemonic::CALL => self.call(inst),
            Mnemonic::RET => self.ret(inst),
            Mnemonic::JMP => self.jmp(inst),
            Mnemonic::JE => self.je(inst),
            Mnemonic::JNE => self.jne(inst),
            Mnemonic::INT3 => self.int3(inst),
            Mnemonic::TRAP => self.nemu_trap(inst),
        }
    }
}
