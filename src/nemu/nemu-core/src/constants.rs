// Size of the emulated physical memory in bytes
pub const HW_MEM_SIZE: usize = 128 * 1024 * 1024;

// Guest programs are loaded and entered here
pub const ENTRY_START: u32 = 0x100000;

// Monitor limits
pub const NR_WP: usize = 32;
pub const WP_EXPR_LEN: usize = 64;
pub const ASM_BUF_LEN: usize = 80;
pub const NR_TOKENS: usize = 32;

// Trace records are echoed at info level below this budget (handy for `si`)
pub const MAX_INSTR_TO_PRINT: u64 = 10;

// Instruction budget meaning "run until something stops us"
pub const RUN_FOREVER: u64 = u64::MAX;

pub mod registers {
    // General purpose register indices, in i386 encoding order.
    // Do NOT reorder: the decoder relies on it.
    pub const R_EAX: usize = 0;
    pub const R_ECX: usize = 1;
    pub const R_EDX: usize = 2;
    pub const R_EBX: usize = 3;
    pub const R_ESP: usize = 4;
    pub const R_EBP: usize = 5;
    pub const R_ESI: usize = 6;
    pub const R_EDI: usize = 7;

    pub const NR_GPR: usize = 8;

    pub const REGSL: [&str; NR_GPR] = ["eax", "ecx", "edx", "ebx", "esp", "ebp", "esi", "edi"];
    pub const REGSW: [&str; NR_GPR] = ["ax", "cx", "dx", "bx", "sp", "bp", "si", "di"];
    pub const REGSB: [&str; NR_GPR] = ["al", "cl", "dl", "bl", "ah", "ch", "dh", "bh"];

    // Power-on EFLAGS: only the reserved bit 1 is set
    pub const EFLAGS_RESET: u32 = 0x0000_0002;
}

pub mod eflags {
    // EFLAGS bit positions
    pub const CF: u32 = 0;
    pub const PF: u32 = 2;
    pub const AF: u32 = 4;
    pub const ZF: u32 = 6;
    pub const SF: u32 = 7;
    pub const TF: u32 = 8;
    pub const IF: u32 = 9;
    pub const DF: u32 = 10;
    pub const OF: u32 = 11;
    pub const IOPL: u32 = 12; // 2 bits wide
    pub const NT: u32 = 14;

    pub const IOPL_MASK: u32 = 0b11 << IOPL;
}

pub mod opcodes {
    pub const OPCODE_ADD_EAX_IMM: u8 = 0x05;
    pub const OPCODE_SUB_EAX_IMM: u8 = 0x2D;
    pub const OPCODE_CMP_EAX_IMM: u8 = 0x3D;
    pub const OPCODE_INC_R32: u8 = 0x40; // +r
    pub const OPCODE_DEC_R32: u8 = 0x48; // +r
    pub const OPCODE_PUSH_R32: u8 = 0x50; // +r
    pub const OPCODE_POP_R32: u8 = 0x58; // +r
    pub const OPCODE_JE_REL8: u8 = 0x74;
    pub const OPCODE_JNE_REL8: u8 = 0x75;
    pub const OPCODE_MOV_RM_R: u8 = 0x89;
    pub const OPCODE_MOV_R_RM: u8 = 0x8B;
    pub const OPCODE_NOP: u8 = 0x90;
    pub const OPCODE_MOV_EAX_MOFFS: u8 = 0xA1;
    pub const OPCODE_MOV_MOFFS_EAX: u8 = 0xA3;
    pub const OPCODE_MOV_R32_IMM: u8 = 0xB8; // +r
    pub const OPCODE_RET: u8 = 0xC3;
    pub const OPCODE_INT3: u8 = 0xCC;
    pub const OPCODE_NEMU_TRAP: u8 = 0xD6;
    pub const OPCODE_CALL_REL32: u8 = 0xE8;
    pub const OPCODE_JMP_REL32: u8 = 0xE9;
    pub const OPCODE_JMP_REL8: u8 = 0xEB;
}
