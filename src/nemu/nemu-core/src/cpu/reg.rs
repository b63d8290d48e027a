use crate::constants::eflags::*;
use crate::constants::registers::*;
use crate::constants::ENTRY_START;
use crate::error::RegisterError;

/// One general purpose register.
///
/// The 32, 16 and 8 bit views all read and write the same little-endian
/// buffer, so `ax` is the low half of `eax`, `al`/`ah` its two low bytes.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Gpr {
    bytes: [u8; 4],
}

impl Gpr {
    pub fn get32(&self) -> u32 {
        u32::from_le_bytes(self.bytes)
    }

    pub fn set32(&mut self, value: u32) {
        self.bytes = value.to_le_bytes();
    }

    pub fn get16(&self) -> u16 {
        u16::from_le_bytes([self.bytes[0], self.bytes[1]])
    }

    pub fn set16(&mut self, value: u16) {
        self.bytes[..2].copy_from_slice(&value.to_le_bytes());
    }

    /// `high` selects bits 8-15 instead of bits 0-7
    pub fn get8(&self, high: bool) -> u8 {
        self.bytes[high as usize]
    }

    pub fn set8(&mut self, high: bool, value: u8) {
        self.bytes[high as usize] = value;
    }
}

/// EFLAGS register, kept packed exactly as the hardware layout
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Eflags {
    val: u32,
}

macro_rules! flag_accessors {
    ($($get:ident, $set:ident => $bit:ident;)*) => {
        $(
            pub fn $get(&self) -> bool {
                self.val & (1 << $bit) != 0
            }

            pub fn $set(&mut self, on: bool) {
                if on {
                    self.val |= 1 << $bit;
                } else {
                    self.val &= !(1 << $bit);
                }
            }
        )*
    };
}

impl Eflags {
    pub fn new(val: u32) -> Self {
        Self { val }
    }

    pub fn val(&self) -> u32 {
        self.val
    }

    pub fn set_val(&mut self, val: u32) {
        self.val = val;
    }

    flag_accessors! {
        cf, set_cf => CF;
        pf, set_pf => PF;
        af, set_af => AF;
        zf, set_zf => ZF;
        sf, set_sf => SF;
        tf, set_tf => TF;
        if_, set_if => IF;
        df, set_df => DF;
        of, set_of => OF;
        nt, set_nt => NT;
    }

    pub fn iopl(&self) -> u8 {
        ((self.val & IOPL_MASK) >> IOPL) as u8
    }

    pub fn set_iopl(&mut self, level: u8) {
        self.val = (self.val & !IOPL_MASK) | (((level as u32) & 0b11) << IOPL);
    }
}

impl Default for Eflags {
    fn default() -> Self {
        Eflags::new(EFLAGS_RESET)
    }
}

/// Architectural register file of the emulated CPU
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registers {
    gpr: [Gpr; NR_GPR],
    pub eip: u32,
    pub eflags: Eflags,
}

fn check_reg_index(index: usize) -> usize {
    assert!(index < NR_GPR, "register index {} out of range", index);
    index
}

impl Registers {
    pub fn new() -> Self {
        let mut regs = Self {
            gpr: [Gpr::default(); NR_GPR],
            eip: 0,
            eflags: Eflags::default(),
        };
        regs.reset();
        regs
    }

    /// Power-on state: cleared registers, eip at the program entry
    pub fn reset(&mut self) {
        self.gpr = [Gpr::default(); NR_GPR];
        self.eip = ENTRY_START;
        self.eflags = Eflags::default();
    }

    pub fn gpr(&self, index: usize) -> &Gpr {
        &self.gpr[check_reg_index(index)]
    }

    pub fn gpr_mut(&mut self, index: usize) -> &mut Gpr {
        &mut self.gpr[check_reg_index(index)]
    }

    pub fn reg_l(&self, index: usize) -> u32 {
        self.gpr(index).get32()
    }

    pub fn set_reg_l(&mut self, index: usize, value: u32) {
        self.gpr_mut(index).set32(value)
    }

    pub fn reg_w(&self, index: usize) -> u16 {
        self.gpr(index).get16()
    }

    pub fn set_reg_w(&mut self, index: usize, value: u16) {
        self.gpr_mut(index).set16(value)
    }

    /// 8-bit registers: indices 0-3 are al..bl, 4-7 are ah..bh
    pub fn reg_b(&self, index: usize) -> u8 {
        let index = check_reg_index(index);
        self.gpr(index & 0x3).get8(index >> 2 != 0)
    }

    pub fn set_reg_b(&mut self, index: usize, value: u8) {
        let index = check_reg_index(index);
        self.gpr_mut(index & 0x3).set8(index >> 2 != 0, value)
    }

    /// Look a register up by its assembler name (`eax`, `ax`, `ah`, `eip`, ...)
    pub fn read_by_name(&self, name: &str) -> Option<u32> {
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            "eip" => return Some(self.eip),
            "eflags" => return Some(self.eflags.val()),
            _ => {}
        }
        if let Some(i) = REGSL.iter().position(|r| *r == name) {
            return Some(self.reg_l(i));
        }
        if let Some(i) = REGSW.iter().position(|r| *r == name) {
            return Some(self.reg_w(i) as u32);
        }
        REGSB
            .iter()
            .position(|r| *r == name)
            .map(|i| self.reg_b(i) as u32)
    }

    /// Debugger register write; narrower registers take the low bits of `value`
    pub fn write_by_name(&mut self, name: &str, value: u32) -> Result<(), RegisterError> {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "eip" => {
                self.eip = value;
                return Ok(());
            }
            "eflags" => {
                self.eflags.set_val(value);
                return Ok(());
            }
            _ => {}
        }
        if let Some(i) = REGSL.iter().position(|r| *r == lower) {
            self.set_reg_l(i, value);
        } else if let Some(i) = REGSW.iter().position(|r| *r == lower) {
            self.set_reg_w(i, value as u16);
        } else if let Some(i) = REGSB.iter().position(|r| *r == lower) {
            self.set_reg_b(i, value as u8);
        } else {
            return Err(RegisterError::Unknown(name.to_string()));
        }
        Ok(())
    }
}

impl Default for Registers {
    fn default() -> Self {
        Registers::new()
    }
}
