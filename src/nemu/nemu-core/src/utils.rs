use crate::cpu::Eflags;

// Sign-extends an 8-bit displacement to 32 bits
pub fn sext8(value: u8) -> u32 {
    value as i8 as i32 as u32
}

// Even parity of the low byte, as reported by PF
pub fn parity(value: u32) -> bool {
    (value as u8).count_ones() % 2 == 0
}

// ZF, SF and PF are derived from the result alone
pub fn set_result_flags(flags: &mut Eflags, result: u32) {
    flags.set_zf(result == 0);
    flags.set_sf(result & 0x8000_0000 != 0);
    flags.set_pf(parity(result));
}

// 32-bit addition updating CF, OF, AF, ZF, SF, PF
pub fn add_with_flags(flags: &mut Eflags, a: u32, b: u32) -> u32 {
    let result = a.wrapping_add(b);
    flags.set_cf(result < a);
    flags.set_of(((a ^ result) & (b ^ result)) & 0x8000_0000 != 0);
    flags.set_af((a ^ b ^ result) & 0x10 != 0);
    set_result_flags(flags, result);
    result
}

// 32-bit subtraction (a - b) updating CF, OF, AF, ZF, SF, PF
pub fn sub_with_flags(flags: &mut Eflags, a: u32, b: u32) -> u32 {
    let result = a.wrapping_sub(b);
    flags.set_cf(a < b);
    flags.set_of(((a ^ b) & (a ^ result)) & 0x8000_0000 != 0);
    flags.set_af((a ^ b ^ result) & 0x10 != 0);
    set_result_flags(flags, result);
    result
}

#[cfg(test)]
mod flag_tests {
    use super::*;

    #[test]
    fn test_sext8() {
        assert_eq!(sext8(0x7F), 0x7F);
        assert_eq!(sext8(0x80), 0xFFFF_FF80);
        assert_eq!(sext8(0xFE), 0xFFFF_FFFE);
    }

    #[test]
    fn test_parity() {
        assert!(parity(0));
        assert!(parity(0b11));
        assert!(!parity(0b1));
        // only the low byte counts
        assert!(parity(0x100));
    }

    #[test]
    fn test_add_carry_and_overflow() {
        let mut flags = Eflags::new(0);
        assert_eq!(add_with_flags(&mut flags, 0xFFFF_FFFF, 1), 0);
        assert!(flags.cf());
        assert!(flags.zf());
        assert!(!flags.of());

        assert_eq!(add_with_flags(&mut flags, 0x7FFF_FFFF, 1), 0x8000_0000);
        assert!(!flags.cf());
        assert!(flags.of());
        assert!(flags.sf());
    }

    #[test]
    fn test_sub_borrow() {
        let mut flags = Eflags::new(0);
        assert_eq!(sub_with_flags(&mut flags, 1, 2), 0xFFFF_FFFF);
        assert!(flags.cf());
        assert!(flags.sf());
        assert!(!flags.of());

        sub_with_flags(&mut flags, 5, 5);
        assert!(flags.zf());
        assert!(!flags.cf());

        assert_eq!(sub_with_flags(&mut flags, 0x8000_0000, 1), 0x7FFF_FFFF);
        assert!(flags.of());
    }
}
