use crate::constants::ENTRY_START;
use crate::cpu::Cpu;
use log::debug;

/// Copy a raw guest image to the entry point and point eip at it.
///
/// An image that does not fit in memory is a setup error and aborts.
pub fn load_image(cpu: &mut Cpu, image: &[u8]) {
    debug!("Loading {} bytes at 0x{:08x}", image.len(), ENTRY_START);
    cpu.mem.load(ENTRY_START, image);
    cpu.regs.eip = ENTRY_START;
}

#[cfg(test)]
mod loader_tests {
    use super::*;
    use crate::memory::MemoryMap;

    #[test]
    fn test_load_at_entry() {
        let mut cpu = Cpu::new(MemoryMap::with_capacity(0x20_0000));
        cpu.regs.eip = 0;
        load_image(&mut cpu, &[0xB8, 0x01, 0x00, 0x00, 0x00]);
        assert_eq!(cpu.regs.eip, ENTRY_START);
        assert_eq!(cpu.instr_fetch(ENTRY_START, 1), 0xB8);
        assert_eq!(cpu.instr_fetch(ENTRY_START + 1, 4), 1);
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn test_image_too_large() {
        let mut cpu = Cpu::new(MemoryMap::with_capacity(ENTRY_START as usize + 4));
        load_image(&mut cpu, &[0x90; 5]);
    }
}
