mod ram;

use crate::constants;
use log::debug;

/// Address as referenced by guest instructions
pub type SwAddr = u32;
/// Address after segmentation (not modelled, identical to `SwAddr`)
pub type LnAddr = u32;
/// Offset into the emulator's physical memory buffer
pub type HwAddr = u32;

/// Core memory access interface shared by the address spaces
trait MemoryType {
    fn read(&self, addr: HwAddr, len: usize) -> u32;
    fn write(&mut self, addr: HwAddr, len: usize, value: u32);
}

/// Guest address space.
///
/// Program and linear addresses are translated down to physical addresses
/// before touching the backing store; every access is bounds checked and an
/// out-of-bounds access aborts the emulator.
pub struct MemoryMap {
    ram: ram::Ram,
}

impl MemoryMap {
    /// Creates a memory map with the standard physical memory size
    pub fn new() -> MemoryMap {
        MemoryMap::with_capacity(constants::HW_MEM_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> MemoryMap {
        debug!("Allocating {} bytes of physical memory", capacity);
        MemoryMap {
            ram: ram::Ram::new(capacity),
        }
    }

    pub fn reset(&mut self) {
        self.ram.reset();
    }

    pub fn capacity(&self) -> usize {
        self.ram.capacity()
    }

    // Translation between address kinds. Neither segmentation nor paging is
    // modelled so both steps are identity mappings.

    pub fn seg_translate(&self, addr: SwAddr) -> LnAddr {
        addr
    }

    pub fn page_translate(&self, addr: LnAddr) -> HwAddr {
        addr
    }

    // Physical address space

    pub fn hwaddr_read(&self, addr: HwAddr, len: usize) -> u32 {
        self.ram.read(addr, len)
    }

    pub fn hwaddr_write(&mut self, addr: HwAddr, len: usize, value: u32) {
        self.ram.write(addr, len, value)
    }

    // Linear address space

    pub fn lnaddr_read(&self, addr: LnAddr, len: usize) -> u32 {
        self.hwaddr_read(self.page_translate(addr), len)
    }

    pub fn lnaddr_write(&mut self, addr: LnAddr, len: usize, value: u32) {
        let hwaddr = self.page_translate(addr);
        self.hwaddr_write(hwaddr, len, value)
    }

    // Program address space

    pub fn swaddr_read(&self, addr: SwAddr, len: usize) -> u32 {
        self.lnaddr_read(self.seg_translate(addr), len)
    }

    pub fn swaddr_write(&mut self, addr: SwAddr, len: usize, value: u32) {
        let lnaddr = self.seg_translate(addr);
        self.lnaddr_write(lnaddr, len, value)
    }

    /// Instruction stream read used by the decoder
    pub fn instr_fetch(&self, addr: SwAddr, len: usize) -> u32 {
        self.swaddr_read(addr, len)
    }

    /// Non-fatal program address read for debugger inspection
    pub fn checked_read(&self, addr: SwAddr, len: usize) -> Option<u32> {
        let hwaddr = self.page_translate(self.seg_translate(addr));
        if matches!(len, 1 | 2 | 4) && self.ram.contains(hwaddr, len) {
            Some(self.ram.read(hwaddr, len))
        } else {
            None
        }
    }

    /// Copy a raw image into memory at a program address
    pub fn load(&mut self, addr: SwAddr, bytes: &[u8]) {
        let hwaddr = self.page_translate(self.seg_translate(addr));
        if !self.ram.contains(hwaddr, bytes.len()) {
            panic!(
                "image of {} bytes does not fit at 0x{:08x} (memory size 0x{:x})",
                bytes.len(),
                addr,
                self.capacity()
            );
        }
        self.ram.load(hwaddr, bytes);
    }
}

impl Default for MemoryMap {
    fn default() -> Self {
        MemoryMap::new()
    }
}

#[cfg(test)]
mod memory_map_tests {
    use super::*;

    const CAPACITY: usize = 0x1000;

    #[test]
    fn test_address_spaces_alias() {
        let mut mem = MemoryMap::with_capacity(CAPACITY);
        mem.swaddr_write(0x100, 4, 0xDEAD_BEEF);
        assert_eq!(mem.lnaddr_read(0x100, 4), 0xDEAD_BEEF);
        assert_eq!(mem.hwaddr_read(0x100, 4), 0xDEAD_BEEF);

        mem.hwaddr_write(0x102, 2, 0x1234);
        assert_eq!(mem.swaddr_read(0x100, 4), 0x1234_BEEF);
    }

    #[test]
    fn test_boundary_write_succeeds() {
        let mut mem = MemoryMap::with_capacity(CAPACITY);
        mem.swaddr_write((CAPACITY - 1) as SwAddr, 1, 0);
        mem.swaddr_write((CAPACITY - 4) as SwAddr, 4, 0x0102_0304);
        assert_eq!(mem.swaddr_read((CAPACITY - 1) as SwAddr, 1), 0x01);
    }

    #[test]
    #[should_panic(expected = "out of bound")]
    fn test_write_at_capacity_is_fatal() {
        let mut mem = MemoryMap::with_capacity(CAPACITY);
        mem.swaddr_write(CAPACITY as SwAddr, 1, 0);
    }

    #[test]
    #[should_panic(expected = "out of bound")]
    fn test_lnaddr_read_out_of_bound() {
        let mem = MemoryMap::with_capacity(CAPACITY);
        mem.lnaddr_read(0xFFFF_FFFF, 1);
    }

    #[test]
    fn test_checked_read() {
        let mut mem = MemoryMap::with_capacity(CAPACITY);
        mem.swaddr_write(0x10, 4, 7);
        assert_eq!(mem.checked_read(0x10, 4), Some(7));
        assert_eq!(mem.checked_read((CAPACITY - 2) as SwAddr, 4), None);
        assert_eq!(mem.checked_read(0x10, 3), None);
    }

    #[test]
    fn test_load_and_reset() {
        let mut mem = MemoryMap::with_capacity(CAPACITY);
        mem.load(0x20, &[0x90, 0xCC, 0xD6]);
        assert_eq!(mem.instr_fetch(0x20, 2), 0xCC90);
        mem.reset();
        assert_eq!(mem.swaddr_read(0x20, 4), 0);
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn test_oversized_image_is_fatal() {
        let mut mem = MemoryMap::with_capacity(CAPACITY);
        mem.load((CAPACITY - 1) as SwAddr, &[0; 2]);
    }
}
