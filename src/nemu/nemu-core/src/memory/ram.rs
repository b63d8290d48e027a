use crate::memory::{HwAddr, MemoryType};

/// Flat physical memory backing the whole guest address space.
/// Stored little-endian, no alignment requirements.
pub struct Ram {
    hw_mem: Vec<u8>,
}

impl Ram {
    pub fn new(capacity: usize) -> Self {
        Self {
            hw_mem: vec![0; capacity],
        }
    }

    pub fn reset(&mut self) {
        self.hw_mem.iter_mut().for_each(|b| *b = 0);
    }

    pub fn capacity(&self) -> usize {
        self.hw_mem.len()
    }

    /// True when `len` bytes starting at `addr` are backed by host memory
    pub fn contains(&self, addr: HwAddr, len: usize) -> bool {
        (addr as usize)
            .checked_add(len)
            .map_or(false, |end| end <= self.hw_mem.len())
    }

    /// Convert a guest physical address into an offset range of the host buffer.
    /// Panics when any byte of the access falls outside the buffer.
    fn hwa_to_va(&self, addr: HwAddr, len: usize) -> std::ops::Range<usize> {
        if !self.contains(addr, len) {
            panic!("physical address(0x{:08x}) is out of bound", addr);
        }
        let start = addr as usize;
        start..start + len
    }

    /// Copy a raw block into memory (program loading)
    pub fn load(&mut self, addr: HwAddr, bytes: &[u8]) {
        let range = self.hwa_to_va(addr, bytes.len());
        self.hw_mem[range].copy_from_slice(bytes);
    }
}

fn check_len(len: usize) {
    assert!(
        matches!(len, 1 | 2 | 4),
        "invalid memory access width: {} bytes",
        len
    );
}

impl MemoryType for Ram {
    fn read(&self, addr: HwAddr, len: usize) -> u32 {
        check_len(len);
        let range = self.hwa_to_va(addr, len);
        self.hw_mem[range]
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | b as u32)
    }

    fn write(&mut self, addr: HwAddr, len: usize, value: u32) {
        check_len(len);
        let range = self.hwa_to_va(addr, len);
        let bytes = value.to_le_bytes();
        self.hw_mem[range].copy_from_slice(&bytes[..len]);
    }
}

#[cfg(test)]
mod ram_tests {
    use super::*;

    #[test]
    fn test_little_endian_layout() {
        let mut ram = Ram::new(16);
        ram.write(0, 4, 0x1234_5678);
        assert_eq!(ram.read(0, 1), 0x78);
        assert_eq!(ram.read(1, 1), 0x56);
        assert_eq!(ram.read(0, 2), 0x5678);
        assert_eq!(ram.read(2, 2), 0x1234);
    }

    #[test]
    fn test_unaligned_straddle() {
        let mut ram = Ram::new(16);
        ram.write(3, 4, 0xAABB_CCDD);
        assert_eq!(ram.read(3, 4), 0xAABB_CCDD);
        assert_eq!(ram.read(2, 4), 0xBBCC_DD00);
    }

    #[test]
    fn test_narrow_write_keeps_neighbours() {
        let mut ram = Ram::new(8);
        ram.write(0, 4, 0xFFFF_FFFF);
        ram.write(1, 1, 0);
        assert_eq!(ram.read(0, 4), 0xFFFF_00FF);
    }

    #[test]
    fn test_last_byte_is_writable() {
        let mut ram = Ram::new(8);
        ram.write(7, 1, 0x5A);
        assert_eq!(ram.read(7, 1), 0x5A);
    }

    #[test]
    #[should_panic(expected = "out of bound")]
    fn test_write_at_capacity_is_fatal() {
        let mut ram = Ram::new(8);
        ram.write(8, 1, 0);
    }

    #[test]
    #[should_panic(expected = "out of bound")]
    fn test_wide_read_past_end_is_fatal() {
        let ram = Ram::new(8);
        ram.read(6, 4);
    }

    #[test]
    #[should_panic(expected = "invalid memory access width")]
    fn test_bad_width_is_fatal() {
        let ram = Ram::new(8);
        ram.read(0, 3);
    }

    #[test]
    fn test_contains_handles_overflow() {
        let ram = Ram::new(8);
        assert!(ram.contains(4, 4));
        assert!(!ram.contains(5, 4));
        assert!(!ram.contains(u32::MAX, 4));
    }
}
