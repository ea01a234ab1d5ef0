use crate::Hardware;

/// Atomic set and clear writes through the RP2040 register aliases.
///
/// Every APB and AHB-Lite register is mirrored at +0x1000 (XOR), +0x2000
/// (bitmask set) and +0x3000 (bitmask clear), so bits can be flipped without
/// a read-modify-write racing other contexts.
pub trait RpReg: Hardware {
    #[inline]
    fn write_xor(&self, addr: u32, mask: u32) {
        self.write(addr + 0x1000, mask)
    }

    #[inline]
    fn write_set(&self, addr: u32, mask: u32) {
        self.write(addr + 0x2000, mask)
    }

    #[inline]
    fn write_clear(&self, addr: u32, mask: u32) {
        self.write(addr + 0x3000, mask)
    }
}

impl<H: Hardware> RpReg for H {}
