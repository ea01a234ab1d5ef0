/// Access to memory-mapped peripheral registers.
///
/// Every register touched by this crate goes through this trait. On the
/// target it is implemented with volatile pointer accesses
/// (`cortex_m::Mcu`); tests substitute a simulated register file.
pub trait Hardware {
    /// Read the 32-bit register at `addr`.
    fn read(&self, addr: u32) -> u32;

    /// Write the 32-bit register at `addr`.
    fn write(&self, addr: u32, value: u32);

    /// Busy-wait for at least `us` microseconds.
    fn delay_us(&self, us: u32);

    #[inline]
    fn modify(&self, addr: u32, f: impl FnOnce(u32) -> u32) {
        let v = self.read(addr);
        self.write(addr, f(v));
    }

    #[inline]
    fn set_bits(&self, addr: u32, mask: u32) {
        self.modify(addr, |v| v | mask)
    }

    #[inline]
    fn clear_bits(&self, addr: u32, mask: u32) {
        self.modify(addr, |v| v & !mask)
    }
}

impl<H: Hardware> Hardware for &H {
    #[inline]
    fn read(&self, addr: u32) -> u32 {
        (**self).read(addr)
    }

    #[inline]
    fn write(&self, addr: u32, value: u32) {
        (**self).write(addr, value)
    }

    #[inline]
    fn delay_us(&self, us: u32) {
        (**self).delay_us(us)
    }
}
