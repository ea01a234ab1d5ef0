use cortex_m::peripheral::{syst, SYST};

const SYST_CSR_ENABLE: u32 = 1 << 0;
const SYST_CSR_CLKSOURCE: u32 = 1 << 2;
const SYST_CSR_COUNTFLAG: u32 = 1 << 16;

const SYST_RVR_MAX: u32 = 0x00ff_ffff;

/// Core clock tick waits, for running the `advance` loop without a scheduler.
///
/// Counts core clock cycles, which on the STM32 and N32 families are the
/// `CLOCK_FREQ` ticks `advance` reports.
pub struct SysTick {
    syst: SYST,
}

impl SysTick {
    pub fn new(syst: SYST) -> SysTick {
        SysTick { syst }
    }

    pub fn registers(&self) -> &syst::RegisterBlock {
        &*self.syst
    }

    /// Busy-wait `ticks` core clock cycles.
    pub fn delay(&mut self, ticks: u32) {
        let mut left = ticks;
        while left > 0 {
            let n = left.min(SYST_RVR_MAX);
            unsafe {
                self.registers().rvr.write(n);
                self.registers().cvr.write(0);
                self.registers().csr.write(SYST_CSR_ENABLE | SYST_CSR_CLKSOURCE);
            }
            while self.registers().csr.read() & SYST_CSR_COUNTFLAG == 0 {}
            left -= n;
        }
        unsafe { self.registers().csr.write(0) }
    }
}
