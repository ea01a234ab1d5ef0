//! Register access on a Cortex-M target.

use core::marker::PhantomData;
use core::ptr;

use crate::Hardware;

mod systick;
pub use systick::SysTick;

/// Volatile access to the memory-mapped peripherals of the running chip.
#[derive(Copy, Clone)]
pub struct Mcu {
    cycles_per_us: u32,
    _not_send: PhantomData<*mut ()>,
}

impl Mcu {
    /// SAFETY: Register accesses are not synchronized beyond the critical
    /// sections taken by the drivers, so all users must run on one core.
    /// `cpu_hz` must be the core clock the firmware configured.
    pub const unsafe fn steal(cpu_hz: u32) -> Mcu {
        Mcu {
            cycles_per_us: cpu_hz / 1_000_000,
            _not_send: PhantomData,
        }
    }
}

impl Hardware for Mcu {
    #[inline]
    fn read(&self, addr: u32) -> u32 {
        unsafe { ptr::read_volatile(addr as *const u32) }
    }

    #[inline]
    fn write(&self, addr: u32, value: u32) {
        unsafe { ptr::write_volatile(addr as *mut u32, value) }
    }

    fn delay_us(&self, us: u32) {
        cortex_m::asm::delay(us.saturating_mul(self.cycles_per_us));
    }
}
