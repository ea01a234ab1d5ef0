//! Samples PA0 and the temperature sensor of an STM32F407 forever.
//!
//! Expects the boot code to have left SYSCLK at 168MHz from the PLL, which
//! is what `CLOCK_FREQ` and the bus prescalers assume.

#![no_std]
#![no_main]

use panic_probe as _;
use defmt_rtt as _;

use boardline::adc::gpio;
use boardline::chip::{Adc, CLOCK_FREQ};
use boardline::cortex_m::{Mcu, SysTick};
use boardline::{AnalogIn, AnalogPin};
use cortex_m_rt::entry;

#[entry]
fn main() -> ! {
    let core = unsafe { cortex_m::Peripherals::steal() };
    let mut systick = SysTick::new(core.SYST);
    let adc = Adc::new(unsafe { Mcu::steal(CLOCK_FREQ) });

    let pa0 = adc.setup(gpio('A', 0));
    let temp = adc.setup(AnalogPin::Temperature);
    defmt::info!("sampling {} and {}", pa0, temp);

    loop {
        for ch in [pa0, temp] {
            let value = loop {
                match adc.advance(ch) {
                    0 => break adc.read(ch),
                    ticks => systick.delay(ticks),
                }
            };
            defmt::info!("chan {=u8}: {=u16}", ch.chan, value);
        }
        systick.delay(CLOCK_FREQ / 2);
    }
}
