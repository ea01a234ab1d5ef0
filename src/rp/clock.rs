//! The RESETS block.
//!
//! The RP2040 has no per-peripheral clock gates: every peripheral sits behind
//! a bit of RESETS.RESET, and is usable once RESET_DONE reports it out of
//! reset. Peripherals come out of the boot ROM held in reset.

use super::{RpReg, CLK_ADC_HZ, CLK_PERI_HZ, CLK_SYS_HZ};
use crate::{ClockLine, ClockTree, Hardware, Peripheral};

// `rp_pac::RESETS`: `reset()` and `reset_done()`, one bit per peripheral as
// in `resets::regs::Peripherals`
const RESETS: u32 = 0x4000_c000;
const RESET: u32 = RESETS + 0x00;
const RESET_DONE: u32 = RESETS + 0x08;

// Block bases as in the `rp_pac` peripheral instances
pub const SYSINFO: Peripheral = Peripheral(0x4000_0000);
pub const SYSCFG: Peripheral = Peripheral(0x4000_4000);
pub const IO_BANK0: Peripheral = Peripheral(0x4001_4000);
pub const IO_QSPI: Peripheral = Peripheral(0x4001_8000);
pub const PADS_BANK0: Peripheral = Peripheral(0x4001_c000);
pub const PADS_QSPI: Peripheral = Peripheral(0x4002_0000);
pub const PLL_SYS: Peripheral = Peripheral(0x4002_8000);
pub const PLL_USB: Peripheral = Peripheral(0x4002_c000);
pub const BUSCTRL: Peripheral = Peripheral(0x4003_0000);
pub const UART0: Peripheral = Peripheral(0x4003_4000);
pub const UART1: Peripheral = Peripheral(0x4003_8000);
pub const SPI0: Peripheral = Peripheral(0x4003_c000);
pub const SPI1: Peripheral = Peripheral(0x4004_0000);
pub const I2C0: Peripheral = Peripheral(0x4004_4000);
pub const I2C1: Peripheral = Peripheral(0x4004_8000);
pub const ADC: Peripheral = Peripheral(0x4004_c000);
pub const PWM: Peripheral = Peripheral(0x4005_0000);
pub const TIMER: Peripheral = Peripheral(0x4005_4000);
pub const RTC: Peripheral = Peripheral(0x4005_c000);
pub const TBMAN: Peripheral = Peripheral(0x4006_c000);
pub const DMA: Peripheral = Peripheral(0x5000_0000);
pub const USBCTRL: Peripheral = Peripheral(0x5011_0000);
pub const PIO0: Peripheral = Peripheral(0x5020_0000);
pub const PIO1: Peripheral = Peripheral(0x5030_0000);

// Bit 7 is JTAG
const RESET_BITS: &[(Peripheral, u32)] = &[
    (ADC, 0),
    (BUSCTRL, 1),
    (DMA, 2),
    (I2C0, 3),
    (I2C1, 4),
    (IO_BANK0, 5),
    (IO_QSPI, 6),
    (PADS_BANK0, 8),
    (PADS_QSPI, 9),
    (PIO0, 10),
    (PIO1, 11),
    (PLL_SYS, 12),
    (PLL_USB, 13),
    (PWM, 14),
    (RTC, 15),
    (SPI0, 16),
    (SPI1, 17),
    (SYSCFG, 18),
    (SYSINFO, 19),
    (TBMAN, 20),
    (TIMER, 21),
    (UART0, 22),
    (UART1, 23),
    (USBCTRL, 24),
];

/// Reset controller, standing in for a clock tree.
///
/// A line's `en` is RESET_DONE, so a set bit means the peripheral is running,
/// and `rst` is RESET.
pub struct Resets;

impl ClockTree for Resets {
    fn lookup(periph: Peripheral) -> Option<ClockLine> {
        RESET_BITS
            .iter()
            .find(|&&(p, _)| p == periph)
            .map(|&(_, bit)| ClockLine { en: RESET_DONE, rst: Some(RESET), bit: 1 << bit })
    }

    fn pclock_freq(periph: Peripheral) -> u32 {
        match periph {
            ADC => CLK_ADC_HZ,
            UART0 | UART1 | SPI0 | SPI1 => CLK_PERI_HZ,
            _ => CLK_SYS_HZ,
        }
    }

    /// Take the peripheral through a full reset cycle, unless it is already
    /// out of reset.
    fn enable<H: Hardware>(hw: &H, periph: Peripheral) {
        let cl = Self::line(periph);
        critical_section::with(|_| {
            if hw.read(RESET_DONE) & cl.bit != 0 {
                return;
            }
            hw.write_set(RESET, cl.bit);
            hw.write_clear(RESET, cl.bit);
            while hw.read(RESET_DONE) & cl.bit == 0 {}
        });
        debug!("unreset {=u32:#x}", periph.0);
    }

    /// Hold the peripheral in reset.
    fn disable<H: Hardware>(hw: &H, periph: Peripheral) {
        let cl = Self::line(periph);
        hw.write_set(RESET, cl.bit);
        debug!("reset {=u32:#x}", periph.0);
    }
}
