//! Pad and function control for bank 0 GPIOs.

use super::clock::{Resets, IO_BANK0, PADS_BANK0};
use crate::{ClockTree, Gpio, Hardware};

// `rp_pac::PADS_BANK0.gpio(n)`, fields of `pads::regs::GpioCtrl`
const PAD_OD: u32 = 1 << 7;
const PAD_IE: u32 = 1 << 6;
const PAD_PUE: u32 = 1 << 3;
const PAD_PDE: u32 = 1 << 2;

// `rp_pac::IO_BANK0.gpio(n).ctrl()`, `io::regs::GpioCtrl::funcsel`
const FUNCSEL_NULL: u32 = 31;

#[inline]
const fn pad(gpio: Gpio) -> u32 {
    PADS_BANK0.reg(0x04 + 4 * gpio.0 as u32)
}

#[inline]
const fn ctrl(gpio: Gpio) -> u32 {
    IO_BANK0.reg(0x04 + 8 * gpio.0 as u32)
}

fn unreset<H: Hardware>(hw: &H) {
    for bank in [IO_BANK0, PADS_BANK0] {
        if !Resets::is_enabled(hw, bank) {
            Resets::enable(hw, bank);
        }
    }
}

/// Detach `gpio` from every peripheral function.
pub fn disable<H: Hardware>(hw: &H, gpio: Gpio) {
    unreset(hw);
    hw.write(ctrl(gpio), FUNCSEL_NULL);
}

/// Isolate the pad of `gpio` for the ADC: output driver and input buffer off,
/// no pulls.
pub fn set_analog<H: Hardware>(hw: &H, gpio: Gpio) {
    disable(hw, gpio);
    hw.modify(pad(gpio), |v| (v & !(PAD_IE | PAD_PUE | PAD_PDE)) | PAD_OD);
}
