//! Analog mode for GPIO pins.
//!
//! Ports are register blocks spaced 0x400 apart starting at port A. Two port
//! layouts exist across the families this crate supports: a 2-bit MODER field
//! per pin (F0/F4/G0/H7), and the older 4-bit CRL/CRH fields (F1 and the
//! N32G45x, which copies it).

use core::marker::PhantomData;

use crate::{ClockTree, Gpio, Hardware, Peripheral};

const MODER: u32 = 0x00;
const PUPDR: u32 = 0x0c;
const MODE_ANALOG: u32 = 0b11;

const CRL: u32 = 0x00;
const CRH: u32 = 0x04;
const CNF_ANALOG: u32 = 0b0000;

#[derive(Copy, Clone, PartialEq, Eq)]
pub enum Layout {
    Moder,
    Crl,
}

/// The GPIO ports of one chip.
pub struct Ports<T> {
    base: u32,
    layout: Layout,
    _clocks: PhantomData<T>,
}

impl<T: ClockTree> Ports<T> {
    pub const fn new(base: u32, layout: Layout) -> Self {
        Ports { base, layout, _clocks: PhantomData }
    }

    #[inline]
    pub const fn port(&self, gpio: Gpio) -> Peripheral {
        Peripheral(self.base + 0x400 * gpio.port() as u32)
    }

    /// Put `gpio` in analog mode, clocking its port first if needed.
    pub fn set_analog<H: Hardware>(&self, hw: &H, gpio: Gpio) {
        let port = self.port(gpio);
        if !T::is_enabled(hw, port) {
            T::enable(hw, port);
        }
        let pin = gpio.pin() as u32;
        critical_section::with(|_| match self.layout {
            Layout::Moder => {
                hw.modify(port.reg(MODER), |v| v | (MODE_ANALOG << (pin * 2)));
                hw.clear_bits(port.reg(PUPDR), 0b11 << (pin * 2));
            }
            Layout::Crl => {
                let (reg, shift) = if pin < 8 { (CRL, pin * 4) } else { (CRH, (pin - 8) * 4) };
                hw.modify(port.reg(reg), |v| (v & !(0xf << shift)) | (CNF_ANALOG << shift));
            }
        });
    }
}
