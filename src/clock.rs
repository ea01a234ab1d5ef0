//! Peripheral clock gating.
//!
//! Every chip family supplies a [`ClockTree`] that maps a peripheral's
//! register block base address to the bit that gates its bus clock and,
//! where one exists and is not shared, the bit that holds it in reset.

use crate::{shutdown, Error, Hardware};

/// A memory-mapped peripheral, identified by its register block base address.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Peripheral(pub u32);

impl Peripheral {
    /// Address of the register at `offset` within this peripheral.
    #[inline]
    pub const fn reg(self, offset: u32) -> u32 {
        self.0 + offset
    }
}

/// Enable and reset bits controlling one peripheral.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockLine {
    /// Clock enable register address.
    pub en: u32,
    /// Reset register address, if the peripheral has a reset bit of its own.
    pub rst: Option<u32>,
    /// Bit mask within `en` (and `rst`).
    pub bit: u32,
}

/// Clock gating for one chip family.
///
/// The enable registers are shared by many unrelated peripherals, so every
/// read-modify-write runs inside a critical section.
pub trait ClockTree {
    /// Map a peripheral to its clock line.
    fn lookup(periph: Peripheral) -> Option<ClockLine>;

    /// Bus clock frequency feeding a peripheral, in Hz.
    fn pclock_freq(periph: Peripheral) -> u32;

    /// Like [`lookup`](Self::lookup), but an unknown peripheral halts the firmware.
    fn line(periph: Peripheral) -> ClockLine {
        match Self::lookup(periph) {
            Some(cl) => cl,
            None => shutdown(Error::UnknownPeripheral(periph)),
        }
    }

    /// Whether the peripheral's clock is currently enabled.
    fn is_enabled<H: Hardware>(hw: &H, periph: Peripheral) -> bool {
        let cl = Self::line(periph);
        hw.read(cl.en) & cl.bit != 0
    }

    /// Enable the peripheral's clock, pulsing its reset line on first enable.
    ///
    /// Calling this on a peripheral whose clock is already running leaves it
    /// untouched: resetting a peripheral mid-transfer would glitch it.
    fn enable<H: Hardware>(hw: &H, periph: Peripheral) {
        let cl = Self::line(periph);
        critical_section::with(|_| {
            let en = hw.read(cl.en);
            if en & cl.bit != 0 {
                return;
            }
            hw.write(cl.en, en | cl.bit);
            // Dummy read so the enable lands before the peripheral is touched
            hw.read(cl.en);
            if let Some(rst) = cl.rst {
                hw.set_bits(rst, cl.bit);
                hw.clear_bits(rst, cl.bit);
            }
        });
        debug!("enable pclock {=u32:#x}", periph.0);
    }

    /// Gate the peripheral's clock off.
    fn disable<H: Hardware>(hw: &H, periph: Peripheral) {
        let cl = Self::line(periph);
        critical_section::with(|_| hw.clear_bits(cl.en, cl.bit));
        debug!("disable pclock {=u32:#x}", periph.0);
    }
}

/// Clock line for a bus whose peripherals sit in consecutive 1 KiB slots,
/// slot `n` controlled by bit `n` of the bus's enable and reset registers.
///
/// Only slots whose bit is set in `valid` have a line. Reserved slots, and
/// peripherals with no gate of their own, are left out of the mask.
pub(crate) const fn slot_line(
    periph: Peripheral,
    bus_base: u32,
    valid: u32,
    en: u32,
    rst: Option<u32>,
) -> Option<ClockLine> {
    if periph.0 < bus_base {
        return None;
    }
    let offset = periph.0 - bus_base;
    let slot = offset / 0x400;
    if offset % 0x400 != 0 || slot >= 32 || valid & (1 << slot) == 0 {
        return None;
    }
    Some(ClockLine { en, rst, bit: 1 << slot })
}
