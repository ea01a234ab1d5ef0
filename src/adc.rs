//! Non-blocking analog sampling.
//!
//! A consumer calls [`AnalogIn::setup`] once per pin, then repeatedly calls
//! [`AnalogIn::advance`] from the scheduler until it returns zero, and then
//! [`AnalogIn::read`]:
//!
//! ```ignore
//! let ch = adc.setup(AnalogPin::Gpio(Gpio::new('A', 0)));
//! loop {
//!     match adc.advance(ch) {
//!         0 => break adc.read(ch),
//!         ticks => reschedule_in(ticks),
//!     }
//! }
//! ```
//!
//! Each ADC block converts one channel at a time. Ownership of the in-flight
//! conversion is decided only by the channel programmed into the hardware, so
//! a caller whose channel does not match simply keeps getting the backoff
//! until the block drains.

use core::convert::Infallible;
use core::fmt::Debug;

use crate::{shutdown, Error, Peripheral};

/// Logical GPIO number.
///
/// On STM32 and N32 parts this is `port * 16 + pin`; on RP2040 it is the
/// GPIO number.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Gpio(pub u8);

impl Gpio {
    /// GPIO `num` of lettered port `port` (`'A'` is port 0).
    pub const fn new(port: char, num: u8) -> Gpio {
        Gpio((port as u8 - b'A') * 16 + num)
    }

    #[inline]
    pub const fn port(self) -> u8 {
        self.0 / 16
    }

    #[inline]
    pub const fn pin(self) -> u8 {
        self.0 % 16
    }
}

/// Something an ADC can sample.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AnalogPin {
    Gpio(Gpio),
    /// The chip's internal temperature sensor.
    Temperature,
}

/// Shorthand for `AnalogPin::Gpio(Gpio::new(port, num))`, for pin tables.
pub const fn gpio(port: char, num: u8) -> AnalogPin {
    AnalogPin::Gpio(Gpio::new(port, num))
}

/// A configured analog input: an ADC block and a channel number on it.
///
/// What the channel number means depends on the chip family.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Channel {
    pub adc: Peripheral,
    pub chan: u8,
}

/// Entry of a chip family's pin to channel table.
#[derive(Copy, Clone, Debug)]
pub struct AdcPin {
    pub pin: AnalogPin,
    pub adc: Peripheral,
    pub chan: u8,
}

impl AdcPin {
    pub const fn new(pin: AnalogPin, adc: Peripheral, chan: u8) -> AdcPin {
        AdcPin { pin, adc, chan }
    }
}

/// Find `pin` in a pin table; the first entry wins.
pub fn lookup(table: &[AdcPin], pin: AnalogPin) -> Result<AdcPin, Error> {
    table
        .iter()
        .find(|p| p.pin == pin)
        .copied()
        .ok_or(Error::InvalidPin(pin))
}

/// Build a `&[AdcPin]` grouped by ADC block.
macro_rules! adc_pins {
    ($($adc:expr => [$($pin:expr => $chan:literal),* $(,)?]),* $(,)?) => {
        &[$($($crate::adc::AdcPin::new($pin, $adc, $chan),)*)*]
    };
}
pub(crate) use adc_pins;

/// Non-blocking analog acquisition for one chip family.
pub trait AnalogIn {
    type Channel: Copy + Eq + Debug;

    /// Ticks `advance` asks the caller to wait whenever a sample is not ready.
    const BACKOFF: u32;

    /// Resolve `pin` to a channel, bringing up its ADC block on first use.
    fn try_setup(&self, pin: AnalogPin) -> Result<Self::Channel, Error>;

    /// Like [`try_setup`](Self::try_setup), but an invalid pin halts the firmware.
    fn setup(&self, pin: AnalogPin) -> Self::Channel {
        match self.try_setup(pin) {
            Ok(ch) => ch,
            Err(e) => shutdown(e),
        }
    }

    /// Drive a conversion for `ch` forward without blocking.
    ///
    /// Returns zero when a result for `ch` is ready to [`read`](Self::read),
    /// otherwise the number of ticks to wait before calling again.
    fn advance(&self, ch: Self::Channel) -> u32;

    /// Fetch the result; only valid right after `advance` returned zero.
    fn read(&self, ch: Self::Channel) -> u16;

    /// Abandon a conversion for `ch`, if one is in flight. Interrupt safe.
    fn cancel(&self, ch: Self::Channel);

    /// `advance`, then `read` if the sample is ready.
    fn poll(&self, ch: Self::Channel) -> nb::Result<u16, Infallible> {
        if self.advance(ch) == 0 {
            Ok(self.read(ch))
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

/// Sample time code repeated into every 3-bit field of an SMPR register.
pub(crate) const fn smpr_fill(code: u32, fields: u32) -> u32 {
    let mut v = 0;
    let mut i = 0;
    while i < fields {
        v |= code << (3 * i);
        i += 1;
    }
    v
}
