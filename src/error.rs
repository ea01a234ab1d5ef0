use core::fmt;

use crate::{AnalogPin, Peripheral};

/// Board configuration errors.
///
/// These reflect a mismatch between the firmware build and the hardware it
/// was configured for, so they are never recovered from: see [`shutdown`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The pin has no analog channel on this chip family.
    InvalidPin(AnalogPin),
    /// The base address is not a peripheral known to this chip's clock tree.
    UnknownPeripheral(Peripheral),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidPin(AnalogPin::Gpio(gpio)) => {
                write!(f, "not a valid ADC pin: gpio {}", gpio.0)
            }
            Error::InvalidPin(AnalogPin::Temperature) => write!(f, "no ADC temperature channel"),
            Error::UnknownPeripheral(p) => write!(f, "no clock line for peripheral {:#010x}", p.0),
        }
    }
}

/// Halt the firmware on a configuration error.
#[cold]
#[inline(never)]
pub fn shutdown(err: Error) -> ! {
    error!("shutdown: {}", err);
    panic!("{}", err)
}
