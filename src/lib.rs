#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

mod error;
pub use error::{shutdown, Error};

mod hw;
pub use hw::Hardware;

pub mod time;

pub mod clock;
pub use clock::{ClockLine, ClockTree, Peripheral};

pub mod adc;
pub use adc::{AnalogIn, AnalogPin, Channel, Gpio};

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod cortex_m;

#[cfg(any(
    test,
    feature = "stm32f1",
    feature = "stm32f4",
    feature = "stm32f0",
    feature = "stm32g0",
    feature = "stm32h7",
    feature = "n32g45x",
))]
pub mod stm32;

#[cfg(any(test, feature = "n32g45x"))]
pub mod n32g45x;

#[cfg(any(test, feature = "rp2040"))]
pub mod rp;

#[cfg(test)]
pub(crate) mod sim;

const _: () = assert!(
    (cfg!(feature = "stm32f1") as u8
        + cfg!(feature = "stm32f4") as u8
        + cfg!(feature = "stm32f0") as u8
        + cfg!(feature = "stm32g0") as u8
        + cfg!(feature = "stm32h7") as u8
        + cfg!(feature = "n32g45x") as u8
        + cfg!(feature = "rp2040") as u8)
        <= 1,
    "select at most one chip family feature"
);

/// The chip family compiled into this image.
pub mod chip {
    #[cfg(feature = "stm32f1")]
    pub use crate::stm32::f1::{Adc, Rcc as Clocks, CLOCK_FREQ};

    #[cfg(feature = "stm32f4")]
    pub use crate::stm32::f4::{Adc, Rcc as Clocks, CLOCK_FREQ};

    #[cfg(feature = "stm32f0")]
    pub use crate::stm32::f0::{Adc, Rcc as Clocks, CLOCK_FREQ};

    #[cfg(feature = "stm32g0")]
    pub use crate::stm32::g0::{Adc, Rcc as Clocks, CLOCK_FREQ};

    #[cfg(feature = "stm32h7")]
    pub use crate::stm32::h7::{Adc, Rcc as Clocks, CLOCK_FREQ};

    #[cfg(feature = "n32g45x")]
    pub use crate::n32g45x::{Adc, Rcc as Clocks, CLOCK_FREQ};

    #[cfg(feature = "rp2040")]
    pub use crate::rp::{adc::Adc, clock::Resets as Clocks, CLOCK_FREQ};
}
