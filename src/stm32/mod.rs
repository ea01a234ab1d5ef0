//! STM32 families.

pub mod gpio;

#[cfg(any(test, feature = "stm32f1"))]
pub mod f1;

#[cfg(any(test, feature = "stm32f4"))]
pub mod f4;

#[cfg(any(test, feature = "stm32f0", feature = "stm32g0"))]
pub mod cr_adc;

#[cfg(any(test, feature = "stm32f0"))]
pub mod f0;

#[cfg(any(test, feature = "stm32g0"))]
pub mod g0;

#[cfg(any(test, feature = "stm32h7"))]
pub mod h7;
