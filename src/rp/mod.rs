//! Raspberry Pi RP2040.
//!
//! Assumes the usual boot clock setup: clk_ref from the 12MHz crystal,
//! clk_sys from PLL_SYS at 125MHz, and clk_peri and clk_adc from PLL_USB at
//! 48MHz. The scheduler timer ticks at clk_ref.

mod rp_reg;
pub use rp_reg::RpReg;

pub mod adc;
pub mod clock;
pub mod gpio;

const XOSC_HZ: u32 = 12_000_000;
const PLL_SYS_HZ: u32 = 125_000_000;
const PLL_USB_HZ: u32 = 48_000_000;

pub const CLK_REF_HZ: u32 = XOSC_HZ;
pub const CLK_SYS_HZ: u32 = PLL_SYS_HZ;
pub const CLK_PERI_HZ: u32 = PLL_USB_HZ;
pub const CLK_ADC_HZ: u32 = PLL_USB_HZ;

pub const CLOCK_FREQ: u32 = CLK_REF_HZ;
