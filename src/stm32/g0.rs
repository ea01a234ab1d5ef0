//! STM32G0 (STM32G0B1).

use crate::adc::{adc_pins, gpio, AdcPin};
use crate::clock::slot_line;
use crate::stm32::cr_adc::{CrAdc, Family};
use crate::stm32::gpio::{Layout, Ports};
use crate::{AnalogPin, ClockLine, ClockTree, Peripheral};

pub const CLOCK_FREQ: u32 = 64_000_000;

const APB: u32 = 0x4000_0000;
const AHB: u32 = 0x4002_0000;
const IOPORT: u32 = 0x5000_0000;

const RCC: u32 = 0x4002_1000;
const RCC_IOPRSTR: u32 = RCC + 0x24;
const RCC_AHBRSTR: u32 = RCC + 0x28;
const RCC_APBRSTR1: u32 = RCC + 0x2c;
const RCC_APBRSTR2: u32 = RCC + 0x30;
const RCC_IOPENR: u32 = RCC + 0x34;
const RCC_AHBENR: u32 = RCC + 0x38;
const RCC_APBENR1: u32 = RCC + 0x3c;
const RCC_APBENR2: u32 = RCC + 0x40;

// Slots whose enable bit matches their position. Peripherals off that
// pattern are listed in `Rcc::lookup`; watchdog slots have no gate.
const IOPORT_SLOTS: u32 = 0x0000_003f;
const APB_SLOTS: u32 = 0xb06e_cc37;

pub const TIM2: Peripheral = Peripheral(0x4000_0000);
pub const TIM3: Peripheral = Peripheral(0x4000_0400);
pub const TIM14: Peripheral = Peripheral(0x4000_2000);
pub const IWDG: Peripheral = Peripheral(0x4000_3000);
pub const SPI2: Peripheral = Peripheral(0x4000_3800);
pub const USART2: Peripheral = Peripheral(0x4000_4400);
pub const I2C1: Peripheral = Peripheral(0x4000_5400);
pub const USB: Peripheral = Peripheral(0x4000_5c00);
pub const FDCAN: Peripheral = Peripheral(0x4000_6400);
pub const PWR: Peripheral = Peripheral(0x4000_7000);
pub const LPTIM1: Peripheral = Peripheral(0x4000_7c00);
pub const SYSCFG: Peripheral = Peripheral(0x4001_0000);
pub const ADC1: Peripheral = Peripheral(0x4001_2400);
pub const TIM1: Peripheral = Peripheral(0x4001_2c00);
pub const SPI1: Peripheral = Peripheral(0x4001_3000);
pub const USART1: Peripheral = Peripheral(0x4001_3800);
pub const TIM15: Peripheral = Peripheral(0x4001_4000);
pub const TIM16: Peripheral = Peripheral(0x4001_4400);
pub const TIM17: Peripheral = Peripheral(0x4001_4800);
pub const DMA1: Peripheral = Peripheral(0x4002_0000);
pub const CRC: Peripheral = Peripheral(0x4002_3000);
pub const GPIOA: Peripheral = Peripheral(0x5000_0000);
pub const GPIOC: Peripheral = Peripheral(0x5000_0800);
pub const GPIOF: Peripheral = Peripheral(0x5000_1400);

/// Reset and clock control.
pub struct Rcc;

impl ClockTree for Rcc {
    fn lookup(periph: Peripheral) -> Option<ClockLine> {
        let line = |en: u32, rst: u32, bit: u32| {
            Some(ClockLine { en, rst: Some(rst), bit: 1 << bit })
        };
        let apb2 = |bit: u32| line(RCC_APBENR2, RCC_APBRSTR2, bit);
        let apb1 = |bit: u32| line(RCC_APBENR1, RCC_APBRSTR1, bit);
        let ahb = |bit: u32| line(RCC_AHBENR, RCC_AHBRSTR, bit);
        match periph {
            SYSCFG => apb2(0),
            TIM1 => apb2(11),
            SPI1 => apb2(12),
            USART1 => apb2(14),
            TIM14 => apb2(15),
            TIM15 => apb2(16),
            TIM16 => apb2(17),
            TIM17 => apb2(18),
            ADC1 => apb2(20),
            USB => apb1(13),
            FDCAN => apb1(12),
            DMA1 => ahb(0),
            CRC => ahb(12),
            Peripheral(a) if a >= IOPORT => {
                slot_line(periph, IOPORT, IOPORT_SLOTS, RCC_IOPENR, Some(RCC_IOPRSTR))
            }
            Peripheral(a) if a >= AHB => None,
            _ => slot_line(periph, APB, APB_SLOTS, RCC_APBENR1, Some(RCC_APBRSTR1)),
        }
    }

    fn pclock_freq(_: Peripheral) -> u32 {
        CLOCK_FREQ
    }
}

pub struct G0;

impl Family for G0 {
    type Clocks = Rcc;
    const CLOCK_FREQ: u32 = CLOCK_FREQ;
    const APB_FREQ: u32 = CLOCK_FREQ;
    const MAX_ADC_FREQ: u32 = 35_000_000;
    const REGULATOR: bool = true;
    const PORTS: Ports<Rcc> = Ports::new(GPIOA.0, Layout::Moder);
    const PINS: &'static [AdcPin] = adc_pins! {
        ADC1 => [
            gpio('A', 0) => 0, gpio('A', 1) => 1, gpio('A', 2) => 2, gpio('A', 3) => 3,
            gpio('A', 4) => 4, gpio('A', 5) => 5, gpio('A', 6) => 6, gpio('A', 7) => 7,
            gpio('B', 0) => 8, gpio('B', 1) => 9, gpio('B', 2) => 10,
            gpio('B', 10) => 11, gpio('B', 11) => 15, gpio('B', 12) => 16,
            gpio('C', 4) => 17, gpio('C', 5) => 18,
            AnalogPin::Temperature => 12,
        ],
    };
}

pub type Adc<H> = CrAdc<H, G0>;
