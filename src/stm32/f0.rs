//! STM32F0 (STM32F072).

use crate::adc::{adc_pins, gpio, AdcPin};
use crate::clock::slot_line;
use crate::stm32::cr_adc::{CrAdc, Family};
use crate::stm32::gpio::{Layout, Ports};
use crate::{AnalogPin, ClockLine, ClockTree, Peripheral};

pub const CLOCK_FREQ: u32 = 48_000_000;

const APB1: u32 = 0x4000_0000;
const APB2: u32 = 0x4001_0000;
const AHB1: u32 = 0x4002_0000;
const AHB2: u32 = 0x4800_0000;

const RCC: u32 = 0x4002_1000;
const RCC_APB2RSTR: u32 = RCC + 0x0c;
const RCC_APB1RSTR: u32 = RCC + 0x10;
const RCC_AHBENR: u32 = RCC + 0x14;
const RCC_APB2ENR: u32 = RCC + 0x18;
const RCC_APB1ENR: u32 = RCC + 0x1c;
const RCC_AHBRSTR: u32 = RCC + 0x28;

// GPIO ports are clocked from AHBENR bits 17 and up
const IOP_BIT: u32 = 17;

// Bus slots with an enable bit of their own
const AHB2_SLOTS: u32 = 0x0000_003f;
const APB2_SLOTS: u32 = 0x0047_5a01;
const APB1_SLOTS: u32 = 0x7aee_4933;

pub const TIM2: Peripheral = Peripheral(0x4000_0000);
pub const TIM14: Peripheral = Peripheral(0x4000_2000);
pub const SPI2: Peripheral = Peripheral(0x4000_3800);
pub const USART2: Peripheral = Peripheral(0x4000_4400);
pub const I2C1: Peripheral = Peripheral(0x4000_5400);
pub const USB: Peripheral = Peripheral(0x4000_5c00);
pub const CAN: Peripheral = Peripheral(0x4000_6400);
pub const CEC: Peripheral = Peripheral(0x4000_7800);
pub const SYSCFG: Peripheral = Peripheral(0x4001_0000);
pub const ADC1: Peripheral = Peripheral(0x4001_2400);
pub const TIM1: Peripheral = Peripheral(0x4001_2c00);
pub const SPI1: Peripheral = Peripheral(0x4001_3000);
pub const USART1: Peripheral = Peripheral(0x4001_3800);
pub const TIM17: Peripheral = Peripheral(0x4001_4800);
pub const DMA1: Peripheral = Peripheral(0x4002_0000);
pub const CRC: Peripheral = Peripheral(0x4002_3000);
pub const TSC: Peripheral = Peripheral(0x4002_4000);
pub const GPIOA: Peripheral = Peripheral(0x4800_0000);
pub const GPIOC: Peripheral = Peripheral(0x4800_0800);
pub const GPIOF: Peripheral = Peripheral(0x4800_1400);

/// Reset and clock control.
pub struct Rcc;

impl ClockTree for Rcc {
    fn lookup(periph: Peripheral) -> Option<ClockLine> {
        match periph.0 {
            a if a >= AHB2 => slot_line(periph, AHB2, AHB2_SLOTS, RCC_AHBENR, Some(RCC_AHBRSTR))
                .map(|cl| ClockLine { bit: cl.bit << IOP_BIT, ..cl }),
            a if a >= AHB1 => {
                let line = |bit: u32, rst: bool| {
                    let rst = rst.then_some(RCC_AHBRSTR);
                    Some(ClockLine { en: RCC_AHBENR, rst, bit: 1 << bit })
                };
                match periph {
                    DMA1 => line(0, false),
                    CRC => line(6, false),
                    TSC => line(24, true),
                    _ => None,
                }
            }
            a if a >= APB2 => {
                slot_line(periph, APB2, APB2_SLOTS, RCC_APB2ENR, Some(RCC_APB2RSTR))
            }
            _ => slot_line(periph, APB1, APB1_SLOTS, RCC_APB1ENR, Some(RCC_APB1RSTR)),
        }
    }

    fn pclock_freq(_: Peripheral) -> u32 {
        CLOCK_FREQ
    }
}

pub struct F0;

impl Family for F0 {
    type Clocks = Rcc;
    const CLOCK_FREQ: u32 = CLOCK_FREQ;
    const APB_FREQ: u32 = CLOCK_FREQ;
    const MAX_ADC_FREQ: u32 = 14_000_000;
    const REGULATOR: bool = false;
    const PORTS: Ports<Rcc> = Ports::new(GPIOA.0, Layout::Moder);
    const PINS: &'static [AdcPin] = adc_pins! {
        ADC1 => [
            gpio('A', 0) => 0, gpio('A', 1) => 1, gpio('A', 2) => 2, gpio('A', 3) => 3,
            gpio('A', 4) => 4, gpio('A', 5) => 5, gpio('A', 6) => 6, gpio('A', 7) => 7,
            gpio('B', 0) => 8, gpio('B', 1) => 9,
            gpio('C', 0) => 10, gpio('C', 1) => 11, gpio('C', 2) => 12,
            gpio('C', 3) => 13, gpio('C', 4) => 14, gpio('C', 5) => 15,
            AnalogPin::Temperature => 16,
        ],
    };
}

pub type Adc<H> = CrAdc<H, F0>;
