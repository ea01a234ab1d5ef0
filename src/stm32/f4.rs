//! STM32F4 (STM32F407/F417).

use crate::adc::{self, adc_pins, gpio, smpr_fill, AdcPin};
use crate::clock::slot_line;
use crate::stm32::gpio::{Layout, Ports};
use crate::time::{prescaler, ticks_from_us};
use crate::{AnalogIn, AnalogPin, Channel, ClockLine, ClockTree, Error, Hardware, Peripheral};

pub const CLOCK_FREQ: u32 = 168_000_000;
const APB1_FREQ: u32 = CLOCK_FREQ / 4;
const APB2_FREQ: u32 = CLOCK_FREQ / 2;

const APB1: u32 = 0x4000_0000;
const APB2: u32 = 0x4001_0000;
const AHB1: u32 = 0x4002_0000;
const AHB2: u32 = 0x5000_0000;

const RCC: u32 = 0x4002_3800;
const RCC_AHB1RSTR: u32 = RCC + 0x10;
const RCC_AHB2RSTR: u32 = RCC + 0x14;
const RCC_APB1RSTR: u32 = RCC + 0x20;
const RCC_APB2RSTR: u32 = RCC + 0x24;
const RCC_AHB1ENR: u32 = RCC + 0x30;
const RCC_AHB2ENR: u32 = RCC + 0x34;
const RCC_APB1ENR: u32 = RCC + 0x40;
const RCC_APB2ENR: u32 = RCC + 0x44;

// Bus slots with an enable bit of their own
const AHB1_SLOTS: u32 = 0x0000_01ff;
const APB2_SLOTS: u32 = 0x0007_7833;
const APB1_SLOTS: u32 = 0x36fe_c9ff;

pub const TIM2: Peripheral = Peripheral(0x4000_0000);
pub const SPI2: Peripheral = Peripheral(0x4000_3800);
pub const USART2: Peripheral = Peripheral(0x4000_4400);
pub const I2C1: Peripheral = Peripheral(0x4000_5400);
pub const CAN1: Peripheral = Peripheral(0x4000_6400);
pub const DAC: Peripheral = Peripheral(0x4000_7400);
pub const TIM1: Peripheral = Peripheral(0x4001_0000);
pub const USART1: Peripheral = Peripheral(0x4001_1000);
pub const USART6: Peripheral = Peripheral(0x4001_1400);
pub const ADC1: Peripheral = Peripheral(0x4001_2000);
pub const ADC2: Peripheral = Peripheral(0x4001_2100);
pub const ADC3: Peripheral = Peripheral(0x4001_2200);
pub const SDIO: Peripheral = Peripheral(0x4001_2c00);
pub const SPI1: Peripheral = Peripheral(0x4001_3000);
pub const SYSCFG: Peripheral = Peripheral(0x4001_3800);
pub const GPIOA: Peripheral = Peripheral(0x4002_0000);
pub const GPIOF: Peripheral = Peripheral(0x4002_1400);
pub const CRC: Peripheral = Peripheral(0x4002_3000);
pub const DMA1: Peripheral = Peripheral(0x4002_6000);
pub const DMA2: Peripheral = Peripheral(0x4002_6400);
pub const OTG_FS: Peripheral = Peripheral(0x5000_0000);
pub const RNG: Peripheral = Peripheral(0x5006_0800);

/// Reset and clock control.
pub struct Rcc;

impl ClockTree for Rcc {
    fn lookup(periph: Peripheral) -> Option<ClockLine> {
        let line = |en: u32, rst: u32, bit: u32| {
            Some(ClockLine { en, rst: Some(rst), bit: 1 << bit })
        };
        // The three converters share a single reset bit
        let adc = |bit: u32| Some(ClockLine { en: RCC_APB2ENR, rst: None, bit: 1 << bit });
        match periph {
            ADC1 => adc(8),
            ADC2 => adc(9),
            ADC3 => adc(10),
            CRC => line(RCC_AHB1ENR, RCC_AHB1RSTR, 12),
            DMA1 => line(RCC_AHB1ENR, RCC_AHB1RSTR, 21),
            DMA2 => line(RCC_AHB1ENR, RCC_AHB1RSTR, 22),
            OTG_FS => line(RCC_AHB2ENR, RCC_AHB2RSTR, 7),
            RNG => line(RCC_AHB2ENR, RCC_AHB2RSTR, 6),
            Peripheral(a) if a >= AHB1 => {
                slot_line(periph, AHB1, AHB1_SLOTS, RCC_AHB1ENR, Some(RCC_AHB1RSTR))
            }
            Peripheral(a) if a >= APB2 => {
                slot_line(periph, APB2, APB2_SLOTS, RCC_APB2ENR, Some(RCC_APB2RSTR))
            }
            _ => slot_line(periph, APB1, APB1_SLOTS, RCC_APB1ENR, Some(RCC_APB1RSTR)),
        }
    }

    fn pclock_freq(periph: Peripheral) -> u32 {
        match periph.0 {
            a if a >= AHB1 => CLOCK_FREQ,
            a if a >= APB2 => APB2_FREQ,
            _ => APB1_FREQ,
        }
    }
}

const PORTS: Ports<Rcc> = Ports::new(GPIOA.0, Layout::Moder);

const SR: u32 = 0x00;
const CR2: u32 = 0x08;
const SMPR1: u32 = 0x0c;
const SMPR2: u32 = 0x10;
const SQR3: u32 = 0x34;
const DR: u32 = 0x4c;

const SR_EOC: u32 = 1 << 1;
const SR_STRT: u32 = 1 << 4;

const CR2_ADON: u32 = 1 << 0;
const CR2_SWSTART: u32 = 1 << 30;

// Registers common to all three converters
const ADC_CCR: u32 = 0x4001_2304;
const CCR_ADCPRE_POS: u32 = 16;
const CCR_TSVREFE: u32 = 1 << 23;

const ADC_MAX_FREQ: u32 = 36_000_000;
const ADCPRE_DIVS: [u32; 4] = [2, 4, 6, 8];
const ADCPRE: u32 = prescaler(APB2_FREQ, ADC_MAX_FREQ, &ADCPRE_DIVS);

// 84 cycles
const SAMPLE_TIME: u32 = 0b100;

const ADC_PINS: &[AdcPin] = adc_pins! {
    ADC1 => [
        gpio('A', 0) => 0, gpio('A', 1) => 1, gpio('A', 2) => 2, gpio('A', 3) => 3,
        gpio('A', 4) => 4, gpio('A', 5) => 5, gpio('A', 6) => 6, gpio('A', 7) => 7,
        gpio('B', 0) => 8, gpio('B', 1) => 9,
        gpio('C', 0) => 10, gpio('C', 1) => 11, gpio('C', 2) => 12,
        gpio('C', 3) => 13, gpio('C', 4) => 14, gpio('C', 5) => 15,
        AnalogPin::Temperature => 16,
    ],
    ADC3 => [
        gpio('F', 3) => 9, gpio('F', 4) => 14, gpio('F', 5) => 15,
        gpio('F', 6) => 4, gpio('F', 7) => 5, gpio('F', 8) => 6,
        gpio('F', 9) => 7, gpio('F', 10) => 8,
    ],
};

pub struct Adc<H> {
    hw: H,
}

impl<H: Hardware> Adc<H> {
    pub const fn new(hw: H) -> Self {
        Adc { hw }
    }

    fn bring_up(&self, adc: Peripheral) {
        let hw = &self.hw;
        Rcc::enable(hw, adc);

        critical_section::with(|_| {
            hw.modify(ADC_CCR, |v| (v & !(0b11 << CCR_ADCPRE_POS)) | (ADCPRE << CCR_ADCPRE_POS))
        });

        hw.write(adc.reg(SMPR1), smpr_fill(SAMPLE_TIME, 9));
        hw.write(adc.reg(SMPR2), smpr_fill(SAMPLE_TIME, 10));
        hw.write(adc.reg(CR2), CR2_ADON);
        info!("adc {=u32:#x} on", adc.0);
    }
}

impl<H: Hardware> AnalogIn for Adc<H> {
    type Channel = Channel;

    const BACKOFF: u32 = ticks_from_us(CLOCK_FREQ, 20);

    fn try_setup(&self, pin: AnalogPin) -> Result<Channel, Error> {
        let p = adc::lookup(ADC_PINS, pin)?;
        if !Rcc::is_enabled(&self.hw, p.adc) {
            self.bring_up(p.adc);
        }
        match pin {
            AnalogPin::Temperature => {
                critical_section::with(|_| self.hw.set_bits(ADC_CCR, CCR_TSVREFE))
            }
            AnalogPin::Gpio(gpio) => PORTS.set_analog(&self.hw, gpio),
        }
        trace!("adc {} on {=u32:#x} chan {=u8}", pin, p.adc.0, p.chan);
        Ok(Channel { adc: p.adc, chan: p.chan })
    }

    fn advance(&self, ch: Channel) -> u32 {
        let hw = &self.hw;
        let sr = hw.read(ch.adc.reg(SR));
        if sr & SR_STRT != 0 {
            if sr & SR_EOC != 0 && hw.read(ch.adc.reg(SQR3)) == ch.chan as u32 {
                return 0;
            }
            return Self::BACKOFF;
        }
        hw.write(ch.adc.reg(SR), !SR_EOC);
        hw.write(ch.adc.reg(SQR3), ch.chan as u32);
        hw.modify(ch.adc.reg(CR2), |v| v | CR2_SWSTART);
        Self::BACKOFF
    }

    fn read(&self, ch: Channel) -> u16 {
        self.hw.write(ch.adc.reg(SR), !SR_STRT);
        self.hw.read(ch.adc.reg(DR)) as u16
    }

    fn cancel(&self, ch: Channel) {
        critical_section::with(|_| {
            let sr = self.hw.read(ch.adc.reg(SR));
            if sr & SR_STRT != 0 && self.hw.read(ch.adc.reg(SQR3)) == ch.chan as u32 {
                self.read(ch);
            }
        })
    }
}
