//! Nations N32G45x.
//!
//! An STM32F1 look-alike with four converters on the AHB bus. Channels are
//! numbered per converter and reach the converter through a slot of the
//! regular sequence ("rank") rather than a flat channel register.

use crate::adc::{self, adc_pins, gpio, smpr_fill, AdcPin};
use crate::clock::slot_line;
use crate::stm32::gpio::{Layout, Ports};
use crate::time::{prescaler, ticks_from_us};
use crate::{AnalogIn, AnalogPin, ClockLine, ClockTree, Error, Hardware, Peripheral};

pub const CLOCK_FREQ: u32 = 144_000_000;
const HSE_FREQ: u32 = 8_000_000;
const APB1_FREQ: u32 = CLOCK_FREQ / 4;
const APB2_FREQ: u32 = CLOCK_FREQ / 2;

const APB1: u32 = 0x4000_0000;
const APB2: u32 = 0x4001_0000;
const AHB: u32 = 0x4001_8000;

const RCC: u32 = 0x4002_1000;
const RCC_APB2PRST: u32 = RCC + 0x0c;
const RCC_APB1PRST: u32 = RCC + 0x10;
const RCC_AHBPCLKEN: u32 = RCC + 0x14;
const RCC_APB2PCLKEN: u32 = RCC + 0x18;
const RCC_APB1PCLKEN: u32 = RCC + 0x1c;
const RCC_AHBPRST: u32 = RCC + 0x28;
const RCC_CFG2: u32 = RCC + 0x2c;

// Bus slots with an enable bit of their own
const APB2_SLOTS: u32 = 0x0000_79fd;
const APB1_SLOTS: u32 = 0x3efe_c83f;

// Converter clock: HCLK through ADCHPRES, at most 72MHz
const CFG2_ADCHPRES_MASK: u32 = 0xf;
const ADCHPRES_DIVS: [u32; 9] = [1, 2, 4, 6, 8, 10, 12, 16, 32];
const ADC_MAX_FREQ: u32 = 72_000_000;
const ADCHPRES: u32 = prescaler(CLOCK_FREQ, ADC_MAX_FREQ, &ADCHPRES_DIVS);

// 1MHz timing clock for the converters, divided down from HSE
const CFG2_ADC1MSEL_HSE: u32 = 1 << 10;
const CFG2_ADC1MPRES_POS: u32 = 11;
const CFG2_ADC1MPRES_MASK: u32 = 0x1f << CFG2_ADC1MPRES_POS;
const ADC1MPRES: u32 = HSE_FREQ / 1_000_000 - 1;
const _: () = assert!(HSE_FREQ % 1_000_000 == 0 && ADC1MPRES < 32);

pub const TIM2: Peripheral = Peripheral(0x4000_0000);
pub const USART2: Peripheral = Peripheral(0x4000_4400);
pub const I2C1: Peripheral = Peripheral(0x4000_5400);
pub const CAN1: Peripheral = Peripheral(0x4000_6400);
pub const AFIO: Peripheral = Peripheral(0x4001_0000);
pub const GPIOA: Peripheral = Peripheral(0x4001_0800);
pub const GPIOE: Peripheral = Peripheral(0x4001_1800);
pub const GPIOF: Peripheral = Peripheral(0x4001_1c00);
pub const TIM1: Peripheral = Peripheral(0x4001_2c00);
pub const SPI1: Peripheral = Peripheral(0x4001_3000);
pub const USART1: Peripheral = Peripheral(0x4001_3800);
pub const DMA1: Peripheral = Peripheral(0x4002_0000);
pub const DMA2: Peripheral = Peripheral(0x4002_0400);
pub const ADC1: Peripheral = Peripheral(0x4002_0800);
pub const ADC2: Peripheral = Peripheral(0x4002_0c00);
pub const CRC: Peripheral = Peripheral(0x4002_3000);
pub const ADC3: Peripheral = Peripheral(0x4002_4800);
pub const ADC4: Peripheral = Peripheral(0x4002_4c00);

/// Reset and clock control.
pub struct Rcc;

impl ClockTree for Rcc {
    fn lookup(periph: Peripheral) -> Option<ClockLine> {
        let adc = |bit: u32| {
            Some(ClockLine { en: RCC_AHBPCLKEN, rst: Some(RCC_AHBPRST), bit: 1 << bit })
        };
        let ahb = |bit: u32| Some(ClockLine { en: RCC_AHBPCLKEN, rst: None, bit: 1 << bit });
        match periph {
            ADC1 => adc(12),
            ADC2 => adc(13),
            ADC3 => adc(14),
            ADC4 => adc(15),
            DMA1 => ahb(0),
            DMA2 => ahb(1),
            CRC => ahb(6),
            Peripheral(a) if a >= AHB => None,
            Peripheral(a) if a >= APB2 => {
                slot_line(periph, APB2, APB2_SLOTS, RCC_APB2PCLKEN, Some(RCC_APB2PRST))
            }
            _ => slot_line(periph, APB1, APB1_SLOTS, RCC_APB1PCLKEN, Some(RCC_APB1PRST)),
        }
    }

    fn pclock_freq(periph: Peripheral) -> u32 {
        match periph.0 {
            a if a >= AHB => CLOCK_FREQ,
            a if a >= APB2 => APB2_FREQ,
            _ => APB1_FREQ,
        }
    }
}

const PORTS: Ports<Rcc> = Ports::new(GPIOA.0, Layout::Crl);

const STS: u32 = 0x00;
const CTRL2: u32 = 0x08;
const SAMPT1: u32 = 0x0c;
const SAMPT2: u32 = 0x10;
const RSEQ1: u32 = 0x2c;
const RSEQ3: u32 = 0x34;
const DAT: u32 = 0x4c;
const CTRL3: u32 = 0x50;

const STS_ENDC: u32 = 1 << 1;
const STS_STR: u32 = 1 << 4;

const CTRL2_ON: u32 = 1 << 0;
const CTRL2_ENCAL: u32 = 1 << 2;
const CTRL2_EXTRSEL_SWSTRRCH: u32 = 0b111 << 17;
const CTRL2_EXTRTRIG: u32 = 1 << 20;
const CTRL2_SWSTRRCH: u32 = 1 << 22;
const CTRL2_TEMPEN: u32 = 1 << 23;
const CTRL2_FLAGS: u32 = CTRL2_ON | CTRL2_EXTRSEL_SWSTRRCH | CTRL2_EXTRTRIG;

// 12 bit
const CTRL3_RES: u32 = 0b11;
const CTRL3_RDY: u32 = 1 << 5;

// 55.5 cycles
const SAMPLE_TIME: u32 = 0b101;

// Single conversions always run from the first slot of the sequence
const RANK: u8 = 1;

/// A converter channel and the regular sequence slot it is converted from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueuedChannel {
    pub adc: Peripheral,
    pub chan: u8,
    pub rank: u8,
}

impl QueuedChannel {
    /// RSEQ3 value selecting this channel in its slot.
    #[inline]
    const fn rseq3(self) -> u32 {
        (self.chan as u32) << (5 * (self.rank as u32 - 1))
    }
}

const ADC_PINS: &[AdcPin] = adc_pins! {
    ADC1 => [
        gpio('A', 0) => 1, gpio('A', 1) => 2, gpio('A', 6) => 3, gpio('A', 3) => 4,
        gpio('F', 4) => 5, gpio('C', 0) => 6, gpio('C', 1) => 7, gpio('C', 2) => 8,
        gpio('C', 3) => 9, gpio('F', 2) => 10, gpio('A', 2) => 11,
        AnalogPin::Temperature => 16,
    ],
    ADC2 => [
        gpio('A', 4) => 1, gpio('A', 5) => 2, gpio('B', 1) => 3, gpio('A', 7) => 4,
        gpio('C', 4) => 5, gpio('C', 5) => 12, gpio('B', 2) => 13,
    ],
    ADC3 => [
        gpio('B', 11) => 1, gpio('E', 9) => 2, gpio('E', 13) => 3, gpio('E', 12) => 4,
        gpio('B', 13) => 5, gpio('E', 8) => 6, gpio('D', 10) => 7,
    ],
    ADC4 => [
        gpio('E', 14) => 1, gpio('E', 15) => 2, gpio('B', 12) => 3, gpio('B', 14) => 4,
        gpio('B', 15) => 5,
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
            let mask = CFG2_ADCHPRES_MASK | CFG2_ADC1MSEL_HSE | CFG2_ADC1MPRES_MASK;
            let cfg = ADCHPRES | CFG2_ADC1MSEL_HSE | (ADC1MPRES << CFG2_ADC1MPRES_POS);
            hw.modify(RCC_CFG2, |v| (v & !mask) | cfg)
        });

        // Converter clocked from HCLK (CKMOD clear)
        hw.write(adc.reg(CTRL3), CTRL3_RES);
        hw.write(adc.reg(SAMPT1), smpr_fill(SAMPLE_TIME, 8));
        hw.write(adc.reg(SAMPT2), smpr_fill(SAMPLE_TIME, 10));
        // One conversion per sequence
        hw.write(adc.reg(RSEQ1), 0);

        hw.write(adc.reg(CTRL2), CTRL2_FLAGS);
        while hw.read(adc.reg(CTRL3)) & CTRL3_RDY == 0 {}

        hw.set_bits(adc.reg(CTRL2), CTRL2_ENCAL);
        while hw.read(adc.reg(CTRL2)) & CTRL2_ENCAL != 0 {}
        info!("adc {=u32:#x} calibrated", adc.0);
    }
}

impl<H: Hardware> AnalogIn for Adc<H> {
    type Channel = QueuedChannel;

    const BACKOFF: u32 = ticks_from_us(CLOCK_FREQ, 20);

    fn try_setup(&self, pin: AnalogPin) -> Result<QueuedChannel, Error> {
        let p = adc::lookup(ADC_PINS, pin)?;
        if !Rcc::is_enabled(&self.hw, p.adc) {
            self.bring_up(p.adc);
        }
        match pin {
            AnalogPin::Temperature => self.hw.set_bits(p.adc.reg(CTRL2), CTRL2_TEMPEN),
            AnalogPin::Gpio(gpio) => PORTS.set_analog(&self.hw, gpio),
        }
        trace!("adc {} on {=u32:#x} chan {=u8}", pin, p.adc.0, p.chan);
        Ok(QueuedChannel { adc: p.adc, chan: p.chan, rank: RANK })
    }

    fn advance(&self, ch: QueuedChannel) -> u32 {
        let hw = &self.hw;
        let sts = hw.read(ch.adc.reg(STS));
        if sts & STS_STR != 0 {
            if sts & STS_ENDC != 0 && hw.read(ch.adc.reg(RSEQ3)) == ch.rseq3() {
                return 0;
            }
            return Self::BACKOFF;
        }
        hw.write(ch.adc.reg(STS), !STS_ENDC);
        hw.write(ch.adc.reg(RSEQ3), ch.rseq3());
        hw.modify(ch.adc.reg(CTRL2), |v| v | CTRL2_SWSTRRCH);
        Self::BACKOFF
    }

    fn read(&self, ch: QueuedChannel) -> u16 {
        self.hw.write(ch.adc.reg(STS), !STS_STR);
        self.hw.read(ch.adc.reg(DAT)) as u16
    }

    fn cancel(&self, ch: QueuedChannel) {
        critical_section::with(|_| {
            let sts = self.hw.read(ch.adc.reg(STS));
            if sts & STS_STR != 0 && self.hw.read(ch.adc.reg(RSEQ3)) == ch.rseq3() {
                self.read(ch);
            }
        })
    }
}
