//! STM32H7 (STM32H743/H753).

use crate::adc::{self, adc_pins, gpio, smpr_fill, AdcPin};
use crate::clock::slot_line;
use crate::stm32::gpio::{Layout, Ports};
use crate::time::{prescaler, ticks_from_us};
use crate::{AnalogIn, AnalogPin, Channel, ClockLine, ClockTree, Error, Hardware, Peripheral};

pub const CLOCK_FREQ: u32 = 400_000_000;
const HCLK_FREQ: u32 = CLOCK_FREQ / 2;
const PCLK_FREQ: u32 = HCLK_FREQ / 2;

const APB1: u32 = 0x4000_0000;
const APB1H: u32 = 0x4000_8000;
const APB2: u32 = 0x4001_0000;
const AHB1: u32 = 0x4002_0000;
const AHB2: u32 = 0x4802_0000;
const APB3: u32 = 0x5000_0000;
const AHB3: u32 = 0x5200_0000;
const APB4: u32 = 0x5800_0000;
const AHB4: u32 = 0x5802_0000;

const RCC: u32 = 0x5802_4400;
const RCC_AHB3RSTR: u32 = RCC + 0x7c;
const RCC_AHB1RSTR: u32 = RCC + 0x80;
const RCC_AHB2RSTR: u32 = RCC + 0x84;
const RCC_AHB4RSTR: u32 = RCC + 0x88;
const RCC_APB3RSTR: u32 = RCC + 0x8c;
const RCC_APB1LRSTR: u32 = RCC + 0x90;
const RCC_APB1HRSTR: u32 = RCC + 0x94;
const RCC_APB2RSTR: u32 = RCC + 0x98;
const RCC_APB4RSTR: u32 = RCC + 0x9c;
const RCC_AHB3ENR: u32 = RCC + 0xd4;
const RCC_AHB1ENR: u32 = RCC + 0xd8;
const RCC_AHB2ENR: u32 = RCC + 0xdc;
const RCC_AHB4ENR: u32 = RCC + 0xe0;
const RCC_APB3ENR: u32 = RCC + 0xe4;
const RCC_APB1LENR: u32 = RCC + 0xe8;
const RCC_APB1HENR: u32 = RCC + 0xec;
const RCC_APB2ENR: u32 = RCC + 0xf0;
const RCC_APB4ENR: u32 = RCC + 0xf4;

// Bus slots with an enable bit of their own. APB1 spans two register
// pairs, L for its first 32 slots and H above.
const AHB4_SLOTS: u32 = 0x0328_07ff;
const APB4_SLOTS: u32 = 0x0021_deaa;
const AHB2_SLOTS: u32 = 0x0000_0271;
const APB2_SLOTS: u32 = 0x31d7_3033;
const APB1H_SLOTS: u32 = 0x0000_0136;
const APB1L_SLOTS: u32 = 0xe8ff_c3ff;

pub const USART2: Peripheral = Peripheral(0x4000_4400);
pub const UART8: Peripheral = Peripheral(0x4000_7c00);
pub const CRS: Peripheral = Peripheral(0x4000_8400);
pub const FDCAN1: Peripheral = Peripheral(0x4000_a000);
pub const TIM1: Peripheral = Peripheral(0x4001_0000);
pub const USART1: Peripheral = Peripheral(0x4001_1000);
pub const SPI1: Peripheral = Peripheral(0x4001_3000);
pub const DMA1: Peripheral = Peripheral(0x4002_0000);
pub const DMA2: Peripheral = Peripheral(0x4002_0400);
pub const ADC1: Peripheral = Peripheral(0x4002_2000);
pub const ADC2: Peripheral = Peripheral(0x4002_2100);
pub const USB1: Peripheral = Peripheral(0x4004_0000);
pub const RNG: Peripheral = Peripheral(0x4802_1800);
pub const LTDC: Peripheral = Peripheral(0x5000_1000);
pub const MDMA: Peripheral = Peripheral(0x5200_0000);
pub const DMA2D: Peripheral = Peripheral(0x5200_1000);
pub const FMC: Peripheral = Peripheral(0x5200_4000);
pub const SYSCFG: Peripheral = Peripheral(0x5800_0400);
pub const LPUART1: Peripheral = Peripheral(0x5800_0c00);
pub const GPIOA: Peripheral = Peripheral(0x5802_0000);
pub const GPIOF: Peripheral = Peripheral(0x5802_1400);
pub const ADC3: Peripheral = Peripheral(0x5802_6000);

/// Reset and clock control.
pub struct Rcc;

impl ClockTree for Rcc {
    fn lookup(periph: Peripheral) -> Option<ClockLine> {
        let line = |en: u32, rst: u32, bit: u32| {
            Some(ClockLine { en, rst: Some(rst), bit: 1 << bit })
        };
        match periph {
            DMA1 => line(RCC_AHB1ENR, RCC_AHB1RSTR, 0),
            DMA2 => line(RCC_AHB1ENR, RCC_AHB1RSTR, 1),
            // ADC1 and ADC2 share both the ADC12 enable and reset bits
            ADC1 => Some(ClockLine { en: RCC_AHB1ENR, rst: None, bit: 1 << 5 }),
            USB1 => line(RCC_AHB1ENR, RCC_AHB1RSTR, 25),
            LTDC => line(RCC_APB3ENR, RCC_APB3RSTR, 3),
            MDMA => line(RCC_AHB3ENR, RCC_AHB3RSTR, 0),
            DMA2D => line(RCC_AHB3ENR, RCC_AHB3RSTR, 4),
            FMC => line(RCC_AHB3ENR, RCC_AHB3RSTR, 12),
            Peripheral(a) if a >= AHB4 => {
                slot_line(periph, AHB4, AHB4_SLOTS, RCC_AHB4ENR, Some(RCC_AHB4RSTR))
            }
            Peripheral(a) if a >= APB4 => {
                slot_line(periph, APB4, APB4_SLOTS, RCC_APB4ENR, Some(RCC_APB4RSTR))
            }
            Peripheral(a) if a >= APB3 => None,
            Peripheral(a) if a >= AHB2 => {
                slot_line(periph, AHB2, AHB2_SLOTS, RCC_AHB2ENR, Some(RCC_AHB2RSTR))
            }
            Peripheral(a) if a >= AHB1 => None,
            Peripheral(a) if a >= APB2 => {
                slot_line(periph, APB2, APB2_SLOTS, RCC_APB2ENR, Some(RCC_APB2RSTR))
            }
            Peripheral(a) if a >= APB1H => {
                slot_line(periph, APB1H, APB1H_SLOTS, RCC_APB1HENR, Some(RCC_APB1HRSTR))
            }
            _ => slot_line(periph, APB1, APB1L_SLOTS, RCC_APB1LENR, Some(RCC_APB1LRSTR)),
        }
    }

    fn pclock_freq(periph: Peripheral) -> u32 {
        match periph.0 {
            a if a >= AHB4 => HCLK_FREQ,
            a if a >= APB4 => PCLK_FREQ,
            a if a >= AHB3 => HCLK_FREQ,
            a if a >= APB3 => PCLK_FREQ,
            a if a >= AHB1 => HCLK_FREQ,
            _ => PCLK_FREQ,
        }
    }
}

const PORTS: Ports<Rcc> = Ports::new(GPIOA.0, Layout::Moder);

const ISR: u32 = 0x00;
const CR: u32 = 0x08;
const CFGR: u32 = 0x0c;
const SMPR1: u32 = 0x14;
const SMPR2: u32 = 0x18;
const PCSEL: u32 = 0x1c;
const SQR1: u32 = 0x30;
const DR: u32 = 0x40;

const ISR_ADRDY: u32 = 1 << 0;
const ISR_EOC: u32 = 1 << 2;
const ISR_EOS: u32 = 1 << 3;
const ISR_LDORDY: u32 = 1 << 12;

const CR_ADEN: u32 = 1 << 0;
const CR_ADSTART: u32 = 1 << 2;
const CR_ADSTP: u32 = 1 << 4;
// Revision V analog boost for a 25 to 50MHz converter clock
const CR_BOOST: u32 = 0b11 << 8;
const CR_ADCALLIN: u32 = 1 << 16;
const CR_ADVREGEN: u32 = 1 << 28;
const CR_DEEPPWD: u32 = 1 << 29;
const CR_ADCALDIF: u32 = 1 << 30;
const CR_ADCAL: u32 = 1 << 31;

// 12 bit
const CFGR_RES: u32 = 0b110 << 2;
const SQR1_SQ1_POS: u32 = 6;

const ADC12_CCR: u32 = 0x4002_2308;
const ADC3_CCR: u32 = 0x5802_6308;
const CCR_CKMODE_POS: u32 = 16;
const CCR_TSEN: u32 = 1 << 23;

// Synchronous HCLK/1, /2, /4, CKMODE codes 1 to 3
const CKMODE_DIVS: [u32; 3] = [1, 2, 4];
const ADC_MAX_FREQ: u32 = 50_000_000;
const CKMODE: u32 = prescaler(HCLK_FREQ, ADC_MAX_FREQ, &CKMODE_DIVS) + 1;

// 64.5 cycles
const SAMPLE_TIME: u32 = 0b101;

const ADC_PINS: &[AdcPin] = adc_pins! {
    ADC1 => [
        gpio('F', 11) => 2, gpio('A', 6) => 3, gpio('C', 4) => 4, gpio('B', 1) => 5,
        gpio('F', 12) => 6, gpio('A', 7) => 7, gpio('C', 5) => 8, gpio('B', 0) => 9,
        gpio('C', 0) => 10, gpio('C', 1) => 11, gpio('C', 2) => 12, gpio('C', 3) => 13,
        gpio('A', 2) => 14, gpio('A', 3) => 15, gpio('A', 0) => 16, gpio('A', 1) => 17,
        gpio('A', 4) => 18, gpio('A', 5) => 19,
    ],
    ADC3 => [
        gpio('F', 9) => 2, gpio('F', 7) => 3, gpio('F', 5) => 4, gpio('F', 3) => 5,
        gpio('F', 10) => 6, gpio('F', 8) => 7, gpio('F', 6) => 8, gpio('F', 4) => 9,
        AnalogPin::Temperature => 18,
    ],
};

fn common_ccr(adc: Peripheral) -> u32 {
    if adc == ADC3 {
        ADC3_CCR
    } else {
        ADC12_CCR
    }
}

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
            hw.modify(common_ccr(adc), |v| {
                (v & !(0b11 << CCR_CKMODE_POS)) | (CKMODE << CCR_CKMODE_POS)
            })
        });

        // Leave deep power down, then power the regulator
        hw.write(adc.reg(CR), 0);
        hw.write(adc.reg(CR), CR_ADVREGEN | CR_BOOST);
        while hw.read(adc.reg(ISR)) & ISR_LDORDY == 0 {}

        // Single-ended calibration including linearity
        hw.modify(adc.reg(CR), |v| (v & !CR_ADCALDIF) | CR_ADCALLIN);
        hw.set_bits(adc.reg(CR), CR_ADCAL);
        while hw.read(adc.reg(CR)) & CR_ADCAL != 0 {}

        hw.write(adc.reg(ISR), ISR_ADRDY);
        hw.set_bits(adc.reg(CR), CR_ADEN);
        while hw.read(adc.reg(ISR)) & ISR_ADRDY == 0 {}

        hw.write(adc.reg(SMPR1), smpr_fill(SAMPLE_TIME, 10));
        hw.write(adc.reg(SMPR2), smpr_fill(SAMPLE_TIME, 10));
        hw.write(adc.reg(CFGR), CFGR_RES);
        info!("adc {=u32:#x} calibrated", adc.0);
    }
}

impl<H: Hardware> AnalogIn for Adc<H> {
    type Channel = Channel;

    const BACKOFF: u32 = ticks_from_us(CLOCK_FREQ, 10);

    fn try_setup(&self, pin: AnalogPin) -> Result<Channel, Error> {
        let p = adc::lookup(ADC_PINS, pin)?;
        let hw = &self.hw;
        if !Rcc::is_enabled(hw, p.adc) {
            self.bring_up(p.adc);
        }
        match pin {
            AnalogPin::Temperature => {
                critical_section::with(|_| hw.set_bits(common_ccr(p.adc), CCR_TSEN))
            }
            AnalogPin::Gpio(gpio) => PORTS.set_analog(hw, gpio),
        }
        hw.set_bits(p.adc.reg(PCSEL), 1 << p.chan);
        trace!("adc {} on {=u32:#x} chan {=u8}", pin, p.adc.0, p.chan);
        Ok(Channel { adc: p.adc, chan: p.chan })
    }

    fn advance(&self, ch: Channel) -> u32 {
        let hw = &self.hw;
        let sq1 = (ch.chan as u32) << SQR1_SQ1_POS;
        let cr = hw.read(ch.adc.reg(CR));
        if cr & CR_ADSTART != 0 {
            return Self::BACKOFF;
        }
        if hw.read(ch.adc.reg(ISR)) & ISR_EOC != 0 {
            if hw.read(ch.adc.reg(SQR1)) == sq1 {
                return 0;
            }
            return Self::BACKOFF;
        }
        hw.write(ch.adc.reg(SQR1), sq1);
        hw.write(ch.adc.reg(CR), cr | CR_ADSTART);
        Self::BACKOFF
    }

    fn read(&self, ch: Channel) -> u16 {
        self.hw.write(ch.adc.reg(ISR), ISR_EOC | ISR_EOS);
        self.hw.read(ch.adc.reg(DR)) as u16
    }

    fn cancel(&self, ch: Channel) {
        let hw = &self.hw;
        critical_section::with(|_| {
            if hw.read(ch.adc.reg(SQR1)) != (ch.chan as u32) << SQR1_SQ1_POS {
                return;
            }
            let cr = hw.read(ch.adc.reg(CR));
            if cr & CR_ADSTART != 0 {
                let keep = CR_ADVREGEN | CR_BOOST | CR_ADCALLIN;
                hw.write(ch.adc.reg(CR), (cr & keep) | CR_ADSTP);
                while hw.read(ch.adc.reg(CR)) & CR_ADSTP != 0 {}
            } else if hw.read(ch.adc.reg(ISR)) & ISR_EOC == 0 {
                return;
            }
            self.read(ch);
        })
    }
}
