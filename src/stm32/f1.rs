//! STM32F1 (STM32F103).

use crate::adc::{self, adc_pins, gpio, smpr_fill, AdcPin};
use crate::clock::slot_line;
use crate::stm32::gpio::{Layout, Ports};
use crate::time::{prescaler, ticks_from_us};
use crate::{AnalogIn, AnalogPin, Channel, ClockLine, ClockTree, Error, Hardware, Peripheral};

pub const CLOCK_FREQ: u32 = 72_000_000;
const APB1_FREQ: u32 = CLOCK_FREQ / 2;
const APB2_FREQ: u32 = CLOCK_FREQ;

const APB1: u32 = 0x4000_0000;
const APB2: u32 = 0x4001_0000;
const AHB: u32 = 0x4001_8000;

const RCC: u32 = 0x4002_1000;
const RCC_CFGR: u32 = RCC + 0x04;
const RCC_APB2RSTR: u32 = RCC + 0x0c;
const RCC_APB1RSTR: u32 = RCC + 0x10;
const RCC_AHBENR: u32 = RCC + 0x14;
const RCC_APB2ENR: u32 = RCC + 0x18;
const RCC_APB1ENR: u32 = RCC + 0x1c;

// Bus slots with an enable bit of their own
const APB2_SLOTS: u32 = 0x0038_fffd;
const APB1_SLOTS: u32 = 0x3afe_c9ff;

pub const TIM2: Peripheral = Peripheral(0x4000_0000);
pub const SPI2: Peripheral = Peripheral(0x4000_3800);
pub const USART2: Peripheral = Peripheral(0x4000_4400);
pub const USART3: Peripheral = Peripheral(0x4000_4800);
pub const I2C1: Peripheral = Peripheral(0x4000_5400);
pub const I2C2: Peripheral = Peripheral(0x4000_5800);
pub const USB: Peripheral = Peripheral(0x4000_5c00);
pub const CAN1: Peripheral = Peripheral(0x4000_6400);
pub const AFIO: Peripheral = Peripheral(0x4001_0000);
pub const GPIOA: Peripheral = Peripheral(0x4001_0800);
pub const GPIOB: Peripheral = Peripheral(0x4001_0c00);
pub const GPIOC: Peripheral = Peripheral(0x4001_1000);
pub const ADC1: Peripheral = Peripheral(0x4001_2400);
pub const ADC2: Peripheral = Peripheral(0x4001_2800);
pub const TIM1: Peripheral = Peripheral(0x4001_2c00);
pub const SPI1: Peripheral = Peripheral(0x4001_3000);
pub const USART1: Peripheral = Peripheral(0x4001_3800);
pub const SDIO: Peripheral = Peripheral(0x4001_8000);
pub const DMA1: Peripheral = Peripheral(0x4002_0000);
pub const DMA2: Peripheral = Peripheral(0x4002_0400);
pub const CRC: Peripheral = Peripheral(0x4002_3000);

/// Reset and clock control.
pub struct Rcc;

impl ClockTree for Rcc {
    fn lookup(periph: Peripheral) -> Option<ClockLine> {
        // AHB peripherals have no reset bits on this part
        let ahb = |bit: u32| Some(ClockLine { en: RCC_AHBENR, rst: None, bit: 1 << bit });
        if periph.0 >= AHB {
            match periph {
                DMA1 => ahb(0),
                DMA2 => ahb(1),
                CRC => ahb(6),
                SDIO => ahb(10),
                _ => None,
            }
        } else if periph.0 >= APB2 {
            slot_line(periph, APB2, APB2_SLOTS, RCC_APB2ENR, Some(RCC_APB2RSTR))
        } else {
            slot_line(periph, APB1, APB1_SLOTS, RCC_APB1ENR, Some(RCC_APB1RSTR))
        }
    }

    fn pclock_freq(periph: Peripheral) -> u32 {
        if periph.0 >= AHB {
            CLOCK_FREQ
        } else if periph.0 >= APB2 {
            APB2_FREQ
        } else {
            APB1_FREQ
        }
    }
}

const PORTS: Ports<Rcc> = Ports::new(GPIOA.0, Layout::Crl);

const SR: u32 = 0x00;
const CR2: u32 = 0x08;
const SMPR1: u32 = 0x0c;
const SMPR2: u32 = 0x10;
const SQR3: u32 = 0x34;
const DR: u32 = 0x4c;

const SR_EOC: u32 = 1 << 1;
const SR_STRT: u32 = 1 << 4;

const CR2_ADON: u32 = 1 << 0;
const CR2_CAL: u32 = 1 << 2;
const CR2_RSTCAL: u32 = 1 << 3;
const CR2_EXTSEL_SWSTART: u32 = 0b111 << 17;
const CR2_EXTTRIG: u32 = 1 << 20;
const CR2_SWSTART: u32 = 1 << 22;
const CR2_TSVREFE: u32 = 1 << 23;
const CR2_FLAGS: u32 = CR2_ADON | CR2_EXTSEL_SWSTART | CR2_EXTTRIG;

// ADC clock at most 14MHz, prescaled from APB2 by RCC_CFGR.ADCPRE
const ADC_MAX_FREQ: u32 = 14_000_000;
const ADCPRE_DIVS: [u32; 4] = [2, 4, 6, 8];
const CFGR_ADCPRE_POS: u32 = 14;
const ADCPRE: u32 = prescaler(APB2_FREQ, ADC_MAX_FREQ, &ADCPRE_DIVS);

// 41.5 cycles; 12.5 + 41.5 cycles is under 5us at 12MHz
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
            hw.modify(RCC_CFGR, |v| (v & !(0b11 << CFGR_ADCPRE_POS)) | (ADCPRE << CFGR_ADCPRE_POS))
        });

        hw.write(adc.reg(SMPR1), smpr_fill(SAMPLE_TIME, 8));
        hw.write(adc.reg(SMPR2), smpr_fill(SAMPLE_TIME, 10));
        hw.write(adc.reg(CR2), CR2_FLAGS);

        hw.write(adc.reg(CR2), CR2_FLAGS | CR2_RSTCAL);
        while hw.read(adc.reg(CR2)) & CR2_RSTCAL != 0 {}
        hw.write(adc.reg(CR2), CR2_FLAGS | CR2_CAL);
        while hw.read(adc.reg(CR2)) & CR2_CAL != 0 {}

        info!("adc {=u32:#x} calibrated", adc.0);
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
            AnalogPin::Temperature => self.hw.set_bits(p.adc.reg(CR2), CR2_TSVREFE),
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
            // Still converting, or holding another channel's result
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adc::tests::{assert_unique_channels, drain};
    use crate::clock::tests::assert_distinct_lines;
    use crate::sim::{sample_value, Converters, Sim, SrAdc};

    type Hw = Sim<Converters<SrAdc>>;

    const ADC1_BIT: u32 = 1 << 9;

    fn sim() -> Hw {
        Sim::new(Converters::new(vec![SrAdc::new(ADC1.0, CR2_SWSTART, CR2_CAL | CR2_RSTCAL)]))
    }

    #[test]
    fn channels_are_unique() {
        assert_unique_channels(ADC_PINS);
    }

    #[test]
    fn clock_lines() {
        assert_distinct_lines::<Rcc>(&[
            TIM2, SPI2, USART2, USART3, I2C1, I2C2, USB, CAN1, AFIO, GPIOA, GPIOB, GPIOC, ADC1,
            ADC2, TIM1, SPI1, USART1, SDIO, DMA1, DMA2, CRC,
        ]);
        assert_eq!(
            Rcc::lookup(ADC1),
            Some(ClockLine { en: RCC_APB2ENR, rst: Some(RCC_APB2RSTR), bit: 1 << 9 })
        );
        assert_eq!(
            Rcc::lookup(I2C2),
            Some(ClockLine { en: RCC_APB1ENR, rst: Some(RCC_APB1RSTR), bit: 1 << 22 })
        );
        assert_eq!(Rcc::lookup(DMA2), Some(ClockLine { en: RCC_AHBENR, rst: None, bit: 1 << 1 }));
        assert_eq!(Rcc::lookup(Peripheral(0x4002_1000)), None);
        assert_eq!(Rcc::pclock_freq(USART1), 72_000_000);
        assert_eq!(Rcc::pclock_freq(USART2), 36_000_000);
    }

    #[test]
    fn ungated_slots_have_no_line() {
        // EXTI, RTC, IWDG and a reserved hole
        for a in [0x4001_0400, 0x4000_2800, 0x4000_3000, 0x4001_4000] {
            assert_eq!(Rcc::lookup(Peripheral(a)), None, "{:#x}", a);
        }
        assert_eq!(Rcc::lookup(Peripheral(0x4001_5400)).map(|cl| cl.bit), Some(1 << 21));
    }

    #[test]
    fn setup_brings_up_block_once() {
        let hw = sim();
        hw.poke(GPIOA.reg(0x00), 0x4444_4444);
        let adc = Adc::new(&hw);
        let a = adc.setup(gpio('A', 0));
        let b = adc.setup(gpio('A', 1));
        let c = adc.setup(gpio('B', 0));
        assert_eq!(a, Channel { adc: ADC1, chan: 0 });
        assert_eq!(b, Channel { adc: ADC1, chan: 1 });
        assert_eq!(c, Channel { adc: ADC1, chan: 8 });

        let resets = hw.writes_to(RCC_APB2RSTR);
        assert_eq!(resets.iter().filter(|&&v| v & ADC1_BIT != 0).count(), 1);
        let cal = hw.writes_to(ADC1.reg(CR2));
        assert_eq!(cal.iter().filter(|&&v| v & CR2_CAL != 0).count(), 1);
        assert_eq!(cal.iter().filter(|&&v| v & CR2_RSTCAL != 0).count(), 1);
        assert_eq!(hw.peek(ADC1.reg(CR2)) & (CR2_CAL | CR2_RSTCAL), 0);
        assert_eq!(hw.peek(ADC1.reg(SMPR2)), 0x2492_4924);
        // 72MHz / 6
        assert_eq!((hw.peek(RCC_CFGR) >> CFGR_ADCPRE_POS) & 0b11, 2);
        assert!(Rcc::pclock_freq(ADC1) / ADCPRE_DIVS[ADCPRE as usize] <= ADC_MAX_FREQ);
        // PA0 and PA1 analog, ports A and B clocked
        assert_eq!(hw.peek(GPIOA.reg(0x00)), 0x4444_4400);
        assert_eq!(hw.peek(RCC_APB2ENR), ADC1_BIT | (1 << 2) | (1 << 3));
    }

    #[test]
    fn sample_cycle() {
        let hw = sim();
        let adc = Adc::new(&hw);
        let ch = adc.setup(gpio('A', 5));
        let waits = drain(&adc, ch);
        assert!(!waits.is_empty());
        assert!(waits.iter().all(|&w| w == Adc::<&Hw>::BACKOFF));
        assert_eq!(adc.read(ch), sample_value(0, 5));

        // A second cycle needs no new setup and gets a fresh result
        drain(&adc, ch);
        assert_eq!(adc.read(ch), sample_value(1, 5));
        assert_eq!(hw.peek(ADC1.reg(SR)) & (SR_STRT | SR_EOC), 0);
    }

    #[test]
    fn backoff_is_constant() {
        assert_eq!(Adc::<&Hw>::BACKOFF, 1440);
        let hw = sim();
        let adc = Adc::new(&hw);
        let a = adc.setup(gpio('A', 0));
        let b = adc.setup(gpio('A', 1));
        adc.advance(a);
        for _ in 0..50 {
            assert_eq!(adc.advance(b), Adc::<&Hw>::BACKOFF);
        }
    }

    #[test]
    fn stale_result_is_not_ready_for_other_channel() {
        let hw = sim();
        let adc = Adc::new(&hw);
        let a = adc.setup(gpio('A', 0));
        let b = adc.setup(gpio('A', 1));
        drain(&adc, a);
        // a's result is complete but unread
        for _ in 0..10 {
            assert_ne!(adc.advance(b), 0);
        }
        assert_eq!(adc.read(a), sample_value(0, 0));
        drain(&adc, b);
        assert_eq!(adc.read(b), sample_value(1, 1));
    }

    #[test]
    fn cancel_when_idle_is_a_no_op() {
        let hw = sim();
        let adc = Adc::new(&hw);
        let a = adc.setup(gpio('A', 0));
        let b = adc.setup(gpio('A', 1));
        hw.clear_log();
        adc.cancel(a);
        assert!(!hw.wrote_anything());

        // In flight for another channel
        adc.advance(b);
        hw.clear_log();
        adc.cancel(a);
        assert!(!hw.wrote_anything());
    }

    #[test]
    fn cancel_releases_block() {
        let hw = sim();
        let adc = Adc::new(&hw);
        let a = adc.setup(gpio('A', 0));
        let b = adc.setup(gpio('A', 1));
        drain(&adc, a);
        adc.cancel(a);
        assert_eq!(hw.peek(ADC1.reg(SR)) & (SR_STRT | SR_EOC), 0);
        drain(&adc, b);
        assert_eq!(adc.read(b), sample_value(1, 1));
    }

    #[test]
    fn temperature_channel() {
        let hw = sim();
        let adc = Adc::new(&hw);
        let t = adc.setup(AnalogPin::Temperature);
        assert_eq!(t, Channel { adc: ADC1, chan: 16 });
        assert_ne!(hw.peek(ADC1.reg(CR2)) & CR2_TSVREFE, 0);
        drain(&adc, t);
        assert_eq!(adc.read(t), sample_value(0, 16));
        // Starting a conversion keeps the sensor enabled
        assert_ne!(hw.peek(ADC1.reg(CR2)) & CR2_TSVREFE, 0);
    }

    #[test]
    fn poll() {
        let hw = sim();
        let adc = Adc::new(&hw);
        let ch = adc.setup(gpio('C', 3));
        assert_eq!(adc.poll(ch), Err(nb::Error::WouldBlock));
        assert_eq!(nb::block!(adc.poll(ch)), Ok(sample_value(0, 13)));
    }

    #[test]
    fn invalid_pin() {
        let hw = sim();
        let adc = Adc::new(&hw);
        assert_eq!(adc.try_setup(gpio('D', 2)), Err(Error::InvalidPin(gpio('D', 2))));
        assert!(!hw.wrote_anything());
    }

    #[test]
    #[should_panic(expected = "not a valid ADC pin")]
    fn invalid_pin_is_fatal() {
        let hw = sim();
        Adc::new(&hw).setup(gpio('B', 5));
    }
}
