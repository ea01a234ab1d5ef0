//! The single-block converter of the STM32F0 and STM32G0.
//!
//! Both parts calibrate and start conversions through bits in ADC_CR, select
//! channels with a one-hot CHSELR mask and report completion through
//! write-1-to-clear flags in ADC_ISR. The G0 additionally has an internal
//! voltage regulator that has to be powered and settle before calibration.

use core::marker::PhantomData;

use crate::adc::{self, AdcPin};
use crate::stm32::gpio::Ports;
use crate::time::{prescaler, ticks_from_us};
use crate::{AnalogIn, AnalogPin, Channel, ClockTree, Error, Hardware, Peripheral};

/// Per-part parameters of a [`CrAdc`].
pub trait Family {
    type Clocks: ClockTree;
    const CLOCK_FREQ: u32;
    /// Bus clock feeding the converter, as `Clocks::pclock_freq` reports it.
    const APB_FREQ: u32;
    /// Highest converter clock the part accepts, in Hz.
    const MAX_ADC_FREQ: u32;
    /// Whether ADVREGEN has to be set before calibrating.
    const REGULATOR: bool;
    const PORTS: Ports<Self::Clocks>;
    const PINS: &'static [AdcPin];
}

pub(crate) const ISR: u32 = 0x00;
pub(crate) const CR: u32 = 0x08;
pub(crate) const CFGR2: u32 = 0x10;
pub(crate) const SMPR: u32 = 0x14;
pub(crate) const CHSELR: u32 = 0x28;
pub(crate) const DR: u32 = 0x40;

pub(crate) const ISR_ADRDY: u32 = 1 << 0;
pub(crate) const ISR_EOC: u32 = 1 << 2;
pub(crate) const ISR_EOSEQ: u32 = 1 << 3;

pub(crate) const CR_ADEN: u32 = 1 << 0;
pub(crate) const CR_ADSTART: u32 = 1 << 2;
pub(crate) const CR_ADSTP: u32 = 1 << 4;
pub(crate) const CR_ADVREGEN: u32 = 1 << 28;
pub(crate) const CR_ADCAL: u32 = 1 << 31;

const CFGR2_CKMODE_POS: u32 = 30;
// Synchronous PCLK/2 and PCLK/4, CKMODE codes 1 and 2
pub(crate) const CKMODE_DIVS: [u32; 2] = [2, 4];

pub(crate) const ADC_CCR: u32 = 0x4001_2708;
pub(crate) const CCR_TSEN: u32 = 1 << 23;

const SAMPLE_TIME: u32 = 0b100;
pub(crate) const REGULATOR_SETTLE_US: u32 = 20;

pub struct CrAdc<H, F> {
    hw: H,
    _family: PhantomData<F>,
}

impl<H: Hardware, F: Family> CrAdc<H, F> {
    const CKMODE: u32 = prescaler(F::APB_FREQ, F::MAX_ADC_FREQ, &CKMODE_DIVS) + 1;

    pub const fn new(hw: H) -> Self {
        CrAdc { hw, _family: PhantomData }
    }

    fn bring_up(&self, adc: Peripheral) {
        let hw = &self.hw;
        F::Clocks::enable(hw, adc);

        if F::REGULATOR {
            hw.write(adc.reg(CR), CR_ADVREGEN);
            hw.delay_us(REGULATOR_SETTLE_US);
        }

        hw.write(adc.reg(CFGR2), Self::CKMODE << CFGR2_CKMODE_POS);

        hw.set_bits(adc.reg(CR), CR_ADCAL);
        while hw.read(adc.reg(CR)) & CR_ADCAL != 0 {}

        hw.write(adc.reg(ISR), ISR_ADRDY);
        hw.set_bits(adc.reg(CR), CR_ADEN);
        while hw.read(adc.reg(ISR)) & ISR_ADRDY == 0 {}

        hw.write(adc.reg(SMPR), SAMPLE_TIME);
        info!("adc {=u32:#x} calibrated", adc.0);
    }
}

impl<H: Hardware, F: Family> AnalogIn for CrAdc<H, F> {
    type Channel = Channel;

    const BACKOFF: u32 = ticks_from_us(F::CLOCK_FREQ, 10);

    fn try_setup(&self, pin: AnalogPin) -> Result<Channel, Error> {
        let p = adc::lookup(F::PINS, pin)?;
        if !F::Clocks::is_enabled(&self.hw, p.adc) {
            self.bring_up(p.adc);
        }
        match pin {
            AnalogPin::Temperature => {
                critical_section::with(|_| self.hw.set_bits(ADC_CCR, CCR_TSEN))
            }
            AnalogPin::Gpio(gpio) => F::PORTS.set_analog(&self.hw, gpio),
        }
        trace!("adc {} on {=u32:#x} chan {=u8}", pin, p.adc.0, p.chan);
        Ok(Channel { adc: p.adc, chan: p.chan })
    }

    fn advance(&self, ch: Channel) -> u32 {
        let hw = &self.hw;
        let cr = hw.read(ch.adc.reg(CR));
        if cr & CR_ADSTART != 0 {
            return Self::BACKOFF;
        }
        if hw.read(ch.adc.reg(ISR)) & ISR_EOC != 0 {
            if hw.read(ch.adc.reg(CHSELR)) == 1 << ch.chan {
                return 0;
            }
            return Self::BACKOFF;
        }
        hw.write(ch.adc.reg(CHSELR), 1 << ch.chan);
        hw.write(ch.adc.reg(CR), cr | CR_ADSTART);
        Self::BACKOFF
    }

    fn read(&self, ch: Channel) -> u16 {
        self.hw.write(ch.adc.reg(ISR), ISR_EOC | ISR_EOSEQ);
        self.hw.read(ch.adc.reg(DR)) as u16
    }

    fn cancel(&self, ch: Channel) {
        let hw = &self.hw;
        critical_section::with(|_| {
            if hw.read(ch.adc.reg(CHSELR)) != 1 << ch.chan {
                return;
            }
            let cr = hw.read(ch.adc.reg(CR));
            if cr & CR_ADSTART != 0 {
                // ADSTP discards the conversion, so no result can land later
                hw.write(ch.adc.reg(CR), (cr & CR_ADVREGEN) | CR_ADSTP);
                while hw.read(ch.adc.reg(CR)) & CR_ADSTP != 0 {}
            } else if hw.read(ch.adc.reg(ISR)) & ISR_EOC == 0 {
                return;
            }
            self.read(ch);
        })
    }
}
