//! The RP2040 ADC.
//!
//! One converter with a single result register and no record of which channel
//! a finished result belongs to once AINSEL has been rewritten, so the driver
//! keeps the channel of the conversion it started. There is one converter per
//! chip, so that record is a single static shared by every `Adc` handle.

use core::sync::atomic::{AtomicU8, Ordering};

use super::clock::{Resets, ADC};
use super::{gpio, RpReg, CLOCK_FREQ};
use crate::adc::{self, adc_pins, AdcPin};
use crate::time::ticks_from_us;
use crate::{AnalogIn, AnalogPin, Channel, ClockTree, Error, Gpio, Hardware};

// `rp_pac::ADC`: `cs()` with the fields of `adc::regs::Cs`, and `result()`
const CS: u32 = 0x00;
const RESULT: u32 = 0x04;

const CS_EN: u32 = 1 << 0;
const CS_TS_EN: u32 = 1 << 1;
const CS_START_ONCE: u32 = 1 << 2;
const CS_READY: u32 = 1 << 8;
const CS_AINSEL_POS: u32 = 12;

const NO_OWNER: u8 = 0xff;

/// Channel of the conversion in flight or waiting to be read.
static OWNER: AtomicU8 = AtomicU8::new(NO_OWNER);

const PINS: &[AdcPin] = adc_pins! {
    ADC => [
        AnalogPin::Gpio(Gpio(26)) => 0,
        AnalogPin::Gpio(Gpio(27)) => 1,
        AnalogPin::Gpio(Gpio(28)) => 2,
        AnalogPin::Gpio(Gpio(29)) => 3,
        AnalogPin::Temperature => 4,
    ],
};

pub struct Adc<H> {
    hw: H,
}

impl<H: Hardware> Adc<H> {
    pub const fn new(hw: H) -> Self {
        Adc { hw }
    }

    fn bring_up(&self) {
        // Out of reset nothing is converting
        OWNER.store(NO_OWNER, Ordering::Relaxed);
        Resets::enable(&self.hw, ADC);
        self.hw.write(ADC.reg(CS), CS_EN);
        while self.hw.read(ADC.reg(CS)) & CS_READY == 0 {}
        info!("adc {=u32:#x} ready", ADC.0);
    }
}

impl<H: Hardware> AnalogIn for Adc<H> {
    type Channel = Channel;

    const BACKOFF: u32 = ticks_from_us(CLOCK_FREQ, 10);

    fn try_setup(&self, pin: AnalogPin) -> Result<Channel, Error> {
        let p = adc::lookup(PINS, pin)?;
        if !Resets::is_enabled(&self.hw, p.adc) {
            self.bring_up();
        }
        match pin {
            AnalogPin::Temperature => self.hw.write_set(p.adc.reg(CS), CS_TS_EN),
            AnalogPin::Gpio(g) => gpio::set_analog(&self.hw, g),
        }
        trace!("adc {} on {=u32:#x} chan {=u8}", pin, p.adc.0, p.chan);
        Ok(Channel { adc: p.adc, chan: p.chan })
    }

    fn advance(&self, ch: Channel) -> u32 {
        let hw = &self.hw;
        let cs = hw.read(ch.adc.reg(CS));
        if cs & CS_READY == 0 {
            return Self::BACKOFF;
        }
        let held = critical_section::with(|_| match OWNER.load(Ordering::Relaxed) {
            NO_OWNER => {
                OWNER.store(ch.chan, Ordering::Relaxed);
                None
            }
            o => Some(o),
        });
        match held {
            Some(o) if o == ch.chan => 0,
            None => {
                let ainsel = (ch.chan as u32) << CS_AINSEL_POS;
                let start = (cs & CS_TS_EN) | CS_EN | CS_START_ONCE | ainsel;
                hw.write(ch.adc.reg(CS), start);
                Self::BACKOFF
            }
            Some(_) => Self::BACKOFF,
        }
    }

    fn read(&self, ch: Channel) -> u16 {
        let v = self.hw.read(ch.adc.reg(RESULT)) as u16;
        OWNER.store(NO_OWNER, Ordering::Relaxed);
        v
    }

    fn cancel(&self, ch: Channel) {
        critical_section::with(|_| {
            if OWNER.load(Ordering::Relaxed) == ch.chan {
                // A conversion still running just finishes unclaimed
                OWNER.store(NO_OWNER, Ordering::Relaxed);
            }
        })
    }
}
