//! Simulated register file for host tests.
//!
//! A [`Sim`] stores register values in a map, logs every access, and hands
//! reads and writes to a [`Model`] that emulates the side effects of the
//! peripheral behind them (self-clearing calibration bits, conversion latency,
//! write-1-to-clear flags and so on).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::vec::Vec;

use crate::Hardware;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Read(u32, u32),
    Write(u32, u32),
}

impl Access {
    pub fn is_write_to(&self, addr: u32) -> bool {
        matches!(*self, Access::Write(a, _) if a == addr)
    }

    pub fn is_read_of(&self, addr: u32) -> bool {
        matches!(*self, Access::Read(a, _) if a == addr)
    }
}

#[derive(Default)]
pub struct Regs(BTreeMap<u32, u32>);

impl Regs {
    pub fn get(&self, addr: u32) -> u32 {
        self.0.get(&addr).copied().unwrap_or(0)
    }

    pub fn set(&mut self, addr: u32, value: u32) {
        self.0.insert(addr, value);
    }

    pub fn set_bits(&mut self, addr: u32, mask: u32) {
        let v = self.get(addr);
        self.set(addr, v | mask);
    }

    pub fn clear_bits(&mut self, addr: u32, mask: u32) {
        let v = self.get(addr);
        self.set(addr, v & !mask);
    }
}

/// Side effects of the simulated peripherals.
pub trait Model {
    fn read(&mut self, regs: &mut Regs, addr: u32) -> u32 {
        regs.get(addr)
    }

    fn write(&mut self, regs: &mut Regs, addr: u32, value: u32) {
        regs.set(addr, value)
    }
}

/// Plain memory.
pub struct Memory;

impl Model for Memory {}

struct State<M> {
    regs: Regs,
    model: M,
    log: Vec<Access>,
    elapsed_us: u64,
}

pub struct Sim<M> {
    state: RefCell<State<M>>,
}

impl<M: Model> Sim<M> {
    pub fn new(model: M) -> Self {
        Sim {
            state: RefCell::new(State {
                regs: Regs::default(),
                model,
                log: Vec::new(),
                elapsed_us: 0,
            }),
        }
    }

    /// Read a register without side effects or logging.
    pub fn peek(&self, addr: u32) -> u32 {
        self.state.borrow().regs.get(addr)
    }

    /// Write a register without side effects or logging.
    pub fn poke(&self, addr: u32, value: u32) {
        self.state.borrow_mut().regs.set(addr, value)
    }

    pub fn log(&self) -> Vec<Access> {
        self.state.borrow().log.clone()
    }

    pub fn clear_log(&self) {
        self.state.borrow_mut().log.clear()
    }

    /// Values written to `addr`, in order.
    pub fn writes_to(&self, addr: u32) -> Vec<u32> {
        self.state
            .borrow()
            .log
            .iter()
            .filter_map(|a| match *a {
                Access::Write(a, v) if a == addr => Some(v),
                _ => None,
            })
            .collect()
    }

    /// Whether any register was written since the log was last cleared.
    pub fn wrote_anything(&self) -> bool {
        self.state.borrow().log.iter().any(|a| matches!(a, Access::Write(..)))
    }

    pub fn elapsed_us(&self) -> u64 {
        self.state.borrow().elapsed_us
    }

    pub fn model<R>(&self, f: impl FnOnce(&mut M) -> R) -> R {
        f(&mut self.state.borrow_mut().model)
    }
}

impl<M: Model> Hardware for Sim<M> {
    fn read(&self, addr: u32) -> u32 {
        let s = &mut *self.state.borrow_mut();
        let v = s.model.read(&mut s.regs, addr);
        s.log.push(Access::Read(addr, v));
        v
    }

    fn write(&self, addr: u32, value: u32) {
        let s = &mut *self.state.borrow_mut();
        s.log.push(Access::Write(addr, value));
        s.model.write(&mut s.regs, addr, value);
    }

    fn delay_us(&self, us: u32) {
        self.state.borrow_mut().elapsed_us += us as u64;
    }
}

/// Value the simulated converters produce for the `n`th conversion of `chan`.
pub fn sample_value(n: u32, chan: u32) -> u16 {
    (((n & 0xf) << 8) | (chan & 0xff)) as u16
}

/// Converter with a status register whose start flag latches until software
/// clears it (STM32F1/F4 and N32G45x style).
pub struct SrAdc {
    pub base: u32,
    pub sr: u32,
    pub cr2: u32,
    pub sqr3: u32,
    pub dr: u32,
    pub eoc: u32,
    pub strt: u32,
    pub swstart: u32,
    /// Bits in CR2 that self-clear once calibration finishes.
    pub cal: u32,
    /// Power-on bit in CR2 and the ready flag it raises at `(offset, bit)`.
    pub ready: Option<(u32, u32, u32)>,
    pub latency: u32,
    pending: u32,
    cal_pending: u32,
    pub conversions: u32,
}

impl SrAdc {
    pub fn new(base: u32, swstart: u32, cal: u32) -> SrAdc {
        SrAdc {
            base,
            sr: 0x00,
            cr2: 0x08,
            sqr3: 0x34,
            dr: 0x4c,
            eoc: 1 << 1,
            strt: 1 << 4,
            swstart,
            cal,
            ready: None,
            latency: 2,
            pending: 0,
            cal_pending: 0,
            conversions: 0,
        }
    }

    fn read(&mut self, regs: &mut Regs, off: u32) -> u32 {
        let b = self.base;
        if off == self.cr2 && self.cal_pending > 0 {
            self.cal_pending -= 1;
            if self.cal_pending == 0 {
                regs.clear_bits(b + self.cr2, self.cal);
            }
        } else if off == self.sr && self.pending > 0 {
            self.pending -= 1;
            if self.pending == 0 {
                let chan = regs.get(b + self.sqr3) & 0x1f;
                regs.set(b + self.dr, sample_value(self.conversions, chan) as u32);
                regs.set_bits(b + self.sr, self.eoc);
                self.conversions += 1;
            }
        } else if off == self.dr {
            regs.clear_bits(b + self.sr, self.eoc);
        }
        regs.get(b + off)
    }

    fn write(&mut self, regs: &mut Regs, off: u32, value: u32) {
        let b = self.base;
        if off == self.sr {
            // rc_w0
            let v = regs.get(b + off);
            regs.set(b + off, v & value);
        } else if off == self.cr2 {
            regs.set(b + off, value & !self.swstart);
            if value & self.cal != 0 {
                self.cal_pending = 3;
            }
            if let Some((on, reg, rdy)) = self.ready {
                if value & on != 0 {
                    regs.set_bits(b + reg, rdy);
                }
            }
            if value & self.swstart != 0 {
                regs.set_bits(b + self.sr, self.strt);
                self.pending = self.latency;
            }
        } else {
            regs.set(b + off, value);
        }
    }
}

/// How a [`CrAdc`] selects the channel to convert.
pub enum Select {
    /// One-hot channel mask register at this offset.
    Mask(u32),
    /// First regular sequence rank field at (offset, shift).
    Rank(u32, u32),
}

/// Converter controlled through CR start/calibrate bits with write-1-to-clear
/// interrupt status flags (STM32F0/G0/H7 style).
pub struct CrAdc {
    pub base: u32,
    pub select: Select,
    pub dr: u32,
    pub ldordy: Option<u32>,
    pub latency: u32,
    pending: u32,
    cal_pending: u32,
    pub conversions: u32,
}

pub const CR_ISR: u32 = 0x00;
pub const CR_CR: u32 = 0x08;
pub const CR_ADRDY: u32 = 1 << 0;
pub const CR_EOC: u32 = 1 << 2;
pub const CR_EOS: u32 = 1 << 3;
pub const CR_ADEN: u32 = 1 << 0;
pub const CR_ADSTART: u32 = 1 << 2;
pub const CR_ADSTP: u32 = 1 << 4;
pub const CR_ADVREGEN: u32 = 1 << 28;
pub const CR_ADCAL: u32 = 1 << 31;

impl CrAdc {
    pub fn new(base: u32, select: Select, dr: u32) -> CrAdc {
        CrAdc {
            base,
            select,
            dr,
            ldordy: None,
            latency: 2,
            pending: 0,
            cal_pending: 0,
            conversions: 0,
        }
    }

    fn channel(&self, regs: &Regs) -> u32 {
        match self.select {
            Select::Mask(off) => regs.get(self.base + off).trailing_zeros(),
            Select::Rank(off, shift) => (regs.get(self.base + off) >> shift) & 0x1f,
        }
    }

    fn tick(&mut self, regs: &mut Regs) {
        let b = self.base;
        if self.cal_pending > 0 {
            self.cal_pending -= 1;
            if self.cal_pending == 0 {
                regs.clear_bits(b + CR_CR, CR_ADCAL);
            }
        }
        if self.pending > 0 {
            self.pending -= 1;
            if self.pending == 0 {
                let chan = self.channel(regs);
                regs.set(b + self.dr, sample_value(self.conversions, chan) as u32);
                regs.set_bits(b + CR_ISR, CR_EOC | CR_EOS);
                regs.clear_bits(b + CR_CR, CR_ADSTART);
                self.conversions += 1;
            }
        }
    }

    fn read(&mut self, regs: &mut Regs, off: u32) -> u32 {
        let b = self.base;
        if off == CR_ISR || off == CR_CR {
            self.tick(regs);
        } else if off == self.dr {
            regs.clear_bits(b + CR_ISR, CR_EOC);
        }
        regs.get(b + off)
    }

    fn write(&mut self, regs: &mut Regs, off: u32, value: u32) {
        let b = self.base;
        if off == CR_ISR {
            regs.clear_bits(b + off, value);
            return;
        }
        if off == CR_CR {
            let old = regs.get(b + off);
            if value & CR_ADSTP != 0 {
                // Stop completes at once and discards the conversion
                self.pending = 0;
                regs.set(b + off, (old | value) & !(CR_ADSTART | CR_ADSTP));
                return;
            }
            if value & CR_ADCAL != 0 && old & CR_ADCAL == 0 {
                self.cal_pending = 3;
            }
            if value & CR_ADEN != 0 && old & CR_ADEN == 0 {
                regs.set_bits(b + CR_ISR, CR_ADRDY);
            }
            if value & CR_ADVREGEN != 0 {
                if let Some(ldordy) = self.ldordy {
                    regs.set_bits(b + CR_ISR, ldordy);
                }
            }
            if value & CR_ADSTART != 0 && old & CR_ADSTART == 0 {
                self.pending = self.latency;
            }
        }
        regs.set(b + off, value);
    }
}

/// A set of simulated converters; every other address is plain memory.
pub struct Converters<A> {
    pub adcs: Vec<A>,
}

impl<A> Converters<A> {
    pub fn new(adcs: Vec<A>) -> Self {
        Converters { adcs }
    }
}

pub trait Block {
    fn base(&self) -> u32;
    fn read_reg(&mut self, regs: &mut Regs, off: u32) -> u32;
    fn write_reg(&mut self, regs: &mut Regs, off: u32, value: u32);
}

impl Block for SrAdc {
    fn base(&self) -> u32 {
        self.base
    }

    fn read_reg(&mut self, regs: &mut Regs, off: u32) -> u32 {
        self.read(regs, off)
    }

    fn write_reg(&mut self, regs: &mut Regs, off: u32, value: u32) {
        self.write(regs, off, value)
    }
}

impl Block for CrAdc {
    fn base(&self) -> u32 {
        self.base
    }

    fn read_reg(&mut self, regs: &mut Regs, off: u32) -> u32 {
        self.read(regs, off)
    }

    fn write_reg(&mut self, regs: &mut Regs, off: u32, value: u32) {
        self.write(regs, off, value)
    }
}

// Converter register blocks are all smaller than 0x100 bytes
const BLOCK_SPAN: u32 = 0x100;

impl<A: Block> Model for Converters<A> {
    fn read(&mut self, regs: &mut Regs, addr: u32) -> u32 {
        for adc in &mut self.adcs {
            if addr >= adc.base() && addr < adc.base() + BLOCK_SPAN {
                let off = addr - adc.base();
                return adc.read_reg(regs, off);
            }
        }
        regs.get(addr)
    }

    fn write(&mut self, regs: &mut Regs, addr: u32, value: u32) {
        for adc in &mut self.adcs {
            if addr >= adc.base() && addr < adc.base() + BLOCK_SPAN {
                let off = addr - adc.base();
                return adc.write_reg(regs, off, value);
            }
        }
        regs.set(addr, value)
    }
}

pub const RP_RESETS: u32 = 0x4000_c000;
pub const RP_RESET_DONE: u32 = RP_RESETS + 0x08;
pub const RP_ADC_CS: u32 = 0x4004_c000;
pub const RP_ADC_RESULT: u32 = 0x4004_c004;
const RP_CS_EN: u32 = 1 << 0;
const RP_CS_START_ONCE: u32 = 1 << 2;
const RP_CS_READY: u32 = 1 << 8;
const RP_ALL_RESETS: u32 = 0x01ff_ffff;

/// RP2040 peripheral bus: atomic XOR/SET/CLR aliases, the RESETS block
/// (everything held in reset at power on) and the ADC.
pub struct RpBus {
    pub reset: u32,
    pub latency: u32,
    pending: u32,
    pub conversions: u32,
}

impl RpBus {
    pub fn new() -> RpBus {
        RpBus { reset: RP_ALL_RESETS, latency: 2, pending: 0, conversions: 0 }
    }

    fn store(&mut self, regs: &mut Regs, addr: u32, value: u32) {
        match addr {
            RP_RESETS => self.reset = value & RP_ALL_RESETS,
            RP_ADC_CS => {
                let mut cs = value & !(RP_CS_START_ONCE | RP_CS_READY);
                if value & RP_CS_EN != 0 {
                    if value & RP_CS_START_ONCE != 0 {
                        self.pending = self.latency;
                    }
                    if self.pending == 0 {
                        cs |= RP_CS_READY;
                    }
                }
                regs.set(addr, cs);
            }
            _ => regs.set(addr, value),
        }
    }

    fn load(&mut self, regs: &mut Regs, addr: u32) -> u32 {
        match addr {
            RP_RESETS => self.reset,
            RP_RESET_DONE => !self.reset & RP_ALL_RESETS,
            RP_ADC_CS => {
                if self.pending > 0 {
                    self.pending -= 1;
                    if self.pending == 0 {
                        let chan = (regs.get(addr) >> 12) & 0x7;
                        regs.set(RP_ADC_RESULT, sample_value(self.conversions, chan) as u32);
                        regs.set_bits(addr, RP_CS_READY);
                        self.conversions += 1;
                    }
                }
                regs.get(addr)
            }
            _ => regs.get(addr),
        }
    }
}

impl Model for RpBus {
    fn read(&mut self, regs: &mut Regs, addr: u32) -> u32 {
        self.load(regs, addr)
    }

    fn write(&mut self, regs: &mut Regs, addr: u32, value: u32) {
        if !(0x4000_0000..0x6000_0000).contains(&addr) {
            return regs.set(addr, value);
        }
        let base = addr & !0x3000;
        let old = if base == RP_RESETS { self.reset } else { regs.get(base) };
        let new = match (addr >> 12) & 0x3 {
            0 => value,
            1 => old ^ value,
            2 => old | value,
            _ => old & !value,
        };
        self.store(regs, base, new)
    }
}
