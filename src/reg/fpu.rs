//! The x87 register stack.

use crate::error::{Error, Result};
use crate::reg::layout::FPU_LAYOUT;
use log::trace;

/// Tag word value for an empty physical register.
const TAG_EMPTY: u128 = 0b11;

/// Control word after `finit`.
const CONTROL_DEFAULT: u128 = 0x037F;

static SLOTS: [&str; 8] = ["st0", "st1", "st2", "st3", "st4", "st5", "st6", "st7"];

/// Model of the x87 floating point unit.
///
/// Eight physical registers are addressed relative to the `top` field of the
/// status word, so `st0` is whichever physical register `top` points at.
/// Pushing and popping move `top`; data never moves between physical
/// registers. Values are kept as `f64`.
#[derive(Clone, Debug)]
pub struct Fpu {
    data: [f64; 8],

    /// Status, control and tag words, as laid out by `FPU_LAYOUT`.
    words: [u128; 3],
}

impl Default for Fpu {
    fn default() -> Self {
        Fpu {
            data: [0.0; 8],
            words: [0, CONTROL_DEFAULT, 0xFFFF],
        }
    }
}

impl Fpu {
    pub const INFINITY: f64 = f64::INFINITY;

    /// Given a stack register name (`st`, `st0` ... `st7`, or the
    /// disassembler's `st(1)` spelling), produce its position relative to
    /// the top of stack.
    pub fn slot_index(name: &str) -> Option<usize> {
        if name == "st" {
            return Some(0);
        }

        if let Some(inner) = name.strip_prefix("st(").and_then(|n| n.strip_suffix(')')) {
            return inner.parse().ok().filter(|i| *i < 8);
        }

        SLOTS.iter().position(|s| *s == name)
    }

    /// List every FPU register name.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = vec!["st"];
        names.extend(SLOTS.iter());
        names.extend(FPU_LAYOUT.names().iter());
        names
    }

    pub fn top(&self) -> usize {
        self.get_word("top") as usize
    }

    fn physical(&self, index: usize) -> usize {
        (self.top() + index) % 8
    }

    fn get_word(&self, name: &str) -> u128 {
        FPU_LAYOUT.get(name).map(|d| d.read(&self.words)).unwrap_or(0)
    }

    fn set_word(&mut self, name: &str, value: u128) {
        if let Some(def) = FPU_LAYOUT.get(name) {
            def.write(&mut self.words, value);
        }
    }

    fn tag_name(physical: usize) -> String {
        format!("tag{}", physical)
    }

    fn is_empty(&self, physical: usize) -> bool {
        self.get_word(&Self::tag_name(physical)) == TAG_EMPTY
    }

    /// Store a value in a physical register and tag it accordingly.
    fn load(&mut self, physical: usize, value: f64) {
        let tag = if value == 0.0 {
            0b01
        } else if value.is_finite() {
            0b00
        } else {
            0b10
        };

        self.data[physical] = value;
        self.set_word(&Self::tag_name(physical), tag);
    }

    /// Read a status, control or tag word field.
    pub fn get(&self, name: &str) -> Result<u64> {
        FPU_LAYOUT
            .get(name)
            .map(|d| d.read(&self.words) as u64)
            .ok_or_else(|| Error::UnknownRegister(name.to_string()))
    }

    /// Write a status, control or tag word field, truncating `value`.
    pub fn set(&mut self, name: &str, value: u64) -> Result<()> {
        let def = FPU_LAYOUT
            .get(name)
            .ok_or_else(|| Error::UnknownRegister(name.to_string()))?;

        def.write(&mut self.words, value as u128);
        Ok(())
    }

    /// Read a stack register, or `None` if it is empty.
    pub fn st(&self, index: usize) -> Option<f64> {
        let physical = self.physical(index % 8);

        if self.is_empty(physical) {
            None
        } else {
            Some(self.data[physical])
        }
    }

    /// Overwrite a stack register in place without moving `top`.
    pub fn set_st(&mut self, index: usize, value: f64) {
        let physical = self.physical(index % 8);
        self.load(physical, value);
    }

    /// Read a stack register by name.
    pub fn get_float(&self, name: &str) -> Result<Option<f64>> {
        Self::slot_index(name)
            .map(|i| self.st(i))
            .ok_or_else(|| Error::UnknownRegister(name.to_string()))
    }

    pub fn set_float(&mut self, name: &str, value: f64) -> Result<()> {
        let index = Self::slot_index(name).ok_or_else(|| Error::UnknownRegister(name.to_string()))?;

        self.set_st(index, value);
        Ok(())
    }

    /// Push a value onto the register stack.
    ///
    /// Pushing onto an occupied register is a stack overflow: `i`, `sf` and
    /// `c1` are raised and the register is overwritten anyway.
    pub fn push(&mut self, value: f64) {
        let top = (self.top() + 7) % 8;
        self.set_word("top", top as u128);

        if !self.is_empty(top) {
            trace!("x87 stack overflow pushing {}", value);
            self.set_word("i", 1);
            self.set_word("sf", 1);
            self.set_word("c1", 1);
        }

        self.load(top, value);
    }

    /// Pop the top of the register stack.
    ///
    /// Popping an empty register is a stack underflow: `i` and `sf` are
    /// raised, `c1` is cleared and the result is NaN.
    pub fn pop(&mut self) -> f64 {
        let top = self.top();

        let value = if self.is_empty(top) {
            trace!("x87 stack underflow");
            self.set_word("i", 1);
            self.set_word("sf", 1);
            self.set_word("c1", 0);
            f64::NAN
        } else {
            self.data[top]
        };

        self.set_word(&Self::tag_name(top), TAG_EMPTY);
        self.set_word("top", ((top + 1) % 8) as u128);

        value
    }
}
