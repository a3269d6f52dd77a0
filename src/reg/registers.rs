//! The register file of an emulated processor.

use crate::arch::ArchName;
use crate::error::{Error, Result};
use crate::reg::layout::{layout, Layout, RegDef};
use crate::reg::Fpu;

/// All architectural registers of one emulated processor.
///
/// Registers are addressed by name. Names are resolved through the
/// architecture's `Layout`, so writing `al` is immediately visible through
/// `ax`, `eax` and (on x86_64) `rax`. Names the layout does not know are
/// tried against the FPU.
#[derive(Clone, Debug)]
pub struct Registers {
    arch: ArchName,
    layout: &'static Layout,
    stores: Vec<u128>,
    pub fpu: Fpu,
}

impl Registers {
    pub fn new(arch: ArchName) -> Self {
        let layout = layout(arch);

        Registers {
            arch,
            layout,
            stores: vec![0; layout.stores()],
            fpu: Fpu::default(),
        }
    }

    /// Construct the register file for a named architecture.
    pub fn from_arch(name: &str) -> Result<Self> {
        Ok(Self::new(ArchName::resolve(name)?))
    }

    pub fn arch(&self) -> ArchName {
        self.arch
    }

    fn def(&self, name: &str) -> Option<RegDef> {
        self.layout.get(name)
    }

    /// Determine if a name refers to any register, integer or FPU.
    pub fn contains(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();

        self.def(&name).is_some() || Fpu::slot_index(&name).is_some() || self.fpu.get(&name).is_ok()
    }

    /// The width of a register in bytes.
    pub fn width(&self, name: &str) -> Option<usize> {
        let name = name.to_ascii_lowercase();

        match self.def(&name) {
            Some(def) => Some(def.width()),
            None if Fpu::slot_index(&name).is_some() => Some(8),
            None => None,
        }
    }

    /// Read an integer register.
    ///
    /// Registers wider than 64 bits are truncated; use `get_u128` for those.
    /// FPU stack registers hold floats and must be read with `get_float`.
    pub fn get(&self, name: &str) -> Result<u64> {
        self.get_u128(name).map(|v| v as u64)
    }

    pub fn get_u128(&self, name: &str) -> Result<u128> {
        let name = name.to_ascii_lowercase();

        if let Some(def) = self.def(&name) {
            return Ok(def.read(&self.stores));
        }

        if Fpu::slot_index(&name).is_some() {
            return Err(Error::FloatRegister(name));
        }

        self.fpu.get(&name).map(u128::from)
    }

    /// Write an integer register, truncating `value` to its width.
    pub fn set(&mut self, name: &str, value: u64) -> Result<()> {
        self.set_u128(name, value as u128)
    }

    pub fn set_u128(&mut self, name: &str, value: u128) -> Result<()> {
        let name = name.to_ascii_lowercase();

        if let Some(def) = self.def(&name) {
            def.write(&mut self.stores, value);
            return Ok(());
        }

        if Fpu::slot_index(&name).is_some() {
            return Err(Error::FloatRegister(name));
        }

        self.fpu.set(&name, value as u64)
    }

    /// Read an FPU stack register; `None` if the slot is empty.
    pub fn get_float(&self, name: &str) -> Result<Option<f64>> {
        self.fpu.get_float(&name.to_ascii_lowercase())
    }

    pub fn set_float(&mut self, name: &str, value: f64) -> Result<()> {
        self.fpu.set_float(&name.to_ascii_lowercase(), value)
    }

    /// List every register name, FPU names included.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = self.layout.names().to_vec();

        for name in self.fpu.names() {
            if self.layout.get(name).is_none() {
                names.push(name);
            }
        }

        names
    }

    pub fn ip(&self) -> u64 {
        self.get(self.arch.ip()).unwrap_or(0)
    }

    pub fn set_ip(&mut self, value: u64) {
        let name = self.arch.ip();
        if let Some(def) = self.def(name) {
            def.write(&mut self.stores, value as u128);
        }
    }

    pub fn sp(&self) -> u64 {
        self.get(self.arch.sp()).unwrap_or(0)
    }

    pub fn set_sp(&mut self, value: u64) {
        let name = self.arch.sp();
        if let Some(def) = self.def(name) {
            def.write(&mut self.stores, value as u128);
        }
    }

    /// Read a single EFLAGS bit.
    pub fn flag(&self, name: &str) -> bool {
        self.def(name)
            .map(|d| d.read(&self.stores) != 0)
            .unwrap_or(false)
    }

    pub fn set_flag(&mut self, name: &str, value: bool) {
        if let Some(def) = self.def(name) {
            def.write(&mut self.stores, value as u128);
        }
    }
}
