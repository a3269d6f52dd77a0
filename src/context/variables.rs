//! Named memory locations observed during emulation.

use crate::memory::Memory;
use std::collections::BTreeMap;

/// A named, address-keyed value slot: a stack argument, a local, or a global
/// symbol referenced by an executed instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub address: u64,
    pub size: usize,

    /// Contents the variable held before each write to it, oldest first.
    pub history: Vec<Vec<u8>>,
}

impl Variable {
    /// The variable's current contents.
    pub fn data(&self, memory: &Memory) -> Vec<u8> {
        memory.read(self.address, self.size)
    }

    fn overlaps(&self, address: u64, len: usize) -> bool {
        let end = address.saturating_add(len as u64);
        let var_end = self.address.saturating_add(self.size as u64);

        address < var_end && self.address < end
    }
}

/// Every variable a processor context knows about.
#[derive(Clone, Debug, Default)]
pub struct VariableMap {
    vars: BTreeMap<u64, Variable>,
}

impl VariableMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// List every variable name, in address order.
    pub fn names(&self) -> Vec<&str> {
        self.vars.values().map(|v| v.name.as_str()).collect()
    }

    pub fn get(&self, address: u64) -> Option<&Variable> {
        self.vars.get(&address)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Variable> {
        self.vars.values().find(|v| v.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.vars.values()
    }

    pub fn contains(&self, address: u64) -> bool {
        self.vars.contains_key(&address)
    }

    /// Register a variable, unless one is already known at `address`.
    pub fn add(&mut self, address: u64, name: &str, size: usize) {
        self.vars.entry(address).or_insert_with(|| Variable {
            name: name.to_string(),
            address,
            size: size.max(1),
            history: Vec::new(),
        });
    }

    /// Note that `[address, address + len)` is about to be overwritten.
    ///
    /// Every variable overlapping the range has its current contents pushed
    /// onto its history.
    pub fn record_write(&mut self, memory: &Memory, address: u64, len: usize) {
        for var in self.vars.values_mut() {
            if var.overlaps(address, len) {
                let old = memory.read(var.address, var.size);
                var.history.push(old);
            }
        }
    }
}
