//! The narrow interface functrace consumes from an external disassembler.
//!
//! Instruction decoding, operand rendering, type inference and
//! cross-reference discovery are all the host's job. The emulator only ever
//! asks questions through the `Host` trait, so any disassembler that can
//! answer them (or an export of its database, see `StaticHost`) can drive
//! emulation.

mod fixture;
mod types;

pub use fixture::StaticHost;
pub use types::*;

use crate::arch::ArchName;

/// A read-only view of a disassembled program.
pub trait Host: Send + Sync {
    /// The architecture of the program under analysis.
    fn arch(&self) -> ArchName;

    /// Decode the instruction at a given address.
    ///
    /// Yields `None` if the address is not the start of an instruction.
    fn decode(&self, address: u64) -> Option<Instruction>;

    /// List every loaded segment, with initial contents where known.
    fn segments(&self) -> Vec<Segment>;

    /// Find the function that contains a given address.
    fn function_at(&self, address: u64) -> Option<FunctionInfo>;

    /// List the basic blocks of the function starting at `entry`.
    ///
    /// Successor and predecessor lists are consumed in the order the host
    /// gives them; traversal order depends on it.
    fn function_blocks(&self, entry: u64) -> Vec<BlockInfo>;

    /// The declared prototype of the function at `entry`, if any.
    fn prototype(&self, entry: u64) -> Option<Prototype>;

    /// The human-readable name of a location.
    fn name_at(&self, address: u64) -> Option<String>;

    /// The size of the item (data or code) named at a location.
    fn symbol_size(&self, address: u64) -> Option<usize>;

    /// List every call instruction that targets the function at `entry`.
    fn calls_to(&self, entry: u64) -> Vec<u64>;

    /// Determine if an address is the entry point of a known function.
    fn is_function_start(&self, address: u64) -> bool {
        self.function_at(address)
            .map(|f| f.entry == address)
            .unwrap_or(false)
    }
}
