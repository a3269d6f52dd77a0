//! A sparse model of the emulated address space.

mod heap;
mod paged;
mod segment;

pub use heap::Heap;
pub use paged::Memory;
pub use segment::Segment;

/// Granularity at which emulated memory is materialised.
pub const PAGE_SIZE: u64 = 0x1000;

/// Where the heap starts if nothing else is configured.
pub const DEFAULT_HEAP_BASE: u64 = 0x0200_0000;

/// Padding left after each heap allocation.
pub const DEFAULT_HEAP_SLACK: u64 = 0x100;

/// Largest single copy or fill a runtime function may perform.
pub const DEFAULT_MAX_TRANSFER: u64 = 0x10_0000;

/// Given an address, produce the base of the page containing it.
pub fn page_base(address: u64) -> u64 {
    address & !(PAGE_SIZE - 1)
}

#[cfg(test)]
mod tests;
