//! Bump allocator for emulated heap memory.

use std::collections::BTreeMap;

/// Bookkeeping for the emulated heap.
///
/// Allocations are handed out in ascending order starting at `base`, each one
/// followed by `slack` bytes of padding. Freed space is never reused, which
/// keeps every address handed out during a run unique.
#[derive(Clone, Debug)]
pub struct Heap {
    base: u64,
    slack: u64,
    next: u64,

    /// Live allocations, keyed by address, valued by size.
    allocations: BTreeMap<u64, u64>,
}

impl Heap {
    pub fn new(base: u64, slack: u64) -> Self {
        Heap {
            base,
            slack,
            next: base,
            allocations: BTreeMap::new(),
        }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn slack(&self) -> u64 {
        self.slack
    }

    /// The size of the live allocation at `address`, if there is one.
    pub fn size_of(&self, address: u64) -> Option<u64> {
        self.allocations.get(&address).cloned()
    }

    /// Exclusive end of the highest live allocation.
    ///
    /// Slack after the last allocation is not included. Yields `None` if
    /// nothing has been allocated.
    pub fn end(&self) -> Option<u64> {
        self.allocations
            .iter()
            .map(|(addr, size)| addr.saturating_add(*size))
            .max()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.allocations.iter().map(|(a, s)| (*a, *s))
    }

    /// Reserve `size` bytes.
    ///
    /// Zero-sized allocations return the next free address without reserving
    /// anything.
    pub fn alloc(&mut self, size: u64) -> u64 {
        let address = self.next;

        if size == 0 {
            return address;
        }

        self.allocations.insert(address, size);
        self.next = address.saturating_add(size).saturating_add(self.slack);

        address
    }

    /// Resize an allocation.
    ///
    /// Returns the (possibly new) address and, if the block moved, the size
    /// of the old block so the caller can carry its contents over.
    pub fn realloc(&mut self, address: u64, new_size: u64) -> (u64, Option<u64>) {
        let old_size = match self.allocations.get(&address) {
            Some(size) => *size,
            None => return (self.alloc(new_size), None),
        };

        let room = self
            .allocations
            .range(address.saturating_add(1)..)
            .next()
            .map(|(following, _)| following - address);

        match room {
            Some(room) if new_size > room => {
                self.allocations.remove(&address);
                let new_address = self.alloc(new_size);
                (new_address, Some(old_size))
            }
            Some(_) => {
                self.allocations.insert(address, new_size);
                (address, None)
            }
            None => {
                //Last block in the heap, so it can always grow in place.
                self.allocations.insert(address, new_size);
                let grown_next = address.saturating_add(new_size).saturating_add(self.slack);
                self.next = self.next.max(grown_next);
                (address, None)
            }
        }
    }

    /// Release an allocation. Returns `false` if nothing lived at `address`.
    pub fn free(&mut self, address: u64) -> bool {
        self.allocations.remove(&address).is_some()
    }
}
