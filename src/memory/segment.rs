//! Segment descriptors that seed emulated memory with loaded program data.

use serde::{Deserialize, Serialize};

/// Models a range of memory the program under analysis was loaded into.
///
/// A segment with no `data` is still considered mapped (e.g. `.bss`); it simply
/// reads as zero until written.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub start: u64,
    pub size: u64,

    #[serde(default)]
    pub data: Option<Vec<u8>>,
}

impl Segment {
    pub fn new(name: &str, start: u64, size: u64, data: Option<Vec<u8>>) -> Self {
        Segment {
            name: name.to_string(),
            start,
            size,
            data,
        }
    }

    /// Exclusive end address of the segment.
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.size)
    }

    pub fn contains(&self, address: u64) -> bool {
        self.start <= address && address < self.end()
    }

    /// Copy whatever portion of this segment's initial contents overlaps
    /// `[address, address + buf.len())` into `buf`.
    ///
    /// Bytes of `buf` outside the segment, or past the end of the initial
    /// contents, are left untouched.
    pub fn overlay(&self, address: u64, buf: &mut [u8]) {
        let data = match &self.data {
            Some(data) => data,
            None => return,
        };

        let buf_end = address.saturating_add(buf.len() as u64);
        let data_end = self.start.saturating_add(data.len() as u64).min(self.end());
        let lo = address.max(self.start);
        let hi = buf_end.min(data_end);

        if lo >= hi {
            return;
        }

        let src = (lo - self.start) as usize;
        let dst = (lo - address) as usize;
        let len = (hi - lo) as usize;

        buf[dst..dst + len].copy_from_slice(&data[src..src + len]);
    }
}
