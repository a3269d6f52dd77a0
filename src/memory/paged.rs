//! Paged emulated memory.

use crate::memory::{
    page_base, Heap, Segment, DEFAULT_HEAP_BASE, DEFAULT_HEAP_SLACK, DEFAULT_MAX_TRANSFER, PAGE_SIZE,
};
use log::warn;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// The address space of one emulated processor.
///
/// Pages are only materialised when something writes into them. Until then,
/// reads of a page that overlaps a loaded segment see the segment's initial
/// contents, and reads of anything else see zeroes.
///
/// Cloning a `Memory` copies every materialised page but shares the segment
/// list, so branching a context is proportional to what it has written.
#[derive(Clone, Debug)]
pub struct Memory {
    pages: BTreeMap<u64, Box<[u8]>>,
    segments: Arc<Vec<Segment>>,
    heap: Heap,

    /// Cap on bytes moved by one bulk operation.
    max_transfer: u64,
}

impl Default for Memory {
    fn default() -> Self {
        Memory::new(Vec::new())
    }
}

impl Memory {
    /// Construct memory backed by a list of loaded segments.
    pub fn new(segments: Vec<Segment>) -> Self {
        Memory::with_heap(segments, DEFAULT_HEAP_BASE, DEFAULT_HEAP_SLACK)
    }

    /// Construct memory with an explicit heap layout.
    ///
    /// The heap is moved above the highest loaded segment if `heap_base`
    /// would overlap one.
    pub fn with_heap(segments: Vec<Segment>, heap_base: u64, heap_slack: u64) -> Self {
        let highest = segments.iter().map(|s| s.end()).max().unwrap_or(0);
        let heap_base = if highest > heap_base {
            page_base(highest.saturating_add(PAGE_SIZE - 1))
        } else {
            heap_base
        };

        Memory {
            pages: BTreeMap::new(),
            segments: Arc::new(segments),
            heap: Heap::new(heap_base, heap_slack),
            max_transfer: DEFAULT_MAX_TRANSFER,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_base(&self) -> u64 {
        self.heap.base()
    }

    pub fn heap_slack(&self) -> u64 {
        self.heap.slack()
    }

    pub fn max_transfer(&self) -> u64 {
        self.max_transfer
    }

    pub fn set_max_transfer(&mut self, max_transfer: u64) {
        self.max_transfer = max_transfer;
    }

    /// Clamp the size of a bulk copy or fill to `max_transfer`.
    ///
    /// Sizes usually come from emulated arguments, which may be garbage.
    pub fn bounded(&self, size: u64) -> usize {
        if size > self.max_transfer {
            warn!("Clamping transfer of 0x{:X} bytes to 0x{:X}", size, self.max_transfer);
            return self.max_transfer as usize;
        }

        size as usize
    }

    /// Given a page base, produce the page's contents as they were loaded.
    fn seed_page(&self, base: u64) -> Box<[u8]> {
        let mut page = vec![0; PAGE_SIZE as usize].into_boxed_slice();

        for segment in self.segments.iter() {
            segment.overlay(base, &mut page);
        }

        page
    }

    /// Read `size` bytes starting at `address`.
    ///
    /// Never fails: unmapped memory reads as zero.
    pub fn read(&self, address: u64, size: usize) -> Vec<u8> {
        let mut out = vec![0; size];
        let mut done = 0;

        while done < size {
            let cur = address.wrapping_add(done as u64);
            let base = page_base(cur);
            let offset = (cur - base) as usize;
            let len = (PAGE_SIZE as usize - offset).min(size - done);
            let chunk = &mut out[done..done + len];

            match self.pages.get(&base) {
                Some(page) => chunk.copy_from_slice(&page[offset..offset + len]),
                None => {
                    for segment in self.segments.iter() {
                        segment.overlay(cur, chunk);
                    }
                }
            }

            done += len;
        }

        out
    }

    /// Write `data` starting at `address`, materialising pages as needed.
    pub fn write(&mut self, address: u64, data: &[u8]) {
        let mut done = 0;

        while done < data.len() {
            let cur = address.wrapping_add(done as u64);
            let base = page_base(cur);
            let offset = (cur - base) as usize;
            let len = (PAGE_SIZE as usize - offset).min(data.len() - done);

            if !self.pages.contains_key(&base) {
                let page = self.seed_page(base);
                self.pages.insert(base, page);
            }

            if let Some(page) = self.pages.get_mut(&base) {
                page[offset..offset + len].copy_from_slice(&data[done..done + len]);
            }

            done += len;
        }
    }

    /// Read a little-endian unsigned integer of `width` bytes.
    pub fn read_int(&self, address: u64, width: usize) -> u64 {
        let width = width.min(8);
        let mut bytes = [0; 8];
        bytes[..width].copy_from_slice(&self.read(address, width));

        u64::from_le_bytes(bytes)
    }

    /// Write the low `width` bytes of `value`, little-endian.
    pub fn write_int(&mut self, address: u64, value: u64, width: usize) {
        let width = width.min(8);
        self.write(address, &value.to_le_bytes()[..width]);
    }

    /// Address ranges holding bytes: written pages and loaded segments.
    fn backed_ranges(&self) -> Vec<(u64, u64)> {
        let mut spans: Vec<(u64, u64)> = self
            .pages
            .keys()
            .map(|base| (*base, base.saturating_add(PAGE_SIZE)))
            .collect();

        for segment in self.segments.iter().filter(|s| s.size > 0) {
            let lo = page_base(segment.start);
            let hi = page_base(segment.end().saturating_add(PAGE_SIZE - 1));
            spans.push((lo, hi));
        }

        merge_spans(spans)
    }

    /// List every mapped address range, lowest first.
    ///
    /// A range is mapped if it has been written to, lies in a loaded
    /// segment, or lies between the heap base and the end of its last
    /// allocation. Ranges are page-aligned and adjacent ranges are merged.
    pub fn mapped_ranges(&self) -> Vec<(u64, u64)> {
        let mut spans = self.backed_ranges();

        if let Some(end) = self.heap.end() {
            let lo = page_base(self.heap.base());
            spans.push((lo, page_base(end.saturating_add(PAGE_SIZE - 1))));
        }

        merge_spans(spans)
    }

    /// Find the lowest address at which `needle` occurs.
    ///
    /// Only written pages and loaded segments are searched, and the whole
    /// match must fit within `[start, end)`. `start` defaults to the lowest
    /// mapped address and `end` to the top of memory.
    pub fn find(&self, needle: &[u8], start: Option<u64>, end: Option<u64>) -> Option<u64> {
        let start = start.unwrap_or(0);
        let end = end.unwrap_or(u64::MAX);

        if needle.is_empty() || start >= end {
            return None;
        }

        for (lo, hi) in self.backed_ranges() {
            let lo = lo.max(start);
            let hi = hi.min(end);

            if hi <= lo || hi - lo < needle.len() as u64 {
                continue;
            }

            let haystack = self.read(lo, (hi - lo) as usize);
            if let Some(pos) = haystack.windows(needle.len()).position(|w| w == needle) {
                return Some(lo + pos as u64);
            }
        }

        None
    }

    /// Find `needle` within the named segment.
    pub fn find_in_segment(&self, needle: &[u8], name: &str) -> Option<u64> {
        let segment = self.segments.iter().find(|s| s.name == name)?;

        self.find(needle, Some(segment.start), Some(segment.end()))
    }

    /// Find `needle` between the heap base and the end of the last
    /// allocation.
    pub fn find_in_heap(&self, needle: &[u8]) -> Option<u64> {
        let end = self.heap.end()?;

        self.find(needle, Some(self.heap.base()), Some(end))
    }

    /// Allocate `size` bytes on the emulated heap.
    pub fn alloc(&mut self, size: u64) -> u64 {
        self.heap.alloc(size)
    }

    /// Resize a heap allocation, moving its contents if it has to relocate.
    ///
    /// Resizing an address that was never allocated behaves like `alloc`.
    pub fn realloc(&mut self, address: u64, size: u64) -> u64 {
        let (new_address, moved) = self.heap.realloc(address, size);

        if let Some(old_size) = moved {
            let keep = self.bounded(old_size.min(size));
            let data = self.read(address, keep);
            self.write(new_address, &data);
        }

        new_address
    }

    /// Release a heap allocation. The memory itself stays readable.
    pub fn free(&mut self, address: u64) {
        self.heap.free(address);
    }
}

fn merge_spans(mut spans: Vec<(u64, u64)>) -> Vec<(u64, u64)> {
    spans.sort_unstable();

    let mut merged: Vec<(u64, u64)> = Vec::with_capacity(spans.len());
    for (lo, hi) in spans {
        match merged.last_mut() {
            Some(last) if lo <= last.1 => last.1 = last.1.max(hi),
            _ => merged.push((lo, hi)),
        }
    }

    merged
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Base Address             Address Range            Size")?;

        for (lo, hi) in self.mapped_ranges() {
            writeln!(f, "0x{:08X}               0x{:08X} - 0x{:08X}  {}", lo, lo, hi, hi - lo)?;
        }

        Ok(())
    }
}
