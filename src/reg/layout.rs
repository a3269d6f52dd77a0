//! Register layouts: the name → bit-field tables that give aliasing its
//! meaning.

use crate::arch::ArchName;
use crate::maths::mask_bits;
use std::collections::HashMap;

/// Where a named register lives.
///
/// Every register is a window of `bits` bits, `offset` bits up from the bottom
/// of one backing store. Names that share a store alias each other.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegDef {
    pub store: usize,
    pub offset: u32,
    pub bits: u32,

    /// Writes clear every other bit of the store (x86_64 32-bit registers).
    pub zero_extend: bool,
}

impl RegDef {
    pub fn read(&self, stores: &[u128]) -> u128 {
        (stores[self.store] >> self.offset) & mask_bits(self.bits)
    }

    /// Write `value`, truncated to the register's width, into the store.
    pub fn write(&self, stores: &mut [u128], value: u128) {
        let mask = mask_bits(self.bits);
        let value = (value & mask) << self.offset;

        if self.zero_extend {
            stores[self.store] = value;
        } else {
            stores[self.store] = stores[self.store] & !(mask << self.offset) | value;
        }
    }

    /// The register's width in bytes, rounded up.
    pub fn width(&self) -> usize {
        ((self.bits + 7) / 8) as usize
    }
}

/// A complete set of register definitions for one processor model.
#[derive(Clone, Debug, Default)]
pub struct Layout {
    defs: HashMap<&'static str, RegDef>,
    names: Vec<&'static str>,
    stores: usize,
}

impl Layout {
    pub fn get(&self, name: &str) -> Option<RegDef> {
        self.defs.get(name).copied()
    }

    /// Every register name, in definition order.
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    /// How many backing stores a register file using this layout needs.
    pub fn stores(&self) -> usize {
        self.stores
    }

    fn store(&mut self) -> usize {
        self.stores += 1;
        self.stores - 1
    }

    fn reg(&mut self, name: &'static str, store: usize, offset: u32, bits: u32) -> &mut Self {
        self.define(name, store, offset, bits, false)
    }

    fn define(&mut self, name: &'static str, store: usize, offset: u32, bits: u32, zero_extend: bool) -> &mut Self {
        self.names.push(name);
        self.defs.insert(
            name,
            RegDef {
                store,
                offset,
                bits,
                zero_extend,
            },
        );
        self
    }

    /// Add a register with a full-width name, a zero-extending 32-bit name
    /// (only if `wide`) and whatever narrower names are given as
    /// `(name, offset, bits)`.
    fn gpr(&mut self, full: &'static str, full_bits: u32, wide: Option<&'static str>, narrow: &[(&'static str, u32, u32)]) {
        let store = self.store();

        self.reg(full, store, 0, full_bits);
        if let Some(name32) = wide {
            self.define(name32, store, 0, 32, true);
        }
        for (name, offset, bits) in narrow {
            self.reg(*name, store, *offset, *bits);
        }
    }

    fn flags(&mut self, rflags: bool) {
        let store = self.store();

        if rflags {
            self.reg("rflags", store, 0, 64);
        }
        self.reg("eflags", store, 0, 32);
        self.reg("flags", store, 0, 16);

        for (name, offset, bits) in EFLAGS_BITS.iter() {
            self.reg(*name, store, *offset, *bits);
        }
    }

    fn segments_and_vectors(&mut self, xmm: &[&'static str]) {
        for name in &["cs", "ds", "es", "fs", "gs", "ss"] {
            let store = self.store();
            self.reg(*name, store, 0, 16);
        }

        for name in xmm {
            let store = self.store();
            self.reg(*name, store, 0, 128);
        }
    }

    fn x86() -> Self {
        let mut l = Layout::default();

        l.gpr("eax", 32, None, &[("ax", 0, 16), ("al", 0, 8), ("ah", 8, 8)]);
        l.gpr("ebx", 32, None, &[("bx", 0, 16), ("bl", 0, 8), ("bh", 8, 8)]);
        l.gpr("ecx", 32, None, &[("cx", 0, 16), ("cl", 0, 8), ("ch", 8, 8)]);
        l.gpr("edx", 32, None, &[("dx", 0, 16), ("dl", 0, 8), ("dh", 8, 8)]);
        l.gpr("esi", 32, None, &[("si", 0, 16)]);
        l.gpr("edi", 32, None, &[("di", 0, 16)]);
        l.gpr("ebp", 32, None, &[("bp", 0, 16)]);
        l.gpr("esp", 32, None, &[("sp", 0, 16)]);
        l.gpr("eip", 32, None, &[("ip", 0, 16)]);
        l.flags(false);
        l.segments_and_vectors(&XMM[..8]);

        l
    }

    fn x86_64() -> Self {
        let mut l = Layout::default();

        l.gpr("rax", 64, Some("eax"), &[("ax", 0, 16), ("al", 0, 8), ("ah", 8, 8)]);
        l.gpr("rbx", 64, Some("ebx"), &[("bx", 0, 16), ("bl", 0, 8), ("bh", 8, 8)]);
        l.gpr("rcx", 64, Some("ecx"), &[("cx", 0, 16), ("cl", 0, 8), ("ch", 8, 8)]);
        l.gpr("rdx", 64, Some("edx"), &[("dx", 0, 16), ("dl", 0, 8), ("dh", 8, 8)]);
        l.gpr("rsi", 64, Some("esi"), &[("si", 0, 16), ("sil", 0, 8)]);
        l.gpr("rdi", 64, Some("edi"), &[("di", 0, 16), ("dil", 0, 8)]);
        l.gpr("rbp", 64, Some("ebp"), &[("bp", 0, 16), ("bpl", 0, 8)]);
        l.gpr("rsp", 64, Some("esp"), &[("sp", 0, 16), ("spl", 0, 8)]);

        for (full, name32, name16, name8) in EXTENDED_GPRS.iter() {
            l.gpr(*full, 64, Some(*name32), &[(*name16, 0, 16), (*name8, 0, 8)]);
        }

        l.gpr("rip", 64, Some("eip"), &[("ip", 0, 16)]);
        l.flags(true);
        l.segments_and_vectors(&XMM);

        l
    }
}

/// Single- and multi-bit fields of EFLAGS.
static EFLAGS_BITS: [(&str, u32, u32); 17] = [
    ("cf", 0, 1),
    ("pf", 2, 1),
    ("af", 4, 1),
    ("zf", 6, 1),
    ("sf", 7, 1),
    ("tf", 8, 1),
    ("if", 9, 1),
    ("df", 10, 1),
    ("of", 11, 1),
    ("iopl", 12, 2),
    ("nt", 14, 1),
    ("rf", 16, 1),
    ("vm", 17, 1),
    ("ac", 18, 1),
    ("vif", 19, 1),
    ("vip", 20, 1),
    ("id", 21, 1),
];

static EXTENDED_GPRS: [(&str, &str, &str, &str); 8] = [
    ("r8", "r8d", "r8w", "r8b"),
    ("r9", "r9d", "r9w", "r9b"),
    ("r10", "r10d", "r10w", "r10b"),
    ("r11", "r11d", "r11w", "r11b"),
    ("r12", "r12d", "r12w", "r12b"),
    ("r13", "r13d", "r13w", "r13b"),
    ("r14", "r14d", "r14w", "r14b"),
    ("r15", "r15d", "r15w", "r15b"),
];

static XMM: [&str; 16] = [
    "xmm0", "xmm1", "xmm2", "xmm3", "xmm4", "xmm5", "xmm6", "xmm7", "xmm8", "xmm9", "xmm10",
    "xmm11", "xmm12", "xmm13", "xmm14", "xmm15",
];

lazy_static! {
    static ref X86_LAYOUT: Layout = Layout::x86();
    static ref X86_64_LAYOUT: Layout = Layout::x86_64();

    /// The x87 status, control and tag words, with their bit fields.
    ///
    /// Store 0 is the status word, 1 the control word and 2 the tag word.
    pub static ref FPU_LAYOUT: Layout = {
        let mut l = Layout::default();
        let status = l.store();
        let control = l.store();
        let tag = l.store();

        l.reg("status", status, 0, 16);
        for (name, offset, bits) in &[
            ("i", 0, 1), ("d", 1, 1), ("z", 2, 1), ("o", 3, 1), ("u", 4, 1), ("p", 5, 1),
            ("sf", 6, 1), ("ir", 7, 1), ("c0", 8, 1), ("c1", 9, 1), ("c2", 10, 1),
            ("top", 11, 3), ("c3", 14, 1), ("b", 15, 1),
        ] {
            l.reg(*name, status, *offset, *bits);
        }

        l.reg("control", control, 0, 16);
        for (name, offset, bits) in &[
            ("im", 0, 1), ("dm", 1, 1), ("zm", 2, 1), ("om", 3, 1), ("um", 4, 1), ("pm", 5, 1),
            ("iem", 7, 1), ("pc", 8, 2), ("rc", 10, 2), ("ic", 12, 1),
        ] {
            l.reg(*name, control, *offset, *bits);
        }

        l.reg("tag", tag, 0, 16);
        for (i, name) in ["tag0", "tag1", "tag2", "tag3", "tag4", "tag5", "tag6", "tag7"].iter().enumerate() {
            l.reg(*name, tag, i as u32 * 2, 2);
        }

        l
    };
}

/// Given an architecture, produce its register layout.
pub fn layout(arch: ArchName) -> &'static Layout {
    match arch {
        ArchName::X86 => &X86_LAYOUT,
        ArchName::X86_64 => &X86_64_LAYOUT,
    }
}
