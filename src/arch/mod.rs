//! Processor architectures that functrace can emulate.
//!
//! An architecture supplies three things to the rest of the crate:
//!
//!  * A register layout, consumed by `reg::Registers::from_arch`.
//!  * A handful of facts about pointer width and the registers that hold
//!    the stack pointer, frame pointer, instruction pointer and return value.
//!  * The instruction semantics themselves, which live in a child module and
//!    are dispatched by mnemonic from `ProcessorContext::execute`.
//!
//! Only the x86 family ships today. Both the 32-bit and 64-bit flavors share
//! a single instruction model; the differences are entirely in register
//! layout and calling conventions.

pub mod x86;

use crate::error::{Error, Result};
use serde::Serialize;
use std::str;

/// Enumeration of all architectures that ship with functrace.
#[derive(Copy, Clone, Serialize, Debug, PartialEq, Eq, Hash)]
pub enum ArchName {
    X86,
    X86_64,
}

impl Default for ArchName {
    fn default() -> Self {
        ArchName::X86
    }
}

impl ArchName {
    /// Resolve an architecture by name, failing with `UnsupportedArchitecture`
    /// if the name is not recognized.
    pub fn resolve(name: &str) -> Result<Self> {
        name.parse()
            .map_err(|_| Error::UnsupportedArchitecture(name.to_string()))
    }

    /// The width of a pointer (and of a stack slot) in bytes.
    pub fn ptr_size(self) -> usize {
        match self {
            ArchName::X86 => 4,
            ArchName::X86_64 => 8,
        }
    }

    /// Mask covering every bit of a native pointer.
    pub fn ptr_mask(self) -> u64 {
        match self {
            ArchName::X86 => 0xFFFF_FFFF,
            ArchName::X86_64 => u64::MAX,
        }
    }

    pub fn sp(self) -> &'static str {
        match self {
            ArchName::X86 => "esp",
            ArchName::X86_64 => "rsp",
        }
    }

    pub fn bp(self) -> &'static str {
        match self {
            ArchName::X86 => "ebp",
            ArchName::X86_64 => "rbp",
        }
    }

    pub fn ip(self) -> &'static str {
        match self {
            ArchName::X86 => "eip",
            ArchName::X86_64 => "rip",
        }
    }

    /// The register a called function leaves its return value in.
    pub fn ret(self) -> &'static str {
        match self {
            ArchName::X86 => "eax",
            ArchName::X86_64 => "rax",
        }
    }

    /// The full-width name of a general purpose register, given its 32-bit
    /// name (`eax`, `ecx`, ...).
    pub fn native_gpr(self, name32: &'static str) -> &'static str {
        match (self, name32) {
            (ArchName::X86, n) => n,
            (ArchName::X86_64, "eax") => "rax",
            (ArchName::X86_64, "ebx") => "rbx",
            (ArchName::X86_64, "ecx") => "rcx",
            (ArchName::X86_64, "edx") => "rdx",
            (ArchName::X86_64, "esi") => "rsi",
            (ArchName::X86_64, "edi") => "rdi",
            (ArchName::X86_64, "ebp") => "rbp",
            (ArchName::X86_64, "esp") => "rsp",
            (ArchName::X86_64, n) => n,
        }
    }
}

impl str::FromStr for ArchName {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_ref() {
            "x86" => Ok(ArchName::X86),
            "i386" => Ok(ArchName::X86),
            "ia32" => Ok(ArchName::X86),
            "metapc" => Ok(ArchName::X86),
            "x86_64" => Ok(ArchName::X86_64),
            "x64" => Ok(ArchName::X86_64),
            "amd64" => Ok(ArchName::X86_64),
            "metapc64" => Ok(ArchName::X86_64),
            _ => Err(()),
        }
    }
}

derive_deserialize_from_str!(ArchName, "valid architecture name");
