//! Data the disassembly host hands to the emulator.

use serde::{Deserialize, Serialize};

pub use crate::memory::Segment;

/// A single decoded instruction.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Instruction {
    pub address: u64,

    /// Lowercase mnemonic, without prefixes.
    pub mnemonic: String,

    /// Encoded length of the instruction in bytes.
    pub length: u64,

    /// A `rep`, `repe` or `repne` prefix, if present.
    #[serde(default)]
    pub prefix: Option<String>,

    #[serde(default)]
    pub operands: Vec<OperandDesc>,
}

impl Instruction {
    pub fn new(address: u64, mnemonic: &str, length: u64, operands: Vec<OperandDesc>) -> Self {
        Instruction {
            address,
            mnemonic: mnemonic.to_ascii_lowercase(),
            length,
            prefix: None,
            operands,
        }
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_ascii_lowercase());
        self
    }

    /// The address of the instruction that follows this one in memory.
    pub fn next(&self) -> u64 {
        self.address.wrapping_add(self.length)
    }

    pub fn is_call(&self) -> bool {
        self.mnemonic == "call"
    }
}

/// How an operand's value is located.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperandKind {
    /// A named register.
    Register(String),

    /// An immediate value, already sign-extended to 64 bits by the host.
    Immediate(u64),

    /// A memory reference of the form `seg:[base + index * scale + disp]`.
    Memory {
        #[serde(default)]
        segment: Option<String>,
        #[serde(default)]
        base: Option<String>,
        #[serde(default)]
        index: Option<String>,
        #[serde(default = "default_scale")]
        scale: u8,
        #[serde(default)]
        displacement: i64,
    },

    /// A code address used as a branch or call target.
    Near(u64),
}

fn default_scale() -> u8 {
    1
}

/// A single operand of a decoded instruction.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperandDesc {
    /// The operand as the disassembler renders it (e.g. `[ebp+arg_0]`).
    pub text: String,

    /// Width of the operand in bytes.
    pub size: usize,

    pub kind: OperandKind,
}

impl OperandDesc {
    pub fn reg(text: &str, size: usize) -> Self {
        OperandDesc {
            text: text.to_string(),
            size,
            kind: OperandKind::Register(text.to_ascii_lowercase()),
        }
    }

    pub fn imm(text: &str, size: usize, value: u64) -> Self {
        OperandDesc {
            text: text.to_string(),
            size,
            kind: OperandKind::Immediate(value),
        }
    }

    pub fn near(text: &str, size: usize, target: u64) -> Self {
        OperandDesc {
            text: text.to_string(),
            size,
            kind: OperandKind::Near(target),
        }
    }

    /// A `[base + disp]` memory operand.
    pub fn mem(text: &str, size: usize, base: Option<&str>, displacement: i64) -> Self {
        OperandDesc {
            text: text.to_string(),
            size,
            kind: OperandKind::Memory {
                segment: None,
                base: base.map(str::to_string),
                index: None,
                scale: 1,
                displacement,
            },
        }
    }

    /// A `[base + index * scale + disp]` memory operand.
    pub fn mem_indexed(
        text: &str,
        size: usize,
        base: Option<&str>,
        index: &str,
        scale: u8,
        displacement: i64,
    ) -> Self {
        OperandDesc {
            text: text.to_string(),
            size,
            kind: OperandKind::Memory {
                segment: None,
                base: base.map(str::to_string),
                index: Some(index.to_string()),
                scale,
                displacement,
            },
        }
    }

    pub fn is_memory(&self) -> bool {
        matches!(self.kind, OperandKind::Memory { .. })
    }

    pub fn is_register(&self) -> bool {
        matches!(self.kind, OperandKind::Register(_))
    }
}

/// A named slot in a function's stack frame.
///
/// `offset` is relative to the stack pointer at function entry, so the return
/// address of an x86 function is at offset zero, its first stack argument at
/// `+4` and locals at negative offsets.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrameMember {
    pub name: String,
    pub offset: i64,
    pub size: usize,
}

/// The extent and frame layout of a single function.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionInfo {
    pub entry: u64,

    /// Exclusive end of the function's code.
    pub end: u64,

    #[serde(default)]
    pub frame: Vec<FrameMember>,
}

impl FunctionInfo {
    pub fn contains(&self, address: u64) -> bool {
        self.entry <= address && address < self.end
    }

    /// Find the frame member covering a given entry-relative stack offset.
    pub fn frame_member(&self, offset: i64) -> Option<&FrameMember> {
        self.frame
            .iter()
            .find(|m| m.offset <= offset && offset < m.offset + m.size as i64)
    }
}

/// A basic block as the host sees it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockInfo {
    pub start: u64,

    /// Exclusive end of the block.
    pub end: u64,

    /// Addresses of every instruction within the block, in order.
    pub heads: Vec<u64>,

    #[serde(default)]
    pub succs: Vec<u64>,

    #[serde(default)]
    pub preds: Vec<u64>,
}

/// Calling conventions understood by argument resolution.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CallingConvention {
    Cdecl,
    Stdcall,
    Fastcall,
    Thiscall,
    /// Microsoft x64: rcx, rdx, r8, r9, then the stack above 32 bytes of
    /// shadow space.
    Win64,
    /// System V AMD64: rdi, rsi, rdx, rcx, r8, r9, then the stack.
    SysV,
}

impl CallingConvention {
    /// The spelling disassemblers use in declarations.
    pub fn keyword(self) -> &'static str {
        match self {
            CallingConvention::Cdecl => "__cdecl",
            CallingConvention::Stdcall => "__stdcall",
            CallingConvention::Fastcall => "__fastcall",
            CallingConvention::Thiscall => "__thiscall",
            CallingConvention::Win64 => "__fastcall",
            CallingConvention::SysV => "__cdecl",
        }
    }
}

/// A declared argument.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArgDecl {
    #[serde(rename = "type")]
    pub ty: String,
    pub name: String,
}

/// A function prototype as declared in the host's type system.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prototype {
    pub name: String,
    pub return_type: String,

    #[serde(default)]
    pub convention: Option<CallingConvention>,

    #[serde(default)]
    pub args: Vec<ArgDecl>,
}
