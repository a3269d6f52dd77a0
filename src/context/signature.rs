//! Function signatures and calling-convention argument resolution.

use crate::arch::ArchName;
use crate::context::ProcessorContext;
use crate::error::{Error, Result};
use crate::host::{ArgDecl, CallingConvention};
use std::fmt;

impl fmt::Display for ArgDecl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.ty, self.name)
    }
}

impl ArgDecl {
    /// Parse a `type name` declaration such as `char *buf`.
    ///
    /// A declaration with no separable name is taken to be a bare type and
    /// named after its position, `a{position}`.
    pub fn parse(decl: &str, position: usize) -> ArgDecl {
        let decl = decl.trim();
        let split = decl.rfind(|c: char| c.is_whitespace() || c == '*');

        match split {
            Some(i) if i + 1 < decl.len() => {
                let (ty, name) = decl.split_at(i + 1);
                ArgDecl {
                    ty: ty.trim_end().to_string(),
                    name: name.to_string(),
                }
            }
            _ => ArgDecl {
                ty: decl.to_string(),
                name: format!("a{}", position),
            },
        }
    }
}

impl CallingConvention {
    /// Registers that carry the leading arguments, in order.
    pub fn arg_registers(self) -> &'static [&'static str] {
        match self {
            CallingConvention::Cdecl | CallingConvention::Stdcall => &[],
            CallingConvention::Fastcall => &["ecx", "edx"],
            CallingConvention::Thiscall => &["ecx"],
            CallingConvention::Win64 => &["rcx", "rdx", "r8", "r9"],
            CallingConvention::SysV => &["rdi", "rsi", "rdx", "rcx", "r8", "r9"],
        }
    }

    /// Determine if the called function pops its own stack arguments.
    pub fn callee_cleans(self) -> bool {
        match self {
            CallingConvention::Stdcall | CallingConvention::Fastcall | CallingConvention::Thiscall => true,
            _ => false,
        }
    }

    /// Bytes of stack a function with `count` arguments releases on return.
    ///
    /// Zero unless the callee cleans up.
    pub fn callee_cleanup(self, count: usize, ptr_size: usize) -> u64 {
        if !self.callee_cleans() {
            return 0;
        }

        count.saturating_sub(self.arg_registers().len()) as u64 * ptr_size as u64
    }

    /// Bytes reserved on the stack by the caller above the return address
    /// before the first stack argument.
    pub fn shadow_space(self) -> u64 {
        match self {
            CallingConvention::Win64 => 0x20,
            _ => 0,
        }
    }
}

/// One resolved argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionArg {
    pub name: String,
    pub ty: String,
    pub value: u64,
}

/// A function declaration along with where to find its arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionSignature {
    /// Entry point of the function this signature describes.
    pub address: u64,
    pub name: String,
    pub return_type: String,
    pub convention: CallingConvention,

    /// Declared arguments, which may be extended with `push_arg_type`.
    pub arg_types: Vec<ArgDecl>,
}

impl FunctionSignature {
    /// Render the signature as a C declaration.
    pub fn declaration(&self) -> String {
        let args: Vec<String> = self
            .arg_types
            .iter()
            .map(|a| format!("{}{}{}", a.ty, separator(&a.ty), a.name))
            .collect();

        format!(
            "{}{}{} {}({});",
            self.return_type,
            separator(&self.return_type),
            self.convention.keyword(),
            self.name,
            args.join(", ")
        )
    }

    /// Append an argument given as a `type name` declaration.
    pub fn push_arg_type(&mut self, decl: &str) {
        let position = self.arg_types.len() + 1;
        self.arg_types.push(ArgDecl::parse(decl, position));
    }

    /// Resolve every declared argument's value in a given context.
    pub fn args(&self, ctx: &ProcessorContext) -> Vec<FunctionArg> {
        let values = ctx.read_args(self.address, self.convention, self.arg_types.len());

        self.arg_types
            .iter()
            .zip(values)
            .map(|(decl, value)| FunctionArg {
                name: decl.name.clone(),
                ty: decl.ty.clone(),
                value,
            })
            .collect()
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.declaration())
    }
}

/// Pointer types hug the name that follows them.
fn separator(ty: &str) -> &'static str {
    if ty.ends_with('*') {
        ""
    } else {
        " "
    }
}

impl ProcessorContext {
    /// The convention assumed when a function does not declare one.
    pub fn default_convention(&self) -> CallingConvention {
        match self.arch() {
            ArchName::X86 => CallingConvention::Cdecl,
            ArchName::X86_64 => CallingConvention::Win64,
        }
    }

    /// Map a declared convention onto one this architecture can use.
    pub(crate) fn effective_convention(&self, declared: Option<CallingConvention>) -> CallingConvention {
        match (self.arch(), declared) {
            (_, None) => self.default_convention(),
            (ArchName::X86_64, Some(CallingConvention::SysV)) => CallingConvention::SysV,
            (ArchName::X86_64, Some(_)) => CallingConvention::Win64,
            (ArchName::X86, Some(CallingConvention::Win64)) | (ArchName::X86, Some(CallingConvention::SysV)) => {
                CallingConvention::Cdecl
            }
            (ArchName::X86, Some(cc)) => cc,
        }
    }

    /// Work out which function an argument query is about.
    ///
    /// With no explicit address, this is the target of the call at the
    /// current instruction pointer, or else the function containing it.
    fn resolve_function(&self, func_ea: Option<u64>) -> u64 {
        let address = match func_ea {
            Some(ea) => ea,
            None => match self.instruction() {
                Some(instr) if instr.is_call() && !instr.operands.is_empty() => {
                    self.operand_value(&instr.operands[0])
                }
                _ => self.ip(),
            },
        };

        self.host()
            .function_at(address)
            .map_or(address, |f| f.entry)
    }

    /// Read `count` arguments laid out by `convention`.
    ///
    /// Stack arguments are read relative to the stack pointer as it stands
    /// at a call site, or just past the return address when the instruction
    /// pointer is at the function's entry.
    pub fn read_args(&self, entry: u64, convention: CallingConvention, count: usize) -> Vec<u64> {
        let ptr = self.ptr_size();
        let regs = convention.arg_registers();

        let mut base = self.sp();
        if self.ip() == entry {
            base = base.wrapping_add(ptr as u64);
        }
        let stack = base.wrapping_add(convention.shadow_space());

        (0..count)
            .map(|i| match regs.get(i) {
                Some(reg) => self.registers.get(reg).unwrap_or(0),
                None => {
                    let slot = (i - regs.len()) as u64 * ptr as u64;
                    self.memory.read_int(stack.wrapping_add(slot), ptr)
                }
            })
            .collect()
    }

    /// Resolve the argument values of a function.
    ///
    /// The argument count comes from `num_args` if given, otherwise from the
    /// function's declared prototype. With neither, resolution fails rather
    /// than guess.
    pub fn get_function_args(&self, func_ea: Option<u64>, num_args: Option<usize>) -> Result<Vec<u64>> {
        let entry = self.resolve_function(func_ea);
        let prototype = self.host().prototype(entry);
        let convention = self.effective_convention(prototype.as_ref().and_then(|p| p.convention));

        let count = match (num_args, &prototype) {
            (Some(n), _) => n,
            (None, Some(p)) => p.args.len(),
            (None, None) => return Err(Error::SignatureResolution(entry)),
        };

        Ok(self.read_args(entry, convention, count))
    }

    /// Resolve the signature of a function.
    ///
    /// A declared prototype always wins. Without one, `force` synthesizes a
    /// `no_name` signature of that many `int` arguments; without either,
    /// resolution fails.
    pub fn get_function_signature(&self, func_ea: Option<u64>, force: Option<usize>) -> Result<FunctionSignature> {
        let entry = self.resolve_function(func_ea);

        if let Some(p) = self.host().prototype(entry) {
            return Ok(FunctionSignature {
                address: entry,
                name: p.name,
                return_type: p.return_type,
                convention: self.effective_convention(p.convention),
                arg_types: p.args,
            });
        }

        let count = force.ok_or(Error::SignatureResolution(entry))?;

        Ok(FunctionSignature {
            address: entry,
            name: "no_name".to_string(),
            return_type: "int".to_string(),
            convention: self.default_convention(),
            arg_types: (1..=count)
                .map(|i| ArgDecl {
                    ty: "int".to_string(),
                    name: format!("a{}", i),
                })
                .collect(),
        })
    }
}
