//! Operands as seen from a particular machine state.

use crate::context::ProcessorContext;
use crate::host::{OperandDesc, OperandKind};

/// An operand of the instruction at a context's instruction pointer.
///
/// The host supplies the operand's shape; its address and value are
/// computed against the context's current registers and memory.
#[derive(Clone, Debug)]
pub struct Operand<'a> {
    ctx: &'a ProcessorContext,
    desc: OperandDesc,
}

impl<'a> Operand<'a> {
    pub fn new(ctx: &'a ProcessorContext, desc: OperandDesc) -> Self {
        Operand { ctx, desc }
    }

    /// The operand as the disassembler renders it.
    pub fn text(&self) -> &str {
        &self.desc.text
    }

    /// Width of the operand in bytes.
    pub fn width(&self) -> usize {
        self.desc.size
    }

    pub fn desc(&self) -> &OperandDesc {
        &self.desc
    }

    /// Effective address, for memory operands only.
    pub fn addr(&self) -> Option<u64> {
        self.ctx.operand_addr(&self.desc)
    }

    pub fn value(&self) -> u64 {
        self.ctx.operand_value(&self.desc)
    }

    /// Determine if the operand refers to the entry point of a known
    /// function, either directly or through the memory it addresses.
    pub fn is_func_ptr(&self) -> bool {
        let host = self.ctx.host();

        match &self.desc.kind {
            OperandKind::Memory { .. } => {
                self.addr().map_or(false, |a| host.is_function_start(a))
                    || host.is_function_start(self.value())
            }
            OperandKind::Register(_) | OperandKind::Immediate(_) | OperandKind::Near(_) => {
                host.is_function_start(self.value())
            }
        }
    }
}
