//! Raw memory and heap functions.

use crate::builtins::arg;
use crate::context::ProcessorContext;

/// Copy `n` bytes. Overlapping ranges behave like `memmove`.
pub fn memcpy(ctx: &mut ProcessorContext, _name: &str, args: &[u64]) -> u64 {
    let (dst, src, n) = (arg(args, 0), arg(args, 1), arg(args, 2));
    let data = ctx.memory.read(src, ctx.memory.bounded(n));

    ctx.write_memory(dst, &data);
    dst
}

pub fn memset(ctx: &mut ProcessorContext, _name: &str, args: &[u64]) -> u64 {
    let (dst, value, n) = (arg(args, 0), arg(args, 1), arg(args, 2));

    let n = ctx.memory.bounded(n);

    ctx.write_memory(dst, &vec![value as u8; n]);
    dst
}

pub fn malloc(ctx: &mut ProcessorContext, _name: &str, args: &[u64]) -> u64 {
    ctx.memory.alloc(arg(args, 0))
}

/// Allocate `count * size` bytes.
///
/// Heap addresses are never handed out twice, so a fresh block already
/// reads as zero.
pub fn calloc(ctx: &mut ProcessorContext, _name: &str, args: &[u64]) -> u64 {
    ctx.memory.alloc(arg(args, 0).saturating_mul(arg(args, 1)))
}

pub fn realloc(ctx: &mut ProcessorContext, _name: &str, args: &[u64]) -> u64 {
    ctx.memory.realloc(arg(args, 0), arg(args, 1))
}

pub fn free(ctx: &mut ProcessorContext, _name: &str, args: &[u64]) -> u64 {
    ctx.memory.free(arg(args, 0));
    0
}
