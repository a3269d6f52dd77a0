//! String functions, narrow and wide.
//!
//! Wide variants work in two-byte units. A unit is a terminator only if
//! every byte in it is zero, so byte order does not matter.

use crate::builtins::arg;
use crate::context::ProcessorContext;

/// Character width implied by a function name.
fn unit(name: &str) -> usize {
    let name = name.to_ascii_lowercase();

    if name.starts_with("wcs") || (name.starts_with("lstr") && name.ends_with('w')) {
        2
    } else {
        1
    }
}

/// Read at most `count` units of a string, stopping early at a terminator.
fn read_prefix(ctx: &ProcessorContext, address: u64, unit: usize, count: u64) -> Vec<u8> {
    let mut data = ctx.read_string(address, unit);
    let limit = (count as usize).saturating_mul(unit);

    data.truncate(limit);
    data
}

/// Write `data` followed by a one-unit terminator.
fn write_terminated(ctx: &mut ProcessorContext, address: u64, data: &[u8], unit: usize) {
    let mut buf = data.to_vec();
    buf.resize(data.len() + unit, 0);

    ctx.write_memory(address, &buf);
}

pub fn strcat(ctx: &mut ProcessorContext, name: &str, args: &[u64]) -> u64 {
    let (dst, src) = (arg(args, 0), arg(args, 1));
    let unit = unit(name);
    let end = dst.wrapping_add(ctx.read_string(dst, unit).len() as u64);
    let data = ctx.read_string(src, unit);

    write_terminated(ctx, end, &data, unit);
    dst
}

/// Append up to `n` units of `src`, then a terminator.
pub fn strncat(ctx: &mut ProcessorContext, name: &str, args: &[u64]) -> u64 {
    let (dst, src, n) = (arg(args, 0), arg(args, 1), arg(args, 2));
    let unit = unit(name);
    let end = dst.wrapping_add(ctx.read_string(dst, unit).len() as u64);
    let data = read_prefix(ctx, src, unit, n);

    write_terminated(ctx, end, &data, unit);
    dst
}

pub fn strcpy(ctx: &mut ProcessorContext, name: &str, args: &[u64]) -> u64 {
    let (dst, src) = (arg(args, 0), arg(args, 1));
    let unit = unit(name);
    let data = ctx.read_string(src, unit);

    write_terminated(ctx, dst, &data, unit);
    dst
}

/// Copy exactly `n` units: the source is zero padded if it is shorter, and
/// no terminator is added if it is not.
pub fn strncpy(ctx: &mut ProcessorContext, name: &str, args: &[u64]) -> u64 {
    let (dst, src, n) = (arg(args, 0), arg(args, 1), arg(args, 2));
    let unit = unit(name);
    let mut data = read_prefix(ctx, src, unit, n);

    let len = ctx.memory.bounded(n.saturating_mul(unit as u64));

    data.resize(len, 0);
    ctx.write_memory(dst, &data);
    dst
}

pub fn strdup(ctx: &mut ProcessorContext, name: &str, args: &[u64]) -> u64 {
    let unit = unit(name);
    let data = ctx.read_string(arg(args, 0), unit);
    let copy = ctx.memory.alloc((data.len() + unit) as u64);

    write_terminated(ctx, copy, &data, unit);
    copy
}

pub fn strndup(ctx: &mut ProcessorContext, name: &str, args: &[u64]) -> u64 {
    let unit = unit(name);
    let data = read_prefix(ctx, arg(args, 0), unit, arg(args, 1));
    let copy = ctx.memory.alloc((data.len() + unit) as u64);

    write_terminated(ctx, copy, &data, unit);
    copy
}

/// Length in units, terminator excluded.
pub fn strlen(ctx: &mut ProcessorContext, name: &str, args: &[u64]) -> u64 {
    let unit = unit(name);
    (ctx.read_string(arg(args, 0), unit).len() / unit) as u64
}
