//! Integer arithmetic and logic, with x86 flag semantics.

use crate::arch::x86::{acc_pair, operand};
use crate::context::ProcessorContext;
use crate::error::Result;
use crate::host::Instruction;
use crate::maths::{mask, msb, parity, sign_extend, to_signed};
use log::warn;

/// Set ZF, SF and PF from a `width`-byte result.
fn set_result_flags(ctx: &mut ProcessorContext, result: u64, width: usize) {
    let result = result & mask(width);

    ctx.registers.set_flag("zf", result == 0);
    ctx.registers.set_flag("sf", msb(result, width));
    ctx.registers.set_flag("pf", parity(result));
}

/// Compute `a + b + carry` at `width` and set every arithmetic flag.
fn add_with_flags(ctx: &mut ProcessorContext, a: u64, b: u64, carry: bool, width: usize) -> u64 {
    let m = mask(width);
    let (a, b) = (a & m, b & m);
    let wide = a as u128 + b as u128 + carry as u128;
    let result = wide as u64 & m;

    ctx.registers.set_flag("cf", wide > m as u128);
    ctx.registers.set_flag("of", msb(a, width) == msb(b, width) && msb(result, width) != msb(a, width));
    ctx.registers.set_flag("af", (a ^ b ^ result) & 0x10 != 0);
    set_result_flags(ctx, result, width);

    result
}

/// Compute `a - b - borrow` at `width` and set every arithmetic flag.
fn sub_with_flags(ctx: &mut ProcessorContext, a: u64, b: u64, borrow: bool, width: usize) -> u64 {
    let m = mask(width);
    let (a, b) = (a & m, b & m);
    let result = a.wrapping_sub(b).wrapping_sub(borrow as u64) & m;

    ctx.registers.set_flag("cf", (a as u128) < b as u128 + borrow as u128);
    ctx.registers.set_flag("of", msb(a, width) != msb(b, width) && msb(result, width) != msb(a, width));
    ctx.registers.set_flag("af", (a ^ b ^ result) & 0x10 != 0);
    set_result_flags(ctx, result, width);

    result
}

/// Set flags for a bitwise logic result: CF and OF cleared.
fn logic_flags(ctx: &mut ProcessorContext, result: u64, width: usize) {
    ctx.registers.set_flag("cf", false);
    ctx.registers.set_flag("of", false);
    ctx.registers.set_flag("af", false);
    set_result_flags(ctx, result, width);
}

/// Read the destination and source of a two-operand instruction.
fn binary(ctx: &ProcessorContext, instr: &Instruction) -> Result<(u64, u64, usize)> {
    let dst = operand(instr, 0)?;
    let src = operand(instr, 1)?;
    let b = sign_extend(ctx.operand_value(src), src.size) & mask(dst.size);

    Ok((ctx.operand_value(dst), b, dst.size))
}

fn store(ctx: &mut ProcessorContext, instr: &Instruction, value: u64) -> Result<()> {
    ctx.set_operand_value(operand(instr, 0)?, value)
}

pub fn add(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let (a, b, width) = binary(ctx, instr)?;
    let result = add_with_flags(ctx, a, b, false, width);

    store(ctx, instr, result)
}

pub fn adc(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let (a, b, width) = binary(ctx, instr)?;
    let carry = ctx.registers.flag("cf");
    let result = add_with_flags(ctx, a, b, carry, width);

    store(ctx, instr, result)
}

pub fn sub(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let (a, b, width) = binary(ctx, instr)?;
    let result = sub_with_flags(ctx, a, b, false, width);

    store(ctx, instr, result)
}

pub fn sbb(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let (a, b, width) = binary(ctx, instr)?;
    let borrow = ctx.registers.flag("cf");
    let result = sub_with_flags(ctx, a, b, borrow, width);

    store(ctx, instr, result)
}

pub fn cmp(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let (a, b, width) = binary(ctx, instr)?;
    sub_with_flags(ctx, a, b, false, width);

    Ok(())
}

pub fn inc(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let dst = operand(instr, 0)?;
    let a = ctx.operand_value(dst);
    let carry = ctx.registers.flag("cf");
    let result = add_with_flags(ctx, a, 1, false, dst.size);

    ctx.registers.set_flag("cf", carry);
    store(ctx, instr, result)
}

pub fn dec(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let dst = operand(instr, 0)?;
    let a = ctx.operand_value(dst);
    let carry = ctx.registers.flag("cf");
    let result = sub_with_flags(ctx, a, 1, false, dst.size);

    ctx.registers.set_flag("cf", carry);
    store(ctx, instr, result)
}

pub fn neg(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let dst = operand(instr, 0)?;
    let a = ctx.operand_value(dst);
    let result = sub_with_flags(ctx, 0, a, false, dst.size);

    store(ctx, instr, result)
}

pub fn and(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let (a, b, width) = binary(ctx, instr)?;
    let result = a & b;
    logic_flags(ctx, result, width);

    store(ctx, instr, result)
}

pub fn or(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let (a, b, width) = binary(ctx, instr)?;
    let result = a | b;
    logic_flags(ctx, result, width);

    store(ctx, instr, result)
}

pub fn xor(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let (a, b, width) = binary(ctx, instr)?;
    let result = a ^ b;
    logic_flags(ctx, result, width);

    store(ctx, instr, result)
}

pub fn test(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let (a, b, width) = binary(ctx, instr)?;
    logic_flags(ctx, a & b, width);

    Ok(())
}

pub fn not(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let dst = operand(instr, 0)?;
    let result = !ctx.operand_value(dst) & mask(dst.size);

    store(ctx, instr, result)
}

/// Read a shift or rotate's value, width and masked count.
///
/// A missing count operand means a count of one.
fn shift_operands(ctx: &ProcessorContext, instr: &Instruction) -> Result<(u64, usize, u32)> {
    let dst = operand(instr, 0)?;
    let count = instr.operands.get(1).map_or(1, |o| ctx.operand_value(o));
    let count_mask = if dst.size == 8 { 0x3F } else { 0x1F };

    Ok((ctx.operand_value(dst) & mask(dst.size), dst.size, (count & count_mask) as u32))
}

pub fn shl(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let (a, width, count) = shift_operands(ctx, instr)?;
    if count == 0 {
        return Ok(());
    }

    let bits = width as u32 * 8;
    let result = if count >= bits { 0 } else { (a << count) & mask(width) };
    let cf = count <= bits && (a >> (bits - count)) & 1 == 1;

    ctx.registers.set_flag("cf", cf);
    ctx.registers.set_flag("of", msb(result, width) != cf);
    set_result_flags(ctx, result, width);
    store(ctx, instr, result)
}

pub fn shr(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let (a, width, count) = shift_operands(ctx, instr)?;
    if count == 0 {
        return Ok(());
    }

    let result = a.checked_shr(count).unwrap_or(0);
    let cf = a.checked_shr(count - 1).unwrap_or(0) & 1 == 1;

    ctx.registers.set_flag("cf", cf);
    ctx.registers.set_flag("of", msb(a, width));
    set_result_flags(ctx, result, width);
    store(ctx, instr, result)
}

pub fn sar(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let (a, width, count) = shift_operands(ctx, instr)?;
    if count == 0 {
        return Ok(());
    }

    let signed = to_signed(a, width);
    let result = (signed >> count.min(63)) as u64 & mask(width);
    let cf = (signed >> (count - 1).min(63)) & 1 == 1;

    ctx.registers.set_flag("cf", cf);
    ctx.registers.set_flag("of", false);
    set_result_flags(ctx, result, width);
    store(ctx, instr, result)
}

pub fn rol(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let (a, width, count) = shift_operands(ctx, instr)?;
    let bits = width as u32 * 8;
    let count = count % bits;
    if count == 0 {
        return Ok(());
    }

    let result = ((a << count) | (a >> (bits - count))) & mask(width);
    let cf = result & 1 == 1;

    ctx.registers.set_flag("cf", cf);
    ctx.registers.set_flag("of", msb(result, width) != cf);
    store(ctx, instr, result)
}

pub fn ror(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let (a, width, count) = shift_operands(ctx, instr)?;
    let bits = width as u32 * 8;
    let count = count % bits;
    if count == 0 {
        return Ok(());
    }

    let result = ((a >> count) | (a << (bits - count))) & mask(width);
    let cf = msb(result, width);

    ctx.registers.set_flag("cf", cf);
    ctx.registers.set_flag("of", cf != msb(result << 1, width));
    store(ctx, instr, result)
}

/// Store a double-width product into the accumulator pair.
fn store_product(ctx: &mut ProcessorContext, product: u128, width: usize) -> Result<()> {
    let (lo, hi) = acc_pair(width);
    let bits = width * 8;

    if width == 1 {
        ctx.registers.set("ax", product as u64 & 0xFFFF)
    } else {
        ctx.registers.set(lo, product as u64 & mask(width))?;
        ctx.registers.set(hi, (product >> bits) as u64 & mask(width))
    }
}

pub fn mul(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let src = operand(instr, 0)?;
    let width = src.size;
    let (lo, _) = acc_pair(width);
    let product = ctx.registers.get(lo)? as u128 * (ctx.operand_value(src) & mask(width)) as u128;
    let overflow = product >> (width * 8) != 0;

    ctx.registers.set_flag("cf", overflow);
    ctx.registers.set_flag("of", overflow);
    store_product(ctx, product, width)
}

pub fn imul(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    match instr.operands.len() {
        1 => {
            let src = operand(instr, 0)?;
            let width = src.size;
            let (lo, _) = acc_pair(width);
            let a = to_signed(ctx.registers.get(lo)?, width) as i128;
            let b = to_signed(ctx.operand_value(src), width) as i128;
            let product = a * b;
            let truncated = sign_extend(product as u64, width) as i64 as i128;
            let overflow = truncated != product;

            ctx.registers.set_flag("cf", overflow);
            ctx.registers.set_flag("of", overflow);
            store_product(ctx, product as u128, width)
        }
        n => {
            let dst = operand(instr, 0)?;
            let (x, y) = if n == 2 {
                (operand(instr, 0)?, operand(instr, 1)?)
            } else {
                (operand(instr, 1)?, operand(instr, 2)?)
            };
            let width = dst.size;
            let a = to_signed(ctx.operand_value(x), x.size) as i128;
            let b = to_signed(ctx.operand_value(y), y.size) as i128;
            let product = a * b;
            let result = product as u64 & mask(width);
            let overflow = to_signed(result, width) as i128 != product;

            ctx.registers.set_flag("cf", overflow);
            ctx.registers.set_flag("of", overflow);
            ctx.set_operand_value(dst, result)
        }
    }
}

/// Read the double-width dividend for a divide of the given width.
fn dividend(ctx: &ProcessorContext, width: usize) -> Result<u128> {
    if width == 1 {
        return Ok(ctx.registers.get("ax")? as u128);
    }

    let (lo, hi) = acc_pair(width);
    Ok(((ctx.registers.get(hi)? as u128) << (width * 8)) | ctx.registers.get(lo)? as u128)
}

/// Store a quotient and remainder where a divide of the given width leaves
/// them.
fn store_division(ctx: &mut ProcessorContext, quotient: u64, remainder: u64, width: usize) -> Result<()> {
    if width == 1 {
        ctx.registers.set("al", quotient)?;
        return ctx.registers.set("ah", remainder);
    }

    let (lo, hi) = acc_pair(width);
    ctx.registers.set(lo, quotient & mask(width))?;
    ctx.registers.set(hi, remainder & mask(width))
}

pub fn div(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let src = operand(instr, 0)?;
    let width = src.size;
    let divisor = (ctx.operand_value(src) & mask(width)) as u128;

    if divisor == 0 {
        warn!("Divide by zero at 0x{:08X}", instr.address);
        return Ok(());
    }

    let dividend = dividend(ctx, width)?;
    let quotient = dividend / divisor;
    if quotient > mask(width) as u128 {
        warn!("Divide overflow at 0x{:08X}", instr.address);
        return Ok(());
    }

    store_division(ctx, quotient as u64, (dividend % divisor) as u64, width)
}

pub fn idiv(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let src = operand(instr, 0)?;
    let width = src.size;
    let divisor = to_signed(ctx.operand_value(src), width) as i128;

    if divisor == 0 {
        warn!("Divide by zero at 0x{:08X}", instr.address);
        return Ok(());
    }

    let bits = width as u32 * 16;
    let raw = dividend(ctx, width)?;
    let dividend = if bits < 128 {
        ((raw << (128 - bits)) as i128) >> (128 - bits)
    } else {
        raw as i128
    };

    let (quotient, remainder) = match (dividend.checked_div(divisor), dividend.checked_rem(divisor)) {
        (Some(q), Some(r)) if to_signed(q as u64, width) as i128 == q => (q, r),
        _ => {
            warn!("Divide overflow at 0x{:08X}", instr.address);
            return Ok(());
        }
    };

    store_division(ctx, quotient as u64, remainder as u64, width)
}
