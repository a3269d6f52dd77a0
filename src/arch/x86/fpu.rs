//! x87 floating point

use crate::arch::x86::operand;
use crate::context::ProcessorContext;
use crate::error::Result;
use crate::host::{Instruction, OperandDesc, OperandKind};
use crate::maths::{float_to_int, to_signed};
use crate::reg::Fpu;
use log::warn;

/// Multiply by a power of two without overflowing the intermediate.
fn scale(mut value: f64, mut exponent: i32) -> f64 {
    while exponent > 1000 {
        value *= 2f64.powi(1000);
        exponent -= 1000;
    }

    while exponent < -1000 {
        value *= 2f64.powi(-1000);
        exponent += 1000;
    }

    value * 2f64.powi(exponent)
}

/// Decode an 80-bit extended precision value.
pub fn f80_to_f64(bytes: &[u8]) -> f64 {
    let mut raw = [0u8; 10];
    let len = bytes.len().min(10);
    raw[..len].copy_from_slice(&bytes[..len]);

    let mut mantissa_bytes = [0u8; 8];
    mantissa_bytes.copy_from_slice(&raw[..8]);
    let mantissa = u64::from_le_bytes(mantissa_bytes);
    let sign_exp = u16::from_le_bytes([raw[8], raw[9]]);
    let negative = sign_exp & 0x8000 != 0;
    let exponent = (sign_exp & 0x7FFF) as i32;

    let magnitude = if exponent == 0 && mantissa == 0 {
        0.0
    } else if exponent == 0x7FFF {
        if mantissa << 1 == 0 {
            f64::INFINITY
        } else {
            f64::NAN
        }
    } else {
        scale(mantissa as f64, exponent - 16383 - 63)
    };

    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Encode a value as 80-bit extended precision.
pub fn f64_to_f80(value: f64) -> [u8; 10] {
    let bits = value.to_bits();
    let sign = ((bits >> 63) as u16) << 15;
    let exponent = ((bits >> 52) & 0x7FF) as i32;
    let fraction = bits & ((1 << 52) - 1);

    let (exponent, mantissa) = if exponent == 0 && fraction == 0 {
        (0, 0)
    } else if exponent == 0x7FF {
        (0x7FFF, 1u64 << 63 | fraction << 11)
    } else if exponent == 0 {
        let shift = fraction.leading_zeros() - 11;
        (1 - 1023 - shift as i32 + 16383, fraction << shift << 11)
    } else {
        (exponent - 1023 + 16383, 1u64 << 63 | fraction << 11)
    };

    let mut out = [0u8; 10];
    out[..8].copy_from_slice(&mantissa.to_le_bytes());
    out[8..].copy_from_slice(&(sign | exponent as u16).to_le_bytes());
    out
}

/// The stack slot an operand names, if it is an FPU register.
fn slot(desc: &OperandDesc) -> Option<usize> {
    match &desc.kind {
        OperandKind::Register(name) => Fpu::slot_index(name),
        _ => None,
    }
}

fn st(ctx: &ProcessorContext, index: usize) -> f64 {
    ctx.registers.fpu.st(index).unwrap_or(f64::NAN)
}

/// Read a floating point source operand: a stack register or a 32, 64 or
/// 80-bit memory operand.
fn float_source(ctx: &ProcessorContext, desc: &OperandDesc) -> f64 {
    if let Some(index) = slot(desc) {
        return st(ctx, index);
    }

    let addr = match ctx.operand_addr(desc) {
        Some(addr) => addr,
        None => return f64::from_bits(ctx.operand_value(desc)),
    };

    match desc.size {
        4 => f32::from_bits(ctx.read_int(addr, 4) as u32) as f64,
        10 => f80_to_f64(&ctx.memory.read(addr, 10)),
        _ => f64::from_bits(ctx.read_int(addr, 8)),
    }
}

/// Store a value into a stack register or floating point memory operand.
fn float_dest(ctx: &mut ProcessorContext, desc: &OperandDesc, value: f64) {
    if let Some(index) = slot(desc) {
        ctx.registers.fpu.set_st(index, value);
        return;
    }

    let addr = match ctx.operand_addr(desc) {
        Some(addr) => addr,
        None => {
            warn!("Cannot store a float to {}", desc.text);
            return;
        }
    };

    match desc.size {
        4 => ctx.write_int(addr, (value as f32).to_bits() as u64, 4),
        10 => ctx.write_memory(addr, &f64_to_f80(value)),
        _ => ctx.write_int(addr, value.to_bits(), 8),
    }
}

pub fn fld(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let value = float_source(ctx, operand(instr, 0)?);
    ctx.registers.fpu.push(value);

    Ok(())
}

pub fn fild(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let src = operand(instr, 0)?;
    let value = to_signed(ctx.operand_value(src), src.size) as f64;
    ctx.registers.fpu.push(value);

    Ok(())
}

pub fn fst(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let value = st(ctx, 0);
    float_dest(ctx, operand(instr, 0)?, value);

    Ok(())
}

pub fn fstp(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    fst(ctx, instr)?;
    ctx.registers.fpu.pop();

    Ok(())
}

pub fn fist(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let dst = operand(instr, 0)?;
    let value = float_to_int(st(ctx, 0), dst.size);

    ctx.set_operand_value(dst, value)
}

pub fn fistp(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    fist(ctx, instr)?;
    ctx.registers.fpu.pop();

    Ok(())
}

/// Shared body of the two-operand arithmetic instructions.
///
/// With no operands the instruction acts on `st1` and `st0` and pops. With
/// one operand, `st0` is combined with it. With two, the first operand
/// (a stack register) is combined with the second.
fn arith(ctx: &mut ProcessorContext, instr: &Instruction, op: fn(f64, f64) -> f64, pop: bool) -> Result<()> {
    let pop = pop || instr.operands.is_empty();

    match instr.operands.len() {
        0 => {
            let result = op(st(ctx, 1), st(ctx, 0));
            ctx.registers.fpu.set_st(1, result);
        }
        1 => {
            let result = op(st(ctx, 0), float_source(ctx, operand(instr, 0)?));
            ctx.registers.fpu.set_st(0, result);
        }
        _ => {
            let dst = operand(instr, 0)?;
            let result = op(float_source(ctx, dst), float_source(ctx, operand(instr, 1)?));
            float_dest(ctx, dst, result);
        }
    }

    if pop {
        ctx.registers.fpu.pop();
    }

    Ok(())
}

pub fn fadd(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    arith(ctx, instr, |a, b| a + b, false)
}

pub fn faddp(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    arith(ctx, instr, |a, b| a + b, true)
}

pub fn fsub(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    arith(ctx, instr, |a, b| a - b, false)
}

pub fn fsubp(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    arith(ctx, instr, |a, b| a - b, true)
}

pub fn fmul(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    arith(ctx, instr, |a, b| a * b, false)
}

pub fn fmulp(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    arith(ctx, instr, |a, b| a * b, true)
}

pub fn fdiv(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    arith(ctx, instr, |a, b| a / b, false)
}

pub fn fdivp(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    arith(ctx, instr, |a, b| a / b, true)
}

pub fn fchs(ctx: &mut ProcessorContext, _instr: &Instruction) -> Result<()> {
    let value = -st(ctx, 0);
    ctx.registers.fpu.set_st(0, value);

    Ok(())
}

pub fn fabs(ctx: &mut ProcessorContext, _instr: &Instruction) -> Result<()> {
    let value = st(ctx, 0).abs();
    ctx.registers.fpu.set_st(0, value);

    Ok(())
}

pub fn fxch(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let other = instr.operands.iter().rev().find_map(slot).unwrap_or(1);
    let (a, b) = (st(ctx, 0), st(ctx, other));

    ctx.registers.fpu.set_st(0, b);
    ctx.registers.fpu.set_st(other, a);

    Ok(())
}

pub fn fldz(ctx: &mut ProcessorContext, _instr: &Instruction) -> Result<()> {
    ctx.registers.fpu.push(0.0);
    Ok(())
}

pub fn fld1(ctx: &mut ProcessorContext, _instr: &Instruction) -> Result<()> {
    ctx.registers.fpu.push(1.0);
    Ok(())
}

pub fn fcom(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let a = st(ctx, 0);
    let b = match instr.operands.last() {
        Some(src) => float_source(ctx, src),
        None => st(ctx, 1),
    };

    let (c3, c2, c0) = if a.is_nan() || b.is_nan() {
        (1, 1, 1)
    } else if a > b {
        (0, 0, 0)
    } else if a < b {
        (0, 0, 1)
    } else {
        (1, 0, 0)
    };

    ctx.registers.fpu.set("c3", c3)?;
    ctx.registers.fpu.set("c2", c2)?;
    ctx.registers.fpu.set("c0", c0)
}

pub fn fcomp(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    fcom(ctx, instr)?;
    ctx.registers.fpu.pop();

    Ok(())
}
