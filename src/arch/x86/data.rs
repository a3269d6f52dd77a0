//! Data movement

use crate::arch::x86::{acc_pair, counter, operand};
use crate::arch::ArchName;
use crate::context::ProcessorContext;
use crate::error::Result;
use crate::host::Instruction;
use crate::maths::{mask, msb, sign_extend};
use log::warn;

pub fn nop(_ctx: &mut ProcessorContext, _instr: &Instruction) -> Result<()> {
    Ok(())
}

pub fn mov(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let dst = operand(instr, 0)?;
    let value = ctx.operand_value(operand(instr, 1)?);

    ctx.set_operand_value(dst, value)
}

pub fn movzx(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    mov(ctx, instr)
}

pub fn movsx(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let dst = operand(instr, 0)?;
    let src = operand(instr, 1)?;
    let value = sign_extend(ctx.operand_value(src), src.size);

    ctx.set_operand_value(dst, value & mask(dst.size))
}

pub fn lea(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let dst = operand(instr, 0)?;
    let addr = ctx.operand_addr(operand(instr, 1)?).unwrap_or(0);

    ctx.set_operand_value(dst, addr & mask(dst.size))
}

pub fn xchg(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let a = operand(instr, 0)?;
    let b = operand(instr, 1)?;
    let (va, vb) = (ctx.operand_value(a), ctx.operand_value(b));

    ctx.set_operand_value(a, vb)?;
    ctx.set_operand_value(b, va)
}

pub fn push(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let src = operand(instr, 0)?;
    let value = sign_extend(ctx.operand_value(src), src.size) & ctx.arch().ptr_mask();

    ctx.push(value);
    Ok(())
}

pub fn pop(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let dst = operand(instr, 0)?;
    let value = ctx.pop();

    ctx.set_operand_value(dst, value)
}

static PUSHAD_ORDER: [&str; 8] = ["eax", "ecx", "edx", "ebx", "esp", "ebp", "esi", "edi"];

pub fn pushad(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    if ctx.arch() != ArchName::X86 {
        warn!("pushad is invalid outside 32-bit mode (0x{:08X})", instr.address);
        return Ok(());
    }

    let original_sp = ctx.sp();
    for reg in PUSHAD_ORDER.iter() {
        let value = if *reg == "esp" {
            original_sp
        } else {
            ctx.registers.get(reg)?
        };
        ctx.push(value);
    }

    Ok(())
}

pub fn popad(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    if ctx.arch() != ArchName::X86 {
        warn!("popad is invalid outside 32-bit mode (0x{:08X})", instr.address);
        return Ok(());
    }

    for reg in PUSHAD_ORDER.iter().rev() {
        let value = ctx.pop();
        if *reg != "esp" {
            ctx.registers.set(reg, value)?;
        }
    }

    Ok(())
}

pub fn leave(ctx: &mut ProcessorContext, _instr: &Instruction) -> Result<()> {
    let bp = ctx.arch().bp();
    let frame = ctx.registers.get(bp)?;

    ctx.set_sp(frame);
    let saved = ctx.pop();
    ctx.registers.set(bp, saved)
}

/// Sign-extend the accumulator's low half into itself.
fn extend_acc(ctx: &mut ProcessorContext, from: &str, from_width: usize, to: &str) -> Result<()> {
    let value = sign_extend(ctx.registers.get(from)?, from_width);
    ctx.registers.set(to, value)
}

pub fn cbw(ctx: &mut ProcessorContext, _instr: &Instruction) -> Result<()> {
    extend_acc(ctx, "al", 1, "ax")
}

pub fn cwde(ctx: &mut ProcessorContext, _instr: &Instruction) -> Result<()> {
    extend_acc(ctx, "ax", 2, "eax")
}

pub fn cdqe(ctx: &mut ProcessorContext, _instr: &Instruction) -> Result<()> {
    extend_acc(ctx, "eax", 4, "rax")
}

/// Fill the high-half partner with the accumulator's sign.
fn sign_fill(ctx: &mut ProcessorContext, width: usize) -> Result<()> {
    let (lo, hi) = acc_pair(width);
    let fill = if msb(ctx.registers.get(lo)?, width) {
        mask(width)
    } else {
        0
    };

    ctx.registers.set(hi, fill)
}

pub fn cwd(ctx: &mut ProcessorContext, _instr: &Instruction) -> Result<()> {
    sign_fill(ctx, 2)
}

pub fn cdq(ctx: &mut ProcessorContext, _instr: &Instruction) -> Result<()> {
    sign_fill(ctx, 4)
}

pub fn cqo(ctx: &mut ProcessorContext, _instr: &Instruction) -> Result<()> {
    sign_fill(ctx, 8)
}

pub fn cmov(ctx: &mut ProcessorContext, instr: &Instruction, taken: bool) -> Result<()> {
    if taken {
        mov(ctx, instr)
    } else {
        Ok(())
    }
}

pub fn setcc(ctx: &mut ProcessorContext, instr: &Instruction, taken: bool) -> Result<()> {
    ctx.set_operand_value(operand(instr, 0)?, taken as u64)
}

/// Most iterations a `rep` prefix is allowed to run.
const MAX_REPEAT: u64 = 0x10_0000;

/// Unit width of a string instruction, from its suffix or its operands.
fn string_unit(instr: &Instruction) -> usize {
    if let Some(op) = instr.operands.iter().find(|o| o.is_memory()) {
        return op.size;
    }

    match instr.mnemonic.chars().last() {
        Some('b') => 1,
        Some('w') => 2,
        Some('d') => 4,
        Some('q') => 8,
        _ => 1,
    }
}

/// Run a string instruction body once, or `count` times under a `rep`
/// prefix, stepping the index registers by `unit` in the direction `df`
/// selects.
fn repeat<F>(ctx: &mut ProcessorContext, instr: &Instruction, mut body: F) -> Result<()>
where
    F: FnMut(&mut ProcessorContext, usize) -> Result<()>,
{
    let unit = string_unit(instr);
    let count_reg = counter(ctx);

    let mut count = match instr.prefix.as_deref() {
        Some(_) => ctx.registers.get(count_reg)?,
        None => 1,
    };

    if count > MAX_REPEAT {
        warn!(
            "Clamping rep count 0x{:X} at 0x{:08X}",
            count, instr.address
        );
        count = MAX_REPEAT;
    }

    for _ in 0..count {
        body(ctx, unit)?;
    }

    if instr.prefix.is_some() {
        ctx.registers.set(count_reg, 0)?;
    }

    Ok(())
}

/// Advance an index register by one unit.
fn step(ctx: &mut ProcessorContext, reg: &str, unit: usize) -> Result<()> {
    let value = ctx.registers.get(reg)?;
    let next = if ctx.registers.flag("df") {
        value.wrapping_sub(unit as u64)
    } else {
        value.wrapping_add(unit as u64)
    };

    ctx.registers.set(reg, next & ctx.arch().ptr_mask())
}

pub fn movs(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    //SSE `movsd xmm, xmm/m64` shares a mnemonic with the string move.
    if instr.operands.iter().any(|o| o.is_register()) {
        return mov(ctx, instr);
    }

    let si = ctx.arch().native_gpr("esi");
    let di = ctx.arch().native_gpr("edi");

    repeat(ctx, instr, |ctx, unit| {
        let src = ctx.registers.get(si)?;
        let dst = ctx.registers.get(di)?;
        let data = ctx.memory.read(src, unit);

        ctx.write_memory(dst, &data);
        step(ctx, si, unit)?;
        step(ctx, di, unit)
    })
}

pub fn stos(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let di = ctx.arch().native_gpr("edi");

    repeat(ctx, instr, |ctx, unit| {
        let (acc, _) = acc_pair(unit);
        let value = ctx.registers.get(acc)?;
        let dst = ctx.registers.get(di)?;

        ctx.write_int(dst, value, unit);
        step(ctx, di, unit)
    })
}

pub fn lods(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let si = ctx.arch().native_gpr("esi");

    repeat(ctx, instr, |ctx, unit| {
        let (acc, _) = acc_pair(unit);
        let src = ctx.registers.get(si)?;
        let value = ctx.read_int(src, unit);

        ctx.registers.set(acc, value)?;
        step(ctx, si, unit)
    })
}
