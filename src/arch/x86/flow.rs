//! Control transfer

use crate::arch::x86::{counter, operand};
use crate::context::ProcessorContext;
use crate::error::Result;
use crate::host::Instruction;

pub fn jmp(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let target = ctx.operand_value(operand(instr, 0)?);
    ctx.set_ip(target);

    Ok(())
}

pub fn jcc(ctx: &mut ProcessorContext, instr: &Instruction, taken: bool) -> Result<()> {
    if taken {
        jmp(ctx, instr)
    } else {
        Ok(())
    }
}

/// Calls never enter the callee: the return address is not pushed and the
/// instruction pointer stays on the instruction after the call.
pub fn call(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    ctx.dispatch_call(instr)
}

pub fn ret(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let target = ctx.pop();
    ctx.set_ip(target);

    if let Some(imm) = instr.operands.first() {
        let release = ctx.operand_value(imm);
        let sp = ctx.sp().wrapping_add(release) & ctx.arch().ptr_mask();
        ctx.set_sp(sp);
    }

    Ok(())
}

pub fn loop_(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let reg = counter(ctx);
    let count = ctx.registers.get(reg)?.wrapping_sub(1) & ctx.arch().ptr_mask();

    ctx.registers.set(reg, count)?;
    jcc(ctx, instr, count != 0)
}

pub fn jcxz(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let reg = match instr.mnemonic.as_str() {
        "jcxz" => "cx",
        "jecxz" => "ecx",
        _ => "rcx",
    };
    let count = ctx.registers.get(reg)?;

    jcc(ctx, instr, count == 0)
}
