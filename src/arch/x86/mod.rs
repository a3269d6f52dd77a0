//! Instruction semantics for the x86 family.
//!
//! Each supported mnemonic maps to a handler that mutates a
//! `ProcessorContext`. By the time a handler runs the instruction pointer
//! already points at the next instruction, so handlers only touch it to
//! branch.

mod alu;
mod data;
mod flow;
mod fpu;

use crate::context::ProcessorContext;
use crate::error::{Error, Result};
use crate::host::{Instruction, OperandDesc};
use log::warn;
use std::collections::HashMap;

/// An instruction implementation.
pub type Handler = fn(&mut ProcessorContext, &Instruction) -> Result<()>;

lazy_static! {
    /// Handlers for every mnemonic that is not a condition-code family.
    static ref HANDLERS: HashMap<&'static str, Handler> = {
        let mut h: HashMap<&'static str, Handler> = HashMap::new();

        h.insert("nop", data::nop);
        h.insert("mov", data::mov);
        h.insert("movzx", data::movzx);
        h.insert("movsx", data::movsx);
        h.insert("movsxd", data::movsx);
        h.insert("lea", data::lea);
        h.insert("xchg", data::xchg);
        h.insert("push", data::push);
        h.insert("pop", data::pop);
        h.insert("pushad", data::pushad);
        h.insert("pusha", data::pushad);
        h.insert("popad", data::popad);
        h.insert("popa", data::popad);
        h.insert("leave", data::leave);
        h.insert("cbw", data::cbw);
        h.insert("cwde", data::cwde);
        h.insert("cdqe", data::cdqe);
        h.insert("cwd", data::cwd);
        h.insert("cdq", data::cdq);
        h.insert("cqo", data::cqo);
        for m in &["movs", "movsb", "movsw", "movsd", "movsq"] {
            h.insert(*m, data::movs);
        }
        for m in &["stos", "stosb", "stosw", "stosd", "stosq"] {
            h.insert(*m, data::stos);
        }
        for m in &["lods", "lodsb", "lodsw", "lodsd", "lodsq"] {
            h.insert(*m, data::lods);
        }

        h.insert("add", alu::add);
        h.insert("adc", alu::adc);
        h.insert("sub", alu::sub);
        h.insert("sbb", alu::sbb);
        h.insert("cmp", alu::cmp);
        h.insert("inc", alu::inc);
        h.insert("dec", alu::dec);
        h.insert("neg", alu::neg);
        h.insert("and", alu::and);
        h.insert("or", alu::or);
        h.insert("xor", alu::xor);
        h.insert("test", alu::test);
        h.insert("not", alu::not);
        h.insert("shl", alu::shl);
        h.insert("sal", alu::shl);
        h.insert("shr", alu::shr);
        h.insert("sar", alu::sar);
        h.insert("rol", alu::rol);
        h.insert("ror", alu::ror);
        h.insert("mul", alu::mul);
        h.insert("imul", alu::imul);
        h.insert("div", alu::div);
        h.insert("idiv", alu::idiv);

        h.insert("jmp", flow::jmp);
        h.insert("call", flow::call);
        h.insert("ret", flow::ret);
        h.insert("retn", flow::ret);
        h.insert("loop", flow::loop_);
        h.insert("jcxz", flow::jcxz);
        h.insert("jecxz", flow::jcxz);
        h.insert("jrcxz", flow::jcxz);

        h.insert("fld", fpu::fld);
        h.insert("fild", fpu::fild);
        h.insert("fst", fpu::fst);
        h.insert("fstp", fpu::fstp);
        h.insert("fist", fpu::fist);
        h.insert("fistp", fpu::fistp);
        h.insert("fadd", fpu::fadd);
        h.insert("faddp", fpu::faddp);
        h.insert("fsub", fpu::fsub);
        h.insert("fsubp", fpu::fsubp);
        h.insert("fmul", fpu::fmul);
        h.insert("fmulp", fpu::fmulp);
        h.insert("fdiv", fpu::fdiv);
        h.insert("fdivp", fpu::fdivp);
        h.insert("fchs", fpu::fchs);
        h.insert("fabs", fpu::fabs);
        h.insert("fxch", fpu::fxch);
        h.insert("fldz", fpu::fldz);
        h.insert("fld1", fpu::fld1);
        h.insert("fcom", fpu::fcom);
        h.insert("fcomp", fpu::fcomp);

        h
    };
}

/// Emulate a single decoded instruction.
///
/// Mnemonics without an implementation are skipped with a warning.
pub fn execute(ctx: &mut ProcessorContext, instr: &Instruction) -> Result<()> {
    let mnemonic = instr.mnemonic.as_str();

    if let Some(handler) = HANDLERS.get(mnemonic) {
        return handler(ctx, instr);
    }

    if let Some(cc) = mnemonic.strip_prefix("cmov") {
        if let Some(taken) = condition(ctx, cc) {
            return data::cmov(ctx, instr, taken);
        }
    }

    if let Some(cc) = mnemonic.strip_prefix("set") {
        if let Some(taken) = condition(ctx, cc) {
            return data::setcc(ctx, instr, taken);
        }
    }

    if let Some(cc) = mnemonic.strip_prefix('j') {
        if let Some(taken) = condition(ctx, cc) {
            return flow::jcc(ctx, instr, taken);
        }
    }

    warn!(
        "Unsupported instruction at 0x{:08X}: {}",
        instr.address, instr.mnemonic
    );

    Ok(())
}

/// Evaluate an x86 condition code suffix against the current flags.
///
/// Yields `None` if the suffix is not a condition code.
pub fn condition(ctx: &ProcessorContext, cc: &str) -> Option<bool> {
    let r = &ctx.registers;
    let (cf, zf, sf, of, pf) = (r.flag("cf"), r.flag("zf"), r.flag("sf"), r.flag("of"), r.flag("pf"));

    Some(match cc {
        "o" => of,
        "no" => !of,
        "b" | "c" | "nae" => cf,
        "ae" | "nb" | "nc" => !cf,
        "e" | "z" => zf,
        "ne" | "nz" => !zf,
        "be" | "na" => cf || zf,
        "a" | "nbe" => !cf && !zf,
        "s" => sf,
        "ns" => !sf,
        "p" | "pe" => pf,
        "np" | "po" => !pf,
        "l" | "nge" => sf != of,
        "ge" | "nl" => sf == of,
        "le" | "ng" => zf || sf != of,
        "g" | "nle" => !zf && sf == of,
        _ => return None,
    })
}

/// Fetch an operand, failing if the host decoded fewer than expected.
fn operand(instr: &Instruction, index: usize) -> Result<&OperandDesc> {
    instr
        .operands
        .get(index)
        .ok_or(Error::InvalidInstruction(instr.address))
}

/// The accumulator and its high-half partner for a given operand width.
fn acc_pair(width: usize) -> (&'static str, &'static str) {
    match width {
        1 => ("al", "ah"),
        2 => ("ax", "dx"),
        4 => ("eax", "edx"),
        _ => ("rax", "rdx"),
    }
}

/// The counter register at pointer width.
fn counter(ctx: &ProcessorContext) -> &'static str {
    ctx.arch().native_gpr("ecx")
}

#[cfg(test)]
mod tests;
