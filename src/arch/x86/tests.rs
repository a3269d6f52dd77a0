use crate::arch::x86::condition;
use crate::arch::x86::fpu::{f64_to_f80, f80_to_f64};
use crate::arch::ArchName;
use crate::context::ProcessorContext;
use crate::host::{Instruction, OperandDesc, StaticHost};
use std::sync::Arc;

const BASE: u64 = 0x1000;

fn reg(name: &str, size: usize) -> OperandDesc {
    OperandDesc::reg(name, size)
}

fn imm(value: i64, size: usize) -> OperandDesc {
    OperandDesc::imm(&format!("{}", value), size, value as u64)
}

fn near(target: u64) -> OperandDesc {
    OperandDesc::near(&format!("loc_{:X}", target), 4, target)
}

fn mem(address: u64, size: usize) -> OperandDesc {
    OperandDesc::mem(&format!("ds:{:X}h", address), size, None, address as i64)
}

fn ins(mnemonic: &str, length: u64, operands: Vec<OperandDesc>) -> Instruction {
    Instruction::new(0, mnemonic, length, operands)
}

/// Lay out `code` at `BASE` and run it until control leaves it.
fn emulate<F>(arch: ArchName, code: Vec<Instruction>, setup: F) -> ProcessorContext
where
    F: FnOnce(&mut ProcessorContext),
{
    let mut host = StaticHost::new(arch);
    let end = host.add_code(BASE, code);
    let mut ctx = ProcessorContext::new(Arc::new(host));

    setup(&mut ctx);

    let mut address = BASE;
    while BASE <= address && address < end {
        ctx.execute(address).unwrap();
        address = ctx.ip();
    }

    ctx
}

fn x86(code: Vec<Instruction>) -> ProcessorContext {
    emulate(ArchName::X86, code, |_| {})
}

#[test]
fn add_sets_carry_and_zero() {
    let ctx = x86(vec![
        ins("mov", 5, vec![reg("eax", 4), imm(-1, 4)]),
        ins("add", 3, vec![reg("eax", 4), imm(1, 1)]),
    ]);

    assert_eq!(ctx.registers.get("eax").unwrap(), 0);
    assert!(ctx.registers.flag("cf"));
    assert!(ctx.registers.flag("zf"));
    assert!(ctx.registers.flag("pf"));
    assert!(ctx.registers.flag("af"));
    assert!(!ctx.registers.flag("sf"));
    assert!(!ctx.registers.flag("of"));
}

#[test]
fn sub_signed_overflow() {
    let ctx = x86(vec![
        ins("mov", 2, vec![reg("al", 1), imm(0x80, 1)]),
        ins("sub", 2, vec![reg("al", 1), imm(1, 1)]),
    ]);

    assert_eq!(ctx.registers.get("al").unwrap(), 0x7F);
    assert!(ctx.registers.flag("of"));
    assert!(!ctx.registers.flag("cf"));
    assert!(!ctx.registers.flag("sf"));
}

#[test]
fn cmp_then_jl_taken() {
    let ctx = x86(vec![
        ins("mov", 5, vec![reg("eax", 4), imm(3, 4)]),
        ins("cmp", 3, vec![reg("eax", 4), imm(5, 1)]),
        ins("jl", 2, vec![near(0x5000)]),
    ]);

    assert_eq!(ctx.ip(), 0x5000);
    assert!(ctx.registers.flag("cf"));
    assert!(ctx.registers.flag("sf"));
    assert!(!ctx.registers.flag("of"));
}

#[test]
fn cmp_then_jl_not_taken() {
    let ctx = x86(vec![
        ins("mov", 5, vec![reg("eax", 4), imm(7, 4)]),
        ins("cmp", 3, vec![reg("eax", 4), imm(5, 1)]),
        ins("jl", 2, vec![near(0x5000)]),
    ]);

    assert_eq!(ctx.ip(), BASE + 10);
}

#[test]
fn inc_preserves_carry() {
    let ctx = emulate(ArchName::X86, vec![ins("inc", 1, vec![reg("eax", 4)])], |ctx| {
        ctx.registers.set("eax", 0xFFFF_FFFF).unwrap();
        ctx.registers.set_flag("cf", true);
    });

    assert_eq!(ctx.registers.get("eax").unwrap(), 0);
    assert!(ctx.registers.flag("zf"));
    assert!(ctx.registers.flag("cf"));
}

#[test]
fn logic_clears_carry() {
    let ctx = emulate(
        ArchName::X86,
        vec![ins("xor", 2, vec![reg("eax", 4), reg("eax", 4)])],
        |ctx| {
            ctx.registers.set("eax", 0x1234).unwrap();
            ctx.registers.set_flag("cf", true);
            ctx.registers.set_flag("of", true);
        },
    );

    assert_eq!(ctx.registers.get("eax").unwrap(), 0);
    assert!(ctx.registers.flag("zf"));
    assert!(!ctx.registers.flag("cf"));
    assert!(!ctx.registers.flag("of"));
}

#[test]
fn shifts() {
    let ctx = emulate(
        ArchName::X86,
        vec![
            ins("shl", 2, vec![reg("eax", 4), imm(1, 1)]),
            ins("sar", 3, vec![reg("ebx", 4), imm(4, 1)]),
            ins("shr", 3, vec![reg("ecx", 4), imm(4, 1)]),
        ],
        |ctx| {
            ctx.registers.set("eax", 0x8000_0001).unwrap();
            ctx.registers.set("ebx", 0xF000_0000).unwrap();
            ctx.registers.set("ecx", 0xF000_0008).unwrap();
        },
    );

    assert_eq!(ctx.registers.get("eax").unwrap(), 2);
    assert_eq!(ctx.registers.get("ebx").unwrap(), 0xFF00_0000);
    assert_eq!(ctx.registers.get("ecx").unwrap(), 0x0F00_0000);
    assert!(ctx.registers.flag("cf"));
}

#[test]
fn rotates() {
    let ctx = emulate(ArchName::X86, vec![ins("rol", 2, vec![reg("al", 1), imm(1, 1)])], |ctx| {
        ctx.registers.set("al", 0x81).unwrap();
    });

    assert_eq!(ctx.registers.get("al").unwrap(), 0x03);
    assert!(ctx.registers.flag("cf"));

    let ctx = emulate(ArchName::X86, vec![ins("ror", 3, vec![reg("al", 1), imm(2, 1)])], |ctx| {
        ctx.registers.set("al", 0x03).unwrap();
    });

    assert_eq!(ctx.registers.get("al").unwrap(), 0xC0);
    assert!(ctx.registers.flag("cf"));
}

#[test]
fn multiply() {
    let ctx = emulate(ArchName::X86, vec![ins("mul", 2, vec![reg("ecx", 4)])], |ctx| {
        ctx.registers.set("eax", 0x8000_0000).unwrap();
        ctx.registers.set("ecx", 4).unwrap();
    });

    assert_eq!(ctx.registers.get("eax").unwrap(), 0);
    assert_eq!(ctx.registers.get("edx").unwrap(), 2);
    assert!(ctx.registers.flag("cf"));

    let ctx = emulate(
        ArchName::X86,
        vec![ins("imul", 3, vec![reg("eax", 4), reg("ecx", 4), imm(-3, 1)])],
        |ctx| {
            ctx.registers.set("ecx", 5).unwrap();
        },
    );

    assert_eq!(ctx.registers.get("eax").unwrap(), 0xFFFF_FFF1);
    assert!(!ctx.registers.flag("of"));
}

#[test]
fn divide() {
    let ctx = emulate(ArchName::X86, vec![ins("div", 2, vec![reg("ecx", 4)])], |ctx| {
        ctx.registers.set("eax", 100).unwrap();
        ctx.registers.set("ecx", 7).unwrap();
    });

    assert_eq!(ctx.registers.get("eax").unwrap(), 14);
    assert_eq!(ctx.registers.get("edx").unwrap(), 2);

    let ctx = emulate(
        ArchName::X86,
        vec![ins("cdq", 1, vec![]), ins("idiv", 2, vec![reg("ecx", 4)])],
        |ctx| {
            ctx.registers.set("eax", (-100i64) as u64).unwrap();
            ctx.registers.set("ecx", 7).unwrap();
        },
    );

    assert_eq!(ctx.registers.get("eax").unwrap(), 0xFFFF_FFF2);
    assert_eq!(ctx.registers.get("edx").unwrap(), 0xFFFF_FFFE);
}

#[test]
fn divide_by_zero_is_skipped() {
    let ctx = emulate(ArchName::X86, vec![ins("div", 2, vec![reg("ecx", 4)])], |ctx| {
        ctx.registers.set("eax", 100).unwrap();
    });

    assert_eq!(ctx.registers.get("eax").unwrap(), 100);
    assert_eq!(ctx.ip(), BASE + 2);
}

#[test]
fn signed_divide_overflow_is_skipped() {
    let ctx = emulate(ArchName::X86_64, vec![ins("idiv", 3, vec![reg("rcx", 8)])], |ctx| {
        ctx.registers.set("rdx", 0x8000_0000_0000_0000).unwrap();
        ctx.registers.set("rax", 0).unwrap();
        ctx.registers.set("rcx", u64::MAX).unwrap();
    });

    assert_eq!(ctx.registers.get("rax").unwrap(), 0);
    assert_eq!(ctx.registers.get("rdx").unwrap(), 0x8000_0000_0000_0000);
    assert_eq!(ctx.ip(), BASE + 3);

    let ctx = emulate(ArchName::X86, vec![ins("idiv", 2, vec![reg("ecx", 4)])], |ctx| {
        ctx.registers.set("edx", 0xFFFF_FFFF).unwrap();
        ctx.registers.set("eax", 0x8000_0000).unwrap();
        ctx.registers.set("ecx", 0xFFFF_FFFF).unwrap();
    });

    assert_eq!(ctx.registers.get("eax").unwrap(), 0x8000_0000);
}

#[test]
fn push_pop() {
    let ctx = x86(vec![
        ins("push", 5, vec![imm(0x1234, 4)]),
        ins("pop", 1, vec![reg("ebx", 4)]),
    ]);

    assert_eq!(ctx.registers.get("ebx").unwrap(), 0x1234);
    assert_eq!(ctx.sp(), ctx.config().stack_pointer);
}

#[test]
fn ret_releases_arguments() {
    let mut start_sp = 0;
    let ctx = emulate(ArchName::X86, vec![ins("retn", 3, vec![imm(8, 2)])], |ctx| {
        start_sp = ctx.sp();
        ctx.push(0xAA);
        ctx.push(0x5000);
    });

    assert_eq!(ctx.ip(), 0x5000);
    assert_eq!(ctx.sp(), start_sp + 4);
}

#[test]
fn call_is_stepped_over() {
    let mut host = StaticHost::new(ArchName::X86);
    host.add_code(BASE, vec![ins("call", 5, vec![near(0x4000)])]);
    host.add_name(0x4000, "sub_4000", None);

    let mut ctx = ProcessorContext::new(Arc::new(host));
    let sp = ctx.sp();
    ctx.execute(BASE).unwrap();

    assert_eq!(ctx.ip(), BASE + 5);
    assert_eq!(ctx.sp(), sp);

    let call = &ctx.func_calls[&BASE];
    assert_eq!(call.target, Some(0x4000));
    assert_eq!(call.name.as_deref(), Some("sub_4000"));
}

#[test]
fn rep_stos() {
    let ctx = emulate(
        ArchName::X86,
        vec![ins("stosd", 2, vec![]).with_prefix("rep")],
        |ctx| {
            ctx.registers.set("edi", 0x3000).unwrap();
            ctx.registers.set("ecx", 4).unwrap();
            ctx.registers.set("eax", 0x4141_4141).unwrap();
        },
    );

    assert_eq!(ctx.memory.read(0x3000, 16), vec![0x41; 16]);
    assert_eq!(ctx.memory.read(0x3010, 1), vec![0]);
    assert_eq!(ctx.registers.get("ecx").unwrap(), 0);
    assert_eq!(ctx.registers.get("edi").unwrap(), 0x3010);
}

#[test]
fn rep_movs() {
    let ctx = emulate(
        ArchName::X86,
        vec![ins("movsb", 2, vec![]).with_prefix("rep")],
        |ctx| {
            ctx.memory.write(0x3000, b"hello");
            ctx.registers.set("esi", 0x3000).unwrap();
            ctx.registers.set("edi", 0x3100).unwrap();
            ctx.registers.set("ecx", 5).unwrap();
        },
    );

    assert_eq!(ctx.memory.read(0x3100, 5), b"hello".to_vec());
    assert_eq!(ctx.registers.get("esi").unwrap(), 0x3005);
}

#[test]
fn loop_counts_down() {
    let ctx = emulate(
        ArchName::X86,
        vec![ins("inc", 1, vec![reg("eax", 4)]), ins("loop", 2, vec![near(BASE)])],
        |ctx| {
            ctx.registers.set("ecx", 3).unwrap();
        },
    );

    assert_eq!(ctx.registers.get("eax").unwrap(), 3);
    assert_eq!(ctx.registers.get("ecx").unwrap(), 0);
}

#[test]
fn setcc_and_cmov() {
    let ctx = x86(vec![
        ins("mov", 5, vec![reg("eax", 4), imm(1, 4)]),
        ins("cmp", 3, vec![reg("eax", 4), imm(1, 1)]),
        ins("setz", 3, vec![reg("bl", 1)]),
        ins("cmovnz", 3, vec![reg("ecx", 4), reg("eax", 4)]),
        ins("cmovz", 3, vec![reg("edx", 4), reg("eax", 4)]),
    ]);

    assert_eq!(ctx.registers.get("bl").unwrap(), 1);
    assert_eq!(ctx.registers.get("ecx").unwrap(), 0);
    assert_eq!(ctx.registers.get("edx").unwrap(), 1);
}

#[test]
fn condition_codes() {
    let mut ctx = ProcessorContext::from_arch("x86").unwrap();
    ctx.registers.set_flag("zf", true);

    assert_eq!(condition(&ctx, "e"), Some(true));
    assert_eq!(condition(&ctx, "be"), Some(true));
    assert_eq!(condition(&ctx, "g"), Some(false));
    assert_eq!(condition(&ctx, "mp"), None);
}

#[test]
fn unsupported_instruction_is_skipped() {
    let ctx = x86(vec![
        ins("cpuid", 2, vec![]),
        ins("mov", 5, vec![reg("eax", 4), imm(9, 4)]),
    ]);

    assert_eq!(ctx.registers.get("eax").unwrap(), 9);
}

#[test]
fn mov_zero_extends_on_x64() {
    let ctx = emulate(
        ArchName::X86_64,
        vec![ins("mov", 5, vec![reg("eax", 4), imm(-1, 4)])],
        |ctx| {
            ctx.registers.set("rax", 0x1234_5678_0000_0000).unwrap();
        },
    );

    assert_eq!(ctx.registers.get("rax").unwrap(), 0xFFFF_FFFF);
}

#[test]
fn pushad_popad() {
    let ctx = emulate(
        ArchName::X86,
        vec![
            ins("pushad", 1, vec![]),
            ins("mov", 5, vec![reg("eax", 4), imm(0, 4)]),
            ins("popad", 1, vec![]),
        ],
        |ctx| {
            ctx.registers.set("eax", 0x11).unwrap();
            ctx.registers.set("edi", 0x77).unwrap();
        },
    );

    assert_eq!(ctx.registers.get("eax").unwrap(), 0x11);
    assert_eq!(ctx.registers.get("edi").unwrap(), 0x77);
    assert_eq!(ctx.sp(), ctx.config().stack_pointer);
}

#[test]
fn fpu_arithmetic() {
    let ctx = x86(vec![
        ins("fld1", 2, vec![]),
        ins("fld1", 2, vec![]),
        ins("faddp", 2, vec![]),
        ins("fistp", 6, vec![mem(0x3000, 4)]),
    ]);

    assert_eq!(ctx.read_int(0x3000, 4), 2);
    assert_eq!(ctx.registers.fpu.st(0), None);
}

#[test]
fn fpu_memory_operands() {
    let ctx = emulate(
        ArchName::X86,
        vec![
            ins("fld", 6, vec![mem(0x3000, 8)]),
            ins("fmul", 6, vec![mem(0x3000, 8)]),
            ins("fstp", 6, vec![mem(0x3008, 8)]),
            ins("fld", 6, vec![mem(0x3000, 8)]),
            ins("fistp", 6, vec![mem(0x3010, 4)]),
        ],
        |ctx| {
            ctx.write_int(0x3000, 2.5f64.to_bits(), 8);
        },
    );

    assert_eq!(f64::from_bits(ctx.read_int(0x3008, 8)), 6.25);
    assert_eq!(ctx.read_int(0x3010, 4), 2);
}

#[test]
fn fpu_compare() {
    let ctx = x86(vec![
        ins("fld1", 2, vec![]),
        ins("fldz", 2, vec![]),
        ins("fcom", 2, vec![reg("st(1)", 8)]),
    ]);

    assert_eq!(ctx.registers.get("c0").unwrap(), 1);
    assert_eq!(ctx.registers.get("c3").unwrap(), 0);
    assert_eq!(ctx.registers.get_float("st1").unwrap(), Some(1.0));
}

#[test]
fn fpu_exchange_and_sign() {
    let ctx = x86(vec![
        ins("fld1", 2, vec![]),
        ins("fldz", 2, vec![]),
        ins("fxch", 2, vec![reg("st(1)", 8)]),
        ins("fchs", 2, vec![]),
    ]);

    assert_eq!(ctx.registers.get_float("st0").unwrap(), Some(-1.0));
    assert_eq!(ctx.registers.get_float("st1").unwrap(), Some(0.0));
}

#[test]
fn extended_precision() {
    assert_eq!(f64_to_f80(1.0), [0, 0, 0, 0, 0, 0, 0, 0x80, 0xFF, 0x3F]);
    assert_eq!(f80_to_f64(&[0, 0, 0, 0, 0, 0, 0, 0xC0, 0x00, 0xC0]), -3.0);

    for value in &[-1.5, 5e-324, 1e300, f64::INFINITY] {
        assert_eq!(f80_to_f64(&f64_to_f80(*value)), *value);
    }
}
