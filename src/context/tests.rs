use crate::arch::ArchName;
use crate::context::{Data, DataType, ProcessorContext};
use crate::error::Error;
use crate::host::{ArgDecl, CallingConvention, Instruction, OperandDesc, Prototype, Segment, StaticHost};
use std::sync::Arc;

const CALLER: u64 = 0x1000;
const CALLEE: u64 = 0x2000;
const STRLEN: u64 = 0x5000;
const GLOBAL: u64 = 0x40C000;

fn ins(mnemonic: &str, length: u64, operands: Vec<OperandDesc>) -> Instruction {
    Instruction::new(0, mnemonic, length, operands)
}

fn prototype(args: &[(&str, &str)]) -> Prototype {
    Prototype {
        name: "sub_2000".to_string(),
        return_type: "int".to_string(),
        convention: Some(CallingConvention::Cdecl),
        args: args
            .iter()
            .map(|(ty, name)| ArgDecl {
                ty: ty.to_string(),
                name: name.to_string(),
            })
            .collect(),
    }
}

/// A caller that pushes two arguments and calls a one-argument function,
/// then calls `strlen` on a global string.
fn sample_host() -> StaticHost {
    let mut host = StaticHost::new(ArchName::X86);
    host.add_segment(Segment::new(".data", GLOBAL, 0x1000, Some(b"secret\0".to_vec())));

    let end = host.add_code(
        CALLER,
        vec![
            ins("push", 2, vec![OperandDesc::imm("2", 1, 2)]),
            ins("push", 2, vec![OperandDesc::imm("1", 1, 1)]),
            ins("call", 5, vec![OperandDesc::near("sub_2000", 4, CALLEE)]),
            ins("push", 5, vec![OperandDesc::imm("offset g_secret", 4, GLOBAL)]),
            ins("call", 5, vec![OperandDesc::near("_strlen", 4, STRLEN)]),
        ],
    );
    host.add_function(CALLER, end);

    let end = host.add_code(
        CALLEE,
        vec![
            ins("mov", 4, vec![OperandDesc::reg("eax", 4), OperandDesc::mem("[esp+arg_0]", 4, Some("esp"), 4)]),
            ins("mov", 8, vec![OperandDesc::mem("[esp+var_4]", 4, Some("esp"), -4), OperandDesc::imm("7", 4, 7)]),
            ins("mov", 8, vec![OperandDesc::mem("[esp+var_4]", 4, Some("esp"), -4), OperandDesc::imm("9", 4, 9)]),
            ins("retn", 1, vec![]),
        ],
    );
    host.add_function(CALLEE, end);
    host.add_frame_member(CALLEE, "arg_0", 4, 4);
    host.add_frame_member(CALLEE, "var_4", -4, 4);
    host.set_prototype(CALLEE, Some(prototype(&[("char *", "buf")])));

    host.add_name(CALLEE, "sub_2000", None);
    host.add_name(STRLEN, "_strlen", None);
    host.add_name(GLOBAL, "g_secret", Some(7));
    host
}

fn context() -> ProcessorContext {
    ProcessorContext::new(Arc::new(sample_host()))
}

/// Run the caller up to (not including) the instruction at `stop`.
fn run_until(ctx: &mut ProcessorContext, stop: u64) {
    let mut address = CALLER;
    while address != stop {
        ctx.execute(address).unwrap();
        address = ctx.ip();
    }
}

#[test]
fn read_data_types() {
    let mut ctx = ProcessorContext::from_arch("x86").unwrap();
    ctx.memory.write(0x3000, b"abc\0def");
    ctx.memory.write(0x4000, &[b'h', 0, b'i', 0, 0, 0]);

    assert_eq!(ctx.read_data(0x3000, None, DataType::String), Data::Bytes(b"abc".to_vec()));
    assert_eq!(ctx.read_data(0x3000, Some(5), DataType::String), Data::Bytes(b"abc\0d".to_vec()));
    assert_eq!(
        ctx.read_data(0x4000, None, DataType::WideString),
        Data::Bytes(vec![b'h', 0, b'i', 0])
    );
    assert_eq!(ctx.read_data(0x3000, None, DataType::Word).as_int(), Some(0x6261));
    assert_eq!(ctx.read_data(0x3000, None, DataType::Dword).as_int(), Some(0x0063_6261));
    assert_eq!(ctx.read_data(0x3000, None, DataType::Byte).as_int(), Some(0x61));
}

#[test]
fn read_data_stops_at_limit() {
    let mut ctx = ProcessorContext::from_arch("x86").unwrap();
    let limit = ctx.config().max_string_length;
    ctx.memory.write(0x3000, &vec![0x41; limit + 10]);

    let data = ctx.read_data(0x3000, None, DataType::String);
    assert_eq!(data.as_bytes().map(|b| b.len()), Some(limit));
}

#[test]
fn operands_at_ip() {
    let mut ctx = context();
    run_until(&mut ctx, CALLER + 4);

    let operands = ctx.operands();
    assert_eq!(operands.len(), 1);
    assert_eq!(operands[0].text(), "sub_2000");
    assert_eq!(operands[0].value(), CALLEE);
    assert_eq!(operands[0].addr(), None);
    assert!(operands[0].is_func_ptr());

    ctx.set_ip(CALLEE);
    let operands = ctx.operands();
    assert_eq!(operands[1].addr(), Some(ctx.sp() + 4));
    assert!(!operands[1].is_func_ptr());
}

#[test]
fn function_args_forced_count() {
    let mut ctx = context();
    run_until(&mut ctx, CALLER + 4);

    assert_eq!(ctx.get_function_args(None, None).unwrap(), vec![1]);
    assert_eq!(ctx.get_function_args(None, Some(2)).unwrap(), vec![1, 2]);
    assert_eq!(ctx.get_function_args(Some(CALLEE), Some(2)).unwrap(), vec![1, 2]);
}

#[test]
fn function_args_without_signature() {
    let mut ctx = context();
    run_until(&mut ctx, CALLER + 4);

    assert!(matches!(
        ctx.get_function_args(Some(STRLEN), None),
        Err(Error::SignatureResolution(STRLEN))
    ));
    assert_eq!(ctx.get_function_args(Some(STRLEN), Some(1)).unwrap(), vec![1]);
}

#[test]
fn function_args_at_entry() {
    let mut ctx = context();
    run_until(&mut ctx, CALLER + 4);

    ctx.push(CALLER + 9);
    ctx.set_ip(CALLEE);
    assert_eq!(ctx.get_function_args(None, None).unwrap(), vec![1]);
}

#[test]
fn function_signature() {
    let mut ctx = context();
    run_until(&mut ctx, CALLER + 4);

    let mut sig = ctx.get_function_signature(None, None).unwrap();
    assert_eq!(sig.declaration(), "int __cdecl sub_2000(char *buf);");

    let args = sig.args(&ctx);
    assert_eq!(args.len(), 1);
    assert_eq!((args[0].name.as_str(), args[0].ty.as_str(), args[0].value), ("buf", "char *", 1));

    sig.push_arg_type("int new_arg");
    assert_eq!(sig.declaration(), "int __cdecl sub_2000(char *buf, int new_arg);");

    let args = sig.args(&ctx);
    assert_eq!(args[1].name, "new_arg");
    assert_eq!(args[1].value, 2);
}

#[test]
fn function_signature_forced() {
    let mut ctx = context();
    run_until(&mut ctx, CALLER + 4);

    assert!(matches!(
        ctx.get_function_signature(Some(STRLEN), None),
        Err(Error::SignatureResolution(_))
    ));

    let sig = ctx.get_function_signature(Some(STRLEN), Some(2)).unwrap();
    assert_eq!(sig.declaration(), "int __cdecl no_name(int a1, int a2);");
    assert_eq!(sig.args(&ctx).iter().map(|a| a.value).collect::<Vec<_>>(), vec![1, 2]);

    //A real prototype is not overridden by a forced count.
    let sig = ctx.get_function_signature(Some(CALLEE), Some(3)).unwrap();
    assert_eq!(sig.arg_types.len(), 1);
}

#[test]
fn calls_are_recorded() {
    let mut ctx = context();
    run_until(&mut ctx, CALLER + 9);

    let call = &ctx.func_calls[&(CALLER + 4)];
    assert_eq!(call.target, Some(CALLEE));
    assert_eq!(call.name.as_deref(), Some("sub_2000"));
    assert_eq!(call.args, vec![1]);
}

#[test]
fn builtin_dispatch() {
    let mut ctx = context();
    run_until(&mut ctx, CALLER + 19);

    assert_eq!(ctx.registers.get("eax").unwrap(), 6);
    assert!(!ctx.func_calls.contains_key(&(CALLER + 14)));
    assert!(ctx.variables.contains(GLOBAL));
    assert_eq!(ctx.variables.get(GLOBAL).map(|v| v.size), Some(7));
}

#[test]
fn variables_track_history() {
    let mut ctx = context();
    run_until(&mut ctx, CALLER + 4);

    ctx.push(CALLER + 9);
    let entry_sp = ctx.sp();
    let mut address = CALLEE;
    for _ in 0..3 {
        ctx.execute(address).unwrap();
        address = ctx.ip();
    }

    let mut names = ctx.variables.names();
    names.sort_unstable();
    assert_eq!(names, vec!["arg_0", "var_4"]);

    let arg = ctx.variables.get(entry_sp + 4).unwrap();
    assert_eq!(arg.name, "arg_0");
    assert!(arg.history.is_empty());
    assert_eq!(arg.data(&ctx.memory), vec![1, 0, 0, 0]);

    let local = ctx.variables.get_by_name("var_4").unwrap();
    assert_eq!(local.address, entry_sp - 4);
    assert_eq!(local.history, vec![vec![0, 0, 0, 0], vec![7, 0, 0, 0]]);
    assert_eq!(local.data(&ctx.memory), vec![9, 0, 0, 0]);
}

#[test]
fn push_pop_round_trip() {
    let mut ctx = ProcessorContext::from_arch("x86_64").unwrap();
    let sp = ctx.sp();

    ctx.push(0x1122_3344_5566_7788);
    assert_eq!(ctx.sp(), sp - 8);
    assert_eq!(ctx.pop(), 0x1122_3344_5566_7788);
    assert_eq!(ctx.sp(), sp);
}

#[test]
fn unknown_arch() {
    assert!(matches!(
        ProcessorContext::from_arch("z80"),
        Err(Error::UnsupportedArchitecture(_))
    ));
}

/// A caller that pushes one argument for a `lstrlenA` import and two for a
/// stdcall function.
fn stdcall_host() -> StaticHost {
    let mut host = StaticHost::new(ArchName::X86);
    host.add_segment(Segment::new(".data", GLOBAL, 0x1000, Some(b"secret\0".to_vec())));

    let end = host.add_code(
        CALLER,
        vec![
            ins("push", 5, vec![OperandDesc::imm("offset g_secret", 4, GLOBAL)]),
            ins("call", 6, vec![OperandDesc::mem("ds:__imp_lstrlenA", 4, None, 0x40_D000)]),
            ins("push", 2, vec![OperandDesc::imm("2", 1, 2)]),
            ins("push", 2, vec![OperandDesc::imm("1", 1, 1)]),
            ins("call", 5, vec![OperandDesc::near("sub_2000", 4, CALLEE)]),
        ],
    );
    host.add_function(CALLER, end);

    let end = host.add_code(CALLEE, vec![ins("retn", 3, vec![OperandDesc::imm("8", 2, 8)])]);
    host.add_function(CALLEE, end);
    let mut proto = prototype(&[("int", "a"), ("int", "b")]);
    proto.convention = Some(CallingConvention::Stdcall);
    host.set_prototype(CALLEE, Some(proto));

    host.add_name(0x40_D000, "__imp_lstrlenA", None);
    host.add_name(CALLEE, "sub_2000", None);
    host
}

#[test]
fn stdcall_builtin_releases_arguments() {
    let mut ctx = ProcessorContext::new(Arc::new(stdcall_host()));
    let sp = ctx.sp();

    ctx.execute(CALLER).unwrap();
    ctx.execute(CALLER + 5).unwrap();

    assert_eq!(ctx.registers.get("eax").unwrap(), 6);
    assert_eq!(ctx.ip(), CALLER + 11);
    assert_eq!(ctx.sp(), sp);
}

#[test]
fn stdcall_call_releases_arguments() {
    let mut ctx = ProcessorContext::new(Arc::new(stdcall_host()));
    let sp = ctx.sp();

    let mut address = CALLER;
    while address < CALLER + 20 {
        ctx.execute(address).unwrap();
        address = ctx.ip();
    }

    assert_eq!(ctx.func_calls[&(CALLER + 15)].args, vec![1, 2]);
    assert_eq!(ctx.sp(), sp);
}

#[test]
fn cdecl_builtin_leaves_arguments() {
    let mut ctx = context();
    run_until(&mut ctx, CALLER + 19);

    //Three pushes, none released by the callees.
    assert_eq!(ctx.sp(), ctx.config().stack_pointer - 12);
}
