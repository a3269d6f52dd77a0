//! Context tracing command

use crate::analysis::FunctionTracer;
use crate::cli::common::parse_address;
use crate::context::ProcessorContext;
use crate::error::Result;
use crate::host::Host;
use crate::project::Program;
use clap::ArgMatches;
use log::debug;
use rayon::prelude::*;
use std::io;
use std::sync::Arc;

/// Describe the instruction at a context's instruction pointer, the values
/// of its operands, and the arguments of any call it makes.
pub(crate) fn describe_context(ctx: &ProcessorContext) -> Vec<String> {
    let mut lines = Vec::new();

    let instr = match ctx.instruction() {
        Some(instr) => instr,
        None => {
            lines.push(format!("0x{:08X}: <undecodable>", ctx.ip()));
            return lines;
        }
    };

    let texts: Vec<&str> = instr.operands.iter().map(|o| o.text.as_str()).collect();
    lines.push(format!("0x{:08X}: {} {}", ctx.ip(), instr.mnemonic, texts.join(", ")));

    for (i, op) in ctx.operands().iter().enumerate() {
        match op.addr() {
            Some(addr) => lines.push(format!(
                "    op{} {} = 0x{:X} @ 0x{:08X}",
                i,
                op.text(),
                op.value(),
                addr
            )),
            None => lines.push(format!("    op{} {} = 0x{:X}", i, op.text(), op.value())),
        }
    }

    if instr.is_call() {
        match ctx.get_function_signature(None, None) {
            Ok(sig) => {
                lines.push(format!("    {}", sig.declaration()));
                for arg in sig.args(ctx) {
                    lines.push(format!("        {} {} = 0x{:X}", arg.ty, arg.name, arg.value));
                }
            }
            Err(e) => debug!("No arguments for call at 0x{:08X}: {}", ctx.ip(), e),
        }
    }

    let names = ctx.variables.names();
    if !names.is_empty() {
        lines.push(format!("    variables: {}", names.join(", ")));
    }

    lines
}

pub(crate) fn trace_address(host: Arc<dyn Host>, prog: &Program, address: u64, depth: usize) -> Result<Vec<String>> {
    let tracer = FunctionTracer::with_config(host, address, prog.emulator().clone())?;
    let mut lines = Vec::new();

    for (i, ctx) in tracer.iter_context_at(address, depth)?.enumerate() {
        lines.push(format!("context {}:", i + 1));
        lines.extend(describe_context(&ctx));
    }

    Ok(lines)
}

/// Emulate every way of reaching each requested address and display the
/// operands found there.
pub fn trace<'a>(host: Arc<dyn Host>, prog: &Program, argv: &ArgMatches<'a>) -> io::Result<()> {
    let addresses = argv
        .values_of("address")
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Did not provide an address"))?
        .map(parse_address)
        .collect::<io::Result<Vec<u64>>>()?;

    let depth = match argv.value_of("depth") {
        Some(depth) => depth.parse().map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a valid depth", depth),
            )
        })?,
        None => prog.emulator().default_depth,
    };

    let reports = addresses
        .par_iter()
        .map(|address| trace_address(host.clone(), prog, *address, depth))
        .collect::<Result<Vec<_>>>()?;

    for (address, lines) in addresses.iter().zip(reports) {
        println!("== 0x{:08X} ==", address);
        for line in lines {
            println!("{}", line);
        }
    }

    Ok(())
}
