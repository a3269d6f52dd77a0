//! Basic block listing command

use crate::analysis::{BasicBlock, FlowChart};
use crate::cli::common::parse_address;
use crate::error::Result;
use crate::host::Host;
use crate::project::Program;
use clap::ArgMatches;
use std::io;
use std::sync::Arc;

fn format_edges(edges: &[u64]) -> String {
    edges
        .iter()
        .map(|a| format!("0x{:08X}", a))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn format_block(bb: &BasicBlock) -> String {
    format!(
        "0x{:08X} - 0x{:08X}  preds: [{}]  succs: [{}]",
        bb.start(),
        bb.end(),
        format_edges(bb.preds()),
        format_edges(bb.succs())
    )
}

/// Walk the blocks of the function containing `address`, starting from the
/// block that contains it.
pub(crate) fn list_blocks(
    host: Arc<dyn Host>,
    prog: &Program,
    address: u64,
    reverse: bool,
    dfs: bool,
) -> Result<Vec<String>> {
    let chart = FlowChart::with_config(host, address, prog.emulator().clone())?;

    Ok(chart.blocks(Some(address), reverse, dfs).map(format_block).collect())
}

/// List the basic blocks of a function in walk order.
pub fn blocks<'a>(host: Arc<dyn Host>, prog: &Program, argv: &ArgMatches<'a>) -> io::Result<()> {
    let address = argv
        .value_of("address")
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Did not provide an address"))?;
    let address = parse_address(address)?;

    let lines = list_blocks(
        host,
        prog,
        address,
        argv.is_present("reverse"),
        argv.is_present("dfs"),
    )?;

    for line in lines {
        println!("{}", line);
    }

    Ok(())
}
