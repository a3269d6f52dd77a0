//! Path listing command

use crate::analysis::FlowChart;
use crate::cli::common::parse_address;
use crate::error::Result;
use crate::host::Host;
use crate::project::Program;
use clap::ArgMatches;
use std::io;
use std::sync::Arc;

pub(crate) fn list_paths(host: Arc<dyn Host>, prog: &Program, address: u64) -> Result<Vec<String>> {
    let chart = FlowChart::with_config(host, address, prog.emulator().clone())?;

    Ok(chart
        .get_paths(address)
        .map(|p| {
            p.path()
                .iter()
                .map(|b| format!("0x{:08X}", b.bb().start()))
                .collect::<Vec<_>>()
                .join(" -> ")
        })
        .collect())
}

/// List every path from the entry of a function to an address in it.
pub fn paths<'a>(host: Arc<dyn Host>, prog: &Program, argv: &ArgMatches<'a>) -> io::Result<()> {
    let address = argv
        .value_of("address")
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Did not provide an address"))?;
    let address = parse_address(address)?;

    let paths = list_paths(host, prog, address)?;
    if paths.is_empty() {
        eprintln!("No path reaches 0x{:08X}", address);
    }

    for (i, path) in paths.iter().enumerate() {
        println!("{:>4}: {}", i + 1, path);
    }

    Ok(())
}
