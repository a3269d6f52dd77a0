//! Common utilities for command implementations

use crate::host::{Host, StaticHost};
use crate::project::{Program, Project};
use clap::{App, Arg, SubCommand};
use log::info;
use std::io;
use std::path::Path;
use std::str;
use std::str::FromStr;
use std::sync::Arc;

/// Enumeration of all CLI commands
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Command {
    Blocks,
    Paths,
    Trace,
}

impl Command {
    /// Enumerate all commands that functrace recognizes.
    pub fn enumerate() -> Vec<Self> {
        use Command::*;

        vec![Blocks, Paths, Trace]
    }

    /// Construct the subcommand object for this particular `Command`.
    pub fn into_clap_subcommand<'a, 'b>(self) -> App<'a, 'b> {
        match self {
            Command::Blocks => SubCommand::with_name("blocks")
                .about("List the basic blocks of the function containing an address")
                .arg(
                    Arg::with_name("address")
                        .value_name("0x401000")
                        .index(1)
                        .required(true)
                        .help("An address within the function, or the block to start from"),
                )
                .arg(
                    Arg::with_name("reverse")
                        .long("reverse")
                        .help("Walk predecessor edges instead of successors"),
                )
                .arg(
                    Arg::with_name("dfs")
                        .long("dfs")
                        .help("Walk depth first instead of breadth first"),
                ),
            Command::Paths => SubCommand::with_name("paths")
                .about("List every path from function entry to an address")
                .arg(
                    Arg::with_name("address")
                        .value_name("0x401000")
                        .index(1)
                        .required(true)
                        .help("The address to find paths to"),
                ),
            Command::Trace => SubCommand::with_name("trace")
                .about("Emulate every path to an address and show the operands there")
                .arg(
                    Arg::with_name("address")
                        .value_name("0x401000")
                        .index(1)
                        .multiple(true)
                        .required(true)
                        .help("The addresses to trace"),
                )
                .arg(
                    Arg::with_name("depth")
                        .long("depth")
                        .value_name("N")
                        .takes_value(true)
                        .help("How many levels of callers to emulate before the function"),
                ),
        }
    }
}

impl FromStr for Command {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_ref() {
            "blocks" => Ok(Command::Blocks),
            "paths" => Ok(Command::Paths),
            "trace" => Ok(Command::Trace),
            _ => Err(()),
        }
    }
}

/// Parse an address given on the command line.
///
/// Addresses are hexadecimal, with or without a `0x` prefix or an `h`
/// suffix.
pub fn parse_address(spec: &str) -> io::Result<u64> {
    let digits = spec.trim();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .or_else(|| digits.strip_suffix('h'))
        .or_else(|| digits.strip_suffix('H'))
        .unwrap_or(digits);

    u64::from_str_radix(digits, 16).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a valid address", spec),
        )
    })
}

/// Resolve the program to analyze from the project and the command line.
///
/// A named program must exist in the project. Without a name, the
/// project's only program is used, or failing that the command line
/// settings alone.
pub fn resolve_program(
    project: &Project,
    name: Option<&str>,
    prog: Program,
    export_given: bool,
) -> io::Result<Program> {
    let base = match name {
        Some(name) => project.program(name).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("The program {} does not exist in the project.", name),
            )
        })?,
        None => match project.default_program() {
            Some((name, base)) => {
                info!("Defaulting to program {}", name);
                base.clone()
            }
            None => Program::default(),
        },
    };

    Ok(base.apply_override(&prog, export_given))
}

/// Load the disassembly export a program points at.
///
/// The export path is relative to the directory holding the project file.
/// An architecture set on the program replaces the one in the export.
pub fn load_host(prog: &Program, project_dir: &Path) -> io::Result<Arc<dyn Host>> {
    let path = prog.as_export_path().to_path(project_dir);
    info!("Loading export {}", path.display());

    let mut host = StaticHost::read(&path)?;
    if let Some(arch) = prog.arch() {
        host.set_arch(arch);
    }

    Ok(Arc::new(host))
}
