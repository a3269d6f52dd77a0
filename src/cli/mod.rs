//! CLI commands

mod blocks;
mod common;
mod main;
mod paths;
mod trace;

pub use blocks::blocks;
pub use common::{load_host, parse_address, resolve_program, Command};
pub use main::main;
pub use paths::paths;
pub use trace::trace;
