//! Concrete emulation of x86 functions along the paths of their control
//! flow graphs, driven by an exported disassembly.

#[macro_use]
extern crate clap;

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate serde_plain;

pub mod analysis;
pub mod arch;
pub mod builtins;
pub mod cli;
pub mod context;
pub mod error;
pub mod host;
pub mod maths;
pub mod memory;
pub mod project;
pub mod reg;

pub use error::{Error, Result};
