//! Error type for emulation and tracing

use std::{io, result};
use thiserror::Error;

/// Error type for everything that can fail while building or driving a
/// processor context.
///
/// Reads and writes of emulated memory are deliberately absent from this
/// list: unmapped memory reads as zero and writes map pages on demand.
#[derive(Error, Debug)]
pub enum Error {
    /// The named architecture has no register layout or instruction model.
    #[error("unsupported architecture: {0}")]
    UnsupportedArchitecture(String),

    /// A register name was not present in the current architecture's
    /// register table.
    #[error("unknown register: {0}")]
    UnknownRegister(String),

    /// An x87 stack slot was accessed as an integer register.
    #[error("register {0} holds a floating-point value")]
    FloatRegister(String),

    /// The function at the given address has no usable signature and no
    /// explicit argument count was supplied.
    #[error("unable to resolve a function signature for {0:#x}")]
    SignatureResolution(u64),

    /// The given address cannot be reached from the entry of its function.
    #[error("no path from function entry reaches {0:#x}")]
    PathNotFound(u64),

    /// The given address does not belong to any function the host knows.
    #[error("no function contains {0:#x}")]
    FunctionNotFound(u64),

    /// The host could not decode an instruction at the given address.
    #[error("invalid instruction at {0:#x}")]
    InvalidInstruction(u64),

    /// Underlying cause of error is I/O related
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Underlying cause of error is JSON related
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err {
            Error::Io(e) => e,
            _ => io::Error::new(io::ErrorKind::Other, format!("{}", err)),
        }
    }
}

pub type Result<T> = result::Result<T, Error>;
