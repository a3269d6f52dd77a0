//! Concrete machine state and everything that can be asked of it.

mod data;
mod operand;
mod processor;
mod signature;
mod variables;

pub use data::{Data, DataType};
pub use operand::Operand;
pub use processor::{FuncCall, ProcessorContext};
pub use signature::{FunctionArg, FunctionSignature};
pub use variables::{Variable, VariableMap};

#[cfg(test)]
mod tests;
