//! Control flow of emulated functions: blocks, paths, and tracing along them.

mod block;
mod flowchart;
mod path;
mod tracer;

pub use block::BasicBlock;
pub use flowchart::{Blocks, FlowChart};
pub use path::{PathBlock, Paths};
pub use tracer::FunctionTracer;
