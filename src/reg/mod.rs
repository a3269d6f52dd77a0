//! Types which model the architectural registers of an emulated processor.

mod fpu;
mod layout;
mod registers;

pub use fpu::Fpu;
pub use layout::{layout, Layout, RegDef};
pub use registers::Registers;
