//! Project file structures

mod config;
mod program;
mod repr;

pub use config::EmulatorConfig;
pub use program::Program;
pub use repr::Project;

#[cfg(test)]
mod tests;
