//! Emulator tunables

use crate::memory::{DEFAULT_HEAP_BASE, DEFAULT_HEAP_SLACK, DEFAULT_MAX_TRANSFER};
use serde::{Deserialize, Serialize};

/// Initial stack pointer of a fresh processor context.
pub const DEFAULT_STACK_POINTER: u64 = 0x0117_F800;

/// Longest string `read_data` will scan for a terminator.
pub const DEFAULT_MAX_STRING_LENGTH: usize = 0x1000;

/// Settings that shape the initial state of every processor context.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct EmulatorConfig {
    pub heap_base: u64,
    pub heap_slack: u64,
    pub stack_pointer: u64,
    pub max_string_length: usize,

    /// Most bytes a runtime function copies or fills in one call.
    pub max_buffer_size: u64,

    /// How many caller levels `trace` follows when not told otherwise.
    pub default_depth: usize,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        EmulatorConfig {
            heap_base: DEFAULT_HEAP_BASE,
            heap_slack: DEFAULT_HEAP_SLACK,
            stack_pointer: DEFAULT_STACK_POINTER,
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            max_buffer_size: DEFAULT_MAX_TRANSFER,
            default_depth: 1,
        }
    }
}
