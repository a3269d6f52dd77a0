//! Emulated C runtime functions.
//!
//! When the emulator reaches a call whose target is named after one of these
//! functions, it runs the builtin against emulated memory instead of
//! stepping into (or over) the real implementation.

mod alloc;
mod string;

use crate::context::ProcessorContext;
use crate::host::CallingConvention;
use std::collections::HashMap;

/// The shape of every builtin: the context, the normalised name it was
/// called by, and the raw argument values. Returns the value to place in
/// the return register.
pub type BuiltinFn = fn(&mut ProcessorContext, &str, &[u64]) -> u64;

/// A builtin, the number of arguments it consumes, and how they are passed.
#[derive(Copy, Clone)]
pub struct BuiltinDef {
    pub arity: usize,
    pub convention: CallingConvention,
    pub func: BuiltinFn,
}

lazy_static! {
    static ref BUILTINS: HashMap<&'static str, BuiltinDef> = {
        use CallingConvention::{Cdecl, Stdcall};

        let mut b = HashMap::new();
        let mut def = |names: &[&'static str], arity: usize, convention: CallingConvention, func: BuiltinFn| {
            for name in names {
                b.insert(*name, BuiltinDef { arity, convention, func });
            }
        };

        def(&["strcat", "wcscat"], 2, Cdecl, string::strcat);
        def(&["strncat", "wcsncat"], 3, Cdecl, string::strncat);
        def(&["strcpy", "wcscpy"], 2, Cdecl, string::strcpy);
        def(&["strncpy", "wcsncpy"], 3, Cdecl, string::strncpy);
        def(&["strdup", "wcsdup"], 1, Cdecl, string::strdup);
        def(&["strndup"], 2, Cdecl, string::strndup);
        def(&["strlen", "wcslen"], 1, Cdecl, string::strlen);

        //Win32 string functions are WINAPI.
        def(&["lstrcata", "lstrcatw"], 2, Stdcall, string::strcat);
        def(&["lstrcpya", "lstrcpyw"], 2, Stdcall, string::strcpy);
        def(&["lstrlena", "lstrlenw"], 1, Stdcall, string::strlen);

        def(&["memcpy", "memmove"], 3, Cdecl, alloc::memcpy);
        def(&["memset"], 3, Cdecl, alloc::memset);
        def(&["malloc"], 1, Cdecl, alloc::malloc);
        def(&["calloc"], 2, Cdecl, alloc::calloc);
        def(&["realloc"], 2, Cdecl, alloc::realloc);
        def(&["free"], 1, Cdecl, alloc::free);

        b
    };
}

/// Strip import decoration from a function name: `__imp_`, `j_`, and any
/// leading underscores.
pub fn normalize(name: &str) -> &str {
    let mut name = name;

    loop {
        let stripped = name
            .strip_prefix("__imp_")
            .or_else(|| name.strip_prefix("j_"))
            .unwrap_or(name)
            .trim_start_matches('_');

        if stripped == name {
            return name;
        }

        name = stripped;
    }
}

/// Look up the builtin for a (possibly decorated) function name.
pub fn lookup(name: &str) -> Option<&'static BuiltinDef> {
    BUILTINS.get(normalize(name).to_ascii_lowercase().as_str())
}

/// Fetch an argument, treating missing ones as zero.
fn arg(args: &[u64], index: usize) -> u64 {
    args.get(index).copied().unwrap_or(0)
}

pub use alloc::{calloc, free, malloc, memcpy, memset, realloc};
pub use string::{strcat, strcpy, strdup, strlen, strncat, strncpy, strndup};
