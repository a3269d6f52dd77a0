//! An in-memory host backed by an exported disassembly database.

use crate::arch::ArchName;
use crate::error::Result;
use crate::host::{
    BlockInfo, FunctionInfo, Host, Instruction, OperandKind, Prototype, Segment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fs, io, path};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
struct Symbol {
    name: String,

    #[serde(default)]
    size: Option<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
struct FunctionRecord {
    #[serde(flatten)]
    info: FunctionInfo,

    #[serde(default)]
    blocks: Vec<BlockInfo>,

    #[serde(default)]
    prototype: Option<Prototype>,
}

/// A `Host` whose answers are fixed ahead of time.
///
/// This is the format of the disassembly export the command line tool reads,
/// and it is also what tests use to describe small programs by hand.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StaticHost {
    #[serde(default)]
    arch: ArchName,

    #[serde(default)]
    segments: Vec<Segment>,

    #[serde(default)]
    instructions: BTreeMap<u64, Instruction>,

    #[serde(default)]
    functions: Vec<FunctionRecord>,

    #[serde(default)]
    names: BTreeMap<u64, Symbol>,
}

impl StaticHost {
    pub fn new(arch: ArchName) -> Self {
        StaticHost {
            arch,
            ..Default::default()
        }
    }

    /// Replace the architecture the export was made for.
    pub fn set_arch(&mut self, arch: ArchName) -> &mut Self {
        self.arch = arch;
        self
    }

    /// Load an export from a JSON file.
    pub fn read<P: AsRef<path::Path>>(filename: P) -> Result<Self> {
        let file = fs::File::open(filename)?;
        Self::from_reader(io::BufReader::new(file))
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn add_segment(&mut self, segment: Segment) -> &mut Self {
        self.segments.push(segment);
        self
    }

    pub fn add_instruction(&mut self, instr: Instruction) -> &mut Self {
        self.instructions.insert(instr.address, instr);
        self
    }

    /// Add a run of instructions, laid out back to back from `start`.
    ///
    /// Each entry's address is overwritten with where it lands. Returns the
    /// address following the last instruction.
    pub fn add_code(&mut self, start: u64, code: Vec<Instruction>) -> u64 {
        let mut address = start;

        for mut instr in code {
            instr.address = address;
            address = instr.next();
            self.add_instruction(instr);
        }

        address
    }

    pub fn add_function(&mut self, entry: u64, end: u64) -> &mut Self {
        self.functions.push(FunctionRecord {
            info: FunctionInfo {
                entry,
                end,
                frame: Vec::new(),
            },
            blocks: Vec::new(),
            prototype: None,
        });
        self
    }

    /// Add a named stack frame slot to the function at `entry`.
    pub fn add_frame_member(&mut self, entry: u64, name: &str, offset: i64, size: usize) -> &mut Self {
        if let Some(func) = self.function_mut(entry) {
            func.info.frame.push(crate::host::FrameMember {
                name: name.to_string(),
                offset,
                size,
            });
        }
        self
    }

    /// Add a basic block to the function at `entry`.
    ///
    /// The block's instruction heads are taken from whatever instructions
    /// have already been added within `[start, end)`.
    pub fn add_block(&mut self, entry: u64, start: u64, end: u64, succs: &[u64], preds: &[u64]) -> &mut Self {
        let heads = self.instructions.range(start..end).map(|(a, _)| *a).collect();

        if let Some(func) = self.function_mut(entry) {
            func.blocks.push(BlockInfo {
                start,
                end,
                heads,
                succs: succs.to_vec(),
                preds: preds.to_vec(),
            });
        }
        self
    }

    pub fn set_prototype(&mut self, entry: u64, prototype: Option<Prototype>) -> &mut Self {
        if let Some(func) = self.function_mut(entry) {
            func.prototype = prototype;
        }
        self
    }

    pub fn add_name(&mut self, address: u64, name: &str, size: Option<usize>) -> &mut Self {
        self.names.insert(
            address,
            Symbol {
                name: name.to_string(),
                size,
            },
        );
        self
    }

    fn function_mut(&mut self, entry: u64) -> Option<&mut FunctionRecord> {
        self.functions.iter_mut().find(|f| f.info.entry == entry)
    }

    fn function(&self, address: u64) -> Option<&FunctionRecord> {
        self.functions.iter().find(|f| f.info.contains(address))
    }
}

impl Host for StaticHost {
    fn arch(&self) -> ArchName {
        self.arch
    }

    fn decode(&self, address: u64) -> Option<Instruction> {
        self.instructions.get(&address).cloned()
    }

    fn segments(&self) -> Vec<Segment> {
        self.segments.clone()
    }

    fn function_at(&self, address: u64) -> Option<FunctionInfo> {
        self.function(address).map(|f| f.info.clone())
    }

    fn function_blocks(&self, entry: u64) -> Vec<BlockInfo> {
        self.functions
            .iter()
            .find(|f| f.info.entry == entry)
            .map(|f| f.blocks.clone())
            .unwrap_or_default()
    }

    fn prototype(&self, entry: u64) -> Option<Prototype> {
        self.functions
            .iter()
            .find(|f| f.info.entry == entry)
            .and_then(|f| f.prototype.clone())
    }

    fn name_at(&self, address: u64) -> Option<String> {
        self.names.get(&address).map(|s| s.name.clone())
    }

    fn symbol_size(&self, address: u64) -> Option<usize> {
        self.names.get(&address).and_then(|s| s.size)
    }

    fn calls_to(&self, entry: u64) -> Vec<u64> {
        self.instructions
            .values()
            .filter(|i| i.is_call())
            .filter(|i| match i.operands.get(0).map(|o| &o.kind) {
                Some(OperandKind::Near(target)) => *target == entry,
                Some(OperandKind::Immediate(target)) => *target == entry,
                _ => false,
            })
            .map(|i| i.address)
            .collect()
    }
}
