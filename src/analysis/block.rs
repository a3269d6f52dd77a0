//! Basic blocks

use crate::host::BlockInfo;

/// Represents a sequence of instructions with the following properties:
///
/// 1. The sequence of instructions are executed in sequence.
/// 2. Control flow does not diverge within the block.
/// 3. At the end of a block, execution diverges to zero or more other
///    blocks, one of which may be the next block in sequence.
///
/// Edges are kept as block start addresses, in the order the host listed
/// them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicBlock {
    /// The address of the first instruction.
    start: u64,

    /// The address just past the last instruction.
    end: u64,

    /// Every instruction address within the block, in order.
    heads: Vec<u64>,

    succs: Vec<u64>,
    preds: Vec<u64>,
}

impl BasicBlock {
    pub fn from_parts(start: u64, end: u64, heads: Vec<u64>, succs: Vec<u64>, preds: Vec<u64>) -> Self {
        BasicBlock {
            start,
            end,
            heads,
            succs,
            preds,
        }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn heads(&self) -> &[u64] {
        &self.heads
    }

    pub fn succs(&self) -> &[u64] {
        &self.succs
    }

    pub fn preds(&self) -> &[u64] {
        &self.preds
    }

    pub fn contains(&self, address: u64) -> bool {
        self.start <= address && address < self.end
    }

    /// Determine if control leaves the function from this block.
    pub fn is_terminal(&self) -> bool {
        self.succs.is_empty()
    }
}

impl From<BlockInfo> for BasicBlock {
    fn from(info: BlockInfo) -> Self {
        BasicBlock::from_parts(info.start, info.end, info.heads, info.succs, info.preds)
    }
}
