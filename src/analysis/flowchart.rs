//! The basic block graph of one function.

use crate::analysis::{BasicBlock, Paths};
use crate::context::ProcessorContext;
use crate::error::{Error, Result};
use crate::host::Host;
use crate::project::EmulatorConfig;
use log::debug;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// Every basic block of a function, as the host reports them.
///
/// Blocks live in an arena in host order and are addressed by index; edges
/// are resolved through an index keyed by block start.
pub struct FlowChart {
    host: Arc<dyn Host>,
    config: EmulatorConfig,
    entry: u64,
    blocks: Vec<BasicBlock>,
    index: BTreeMap<u64, usize>,
}

impl FlowChart {
    /// Build the flowchart of the function containing `address`.
    pub fn new(host: Arc<dyn Host>, address: u64) -> Result<Self> {
        Self::with_config(host, address, EmulatorConfig::default())
    }

    pub fn with_config(host: Arc<dyn Host>, address: u64, config: EmulatorConfig) -> Result<Self> {
        let func = host
            .function_at(address)
            .ok_or(Error::FunctionNotFound(address))?;

        let blocks: Vec<BasicBlock> = host
            .function_blocks(func.entry)
            .into_iter()
            .map(BasicBlock::from)
            .collect();
        let index = blocks.iter().enumerate().map(|(i, b)| (b.start(), i)).collect();

        debug!("Function 0x{:08X} has {} blocks", func.entry, blocks.len());

        Ok(FlowChart {
            host,
            config,
            entry: func.entry,
            blocks,
            index,
        })
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// The function's entry address.
    pub fn entry(&self) -> u64 {
        self.entry
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub(crate) fn block(&self, index: usize) -> &BasicBlock {
        &self.blocks[index]
    }

    pub(crate) fn index_of(&self, start: u64) -> Option<usize> {
        self.index.get(&start).copied()
    }

    /// Find the index of the block containing an address.
    pub(crate) fn find_index(&self, address: u64) -> Option<usize> {
        let (_, &index) = self.index.range(..=address).next_back()?;

        if self.blocks[index].contains(address) {
            Some(index)
        } else {
            None
        }
    }

    /// Find the block containing an address.
    pub fn find_block(&self, address: u64) -> Option<&BasicBlock> {
        self.find_index(address).map(|i| &self.blocks[i])
    }

    /// Walk the blocks of the function, each exactly once.
    ///
    /// Traversal is breadth first unless `dfs` is set, in which case it is a
    /// depth first pre-order. It follows successor edges from `start`, or
    /// predecessor edges if `reverse` is set. `start` may be any address
    /// within a block; without it, forward walks begin at the entry block
    /// and reverse walks at every block with no successors.
    pub fn blocks(&self, start: Option<u64>, reverse: bool, dfs: bool) -> Blocks<'_> {
        let roots: Vec<usize> = match start {
            Some(address) => self.find_index(address).into_iter().collect(),
            None if reverse => (0..self.blocks.len())
                .filter(|i| self.blocks[*i].is_terminal())
                .collect(),
            None => self.index_of(self.entry).into_iter().collect(),
        };

        let pending = if dfs {
            roots.into_iter().rev().collect()
        } else {
            roots.into_iter().collect()
        };

        Blocks {
            chart: self,
            reverse,
            dfs,
            pending,
            visited: vec![false; self.blocks.len()],
        }
    }

    /// Enumerate every simple path from the entry block to the block
    /// containing `address`, starting from a fresh processor context.
    pub fn get_paths(&self, address: u64) -> Paths<'_> {
        let seed = ProcessorContext::with_config(self.host.clone(), &self.config);

        self.paths_from(address, seed)
    }

    /// Enumerate every simple path to `address`, with each path's replay
    /// starting from `seed`.
    pub fn paths_from(&self, address: u64, seed: ProcessorContext) -> Paths<'_> {
        Paths::new(self, self.find_index(address), Arc::new(seed))
    }
}

/// A lazy walk over a flowchart's blocks.
pub struct Blocks<'a> {
    chart: &'a FlowChart,
    reverse: bool,
    dfs: bool,

    /// Blocks waiting to be visited: a queue for BFS, a stack for DFS.
    pending: VecDeque<usize>,
    visited: Vec<bool>,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = &'a BasicBlock;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let index = if self.dfs {
                self.pending.pop_back()?
            } else {
                self.pending.pop_front()?
            };

            if self.visited[index] {
                continue;
            }
            self.visited[index] = true;

            let block = self.chart.block(index);
            let edges = if self.reverse { block.preds() } else { block.succs() };
            let next: Vec<usize> = edges
                .iter()
                .filter_map(|a| self.chart.index_of(*a))
                .filter(|i| !self.visited[*i])
                .collect();

            if self.dfs {
                self.pending.extend(next.into_iter().rev());
            } else {
                self.pending.extend(next);
            }

            return Some(block);
        }
    }
}
