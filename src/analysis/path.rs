//! Paths through a function and the machine states along them.

use crate::analysis::{BasicBlock, FlowChart};
use crate::context::ProcessorContext;
use crate::error::Result;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// One block along one path from a function's entry.
///
/// Paths share their common prefixes: a path block points at its parent,
/// and the chain of parents leads back to the entry block. The processor
/// context at the end of each block is computed on first use and kept, so
/// sibling paths replay a shared prefix only once.
pub struct PathBlock {
    bb: BasicBlock,
    parent: Option<Arc<PathBlock>>,

    /// State the path's replay starts from.
    seed: Arc<ProcessorContext>,

    /// State after executing every instruction of this block.
    context: OnceLock<ProcessorContext>,
}

impl fmt::Debug for PathBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let starts: Vec<String> = self
            .path()
            .iter()
            .map(|p| format!("0x{:08X}", p.bb.start()))
            .collect();

        f.debug_struct("PathBlock").field("path", &starts).finish()
    }
}

impl PathBlock {
    fn new(bb: BasicBlock, parent: Option<Arc<PathBlock>>, seed: Arc<ProcessorContext>) -> Arc<Self> {
        Arc::new(PathBlock {
            bb,
            parent,
            seed,
            context: OnceLock::new(),
        })
    }

    /// The basic block this path ends in.
    pub fn bb(&self) -> &BasicBlock {
        &self.bb
    }

    pub fn parent(&self) -> Option<&PathBlock> {
        self.parent.as_deref()
    }

    /// List the blocks of this path, entry block first.
    pub fn path(&self) -> Vec<&PathBlock> {
        let mut path = vec![self];
        let mut node = self;

        while let Some(parent) = node.parent.as_deref() {
            path.push(parent);
            node = parent;
        }

        path.reverse();
        path
    }

    /// Determine if the block starting at `start` is on this path.
    pub fn visits(&self, start: u64) -> bool {
        self.path().iter().any(|p| p.bb.start() == start)
    }

    fn start_context(&self) -> Result<ProcessorContext> {
        match &self.parent {
            Some(parent) => parent.end_context(),
            None => Ok(self.seed.as_ref().clone()),
        }
    }

    fn end_context(&self) -> Result<ProcessorContext> {
        if let Some(ctx) = self.context.get() {
            return Ok(ctx.clone());
        }

        let mut ctx = self.start_context()?;
        for head in self.bb.heads() {
            ctx.execute(*head)?;
        }

        let _ = self.context.set(ctx.clone());
        Ok(ctx)
    }

    /// Produce the processor context at a point along this path.
    ///
    /// Every instruction from the path's entry up to, but not including,
    /// `address` is emulated and the instruction pointer is left at
    /// `address`. Without an address the whole path is emulated and the
    /// instruction pointer is left at the end of the final block.
    pub fn cpu_context(&self, address: Option<u64>) -> Result<ProcessorContext> {
        let address = match address {
            Some(address) => address,
            None => {
                let mut ctx = self.end_context()?;
                ctx.set_ip(self.bb.end());
                return Ok(ctx);
            }
        };

        let mut ctx = self.start_context()?;
        for head in self.bb.heads().iter().take_while(|h| **h < address) {
            ctx.execute(*head)?;
        }

        ctx.set_ip(address);
        ctx.track_variables_at_ip();
        Ok(ctx)
    }
}

/// A lazy, depth first enumeration of the simple paths to one block.
///
/// Only blocks that can still reach the target are explored, and no path
/// visits a block twice.
pub struct Paths<'a> {
    chart: &'a FlowChart,
    target: Option<usize>,
    reachable: Vec<bool>,
    stack: Vec<Arc<PathBlock>>,
}

impl<'a> Paths<'a> {
    pub(crate) fn new(chart: &'a FlowChart, target: Option<usize>, seed: Arc<ProcessorContext>) -> Self {
        let mut reachable = vec![false; chart.len()];
        let mut stack = Vec::new();

        if let Some(target) = target {
            let mut pending = vec![target];
            while let Some(index) = pending.pop() {
                if reachable[index] {
                    continue;
                }
                reachable[index] = true;

                pending.extend(chart.block(index).preds().iter().filter_map(|a| chart.index_of(*a)));
            }

            if let Some(entry) = chart.index_of(chart.entry()) {
                if reachable[entry] {
                    stack.push(PathBlock::new(chart.block(entry).clone(), None, seed));
                }
            }
        }

        Paths {
            chart,
            target,
            reachable,
            stack,
        }
    }
}

impl<'a> Iterator for Paths<'a> {
    type Item = Arc<PathBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            let index = self.chart.index_of(node.bb.start());
            if index == self.target {
                return Some(node);
            }

            let mut children: Vec<usize> = Vec::new();
            for child in node.bb.succs().iter().filter_map(|a| self.chart.index_of(*a)) {
                let start = self.chart.block(child).start();

                if self.reachable[child] && !children.contains(&child) && !node.visits(start) {
                    children.push(child);
                }
            }

            for child in children.into_iter().rev() {
                self.stack.push(PathBlock::new(
                    self.chart.block(child).clone(),
                    Some(node.clone()),
                    node.seed.clone(),
                ));
            }
        }

        None
    }
}
