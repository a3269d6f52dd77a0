//! Driving emulation to a point of interest within a function.

use crate::analysis::FlowChart;
use crate::context::ProcessorContext;
use crate::error::{Error, Result};
use crate::host::Host;
use crate::project::EmulatorConfig;
use log::{debug, warn};
use std::sync::Arc;

/// Produces processor contexts at addresses within one function.
pub struct FunctionTracer {
    flowchart: FlowChart,
}

impl FunctionTracer {
    /// Construct a tracer for the function containing `address`.
    pub fn new(host: Arc<dyn Host>, address: u64) -> Result<Self> {
        Self::with_config(host, address, EmulatorConfig::default())
    }

    pub fn with_config(host: Arc<dyn Host>, address: u64, config: EmulatorConfig) -> Result<Self> {
        Ok(FunctionTracer {
            flowchart: FlowChart::with_config(host, address, config)?,
        })
    }

    pub fn flowchart(&self) -> &FlowChart {
        &self.flowchart
    }

    /// The entry address of the traced function.
    pub fn entry(&self) -> u64 {
        self.flowchart.entry()
    }

    /// Produce the context at `address` along the first path to it.
    ///
    /// The first path is the first one a depth first walk from the entry
    /// block discovers.
    pub fn context_at(&self, address: u64) -> Result<ProcessorContext> {
        let path = self
            .flowchart
            .get_paths(address)
            .next()
            .ok_or(Error::PathNotFound(address))?;

        path.cpu_context(Some(address))
    }

    /// Produce a context at `address` for every way of reaching it.
    ///
    /// With `depth` of zero, or if nothing calls this function, there is one
    /// context per path through the function, each starting from a fresh
    /// state. Otherwise every call site of the function is traced with
    /// `depth - 1`, and each of those callers' contexts seeds a replay of
    /// every path. The caller's state is entered the way a call would: the
    /// return address is pushed and the instruction pointer moves to the
    /// function entry.
    ///
    /// Paths that fail to replay are skipped with a warning.
    pub fn iter_context_at(
        &self,
        address: u64,
        depth: usize,
    ) -> Result<Box<dyn Iterator<Item = ProcessorContext> + '_>> {
        if self.flowchart.get_paths(address).next().is_none() {
            return Err(Error::PathNotFound(address));
        }

        let seeds = self.seeds(depth);

        Ok(Box::new(seeds.into_iter().flat_map(move |seed| {
            self.flowchart
                .paths_from(address, seed)
                .filter_map(move |path| match path.cpu_context(Some(address)) {
                    Ok(ctx) => Some(ctx),
                    Err(e) => {
                        warn!("Could not replay {:?} to 0x{:08X}: {}", path, address, e);
                        None
                    }
                })
        })))
    }

    fn fresh_context(&self) -> ProcessorContext {
        ProcessorContext::with_config(self.flowchart.host().clone(), self.flowchart.config())
    }

    /// Collect the states the function can be entered with.
    fn seeds(&self, depth: usize) -> Vec<ProcessorContext> {
        let host = self.flowchart.host();
        let entry = self.entry();
        let callers = if depth == 0 { Vec::new() } else { host.calls_to(entry) };

        let mut seeds = Vec::new();
        for call_site in callers {
            let caller = match FunctionTracer::with_config(host.clone(), call_site, self.flowchart.config().clone()) {
                Ok(caller) => caller,
                Err(e) => {
                    debug!("Skipping call site 0x{:08X}: {}", call_site, e);
                    continue;
                }
            };

            let return_address = host.decode(call_site).map_or(call_site, |i| i.next());
            let contexts = match caller.iter_context_at(call_site, depth - 1) {
                Ok(contexts) => contexts,
                Err(e) => {
                    debug!("Skipping call site 0x{:08X}: {}", call_site, e);
                    continue;
                }
            };

            for mut ctx in contexts {
                ctx.push(return_address);
                ctx.set_ip(entry);
                seeds.push(ctx);
            }
        }

        if seeds.is_empty() {
            seeds.push(self.fresh_context());
        }

        seeds
    }
}
