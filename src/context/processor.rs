//! The processor context: one concrete machine state.

use crate::arch::{self, ArchName};
use crate::builtins;
use crate::context::{Data, DataType, Operand, VariableMap};
use crate::error::{Error, Result};
use crate::host::{CallingConvention, Host, Instruction, OperandDesc, OperandKind, StaticHost};
use crate::maths::mask;
use crate::memory::Memory;
use crate::project::EmulatorConfig;
use crate::reg::Registers;
use log::{debug, trace, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A call the emulator stepped over rather than into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuncCall {
    pub call_site: u64,
    pub target: Option<u64>,
    pub name: Option<String>,

    /// Arguments, if the target's signature could be resolved.
    pub args: Vec<u64>,
}

/// Registers, memory and bookkeeping for one emulated thread of control at
/// one point along one path.
///
/// Contexts are cheap to clone relative to the state they hold (segment data
/// is shared), and cloning is how diverging paths avoid observing each
/// other's writes.
#[derive(Clone)]
pub struct ProcessorContext {
    host: Arc<dyn Host>,
    config: EmulatorConfig,

    pub registers: Registers,
    pub memory: Memory,
    pub variables: VariableMap,

    /// Calls to non-builtin functions, keyed by call site.
    pub func_calls: BTreeMap<u64, FuncCall>,

    /// Entry address and stack pointer on entry of the function most
    /// recently entered.
    frame: Option<(u64, u64)>,
}

impl fmt::Debug for ProcessorContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ProcessorContext")
            .field("arch", &self.arch())
            .field("ip", &format_args!("0x{:X}", self.ip()))
            .field("sp", &format_args!("0x{:X}", self.sp()))
            .field("variables", &self.variables.names())
            .finish()
    }
}

impl ProcessorContext {
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self::with_config(host, &EmulatorConfig::default())
    }

    /// Construct a fresh context for a program.
    ///
    /// Memory is seeded with the host's segments, and both the stack and
    /// frame pointers start at the configured stack pointer.
    pub fn with_config(host: Arc<dyn Host>, config: &EmulatorConfig) -> Self {
        let arch = host.arch();
        let mut memory = Memory::with_heap(host.segments(), config.heap_base, config.heap_slack);
        memory.set_max_transfer(config.max_buffer_size);
        let mut registers = Registers::new(arch);

        registers.set_sp(config.stack_pointer);
        let _ = registers.set(arch.bp(), config.stack_pointer);

        ProcessorContext {
            host,
            config: config.clone(),
            registers,
            memory,
            variables: VariableMap::new(),
            func_calls: BTreeMap::new(),
            frame: None,
        }
    }

    /// Construct a context with no program loaded.
    pub fn from_arch(name: &str) -> Result<Self> {
        let arch = ArchName::resolve(name)?;

        Ok(Self::new(Arc::new(StaticHost::new(arch))))
    }

    pub fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    pub fn host_arc(&self) -> Arc<dyn Host> {
        self.host.clone()
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    pub fn arch(&self) -> ArchName {
        self.registers.arch()
    }

    pub fn ptr_size(&self) -> usize {
        self.arch().ptr_size()
    }

    pub fn ip(&self) -> u64 {
        self.registers.ip()
    }

    pub fn set_ip(&mut self, address: u64) {
        self.registers.set_ip(address);
    }

    pub fn sp(&self) -> u64 {
        self.registers.sp()
    }

    pub fn set_sp(&mut self, address: u64) {
        self.registers.set_sp(address);
    }

    /// Push a pointer-sized value.
    pub fn push(&mut self, value: u64) {
        let size = self.ptr_size();
        let sp = self.sp().wrapping_sub(size as u64) & self.arch().ptr_mask();

        self.set_sp(sp);
        self.write_int(sp, value, size);
    }

    /// Pop a pointer-sized value.
    pub fn pop(&mut self) -> u64 {
        let size = self.ptr_size();
        let sp = self.sp();
        let value = self.memory.read_int(sp, size);

        self.set_sp(sp.wrapping_add(size as u64) & self.arch().ptr_mask());
        value
    }

    /// Write to memory, recording the overwritten contents of any variable
    /// in the way.
    pub fn write_memory(&mut self, address: u64, data: &[u8]) {
        self.variables.record_write(&self.memory, address, data.len());
        self.memory.write(address, data);
    }

    pub fn write_int(&mut self, address: u64, value: u64, width: usize) {
        let width = width.min(8);
        self.write_memory(address, &value.to_le_bytes()[..width]);
    }

    pub fn read_int(&self, address: u64, width: usize) -> u64 {
        self.memory.read_int(address, width)
    }

    /// Read a nul-terminated run of `unit`-byte characters.
    ///
    /// The terminator is not included. Reads stop at the configured maximum
    /// string length.
    pub fn read_string(&self, address: u64, unit: usize) -> Vec<u8> {
        let unit = unit.max(1);
        let limit = self.config.max_string_length - self.config.max_string_length % unit;
        let mut raw = self.memory.read(address, limit);

        let end = raw
            .chunks_exact(unit)
            .position(|c| c.iter().all(|b| *b == 0))
            .map_or(limit, |i| i * unit);

        raw.truncate(end);
        raw
    }

    /// Read and interpret memory.
    ///
    /// String types read up to their terminator unless `size` is given, in
    /// which case exactly `size` bytes are returned. Integer types always
    /// read their own width.
    pub fn read_data(&self, address: u64, size: Option<usize>, data_type: DataType) -> Data {
        if data_type.is_string() {
            match size {
                Some(size) => Data::Bytes(self.memory.read(address, size)),
                None => Data::Bytes(self.read_string(address, data_type.width())),
            }
        } else {
            Data::Int(self.memory.read_int(address, data_type.width()))
        }
    }

    /// The instruction at the current instruction pointer.
    pub fn instruction(&self) -> Option<Instruction> {
        self.host.decode(self.ip())
    }

    /// The operands of the instruction at the current instruction pointer.
    pub fn operands(&self) -> Vec<Operand<'_>> {
        self.instruction()
            .map(|i| i.operands.into_iter().map(|d| Operand::new(self, d)).collect())
            .unwrap_or_default()
    }

    /// Compute the effective address of a memory operand.
    pub fn operand_addr(&self, desc: &OperandDesc) -> Option<u64> {
        match &desc.kind {
            OperandKind::Memory {
                base,
                index,
                scale,
                displacement,
                ..
            } => {
                let mut addr = *displacement as u64;

                if let Some(base) = base {
                    addr = addr.wrapping_add(self.registers.get(base).unwrap_or(0));
                }

                if let Some(index) = index {
                    let index = self.registers.get(index).unwrap_or(0);
                    addr = addr.wrapping_add(index.wrapping_mul(*scale as u64));
                }

                Some(addr & self.arch().ptr_mask())
            }
            _ => None,
        }
    }

    /// Compute the current value of an operand.
    ///
    /// FPU stack registers yield the bit pattern of their value.
    pub fn operand_value(&self, desc: &OperandDesc) -> u64 {
        match &desc.kind {
            OperandKind::Register(name) => match self.registers.get(name) {
                Ok(value) => value,
                Err(Error::FloatRegister(_)) => self
                    .registers
                    .get_float(name)
                    .ok()
                    .flatten()
                    .map_or(0, f64::to_bits),
                Err(e) => {
                    trace!("reading {}: {}", desc.text, e);
                    0
                }
            },
            OperandKind::Immediate(value) => *value & mask(desc.size),
            OperandKind::Near(target) => *target,
            OperandKind::Memory { .. } => self
                .operand_addr(desc)
                .map_or(0, |addr| self.memory.read_int(addr, desc.size)),
        }
    }

    /// Store a value into a register or memory operand.
    pub fn set_operand_value(&mut self, desc: &OperandDesc, value: u64) -> Result<()> {
        match &desc.kind {
            OperandKind::Register(name) => self.registers.set(name, value),
            OperandKind::Memory { .. } => {
                if let Some(addr) = self.operand_addr(desc) {
                    self.write_int(addr, value, desc.size);
                }
                Ok(())
            }
            _ => {
                warn!("Cannot write to operand {}", desc.text);
                Ok(())
            }
        }
    }

    /// Emulate the instruction at `address`.
    ///
    /// Afterwards the instruction pointer is wherever the instruction sent
    /// control: the next instruction, or a branch target.
    pub fn execute(&mut self, address: u64) -> Result<()> {
        let instr = self
            .host
            .decode(address)
            .ok_or(Error::InvalidInstruction(address))?;

        if self.host.is_function_start(address) {
            self.frame = Some((address, self.sp()));
        }

        self.set_ip(address);
        self.track_variables(&instr);

        debug!(
            "0x{:08X}: {} {}",
            address,
            instr.mnemonic,
            instr
                .operands
                .iter()
                .map(|o| o.text.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        self.set_ip(instr.next());
        arch::x86::execute(self, &instr)
    }

    /// Register variables for the operands of the instruction at the
    /// current instruction pointer, without executing it.
    pub fn track_variables_at_ip(&mut self) {
        let ip = self.ip();
        if self.host.is_function_start(ip) {
            self.frame = Some((ip, self.sp()));
        }

        if let Some(instr) = self.instruction() {
            self.track_variables(&instr);
        }
    }

    fn track_variables(&mut self, instr: &Instruction) {
        for desc in instr.operands.iter() {
            match &desc.kind {
                OperandKind::Memory { .. } => {
                    let addr = match self.operand_addr(desc) {
                        Some(addr) => addr,
                        None => continue,
                    };

                    if let Some(name) = self.host.name_at(addr) {
                        let size = self.host.symbol_size(addr).unwrap_or(desc.size);
                        self.variables.add(addr, &name, size);
                    } else if let Some((var_addr, name, size)) = self.frame_member(addr) {
                        self.variables.add(var_addr, &name, size);
                    }
                }
                OperandKind::Immediate(value) | OperandKind::Near(value) => {
                    if let Some(name) = self.host.name_at(*value) {
                        let size = self.host.symbol_size(*value).unwrap_or(desc.size);
                        self.variables.add(*value, &name, size);
                    }
                }
                OperandKind::Register(_) => {}
            }
        }
    }

    /// Resolve a stack address to the frame member of the current function
    /// that covers it.
    fn frame_member(&self, address: u64) -> Option<(u64, String, usize)> {
        let (entry, entry_sp) = self.frame?;
        let func = self.host.function_at(entry)?;
        let offset = address.wrapping_sub(entry_sp) as i64;
        let offset = match self.arch() {
            ArchName::X86 => offset as i32 as i64,
            ArchName::X86_64 => offset,
        };
        let member = func.frame_member(offset)?;
        let member_addr = entry_sp.wrapping_add(member.offset as u64) & self.arch().ptr_mask();

        Some((member_addr, member.name.clone(), member.size))
    }

    /// Handle a call instruction whose return address has not been pushed.
    ///
    /// Calls to recognized runtime functions are emulated in place. Anything
    /// else is recorded in `func_calls` and stepped over. Either way, stack
    /// arguments are released if the callee's convention has it clean up.
    pub(crate) fn dispatch_call(&mut self, instr: &Instruction) -> Result<()> {
        let desc = match instr.operands.first() {
            Some(desc) => desc,
            None => return Ok(()),
        };

        let target = self.operand_value(desc);
        let name = self.call_target_name(desc, target);

        if let Some(name) = &name {
            if let Some(builtin) = builtins::lookup(name) {
                let convention = self.effective_convention(Some(builtin.convention));
                let args = self.read_args(target, convention, builtin.arity);

                debug!("Emulating builtin {}({:X?})", name, args);

                let ret = (builtin.func)(self, builtins::normalize(name), &args);
                let ret_reg = self.arch().ret();
                self.registers.set(ret_reg, ret)?;
                self.release_stack_args(convention, builtin.arity);
                return Ok(());
            }
        }

        let args = self.get_function_args(Some(target), None).unwrap_or_default();
        if let Some(prototype) = self.host.prototype(target) {
            let convention = self.effective_convention(prototype.convention);
            self.release_stack_args(convention, prototype.args.len());
        }

        self.func_calls.insert(
            instr.address,
            FuncCall {
                call_site: instr.address,
                target: Some(target),
                name,
                args,
            },
        );

        Ok(())
    }

    fn release_stack_args(&mut self, convention: CallingConvention, count: usize) {
        let cleanup = convention.callee_cleanup(count, self.ptr_size());
        if cleanup > 0 {
            let sp = self.sp().wrapping_add(cleanup) & self.arch().ptr_mask();
            self.set_sp(sp);
        }
    }

    fn call_target_name(&self, desc: &OperandDesc, target: u64) -> Option<String> {
        if desc.is_memory() {
            if let Some(name) = self.operand_addr(desc).and_then(|a| self.host.name_at(a)) {
                return Some(name);
            }
        }

        self.host.name_at(target)
    }
}
