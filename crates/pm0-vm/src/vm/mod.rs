//! PM/0 executor
//!
//! Fetch-decode-execute loop over a register file and a single operand stack.
//! - PC is incremented before dispatch; jumps, calls and returns overwrite it
//! - Arithmetic wraps on overflow; DIV and MOD fault on a zero divisor
//! - Every fault is fatal and recorded separately from a normal halt

pub mod dispatch;
pub mod frame;
mod profiler;

pub use frame::{FrameManager, FrameView, FRAME_ORIGIN, HEADER_LEN, ROOT_BASE};
pub use profiler::Profiler;

use crate::error::{Fault, FaultKind, VmError};
use crate::instruction::{Instruction, Opcode, Word};
use crate::io::{InputChannel, OutputChannel};
use crate::program::Program;
use crate::registers::RegisterFile;
use crate::stack::OperandStack;
use crate::trace::{Snapshot, TraceSink};
use serde::Serialize;

/// Machine sizing fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Number of general-purpose registers
    pub registers: usize,
    /// Operand stack capacity in words
    pub stack_capacity: usize,
    /// Largest program the loader accepts
    pub max_code_length: usize,
}

impl Limits {
    /// Effective limits from a merged configuration
    pub fn from_config(config: &pm0_config::Config) -> Self {
        Self {
            registers: config.registers(),
            stack_capacity: config.stack_capacity(),
            max_code_length: config.max_code_length(),
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            registers: pm0_config::DEFAULT_REGISTERS,
            stack_capacity: pm0_config::DEFAULT_STACK_CAPACITY,
            max_code_length: pm0_config::DEFAULT_MAX_CODE_LENGTH,
        }
    }
}

/// Execution state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Running,
    /// Stopped by the halt instruction
    Halted,
    /// Stopped by a fault
    Faulted(FaultKind),
}

/// What the dispatcher tells the loop after one instruction
enum Flow {
    Continue,
    Halt,
}

/// PM/0 machine
///
/// Owns all machine state for one simulation run. Construct a fresh one per
/// program; nothing is shared between instances.
pub struct Machine {
    /// Code memory
    program: Program,
    /// Scratch registers
    registers: RegisterFile,
    /// Data and frame headers
    stack: OperandStack,
    /// BP, SP and the call protocol
    frames: FrameManager,
    /// Next instruction to fetch
    pc: usize,
    /// Instructions completed so far
    steps: u64,
    /// Set once the machine stops
    termination: Option<Result<(), Fault>>,
    /// Optional profiler for execution statistics
    profiler: Option<Profiler>,
}

impl Machine {
    /// Create a machine with zeroed registers and stack, SP = 0, BP = 1, PC = 0
    pub fn new(program: Program, limits: Limits) -> Self {
        Self {
            program,
            registers: RegisterFile::new(limits.registers),
            stack: OperandStack::new(limits.stack_capacity),
            frames: FrameManager::new(),
            pc: 0,
            steps: 0,
            termination: None,
            profiler: None,
        }
    }

    /// Create a machine with profiling enabled
    pub fn with_profiling(program: Program, limits: Limits) -> Self {
        let mut machine = Self::new(program, limits);
        machine.profiler = Some(Profiler::enabled());
        machine
    }

    // ===== Accessors =====

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn bp(&self) -> usize {
        self.frames.bp()
    }

    pub fn sp(&self) -> usize {
        self.frames.sp()
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn stack(&self) -> &OperandStack {
        &self.stack
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn frame_manager(&self) -> &FrameManager {
        &self.frames
    }

    /// Live frames, innermost first
    pub fn frames(&self) -> Result<Vec<FrameView>, VmError> {
        self.frames.frames(&self.stack)
    }

    /// Absolute address of lexical `(level, offset)` from the current frame
    pub fn resolve(&self, level: i32, offset: i32) -> Result<i64, VmError> {
        self.frames.resolve(&self.stack, level, offset)
    }

    /// Instructions completed so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn status(&self) -> Status {
        match &self.termination {
            None => Status::Running,
            Some(Ok(())) => Status::Halted,
            Some(Err(fault)) => Status::Faulted(fault.kind()),
        }
    }

    /// The recorded fault, if the machine stopped on one
    pub fn fault(&self) -> Option<&Fault> {
        match &self.termination {
            Some(Err(fault)) => Some(fault),
            _ => None,
        }
    }

    pub fn profiler(&self) -> Option<&Profiler> {
        self.profiler.as_ref()
    }

    // ===== Execution =====

    /// Run until halt or fault, reporting every completed step to `trace`
    pub fn run<I, O, T>(&mut self, input: &mut I, output: &mut O, trace: &mut T) -> Result<(), Fault>
    where
        I: InputChannel + ?Sized,
        O: OutputChannel + ?Sized,
        T: TraceSink + ?Sized,
    {
        loop {
            match self.step(input, output)? {
                Some(snapshot) => {
                    trace.record(&snapshot);
                    if snapshot.halted {
                        return Ok(());
                    }
                }
                None => return Ok(()),
            }
        }
    }

    /// Execute one instruction
    ///
    /// Returns the post-step snapshot, `Ok(None)` if the machine had already
    /// halted, or the fault that stopped it. A faulted machine keeps
    /// returning the same fault.
    pub fn step<I, O>(&mut self, input: &mut I, output: &mut O) -> Result<Option<Snapshot<'_>>, Fault>
    where
        I: InputChannel + ?Sized,
        O: OutputChannel + ?Sized,
    {
        match &self.termination {
            Some(Ok(())) => return Ok(None),
            Some(Err(fault)) => return Err(fault.clone()),
            None => {}
        }

        let index = self.pc;
        let instruction = match self.program.fetch(index) {
            Ok(instruction) => instruction,
            Err(error) => return Err(self.trap(index, error)),
        };

        // Advance first: jumps, calls and returns overwrite this
        self.pc += 1;

        let flow = match self.execute(instruction, input, output) {
            Ok(flow) => flow,
            Err(error) => return Err(self.trap(index, error)),
        };

        self.steps += 1;
        let halted = matches!(flow, Flow::Halt);
        if halted {
            self.termination = Some(Ok(()));
        }

        if let Some(ref mut profiler) = self.profiler {
            if profiler.is_enabled() {
                if let Some(opcode) = instruction.opcode() {
                    profiler.record_instruction(opcode);
                }
                profiler.update_sp(self.frames.sp());
                if let Ok(depth) = self.frames.depth(&self.stack) {
                    profiler.update_frame_depth(depth);
                }
            }
        }

        Ok(Some(Snapshot {
            index,
            instruction,
            pc: self.pc,
            bp: self.frames.bp(),
            sp: self.frames.sp(),
            halted,
            stack: &self.stack,
            frames: &self.frames,
        }))
    }

    fn trap(&mut self, index: usize, error: VmError) -> Fault {
        let fault = Fault { index, error };
        self.termination = Some(Err(fault.clone()));
        fault
    }

    fn execute<I, O>(
        &mut self,
        ins: Instruction,
        input: &mut I,
        output: &mut O,
    ) -> Result<Flow, VmError>
    where
        I: InputChannel + ?Sized,
        O: OutputChannel + ?Sized,
    {
        let opcode = Opcode::from_raw(ins.op).ok_or(VmError::InvalidOpcode { opcode: ins.op })?;

        match opcode {
            // ===== Data movement and frames =====
            Opcode::Lit => self.registers.write(ins.r, ins.m)?,
            Opcode::Rtn => {
                self.pc = self.frames.ret(&self.stack, self.program.len())?;
            }
            Opcode::Lod => {
                let value = self.frames.load(&self.stack, ins.l, ins.m)?;
                self.registers.write(ins.r, value)?;
            }
            Opcode::Sto => {
                let value = self.registers.read(ins.r)?;
                self.frames.store(&mut self.stack, ins.l, ins.m, value)?;
            }
            Opcode::Cal => {
                let target = self.jump_target(ins.m)?;
                self.frames.call(&mut self.stack, ins.l, self.pc)?;
                self.pc = target;
            }
            Opcode::Inc => self.frames.reserve(&self.stack, ins.m)?,

            // ===== Control flow =====
            Opcode::Jmp => self.pc = self.jump_target(ins.m)?,
            Opcode::Jpc => {
                if self.registers.read(ins.r)? == 0 {
                    self.pc = self.jump_target(ins.m)?;
                }
            }

            // ===== System I/O =====
            Opcode::Write => {
                let value = self.registers.read(ins.r)?;
                output.write_value(value)?;
            }
            Opcode::Read => {
                // Validate the destination before consuming input
                self.registers.read(ins.r)?;
                let value = input.read_value()?.ok_or(VmError::ChannelExhausted)?;
                self.registers.write(ins.r, value)?;
            }
            Opcode::Halt => return Ok(Flow::Halt),

            // ===== Arithmetic =====
            Opcode::Neg => {
                let value = self.registers.read(ins.l)?;
                self.registers.write(ins.r, value.wrapping_neg())?;
            }
            Opcode::Add => self.binary_op(ins, |a, b| Ok(a.wrapping_add(b)))?,
            Opcode::Sub => self.binary_op(ins, |a, b| Ok(a.wrapping_sub(b)))?,
            Opcode::Mul => self.binary_op(ins, |a, b| Ok(a.wrapping_mul(b)))?,
            Opcode::Div => self.binary_op(ins, |a, b| {
                if b == 0 {
                    Err(VmError::DivisionByZero)
                } else {
                    Ok(a.wrapping_div(b))
                }
            })?,
            Opcode::Odd => {
                let value = self.registers.read(ins.r)?;
                self.registers.write(ins.r, value & 1)?;
            }
            Opcode::Mod => self.binary_op(ins, |a, b| {
                if b == 0 {
                    Err(VmError::DivisionByZero)
                } else {
                    Ok(a.wrapping_rem(b))
                }
            })?,

            // ===== Comparison =====
            Opcode::Eql => self.binary_op(ins, |a, b| Ok(Word::from(a == b)))?,
            Opcode::Neq => self.binary_op(ins, |a, b| Ok(Word::from(a != b)))?,
            Opcode::Lss => self.binary_op(ins, |a, b| Ok(Word::from(a < b)))?,
            Opcode::Leq => self.binary_op(ins, |a, b| Ok(Word::from(a <= b)))?,
            Opcode::Gtr => self.binary_op(ins, |a, b| Ok(Word::from(a > b)))?,
            Opcode::Geq => self.binary_op(ins, |a, b| Ok(Word::from(a >= b)))?,
        }

        Ok(Flow::Continue)
    }

    // ===== Helper Methods =====

    /// R[r] = op(R[l], R[m])
    #[inline(always)]
    fn binary_op<F>(&mut self, ins: Instruction, op: F) -> Result<(), VmError>
    where
        F: FnOnce(Word, Word) -> Result<Word, VmError>,
    {
        let a = self.registers.read(ins.l)?;
        let b = self.registers.read(ins.m)?;
        let result = op(a, b)?;
        self.registers.write(ins.r, result)
    }

    /// Jump targets are range-checked by the next fetch; only negative
    /// values, which cannot be a PC at all, are rejected here.
    #[inline(always)]
    fn jump_target(&self, m: i32) -> Result<usize, VmError> {
        usize::try_from(m).map_err(|_| VmError::ProgramCounterOutOfRange {
            pc: m as i64,
            len: self.program.len(),
        })
    }
}
