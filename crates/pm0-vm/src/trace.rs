//! Per-step inspection
//!
//! After every completed instruction the machine hands a [`Snapshot`] to a
//! [`TraceSink`]. The snapshot borrows machine state; sinks that need to keep
//! it convert it into an owned [`TraceRecord`]. Formatting lives in
//! [`crate::report`], not here.

use crate::error::VmError;
use crate::instruction::{Instruction, Word};
use crate::stack::OperandStack;
use crate::vm::frame::{FrameManager, FrameView};
use serde::Serialize;

/// Machine state right after one instruction
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    /// Index the instruction was fetched from
    pub index: usize,
    /// The instruction just executed
    pub instruction: Instruction,
    pub pc: usize,
    pub bp: usize,
    pub sp: usize,
    /// True when this instruction halted the machine
    pub halted: bool,
    pub(crate) stack: &'a OperandStack,
    pub(crate) frames: &'a FrameManager,
}

impl<'a> Snapshot<'a> {
    /// Full stack contents, live or not
    pub fn stack(&self) -> &'a [Word] {
        self.stack.as_slice()
    }

    /// Reserved region `0..SP`
    pub fn live(&self) -> &'a [Word] {
        &self.stack.as_slice()[..self.sp]
    }

    /// Live frames, innermost first, from the dynamic-link chain
    pub fn frames(&self) -> Result<Vec<FrameView>, VmError> {
        self.frames.frames(self.stack)
    }

    /// Owned copy for sinks that outlive the step
    pub fn to_record(&self) -> TraceRecord {
        TraceRecord {
            index: self.index,
            op: self.instruction.mnemonic(),
            instruction: self.instruction,
            pc: self.pc,
            bp: self.bp,
            sp: self.sp,
            stack: self.live().to_vec(),
            frames: self
                .frames()
                .map(|frames| frames.iter().map(|f| f.base).collect())
                .unwrap_or_default(),
            halted: self.halted,
        }
    }
}

/// Serialisable, owned form of a [`Snapshot`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceRecord {
    pub index: usize,
    pub op: &'static str,
    pub instruction: Instruction,
    pub pc: usize,
    pub bp: usize,
    pub sp: usize,
    /// Live stack `0..SP`
    pub stack: Vec<Word>,
    /// Frame bases, innermost first; empty if the link chain is corrupt
    pub frames: Vec<usize>,
    pub halted: bool,
}

/// Receiver of per-step snapshots
pub trait TraceSink {
    fn record(&mut self, snapshot: &Snapshot<'_>);
}

impl<F> TraceSink for F
where
    F: FnMut(&Snapshot<'_>),
{
    fn record(&mut self, snapshot: &Snapshot<'_>) {
        self(snapshot)
    }
}

/// Sink that ignores every snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTrace;

impl TraceSink for NoTrace {
    fn record(&mut self, _snapshot: &Snapshot<'_>) {}
}

/// Sink that keeps an owned record of every step
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub records: Vec<TraceRecord>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TraceSink for Recorder {
    fn record(&mut self, snapshot: &Snapshot<'_>) {
        self.records.push(snapshot.to_record());
    }
}
