//! Machine faults
//!
//! Every fault is fatal: the executor stops at the first one and reports it
//! tagged with the index of the instruction that raised it.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Runtime error raised while executing an instruction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    /// Opcode value outside the instruction set
    #[error("Invalid opcode {opcode}")]
    InvalidOpcode { opcode: i32 },

    /// Register index outside the register file
    #[error("Invalid register r{index} (machine has {count} registers)")]
    InvalidRegister { index: i32, count: usize },

    /// Write, reservation or frame header past the end of the stack
    #[error("Stack overflow: address {address} exceeds capacity {capacity}")]
    StackOverflow { address: i64, capacity: usize },

    /// Access below the stack or into a frame that was never established
    #[error("Stack underflow: {msg}")]
    StackUnderflow { msg: String },

    /// DIV or MOD with a zero divisor
    #[error("Division by zero")]
    DivisionByZero,

    /// Input requested after the input channel ended
    #[error("Input channel exhausted")]
    ChannelExhausted,

    /// Fetch outside code memory
    #[error("Program counter {pc} outside code memory (0..{len})")]
    ProgramCounterOutOfRange { pc: i64, len: usize },

    /// I/O or decode failure on a caller-supplied channel
    #[error("Channel failure: {0}")]
    ChannelFailure(#[from] ChannelError),
}

impl VmError {
    /// Shorthand for a [`VmError::StackUnderflow`] with a formatted message
    pub(crate) fn underflow(msg: impl Into<String>) -> Self {
        VmError::StackUnderflow { msg: msg.into() }
    }

    /// The fault category, without its details
    pub fn kind(&self) -> FaultKind {
        match self {
            VmError::InvalidOpcode { .. } => FaultKind::InvalidOpcode,
            VmError::InvalidRegister { .. } => FaultKind::InvalidRegister,
            VmError::StackOverflow { .. } => FaultKind::StackOverflow,
            VmError::StackUnderflow { .. } => FaultKind::StackUnderflow,
            VmError::DivisionByZero => FaultKind::DivisionByZero,
            VmError::ChannelExhausted => FaultKind::ChannelExhausted,
            VmError::ProgramCounterOutOfRange { .. } => FaultKind::ProgramCounterOutOfRange,
            VmError::ChannelFailure(_) => FaultKind::ChannelFailure,
        }
    }
}

/// Fault category reported on termination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FaultKind {
    InvalidOpcode,
    InvalidRegister,
    StackOverflow,
    StackUnderflow,
    DivisionByZero,
    ChannelExhausted,
    ProgramCounterOutOfRange,
    ChannelFailure,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FaultKind::InvalidOpcode => "InvalidOpcode",
            FaultKind::InvalidRegister => "InvalidRegister",
            FaultKind::StackOverflow => "StackOverflow",
            FaultKind::StackUnderflow => "StackUnderflow",
            FaultKind::DivisionByZero => "DivisionByZero",
            FaultKind::ChannelExhausted => "ChannelExhausted",
            FaultKind::ProgramCounterOutOfRange => "ProgramCounterOutOfRange",
            FaultKind::ChannelFailure => "ChannelFailure",
        };
        f.write_str(name)
    }
}

/// A fault together with the instruction that raised it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fault at instruction {index}: {error}")]
pub struct Fault {
    /// Index of the faulting instruction (the PC before the fetch increment)
    pub index: usize,
    /// What went wrong
    pub error: VmError,
}

impl Fault {
    /// The fault category
    pub fn kind(&self) -> FaultKind {
        self.error.kind()
    }
}

/// Error reported by an input or output channel
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// Underlying reader or writer failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Input token is not an integer
    #[error("expected an integer, found '{0}'")]
    Malformed(String),
}

impl From<std::io::Error> for ChannelError {
    fn from(err: std::io::Error) -> Self {
        ChannelError::Io(err.to_string())
    }
}
