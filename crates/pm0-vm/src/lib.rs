//! PM/0 machine core
//!
//! A register/stack virtual machine for the PM/0 instruction set:
//! - Code memory of `{op, r, l, m}` records and a textual loader
//! - A fixed register file and a single operand stack holding activation records
//! - Static links for lexical scoping, dynamic links for returns
//! - Caller-supplied input/output channels
//! - Per-step snapshots for tracing, with text and JSON reporters

/// PM/0 core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod instruction;
pub mod io;
pub mod loader;
pub mod program;
pub mod registers;
pub mod report;
pub mod stack;
pub mod trace;
pub mod vm;

pub use error::{ChannelError, Fault, FaultKind, VmError};
pub use instruction::{Instruction, Opcode, Word};
pub use io::{Closed, Discard, InputChannel, OutputChannel, ReaderInput, WriterOutput};
pub use loader::LoadError;
pub use program::Program;
pub use registers::RegisterFile;
pub use report::{code_listing, JsonTrace, TextTrace};
pub use stack::OperandStack;
pub use trace::{NoTrace, Recorder, Snapshot, TraceRecord, TraceSink};
pub use vm::{FrameView, Limits, Machine, Profiler, Status};
