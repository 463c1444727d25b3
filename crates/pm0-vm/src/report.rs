//! Human- and machine-readable reports
//!
//! The executor hands out snapshots and nothing else; everything textual
//! lives here. Two renderings of a run are available:
//!
//! - [`TextTrace`]: the classic column layout
//! - [`JsonTrace`]: one JSON object per step, for tooling
//!
//! # Format
//! ```text
//! ***Code Memory***
//!   #  OP   R   L   M
//!   0 inc   0   0   4
//!   1 sio   0   0   3
//!
//! ***Execution***
//!   #  OP   R   L   M  PC  BP  SP STK
//!   0 inc   0   0   4   1   1   4   0 |   0   0   0   0
//!   1 sio   0   0   3   2   1   4   0 |   0   0   0   0
//! HLT
//! ```

use crate::instruction::Instruction;
use crate::program::Program;
use crate::trace::{Snapshot, TraceSink};
use crate::vm::frame::ROOT_BASE;
use std::io::{self, Write};

/// Render code memory as the `***Code Memory***` table
pub fn code_listing(program: &Program) -> String {
    let mut output = String::from("***Code Memory***\n");
    output.push_str(&format!(
        "{:>3} {:>3} {:>3} {:>3} {:>3} \n",
        "#", "OP", "R", "L", "M"
    ));
    for (index, instruction) in program.iter().enumerate() {
        output.push_str(&format!("{:>3} {}\n", index, instruction_columns(instruction)));
    }
    output
}

fn instruction_columns(ins: &Instruction) -> String {
    format!(
        "{:>3} {:>3} {:>3} {:>3} ",
        ins.mnemonic(),
        ins.r,
        ins.l,
        ins.m
    )
}

/// One trace line: instruction, registers, then the stack split by frame
pub fn trace_line(snapshot: &Snapshot<'_>) -> String {
    format!(
        "{:>3} {}{:>3} {:>3} {:>3} {}",
        snapshot.index,
        instruction_columns(&snapshot.instruction),
        snapshot.pc,
        snapshot.bp,
        snapshot.sp,
        render_stack(snapshot)
    )
}

/// A leading `0`, then `0..SP` split into one `| ` group per frame,
/// outermost first
///
/// Group boundaries come from the frame walk: a frame's group starts at its
/// flag slot (slot 0 for the root) and ends where the next frame's begins,
/// or at SP for the innermost one. Empty groups are omitted. A corrupt link
/// chain falls back to a single group for the whole live stack.
fn render_stack(snapshot: &Snapshot<'_>) -> String {
    let stack = snapshot.stack();
    let mut output = format!("{:>3} ", 0);

    let bases: Vec<usize> = match snapshot.frames() {
        Ok(frames) => frames.iter().rev().map(|frame| frame.base).collect(),
        Err(_) => vec![ROOT_BASE],
    };

    for (i, &base) in bases.iter().enumerate() {
        let start = base - 1;
        let end = match bases.get(i + 1) {
            Some(&next) => (next - 1).min(snapshot.sp),
            None => snapshot.sp,
        };
        if start >= end {
            continue;
        }
        output.push_str("| ");
        for word in &stack[start..end] {
            output.push_str(&format!("{:>3} ", word));
        }
    }
    output
}

/// Column-formatted execution trace
///
/// Write errors do not interrupt the run: the first one is kept, later steps
/// are dropped, and [`finish`](Self::finish) reports it.
pub struct TextTrace<W: Write> {
    writer: W,
    error: Option<io::Error>,
}

impl<W: Write> TextTrace<W> {
    /// Start a trace, writing the `***Execution***` header
    pub fn new(mut writer: W) -> io::Result<Self> {
        writeln!(writer, "\n***Execution***")?;
        writeln!(
            writer,
            "{:>3} {:>3} {:>3} {:>3} {:>3} {:>3} {:>3} {:>3} {:>3} ",
            "#", "OP", "R", "L", "M", "PC", "BP", "SP", "STK"
        )?;
        Ok(Self {
            writer,
            error: None,
        })
    }

    fn write_step(&mut self, snapshot: &Snapshot<'_>) -> io::Result<()> {
        writeln!(self.writer, "{}", trace_line(snapshot))?;
        if snapshot.halted {
            writeln!(self.writer, "HLT")?;
        }
        Ok(())
    }

    /// Flush and hand back the writer, or the first write error
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> TraceSink for TextTrace<W> {
    fn record(&mut self, snapshot: &Snapshot<'_>) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = self.write_step(snapshot) {
            self.error = Some(err);
        }
    }
}

/// JSON-lines execution trace, one [`TraceRecord`](crate::trace::TraceRecord) per step
pub struct JsonTrace<W: Write> {
    writer: W,
    error: Option<io::Error>,
}

impl<W: Write> JsonTrace<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            error: None,
        }
    }

    fn write_step(&mut self, snapshot: &Snapshot<'_>) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, &snapshot.to_record())?;
        writeln!(self.writer)
    }

    /// Flush and hand back the writer, or the first write error
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> TraceSink for JsonTrace<W> {
    fn record(&mut self, snapshot: &Snapshot<'_>) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = self.write_step(snapshot) {
            self.error = Some(err);
        }
    }
}
