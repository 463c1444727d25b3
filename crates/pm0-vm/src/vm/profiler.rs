//! Execution profiling
//!
//! Optional instruction accounting. Disabled by default and skipped entirely
//! by the machine when disabled.

use crate::instruction::Opcode;
use std::collections::HashMap;

/// Per-run execution statistics
///
/// Tracks executed instructions by opcode plus the high-water marks of the
/// stack pointer and the frame chain.
#[derive(Debug, Clone, Default)]
pub struct Profiler {
    /// Whether profiling is enabled
    enabled: bool,
    /// Total instructions executed
    total_instructions: u64,
    /// Instructions executed per opcode
    instruction_counts: HashMap<Opcode, u64>,
    /// Highest SP observed after any instruction
    peak_sp: usize,
    /// Deepest frame chain observed, root frame included
    peak_frame_depth: usize,
}

impl Profiler {
    /// Create a new profiler (disabled by default)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new profiler with profiling enabled
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Reset profiling statistics
    pub fn reset(&mut self) {
        self.total_instructions = 0;
        self.instruction_counts.clear();
        self.peak_sp = 0;
        self.peak_frame_depth = 0;
    }

    /// Record one executed instruction
    pub fn record_instruction(&mut self, opcode: Opcode) {
        if !self.enabled {
            return;
        }
        self.total_instructions += 1;
        *self.instruction_counts.entry(opcode).or_insert(0) += 1;
    }

    /// Update the stack pointer high-water mark
    pub fn update_sp(&mut self, sp: usize) {
        if self.enabled && sp > self.peak_sp {
            self.peak_sp = sp;
        }
    }

    /// Update the frame depth high-water mark
    pub fn update_frame_depth(&mut self, depth: usize) {
        if self.enabled && depth > self.peak_frame_depth {
            self.peak_frame_depth = depth;
        }
    }

    pub fn total_instructions(&self) -> u64 {
        self.total_instructions
    }

    /// Executions of `opcode`
    pub fn instruction_count(&self, opcode: Opcode) -> u64 {
        self.instruction_counts.get(&opcode).copied().unwrap_or(0)
    }

    pub fn peak_sp(&self) -> usize {
        self.peak_sp
    }

    pub fn peak_frame_depth(&self) -> usize {
        self.peak_frame_depth
    }

    /// The `n` most executed opcodes, most frequent first
    ///
    /// Ties are broken by opcode value so the order is stable.
    pub fn top_opcodes(&self, n: usize) -> Vec<(Opcode, u64)> {
        let mut counts: Vec<(Opcode, u64)> = self
            .instruction_counts
            .iter()
            .map(|(&op, &count)| (op, count))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then((a.0 as u8).cmp(&(b.0 as u8))));
        counts.truncate(n);
        counts
    }

    /// Multi-line summary for terminal output
    pub fn generate_report(&self) -> String {
        let mut report = String::new();
        report.push_str("=== PM/0 Profile ===\n");
        report.push_str(&format!(
            "instructions executed: {}\n",
            self.total_instructions
        ));
        report.push_str(&format!("peak sp: {}\n", self.peak_sp));
        report.push_str(&format!("peak frame depth: {}\n", self.peak_frame_depth));
        if self.total_instructions > 0 {
            report.push_str("top opcodes:\n");
            for (opcode, count) in self.top_opcodes(5) {
                let share = count as f64 * 100.0 / self.total_instructions as f64;
                report.push_str(&format!(
                    "  {:<4} (op {:>2}) {:>8}  {:>5.1}%\n",
                    opcode.mnemonic(),
                    opcode as u8,
                    count,
                    share
                ));
            }
        }
        report
    }
}
