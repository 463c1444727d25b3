//! PM/0 instruction set
//!
//! Register machine with 24 opcodes. Every instruction is a fixed
//! `{op, r, l, m}` quadruple; the meaning of `l` and `m` depends on the
//! opcode (lexical level, register index, immediate, address or offset).

use serde::Serialize;
use std::fmt;

/// Machine word
pub type Word = i32;

/// Decoded instruction record
///
/// Fields are kept raw as loaded. The opcode is validated when the
/// instruction executes, so code memory may hold values the machine
/// would reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Instruction {
    /// Opcode value
    pub op: i32,
    /// Destination or operand register
    pub r: i32,
    /// Lexical level or first source register
    pub l: i32,
    /// Immediate, address, offset or second source register
    pub m: i32,
}

impl Instruction {
    pub const fn new(op: i32, r: i32, l: i32, m: i32) -> Self {
        Self { op, r, l, m }
    }

    /// Build an instruction from a known opcode
    pub const fn with(opcode: Opcode, r: i32, l: i32, m: i32) -> Self {
        Self::new(opcode as i32, r, l, m)
    }

    /// Decode the opcode field
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_raw(self.op)
    }

    /// Mnemonic for listings; `???` when the opcode is not recognised
    pub fn mnemonic(&self) -> &'static str {
        self.opcode().map(Opcode::mnemonic).unwrap_or("???")
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.mnemonic(), self.r, self.l, self.m)
    }
}

/// PM/0 opcode (24 instructions)
///
/// Explicit values match the numeric encoding of the instruction feed.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Opcode {
    // ===== Data movement and frames (1-6) =====
    /// R[r] = m
    Lit = 1,
    /// Tear down the current activation record
    Rtn = 2,
    /// R[r] = stack[resolve(l, m)]
    Lod = 3,
    /// stack[resolve(l, m)] = R[r]
    Sto = 4,
    /// Build an activation record at level l, jump to m
    Cal = 5,
    /// Reserve m stack slots
    Inc = 6,

    // ===== Control flow (7-8) =====
    /// PC = m
    Jmp = 7,
    /// PC = m if R[r] == 0
    Jpc = 8,

    // ===== System I/O (9-11) =====
    /// Write R[r] to the output channel
    Write = 9,
    /// Read the input channel into R[r]
    Read = 10,
    /// Stop the machine
    Halt = 11,

    // ===== Arithmetic (12-18) =====
    /// R[r] = -R[l]
    Neg = 12,
    /// R[r] = R[l] + R[m]
    Add = 13,
    /// R[r] = R[l] - R[m]
    Sub = 14,
    /// R[r] = R[l] * R[m]
    Mul = 15,
    /// R[r] = R[l] / R[m]
    Div = 16,
    /// R[r] = R[r] is odd
    Odd = 17,
    /// R[r] = R[l] % R[m]
    Mod = 18,

    // ===== Comparison (19-24) =====
    /// R[r] = R[l] == R[m]
    Eql = 19,
    /// R[r] = R[l] != R[m]
    Neq = 20,
    /// R[r] = R[l] < R[m]
    Lss = 21,
    /// R[r] = R[l] <= R[m]
    Leq = 22,
    /// R[r] = R[l] > R[m]
    Gtr = 23,
    /// R[r] = R[l] >= R[m]
    Geq = 24,
}

impl Opcode {
    /// Decode a raw opcode value
    #[inline]
    pub fn from_raw(value: i32) -> Option<Opcode> {
        crate::vm::dispatch::decode_opcode(value)
    }

    /// Three-letter mnemonic used in listings and traces
    ///
    /// The three system calls share `sio`, as in the classic PM/0 listing.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Lit => "lit",
            Opcode::Rtn => "rtn",
            Opcode::Lod => "lod",
            Opcode::Sto => "sto",
            Opcode::Cal => "cal",
            Opcode::Inc => "inc",
            Opcode::Jmp => "jmp",
            Opcode::Jpc => "jpc",
            Opcode::Write | Opcode::Read | Opcode::Halt => "sio",
            Opcode::Neg => "neg",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Odd => "odd",
            Opcode::Mod => "mod",
            Opcode::Eql => "eql",
            Opcode::Neq => "neq",
            Opcode::Lss => "lss",
            Opcode::Leq => "leq",
            Opcode::Gtr => "gtr",
            Opcode::Geq => "geq",
        }
    }
}

impl TryFrom<i32> for Opcode {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Opcode::from_raw(value).ok_or(value)
    }
}
