//! Shared helpers for PM/0 integration tests

#![allow(dead_code)]

use pm0_vm::{
    Fault, Instruction, Limits, Machine, NoTrace, Opcode, Program, Recorder, TraceRecord, Word,
};
use std::collections::VecDeque;

pub use pretty_assertions::{assert_eq, assert_ne};

pub fn ins(op: Opcode, r: i32, l: i32, m: i32) -> Instruction {
    Instruction::with(op, r, l, m)
}

/// Finished run: the machine, how it stopped, and everything it wrote
pub struct Outcome {
    pub machine: Machine,
    pub result: Result<(), Fault>,
    pub output: Vec<Word>,
}

/// Run to completion with default limits and in-memory channels
pub fn run_program(code: Vec<Instruction>, input: &[Word]) -> Outcome {
    let mut machine = Machine::new(Program::new(code), Limits::default());
    let mut input: VecDeque<Word> = input.iter().copied().collect();
    let mut output = Vec::new();
    let result = machine.run(&mut input, &mut output, &mut NoTrace);
    Outcome {
        machine,
        result,
        output,
    }
}

/// Run to completion, keeping a record of every step
pub fn run_recorded(code: Vec<Instruction>) -> (Outcome, Vec<TraceRecord>) {
    let mut machine = Machine::new(Program::new(code), Limits::default());
    let mut output = Vec::new();
    let mut recorder = Recorder::new();
    let result = machine.run(&mut VecDeque::<Word>::new(), &mut output, &mut recorder);
    (
        Outcome {
            machine,
            result,
            output,
        },
        recorder.records,
    )
}

/// Calls an empty procedure `n` times from the root frame
pub fn call_loop(n: i32) -> Vec<Instruction> {
    vec![
        ins(Opcode::Inc, 0, 0, 4),
        ins(Opcode::Lit, 0, 0, 0),
        ins(Opcode::Lit, 1, 0, n),
        ins(Opcode::Lit, 2, 0, 1),
        ins(Opcode::Lss, 3, 0, 1),
        ins(Opcode::Jpc, 3, 0, 9),
        ins(Opcode::Cal, 0, 0, 10),
        ins(Opcode::Add, 0, 0, 2),
        ins(Opcode::Jmp, 0, 0, 4),
        ins(Opcode::Halt, 0, 0, 3),
        ins(Opcode::Inc, 0, 0, 4),
        ins(Opcode::Rtn, 0, 0, 0),
    ]
}

/// Recursive procedure P declared in the root scope
///
/// The root stores `marker` in its first local and calls P. P reserves its
/// frame, copies the root local into r5 through its static chain, and
/// recurses `depth` more times before unwinding.
pub fn recursion(depth: i32, marker: i32) -> Vec<Instruction> {
    vec![
        ins(Opcode::Inc, 0, 0, 5),
        ins(Opcode::Lit, 4, 0, marker),
        ins(Opcode::Sto, 4, 0, 4),
        ins(Opcode::Lit, 0, 0, depth),
        ins(Opcode::Lit, 1, 0, 1),
        ins(Opcode::Cal, 0, 0, 7),
        ins(Opcode::Halt, 0, 0, 3),
        // P
        ins(Opcode::Inc, 0, 0, 4),
        ins(Opcode::Lod, 5, 1, 4),
        ins(Opcode::Jpc, 0, 0, 12),
        ins(Opcode::Sub, 0, 0, 1),
        ins(Opcode::Cal, 1, 0, 7),
        ins(Opcode::Rtn, 0, 0, 0),
    ]
}
