//! Executor behaviour: arithmetic, frames, faults and termination

mod common;

use common::*;
use common::{assert_eq, assert_ne};
use pm0_vm::{FaultKind, Limits, Machine, NoTrace, Opcode, Program, Status, VmError};
use proptest::prelude::*;
use rstest::rstest;

// ============================================================================
// Arithmetic and output
// ============================================================================

#[test]
fn test_add_then_write() {
    let outcome = run_program(
        vec![
            ins(Opcode::Lit, 0, 0, 3),
            ins(Opcode::Lit, 1, 0, 4),
            ins(Opcode::Add, 2, 0, 1),
            ins(Opcode::Write, 2, 0, 1),
            ins(Opcode::Halt, 0, 0, 3),
        ],
        &[],
    );
    assert_eq!(outcome.result, Ok(()));
    assert_eq!(outcome.output, vec![7]);
    assert_eq!(outcome.machine.registers().read(2), Ok(7));
}

#[rstest]
#[case(Opcode::Add, 7, 3, 10)]
#[case(Opcode::Sub, 7, 3, 4)]
#[case(Opcode::Mul, 7, -3, -21)]
#[case(Opcode::Div, 7, 3, 2)]
#[case(Opcode::Div, -7, 2, -3)]
#[case(Opcode::Mod, 7, 3, 1)]
#[case(Opcode::Mod, -7, 3, -1)]
#[case(Opcode::Eql, 4, 4, 1)]
#[case(Opcode::Neq, 4, 4, 0)]
#[case(Opcode::Lss, 3, 4, 1)]
#[case(Opcode::Leq, 4, 4, 1)]
#[case(Opcode::Gtr, 3, 4, 0)]
#[case(Opcode::Geq, 5, 4, 1)]
fn test_binary_ops(#[case] op: Opcode, #[case] a: i32, #[case] b: i32, #[case] expected: i32) {
    let outcome = run_program(
        vec![
            ins(Opcode::Lit, 1, 0, a),
            ins(Opcode::Lit, 2, 0, b),
            ins(op, 0, 1, 2),
            ins(Opcode::Halt, 0, 0, 3),
        ],
        &[],
    );
    assert_eq!(outcome.result, Ok(()));
    assert_eq!(outcome.machine.registers().read(0), Ok(expected));
}

#[test]
fn test_output_captures_value_at_write_time() {
    let outcome = run_program(
        vec![
            ins(Opcode::Lit, 0, 0, 5),
            ins(Opcode::Write, 0, 0, 1),
            ins(Opcode::Lit, 0, 0, 9),
            ins(Opcode::Write, 0, 0, 1),
            ins(Opcode::Lit, 0, 0, 11),
            ins(Opcode::Halt, 0, 0, 3),
        ],
        &[],
    );
    assert_eq!(outcome.output, vec![5, 9]);
    assert_eq!(outcome.machine.registers().read(0), Ok(11));
}

#[test]
fn test_read_sums_input() {
    let outcome = run_program(
        vec![
            ins(Opcode::Read, 0, 0, 2),
            ins(Opcode::Read, 1, 0, 2),
            ins(Opcode::Add, 2, 0, 1),
            ins(Opcode::Write, 2, 0, 1),
            ins(Opcode::Halt, 0, 0, 3),
        ],
        &[40, 2],
    );
    assert_eq!(outcome.output, vec![42]);
}

fn reference(op: Opcode, a: i32, b: i32) -> Option<i32> {
    Some(match op {
        Opcode::Add => a.wrapping_add(b),
        Opcode::Sub => a.wrapping_sub(b),
        Opcode::Mul => a.wrapping_mul(b),
        Opcode::Div => a.checked_div(b).or_else(|| (b != 0).then(|| a.wrapping_div(b)))?,
        Opcode::Mod => a.checked_rem(b).or_else(|| (b != 0).then(|| a.wrapping_rem(b)))?,
        Opcode::Eql => i32::from(a == b),
        Opcode::Lss => i32::from(a < b),
        Opcode::Geq => i32::from(a >= b),
        _ => unreachable!(),
    })
}

proptest! {
    #[test]
    fn prop_binary_ops_match_wrapping_arithmetic(
        a in any::<i32>(),
        b in prop_oneof![Just(0), Just(-1), any::<i32>()],
        op in prop::sample::select(vec![
            Opcode::Add, Opcode::Sub, Opcode::Mul, Opcode::Div,
            Opcode::Mod, Opcode::Eql, Opcode::Lss, Opcode::Geq,
        ]),
    ) {
        let outcome = run_program(
            vec![
                ins(Opcode::Lit, 1, 0, a),
                ins(Opcode::Lit, 2, 0, b),
                ins(op, 3, 1, 2),
                ins(Opcode::Write, 3, 0, 1),
                ins(Opcode::Halt, 0, 0, 3),
            ],
            &[],
        );
        match reference(op, a, b) {
            Some(expected) => {
                prop_assert_eq!(outcome.result, Ok(()));
                prop_assert_eq!(outcome.output, vec![expected]);
            }
            None => {
                let fault = outcome.result.unwrap_err();
                prop_assert_eq!(fault.kind(), FaultKind::DivisionByZero);
                prop_assert_eq!(fault.index, 2);
            }
        }
    }
}

// ============================================================================
// Frames and lexical addressing
// ============================================================================

#[rstest]
#[case(0)]
#[case(1)]
#[case(2)]
fn test_call_then_return_restores_bp_and_pc(#[case] level: i32) {
    // Three nested frames so every level in 0..=2 resolves
    let code = vec![
        ins(Opcode::Inc, 0, 0, 4),
        ins(Opcode::Cal, 0, 0, 3),
        ins(Opcode::Halt, 0, 0, 3),
        ins(Opcode::Inc, 0, 0, 4),
        ins(Opcode::Cal, 0, 0, 6),
        ins(Opcode::Rtn, 0, 0, 0),
        ins(Opcode::Inc, 0, 0, 4),
        ins(Opcode::Cal, level, 0, 9),
        ins(Opcode::Rtn, 0, 0, 0),
        ins(Opcode::Rtn, 0, 0, 0),
    ];
    let mut vm = Machine::new(Program::new(code), Limits::default());
    let mut output: Vec<i32> = Vec::new();
    let mut input: std::collections::VecDeque<i32> = std::collections::VecDeque::new();

    // Run up to the inner CAL at index 7
    while vm.pc() != 7 {
        vm.step(&mut input, &mut output).unwrap();
    }
    let (bp, sp) = (vm.bp(), vm.sp());

    vm.step(&mut input, &mut output).unwrap();
    assert_eq!(vm.pc(), 9);
    let frames = vm.frames().unwrap();
    assert_eq!(frames.len(), 4);
    assert_eq!(frames[0].dynamic_link as usize, bp);

    vm.step(&mut input, &mut output).unwrap();
    assert_eq!((vm.bp(), vm.sp(), vm.pc()), (bp, sp, 8));

    assert_eq!(vm.run(&mut input, &mut output, &mut NoTrace), Ok(()));
    assert_eq!(vm.status(), Status::Halted);
}

#[test]
fn test_static_chain_reaches_root_variable() {
    for depth in [0, 1, 5] {
        let outcome = run_program(recursion(depth, 77), &[]);
        assert_eq!(outcome.result, Ok(()));
        assert_eq!(outcome.machine.registers().read(5), Ok(77));
        assert_eq!((outcome.machine.bp(), outcome.machine.sp()), (1, 5));
    }
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(4)]
#[case(20)]
fn test_frame_walk_follows_call_depth(#[case] depth: i32) {
    let (outcome, records) = run_recorded(recursion(depth, 1));
    assert_eq!(outcome.result, Ok(()));

    let calls = records.iter().filter(|r| r.op == "cal").count();
    assert_eq!(calls, depth as usize + 1);

    let deepest = records.iter().map(|r| r.frames.len()).max().unwrap();
    assert_eq!(deepest, calls + 1);

    // Innermost first, always ending at the root
    for record in &records {
        assert_eq!(record.frames.first(), Some(&record.bp));
        assert_eq!(record.frames.last(), Some(&1));
    }
}

proptest! {
    #[test]
    fn prop_root_resolve_ignores_history(m in 0i32..2000, calls in 0i32..6) {
        let outcome = run_program(call_loop(calls), &[]);
        prop_assert_eq!(outcome.result, Ok(()));
        prop_assert_eq!(outcome.machine.bp(), 1);
        prop_assert_eq!(outcome.machine.resolve(0, m), Ok(i64::from(m)));
    }
}

#[rstest]
#[case::from_root(vec![
    ins(Opcode::Inc, 0, 0, 5),
    ins(Opcode::Lod, 0, 1, 4),
])]
#[case::one_frame_deep(vec![
    ins(Opcode::Inc, 0, 0, 5),
    ins(Opcode::Cal, 0, 0, 2),
    ins(Opcode::Inc, 0, 0, 5),
    ins(Opcode::Lod, 0, 2, 4),
])]
#[case::store_from_root(vec![
    ins(Opcode::Inc, 0, 0, 5),
    ins(Opcode::Sto, 0, 3, 4),
])]
fn test_chasing_past_root_underflows(#[case] code: Vec<pm0_vm::Instruction>) {
    let last = code.len() - 1;
    let outcome = run_program(code, &[]);
    let fault = outcome.result.unwrap_err();
    assert_eq!(fault.kind(), FaultKind::StackUnderflow);
    assert_eq!(fault.index, last);
}

#[test]
fn test_return_without_call_preserves_state() {
    let outcome = run_program(
        vec![ins(Opcode::Inc, 0, 0, 6), ins(Opcode::Rtn, 0, 0, 0)],
        &[],
    );
    assert_eq!(outcome.result.unwrap_err().kind(), FaultKind::StackUnderflow);
    assert_eq!(outcome.machine.bp(), 1);
    assert_eq!(outcome.machine.sp(), 6);
    assert_eq!(outcome.machine.status(), Status::Faulted(FaultKind::StackUnderflow));
}

#[test]
fn test_clobbered_static_link_faults_on_outer_access() {
    let outcome = run_program(
        vec![
            ins(Opcode::Inc, 0, 0, 5),
            ins(Opcode::Cal, 0, 0, 3),
            ins(Opcode::Halt, 0, 0, 3),
            ins(Opcode::Inc, 0, 0, 5),
            ins(Opcode::Lit, 0, 0, 40),
            ins(Opcode::Sto, 0, 0, 1),
            ins(Opcode::Lod, 1, 1, 4),
        ],
        &[],
    );
    let fault = outcome.result.unwrap_err();
    assert_eq!(fault.kind(), FaultKind::StackUnderflow);
    assert_eq!(fault.index, 6);
    assert_eq!(outcome.machine.registers().read(1).unwrap(), 0);
}

#[test]
fn test_locals_of_unreserved_frame_are_unreachable() {
    let outcome = run_program(
        vec![
            ins(Opcode::Inc, 0, 0, 4),
            ins(Opcode::Cal, 0, 0, 2),
            ins(Opcode::Lod, 0, 0, 4),
        ],
        &[],
    );
    assert_eq!(outcome.result.unwrap_err().kind(), FaultKind::StackUnderflow);
}

// ============================================================================
// Faults
// ============================================================================

#[rstest]
#[case::invalid_opcode(vec![pm0_vm::Instruction::new(0, 0, 0, 0)], FaultKind::InvalidOpcode)]
#[case::opcode_past_table(vec![pm0_vm::Instruction::new(25, 0, 0, 0)], FaultKind::InvalidOpcode)]
#[case::invalid_register(vec![ins(Opcode::Lit, 16, 0, 1)], FaultKind::InvalidRegister)]
#[case::negative_register(vec![ins(Opcode::Write, -1, 0, 1)], FaultKind::InvalidRegister)]
#[case::division_by_zero(vec![ins(Opcode::Div, 0, 1, 2)], FaultKind::DivisionByZero)]
#[case::modulo_by_zero(vec![ins(Opcode::Mod, 0, 1, 2)], FaultKind::DivisionByZero)]
#[case::input_exhausted(vec![ins(Opcode::Read, 0, 0, 2)], FaultKind::ChannelExhausted)]
#[case::reserve_past_capacity(vec![ins(Opcode::Inc, 0, 0, 2001)], FaultKind::StackOverflow)]
#[case::release_below_zero(vec![ins(Opcode::Inc, 0, 0, -1)], FaultKind::StackUnderflow)]
#[case::jump_past_end(vec![ins(Opcode::Jmp, 0, 0, 40)], FaultKind::ProgramCounterOutOfRange)]
#[case::negative_jump(vec![ins(Opcode::Jmp, 0, 0, -2)], FaultKind::ProgramCounterOutOfRange)]
#[case::no_halt(vec![ins(Opcode::Lit, 0, 0, 1)], FaultKind::ProgramCounterOutOfRange)]
fn test_fault_kinds(#[case] code: Vec<pm0_vm::Instruction>, #[case] kind: FaultKind) {
    let outcome = run_program(code, &[]);
    assert_eq!(outcome.result.unwrap_err().kind(), kind);
    assert_eq!(outcome.machine.status(), Status::Faulted(kind));
}

#[test]
fn test_division_by_zero_is_not_invalid_opcode() {
    let outcome = run_program(
        vec![ins(Opcode::Lit, 1, 0, 9), ins(Opcode::Div, 0, 1, 2)],
        &[],
    );
    let fault = outcome.result.unwrap_err();
    assert_eq!(fault.error, VmError::DivisionByZero);
    assert_ne!(fault.kind(), FaultKind::InvalidOpcode);
    assert_eq!(fault.to_string(), "fault at instruction 1: Division by zero");
}

#[test]
fn test_call_header_overflow() {
    let limits = Limits {
        stack_capacity: 8,
        ..Limits::default()
    };
    let mut vm = Machine::new(
        Program::new(vec![ins(Opcode::Inc, 0, 0, 5), ins(Opcode::Cal, 0, 0, 0)]),
        limits,
    );
    let fault = vm
        .run(&mut pm0_vm::Closed, &mut pm0_vm::Discard, &mut NoTrace)
        .unwrap_err();
    assert_eq!(fault.kind(), FaultKind::StackOverflow);
    assert_eq!(vm.bp(), 1);
}

#[test]
fn test_unbounded_recursion_overflows() {
    let outcome = run_program(
        vec![
            ins(Opcode::Inc, 0, 0, 4),
            ins(Opcode::Cal, 0, 0, 2),
            ins(Opcode::Inc, 0, 0, 4),
            ins(Opcode::Cal, 1, 0, 2),
        ],
        &[],
    );
    let fault = outcome.result.unwrap_err();
    assert_eq!(fault.kind(), FaultKind::StackOverflow);
    assert!(outcome.machine.sp() <= 2000);
}

#[test]
fn test_stepping_after_halt_is_inert() {
    let mut vm = Machine::new(
        Program::new(vec![ins(Opcode::Halt, 0, 0, 3)]),
        Limits::default(),
    );
    let mut output: Vec<i32> = Vec::new();
    assert_eq!(vm.run(&mut pm0_vm::Closed, &mut output, &mut NoTrace), Ok(()));
    assert_eq!(vm.run(&mut pm0_vm::Closed, &mut output, &mut NoTrace), Ok(()));
    assert_eq!(vm.steps(), 1);
    assert_eq!(vm.pc(), 1);
}
