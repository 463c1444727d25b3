//! Opcode decoding for the dispatch loop
//!
//! Uses a static lookup table indexed by the raw opcode value instead of
//! a match, so decoding is a single bounds-checked load.

use crate::instruction::Opcode;

/// Largest valid opcode value
pub const MAX_OPCODE: i32 = 24;

/// Static dispatch table mapping opcode values to optional Opcodes.
/// Slot 0 is the historically illegal opcode.
static OPCODE_TABLE: [Option<Opcode>; MAX_OPCODE as usize + 1] = {
    let mut table: [Option<Opcode>; MAX_OPCODE as usize + 1] = [None; MAX_OPCODE as usize + 1];

    // Data movement and frames (1-6)
    table[1] = Some(Opcode::Lit);
    table[2] = Some(Opcode::Rtn);
    table[3] = Some(Opcode::Lod);
    table[4] = Some(Opcode::Sto);
    table[5] = Some(Opcode::Cal);
    table[6] = Some(Opcode::Inc);

    // Control flow (7-8)
    table[7] = Some(Opcode::Jmp);
    table[8] = Some(Opcode::Jpc);

    // System I/O (9-11)
    table[9] = Some(Opcode::Write);
    table[10] = Some(Opcode::Read);
    table[11] = Some(Opcode::Halt);

    // Arithmetic (12-18)
    table[12] = Some(Opcode::Neg);
    table[13] = Some(Opcode::Add);
    table[14] = Some(Opcode::Sub);
    table[15] = Some(Opcode::Mul);
    table[16] = Some(Opcode::Div);
    table[17] = Some(Opcode::Odd);
    table[18] = Some(Opcode::Mod);

    // Comparison (19-24)
    table[19] = Some(Opcode::Eql);
    table[20] = Some(Opcode::Neq);
    table[21] = Some(Opcode::Lss);
    table[22] = Some(Opcode::Leq);
    table[23] = Some(Opcode::Gtr);
    table[24] = Some(Opcode::Geq);

    table
};

/// Decode a raw opcode value using the static lookup table.
/// Returns None for values outside the instruction set.
#[inline(always)]
pub fn decode_opcode(value: i32) -> Option<Opcode> {
    usize::try_from(value)
        .ok()
        .and_then(|index| OPCODE_TABLE.get(index).copied().flatten())
}
