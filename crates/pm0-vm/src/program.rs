//! Instruction store
//!
//! Code memory is loaded once and never written by the machine.

use crate::error::VmError;
use crate::instruction::Instruction;

/// Immutable, indexable sequence of instructions
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Instruction at `pc`, or [`VmError::ProgramCounterOutOfRange`]
    #[inline]
    pub fn fetch(&self, pc: usize) -> Result<Instruction, VmError> {
        self.instructions
            .get(pc)
            .copied()
            .ok_or(VmError::ProgramCounterOutOfRange {
                pc: pc as i64,
                len: self.instructions.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    pub fn as_slice(&self) -> &[Instruction] {
        &self.instructions
    }
}

impl From<Vec<Instruction>> for Program {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self::new(instructions)
    }
}

impl FromIterator<Instruction> for Program {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
