//! Operand stack storage
//!
//! One contiguous, zero-initialised array shared by user data and frame
//! headers. Only bounds are enforced here; which slots are live is the
//! frame manager's business.

use crate::error::VmError;
use crate::instruction::Word;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperandStack {
    cells: Vec<Word>,
}

impl OperandStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: vec![0; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Read the word at `address`
    ///
    /// Negative addresses underflow; addresses at or past capacity overflow.
    #[inline]
    pub fn read(&self, address: i64) -> Result<Word, VmError> {
        let slot = self.slot(address)?;
        Ok(self.cells[slot])
    }

    /// Write `value` at `address`, with the same bounds as [`read`](Self::read)
    #[inline]
    pub fn write(&mut self, address: i64, value: Word) -> Result<(), VmError> {
        let slot = self.slot(address)?;
        self.cells[slot] = value;
        Ok(())
    }

    /// Whole backing array, live or not
    pub fn as_slice(&self) -> &[Word] {
        &self.cells
    }

    #[inline]
    fn slot(&self, address: i64) -> Result<usize, VmError> {
        if address < 0 {
            return Err(VmError::underflow(format!(
                "address {} is below the stack",
                address
            )));
        }
        match usize::try_from(address) {
            Ok(slot) if slot < self.cells.len() => Ok(slot),
            _ => Err(VmError::StackOverflow {
                address,
                capacity: self.cells.len(),
            }),
        }
    }
}
