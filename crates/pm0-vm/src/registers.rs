//! Register file
//!
//! A fixed number of general-purpose scratch registers. None is privileged;
//! operands, results and I/O all go through them.

use crate::error::VmError;
use crate::instruction::Word;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    regs: Vec<Word>,
}

impl RegisterFile {
    /// Zeroed register file with `count` registers
    pub fn new(count: usize) -> Self {
        Self {
            regs: vec![0; count],
        }
    }

    #[inline]
    pub fn read(&self, index: i32) -> Result<Word, VmError> {
        let slot = self.slot(index)?;
        Ok(self.regs[slot])
    }

    #[inline]
    pub fn write(&mut self, index: i32, value: Word) -> Result<(), VmError> {
        let slot = self.slot(index)?;
        self.regs[slot] = value;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.regs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }

    pub fn as_slice(&self) -> &[Word] {
        &self.regs
    }

    #[inline]
    fn slot(&self, index: i32) -> Result<usize, VmError> {
        usize::try_from(index)
            .ok()
            .filter(|&slot| slot < self.regs.len())
            .ok_or(VmError::InvalidRegister {
                index,
                count: self.regs.len(),
            })
    }
}
