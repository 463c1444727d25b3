//! Activation records and lexical addressing
//!
//! Frames live inside the operand stack; nothing outside it records where
//! they start. Each one is identified by its base pointer and linked to the
//! rest through its header.
//!
//! ## Frame Layout
//!
//! ```text
//!   B-1        B+0           B+1            B+2              B+3 ..
//! [ flag=0 ][ static link ][ dynamic link ][ return address ][ locals ... ]
//!            ^
//!            BP
//! ```
//!
//! Lexical offsets count from the flag slot: `resolve(level, m)` yields
//! `base + m - FRAME_ORIGIN`, so offset 4 is the first local.
//!
//! The root frame has `BP = ROOT_BASE` and no enclosing scope. CALL writes a
//! header at SP without moving SP; the frame's locals only become
//! addressable once INC reserves them.

use crate::error::VmError;
use crate::instruction::Word;
use crate::stack::OperandStack;
use serde::Serialize;

/// Base pointer of the outermost frame
pub const ROOT_BASE: usize = 1;

/// Distance from a frame's base back to the slot lexical offset 0 names
pub const FRAME_ORIGIN: i64 = 1;

/// Header slots at and above the base: static link, dynamic link, return address
pub const HEADER_LEN: usize = 3;

/// Slots written by CALL: reserved flag plus header
pub const FRAME_SLOTS: usize = HEADER_LEN + 1;

const STATIC_LINK: usize = 0;
const DYNAMIC_LINK: usize = 1;
const RETURN_ADDRESS: usize = 2;

/// Snapshot of one activation record header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameView {
    /// Base pointer identifying the frame
    pub base: usize,
    /// Base of the lexically enclosing frame
    pub static_link: Word,
    /// Caller's base pointer
    pub dynamic_link: Word,
    /// Instruction index to resume at after RETURN
    pub return_address: Word,
}

impl FrameView {
    pub fn is_root(&self) -> bool {
        self.base == ROOT_BASE
    }

    /// Index of the reserved flag slot just below the base
    pub fn flag_slot(&self) -> usize {
        self.base - 1
    }
}

/// Owner of BP and SP and of the call protocol built on them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameManager {
    bp: usize,
    sp: usize,
}

impl FrameManager {
    /// Root frame only: BP = 1, SP = 0
    pub fn new() -> Self {
        Self {
            bp: ROOT_BASE,
            sp: 0,
        }
    }

    /// Base of the current frame
    pub fn bp(&self) -> usize {
        self.bp
    }

    /// First free stack slot
    pub fn sp(&self) -> usize {
        self.sp
    }

    /// Chase `level` static links starting from BP
    ///
    /// Fails with `StackUnderflow` when the chain runs past the root frame or
    /// a link does not point at an older frame.
    pub fn base_at(&self, stack: &OperandStack, level: i32) -> Result<usize, VmError> {
        if level < 0 {
            return Err(VmError::underflow(format!(
                "negative lexical level {}",
                level
            )));
        }

        let mut base = self.bp;
        for hop in 0..level {
            if base == ROOT_BASE {
                return Err(VmError::underflow(format!(
                    "lexical level {} is deeper than the {} enclosing scope(s) available",
                    level, hop
                )));
            }
            let link = header_slot(stack, base, STATIC_LINK)?;
            base = older_frame(link, base, "static link")?;
        }
        Ok(base)
    }

    /// Absolute stack address of lexical `(level, offset)`
    ///
    /// The result is not checked against SP; see [`load`](Self::load).
    pub fn resolve(&self, stack: &OperandStack, level: i32, offset: i32) -> Result<i64, VmError> {
        let base = self.base_at(stack, level)?;
        Ok(base as i64 + offset as i64 - FRAME_ORIGIN)
    }

    /// Read a variable; the slot must lie inside the reserved region `0..SP`
    pub fn load(&self, stack: &OperandStack, level: i32, offset: i32) -> Result<Word, VmError> {
        let address = self.live_address(stack, level, offset)?;
        stack.read(address)
    }

    /// Write a variable; the slot must lie inside the reserved region `0..SP`
    pub fn store(
        &self,
        stack: &mut OperandStack,
        level: i32,
        offset: i32,
        value: Word,
    ) -> Result<(), VmError> {
        let address = self.live_address(stack, level, offset)?;
        stack.write(address, value)
    }

    fn live_address(&self, stack: &OperandStack, level: i32, offset: i32) -> Result<i64, VmError> {
        let address = self.resolve(stack, level, offset)?;
        if address >= stack.capacity() as i64 {
            return Err(VmError::StackOverflow {
                address,
                capacity: stack.capacity(),
            });
        }
        if address < 0 || address >= self.sp as i64 {
            return Err(VmError::underflow(format!(
                "address {} is outside the reserved stack 0..{}",
                address, self.sp
            )));
        }
        Ok(address)
    }

    /// Build a frame header at SP and make it current
    ///
    /// The static link is the frame `level` scopes above the caller. SP is
    /// left where it is.
    pub fn call(
        &mut self,
        stack: &mut OperandStack,
        level: i32,
        return_address: usize,
    ) -> Result<(), VmError> {
        let static_link = self.base_at(stack, level)?;

        // The new flag slot must not land on the caller's own header
        if self.sp < self.bp + HEADER_LEN {
            return Err(VmError::underflow(format!(
                "caller frame at {} has not reserved its header (sp {})",
                self.bp, self.sp
            )));
        }

        let flag = self.sp;
        let top = flag + FRAME_SLOTS;
        if top > stack.capacity() {
            return Err(VmError::StackOverflow {
                address: top as i64 - 1,
                capacity: stack.capacity(),
            });
        }

        let base = flag + 1;
        stack.write(flag as i64, 0)?;
        stack.write((base + STATIC_LINK) as i64, to_word(static_link)?)?;
        stack.write((base + DYNAMIC_LINK) as i64, to_word(self.bp)?)?;
        stack.write((base + RETURN_ADDRESS) as i64, to_word(return_address)?)?;
        self.bp = base;
        Ok(())
    }

    /// Tear down the current frame and return the caller's resume address
    ///
    /// SP drops to the departing frame's flag slot and BP follows the dynamic
    /// link. Nothing changes if the header does not describe a valid caller.
    pub fn ret(&mut self, stack: &OperandStack, code_len: usize) -> Result<usize, VmError> {
        if self.bp == ROOT_BASE {
            return Err(VmError::underflow("return with no matching call"));
        }

        let dynamic_link = header_slot(stack, self.bp, DYNAMIC_LINK)?;
        let return_address = header_slot(stack, self.bp, RETURN_ADDRESS)?;

        let caller = older_frame(dynamic_link, self.bp, "dynamic link")?;
        let resume = usize::try_from(return_address)
            .ok()
            .filter(|&pc| pc <= code_len)
            .ok_or_else(|| {
                VmError::underflow(format!(
                    "return address {} outside code memory 0..={}",
                    return_address, code_len
                ))
            })?;

        self.sp = self.bp - 1;
        self.bp = caller;
        Ok(resume)
    }

    /// Move SP by `count` slots
    pub fn reserve(&mut self, stack: &OperandStack, count: i32) -> Result<(), VmError> {
        let target = self.sp as i64 + count as i64;
        if target < 0 {
            return Err(VmError::underflow(format!(
                "releasing {} slots would move sp below 0",
                -(count as i64)
            )));
        }
        if target > stack.capacity() as i64 {
            return Err(VmError::StackOverflow {
                address: target,
                capacity: stack.capacity(),
            });
        }
        self.sp = target as usize;
        Ok(())
    }

    /// Header of the frame based at `base`
    pub fn view(&self, stack: &OperandStack, base: usize) -> Result<FrameView, VmError> {
        Ok(FrameView {
            base,
            static_link: header_slot(stack, base, STATIC_LINK)?,
            dynamic_link: header_slot(stack, base, DYNAMIC_LINK)?,
            return_address: header_slot(stack, base, RETURN_ADDRESS)?,
        })
    }

    /// Live frames, innermost first, found by walking dynamic links from BP
    ///
    /// The last entry is always the root frame.
    pub fn frames(&self, stack: &OperandStack) -> Result<Vec<FrameView>, VmError> {
        let mut frames = Vec::new();
        let mut base = self.bp;
        loop {
            let view = self.view(stack, base)?;
            frames.push(view);
            if view.is_root() {
                return Ok(frames);
            }
            base = older_frame(view.dynamic_link, base, "dynamic link")?;
        }
    }

    /// Number of live frames, root included
    pub fn depth(&self, stack: &OperandStack) -> Result<usize, VmError> {
        self.frames(stack).map(|frames| frames.len())
    }
}

impl Default for FrameManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Read header slot `slot` of the frame at `base`
///
/// Header reads ignore SP: a frame built by CALL is readable before INC.
fn header_slot(stack: &OperandStack, base: usize, slot: usize) -> Result<Word, VmError> {
    let address = base + slot;
    if address >= stack.capacity() {
        return Err(VmError::underflow(format!(
            "frame at {} has no header inside the stack",
            base
        )));
    }
    stack.read(address as i64)
}

/// Validate a link read from the frame at `from`
///
/// Links always point at an established, strictly older frame.
fn older_frame(link: Word, from: usize, what: &str) -> Result<usize, VmError> {
    usize::try_from(link)
        .ok()
        .filter(|&base| base >= ROOT_BASE && base < from)
        .ok_or_else(|| {
            VmError::underflow(format!(
                "{} {} in frame at {} does not name an enclosing frame",
                what, link, from
            ))
        })
}

fn to_word(value: usize) -> Result<Word, VmError> {
    Word::try_from(value).map_err(|_| VmError::StackOverflow {
        address: value as i64,
        capacity: Word::MAX as usize,
    })
}
