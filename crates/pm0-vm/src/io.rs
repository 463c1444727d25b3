//! Input and output channels
//!
//! The machine never owns its I/O. Callers hand in an [`InputChannel`] and an
//! [`OutputChannel`]; both block the single thread of control until the
//! request is satisfied.

use crate::error::ChannelError;
use crate::instruction::Word;
use std::collections::VecDeque;
use std::io::{BufRead, Write};

/// Source of values for the read system call
pub trait InputChannel {
    /// Next value, or `Ok(None)` once the channel has ended
    fn read_value(&mut self) -> Result<Option<Word>, ChannelError>;
}

/// Sink for the write system call
pub trait OutputChannel {
    fn write_value(&mut self, value: Word) -> Result<(), ChannelError>;
}

impl InputChannel for VecDeque<Word> {
    fn read_value(&mut self) -> Result<Option<Word>, ChannelError> {
        Ok(self.pop_front())
    }
}

impl InputChannel for std::vec::IntoIter<Word> {
    fn read_value(&mut self) -> Result<Option<Word>, ChannelError> {
        Ok(self.next())
    }
}

impl<I: InputChannel + ?Sized> InputChannel for &mut I {
    fn read_value(&mut self) -> Result<Option<Word>, ChannelError> {
        (**self).read_value()
    }
}

impl OutputChannel for Vec<Word> {
    fn write_value(&mut self, value: Word) -> Result<(), ChannelError> {
        self.push(value);
        Ok(())
    }
}

impl<O: OutputChannel + ?Sized> OutputChannel for &mut O {
    fn write_value(&mut self, value: Word) -> Result<(), ChannelError> {
        (**self).write_value(value)
    }
}

/// Input channel that has already ended
#[derive(Debug, Clone, Copy, Default)]
pub struct Closed;

impl InputChannel for Closed {
    fn read_value(&mut self) -> Result<Option<Word>, ChannelError> {
        Ok(None)
    }
}

/// Output channel that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl OutputChannel for Discard {
    fn write_value(&mut self, _value: Word) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Whitespace-separated integers from any buffered reader
///
/// Reads a line at a time, so on an interactive stdin each read blocks
/// until the user finishes a line.
pub struct ReaderInput<R> {
    reader: R,
    pending: VecDeque<String>,
}

impl<R: BufRead> ReaderInput<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: VecDeque::new(),
        }
    }
}

impl<R: BufRead> InputChannel for ReaderInput<R> {
    fn read_value(&mut self) -> Result<Option<Word>, ChannelError> {
        while self.pending.is_empty() {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.pending
                .extend(line.split_whitespace().map(str::to_string));
        }

        match self.pending.pop_front() {
            Some(token) => token
                .parse::<Word>()
                .map(Some)
                .map_err(|_| ChannelError::Malformed(token)),
            None => Ok(None),
        }
    }
}

/// Writes each value followed by a single space
pub struct WriterOutput<W> {
    writer: W,
    written: usize,
}

impl<W: Write> WriterOutput<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Values written so far
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutputChannel for WriterOutput<W> {
    fn write_value(&mut self, value: Word) -> Result<(), ChannelError> {
        write!(self.writer, "{} ", value)?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }
}
