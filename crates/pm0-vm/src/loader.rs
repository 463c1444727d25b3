//! Program text loader
//!
//! Code files are whitespace-separated decimal integers read four at a time
//! as `op r l m`, regardless of line breaks. Anything after `#` on a line is
//! a comment.
//!
//! ```text
//! # r2 = 3 + 4
//! 1 0 0 3
//! 1 1 0 4
//! 13 2 0 1
//! 9 2 0 1
//! 11 0 0 3
//! ```

use crate::instruction::{Instruction, Word};
use crate::program::Program;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fields per instruction record
const RECORD_LEN: usize = 4;

/// Program load errors
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Line {line}: expected an integer, found '{token}'")]
    InvalidToken { line: usize, token: String },

    #[error("Truncated instruction: {count} integers is not a whole number of 4-field records")]
    TruncatedRecord { count: usize },

    #[error("Program has {len} instructions, the limit is {max}")]
    ProgramTooLong { len: usize, max: usize },

    #[error("Program contains no instructions")]
    EmptyProgram,

    #[error("Failed to read program {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parse program text into code memory
pub fn parse(text: &str, max_code_length: usize) -> Result<Program, LoadError> {
    let mut words: Vec<Word> = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let code = match line.find('#') {
            Some(start) => &line[..start],
            None => line,
        };
        for token in code.split_whitespace() {
            let value = token.parse::<Word>().map_err(|_| LoadError::InvalidToken {
                line: number + 1,
                token: token.to_string(),
            })?;
            words.push(value);
        }
    }

    if words.is_empty() {
        return Err(LoadError::EmptyProgram);
    }
    if words.len() % RECORD_LEN != 0 {
        return Err(LoadError::TruncatedRecord { count: words.len() });
    }

    let len = words.len() / RECORD_LEN;
    if len > max_code_length {
        return Err(LoadError::ProgramTooLong {
            len,
            max: max_code_length,
        });
    }

    Ok(words
        .chunks_exact(RECORD_LEN)
        .map(|f| Instruction::new(f[0], f[1], f[2], f[3]))
        .collect())
}

/// Read and parse a program file
pub fn load_file(path: &Path, max_code_length: usize) -> Result<Program, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text, max_code_length)
}
