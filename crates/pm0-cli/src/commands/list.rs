//! List command - print a program's code memory

use anyhow::{Context, Result};
use pm0_vm::{code_listing, loader};
use std::path::Path;

/// Print the `***Code Memory***` table for a program file
pub fn run(program: &Path, config: Option<&Path>) -> Result<()> {
    let config = super::load_config(program, config)?;
    let code = loader::load_file(program, config.max_code_length())
        .with_context(|| format!("Failed to load program {}", program.display()))?;
    info!("{} instructions", code.len());
    print!("{}", code_listing(&code));
    Ok(())
}
