pub mod list;
pub mod run;

use anyhow::{Context, Result};
use pm0_config::{Config, ConfigLoader};
use std::path::Path;

/// Merged configuration for a program
///
/// An explicit `--config` file wins; otherwise pm0.toml is searched for
/// upwards from the program's directory.
pub fn load_config(program: &Path, explicit: Option<&Path>) -> Result<Config> {
    let mut loader = ConfigLoader::new();
    match explicit {
        Some(path) => loader
            .load_from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display())),
        None => {
            let dir = match program.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => std::env::current_dir()?,
            };
            loader
                .load_from_directory(&dir)
                .context("Failed to load configuration")
        }
    }
}

/// Points HOME at `home` and clears PM0_* overrides so `load_config` only
/// sees files the test wrote
#[cfg(test)]
pub(crate) fn isolate_env(home: &Path) {
    std::env::set_var("HOME", home);
    for var in [
        "PM0_REGISTERS",
        "PM0_STACK_CAPACITY",
        "PM0_MAX_CODE_LENGTH",
        "PM0_TRACE",
    ] {
        std::env::remove_var(var);
    }
}
