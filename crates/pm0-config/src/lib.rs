//! PM/0 Configuration System
//!
//! Provides configuration management for the PM/0 simulator:
//! - Project configuration (pm0.toml)
//! - Global user configuration (~/.pm0/config.toml)
//! - Configuration precedence and merging
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Global config (~/.pm0/config.toml)
//! 2. Project config (./pm0.toml)
//! 3. Environment variables (PM0_*)
//! 4. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use pm0_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("stack capacity: {}", config.stack_capacity());
//! ```

pub mod global;
pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Default number of general-purpose registers
pub const DEFAULT_REGISTERS: usize = 16;

/// Default operand stack capacity, in words
pub const DEFAULT_STACK_CAPACITY: usize = 2000;

/// Default maximum number of instructions a program may contain
pub const DEFAULT_MAX_CODE_LENGTH: usize = 500;

/// Smallest stack that can still hold one frame header plus its reserved flag
pub const MIN_STACK_CAPACITY: usize = 4;

/// Largest operand stack, in words (16M); frame links must fit in a machine word
pub const MAX_STACK_CAPACITY: usize = 1 << 24;

/// Largest register file
pub const MAX_REGISTERS: usize = 1 << 16;

/// Largest code memory; return addresses must fit in a machine word
pub const MAX_CODE_LENGTH: usize = 1 << 20;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid value for environment variable {var}: '{value}'")]
    InvalidEnvValue { var: String, value: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use global::GlobalConfig;
pub use loader::{Config, ConfigLoader};
pub use project::{MachineSection, ProjectConfig, TraceFormat, TraceSection};
