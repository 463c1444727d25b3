//! Project Configuration (pm0.toml)
//!
//! Handles project-level configuration stored in `pm0.toml` next to the
//! programs being simulated.

use crate::{
    ConfigError, ConfigResult, MAX_CODE_LENGTH, MAX_REGISTERS, MAX_STACK_CAPACITY,
    MIN_STACK_CAPACITY,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Project configuration from pm0.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Machine sizing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine: Option<MachineSection>,

    /// Execution trace output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceSection>,
}

/// `[machine]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct MachineSection {
    /// Number of general-purpose registers (default: 16)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registers: Option<usize>,

    /// Operand stack capacity in words (default: 2000)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_capacity: Option<usize>,

    /// Maximum number of instructions accepted by the loader (default: 500)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_code_length: Option<usize>,
}

/// `[trace]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct TraceSection {
    /// Emit a per-step execution trace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Trace encoding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<TraceFormat>,

    /// Print the code memory listing before the trace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing: Option<bool>,
}

/// Trace encoding
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TraceFormat {
    /// Column-aligned text, one line per step
    #[default]
    Text,
    /// One JSON object per step
    Json,
}

impl ProjectConfig {
    /// Load project config from file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config = Self::parse(&content).map_err(|e| match e {
            ConfigError::TomlParseError { error, .. } => ConfigError::TomlParseError {
                file: path.to_path_buf(),
                error,
            },
            other => other,
        })?;

        Ok(config)
    }

    /// Parse and validate project config from a TOML string
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::TomlParseError {
            file: "<string>".into(),
            error: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(machine) = &self.machine {
            machine.validate("machine")?;
        }
        Ok(())
    }

    /// Merge another project config into this one
    /// Other config takes precedence for non-None values
    pub fn merge(&mut self, other: &ProjectConfig) {
        match (&mut self.machine, &other.machine) {
            (Some(mine), Some(theirs)) => mine.merge(theirs),
            (None, Some(theirs)) => self.machine = Some(theirs.clone()),
            _ => {}
        }
        match (&mut self.trace, &other.trace) {
            (Some(mine), Some(theirs)) => mine.merge(theirs),
            (None, Some(theirs)) => self.trace = Some(theirs.clone()),
            _ => {}
        }
    }

    /// Mutable access to the machine section, creating it if absent
    pub fn machine_mut(&mut self) -> &mut MachineSection {
        self.machine.get_or_insert_with(MachineSection::default)
    }

    /// Mutable access to the trace section, creating it if absent
    pub fn trace_mut(&mut self) -> &mut TraceSection {
        self.trace.get_or_insert_with(TraceSection::default)
    }
}

impl MachineSection {
    /// Validate sizes; `scope` prefixes field names in errors
    pub fn validate(&self, scope: &str) -> ConfigResult<()> {
        let invalid = |name: &str, reason: String| ConfigError::InvalidValue {
            field: format!("{}.{}", scope, name),
            reason,
        };

        if let Some(registers) = self.registers {
            if registers == 0 {
                return Err(invalid(
                    "registers",
                    "machine needs at least one register".to_string(),
                ));
            }
            if registers > MAX_REGISTERS {
                return Err(invalid(
                    "registers",
                    format!("{} registers exceeds the maximum of {}", registers, MAX_REGISTERS),
                ));
            }
        }
        if let Some(capacity) = self.stack_capacity {
            if capacity < MIN_STACK_CAPACITY {
                return Err(invalid(
                    "stack_capacity",
                    format!(
                        "capacity {} cannot hold a frame header (minimum {})",
                        capacity, MIN_STACK_CAPACITY
                    ),
                ));
            }
            if capacity > MAX_STACK_CAPACITY {
                return Err(invalid(
                    "stack_capacity",
                    format!(
                        "capacity {} exceeds the maximum of {} words",
                        capacity, MAX_STACK_CAPACITY
                    ),
                ));
            }
        }
        if let Some(max) = self.max_code_length {
            if max == 0 {
                return Err(invalid(
                    "max_code_length",
                    "code memory cannot be empty".to_string(),
                ));
            }
            if max > MAX_CODE_LENGTH {
                return Err(invalid(
                    "max_code_length",
                    format!("{} instructions exceeds the maximum of {}", max, MAX_CODE_LENGTH),
                ));
            }
        }
        Ok(())
    }

    fn merge(&mut self, other: &MachineSection) {
        if other.registers.is_some() {
            self.registers = other.registers;
        }
        if other.stack_capacity.is_some() {
            self.stack_capacity = other.stack_capacity;
        }
        if other.max_code_length.is_some() {
            self.max_code_length = other.max_code_length;
        }
    }
}

impl TraceSection {
    fn merge(&mut self, other: &TraceSection) {
        if other.enabled.is_some() {
            self.enabled = other.enabled;
        }
        if other.format.is_some() {
            self.format = other.format;
        }
        if other.listing.is_some() {
            self.listing = other.listing;
        }
    }
}
