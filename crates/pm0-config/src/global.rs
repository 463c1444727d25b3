//! Global Configuration (~/.pm0/config.toml)
//!
//! Handles user-level defaults stored in `~/.pm0/config.toml`. The file uses
//! the same sections as `pm0.toml` and sits below it in precedence.

use crate::project::{MachineSection, ProjectConfig, TraceSection};
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.pm0/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Default machine sizing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine: Option<MachineSection>,

    /// Default trace settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceSection>,
}

impl GlobalConfig {
    /// Load global config from file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(machine) = &self.machine {
            machine.validate("global.machine")?;
        }
        Ok(())
    }

    /// Get the global config file path
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".pm0").join("config.toml"))
    }

    /// Lift the global defaults into a project config that project files merge over
    pub fn as_base(&self) -> ProjectConfig {
        ProjectConfig {
            machine: self.machine.clone(),
            trace: self.trace.clone(),
        }
    }
}
