//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::GlobalConfig;
use crate::project::{ProjectConfig, TraceFormat};
use crate::{
    ConfigError, ConfigResult, DEFAULT_MAX_CODE_LENGTH, DEFAULT_REGISTERS, DEFAULT_STACK_CAPACITY,
};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the project configuration file
pub const PROJECT_CONFIG_FILE: &str = "pm0.toml";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.pm0/config.toml) - lowest priority
/// 2. Project config (./pm0.toml) - overrides global
/// 3. Environment variables (PM0_*) - overrides project
/// 4. CLI flags - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Effective settings after merging every source
    pub settings: ProjectConfig,

    /// Directory where pm0.toml was found
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use an explicit global config path instead of ~/.pm0/config.toml
    pub fn with_global_path(path: impl Into<PathBuf>) -> Self {
        Self {
            global_config_path: Some(path.into()),
        }
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find pm0.toml, then merges it over the
    /// global config and applies environment overrides.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;
        self.assemble(project_config, project_root)
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let project_root = config_path.parent().map(|p| p.to_path_buf());
        self.assemble(project_config, project_root)
    }

    fn assemble(
        &mut self,
        project_config: ProjectConfig,
        project_root: Option<PathBuf>,
    ) -> ConfigResult<Config> {
        // Global config is optional and a broken one must not block a run
        let mut settings = self.load_global_config().unwrap_or_default().as_base();
        settings.merge(&project_config);

        let settings = self.apply_env_overrides(settings)?;
        settings.validate()?;

        Ok(Config {
            settings,
            project_root,
        })
    }

    /// Find project configuration by walking up directory tree
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_CONFIG_FILE);

            if config_path.exists() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    /// Load global configuration from ~/.pm0/config.toml
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => {
                let path = GlobalConfig::global_config_path()?;
                self.global_config_path = Some(path.clone());
                path
            }
        };

        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        GlobalConfig::load_from_file(&path)
    }

    /// Apply environment variable overrides
    ///
    /// Recognised variables: PM0_REGISTERS, PM0_STACK_CAPACITY,
    /// PM0_MAX_CODE_LENGTH and PM0_TRACE.
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if let Some(registers) = env_usize("PM0_REGISTERS")? {
            config.machine_mut().registers = Some(registers);
        }

        if let Some(capacity) = env_usize("PM0_STACK_CAPACITY")? {
            config.machine_mut().stack_capacity = Some(capacity);
        }

        if let Some(max) = env_usize("PM0_MAX_CODE_LENGTH")? {
            config.machine_mut().max_code_length = Some(max);
        }

        if let Ok(trace) = env::var("PM0_TRACE") {
            let enabled = matches!(trace.to_lowercase().as_str(), "true" | "1" | "yes");
            config.trace_mut().enabled = Some(enabled);
        }

        Ok(config)
    }
}

fn env_usize(var: &str) -> ConfigResult<Option<usize>> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvValue {
                var: var.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Effective register count
    pub fn registers(&self) -> usize {
        self.settings
            .machine
            .as_ref()
            .and_then(|m| m.registers)
            .unwrap_or(DEFAULT_REGISTERS)
    }

    /// Effective stack capacity
    pub fn stack_capacity(&self) -> usize {
        self.settings
            .machine
            .as_ref()
            .and_then(|m| m.stack_capacity)
            .unwrap_or(DEFAULT_STACK_CAPACITY)
    }

    /// Effective code memory size
    pub fn max_code_length(&self) -> usize {
        self.settings
            .machine
            .as_ref()
            .and_then(|m| m.max_code_length)
            .unwrap_or(DEFAULT_MAX_CODE_LENGTH)
    }

    /// Whether a per-step trace is requested
    pub fn trace_enabled(&self) -> bool {
        self.settings
            .trace
            .as_ref()
            .and_then(|t| t.enabled)
            .unwrap_or(false)
    }

    /// Trace encoding
    pub fn trace_format(&self) -> TraceFormat {
        self.settings
            .trace
            .as_ref()
            .and_then(|t| t.format)
            .unwrap_or_default()
    }

    /// Whether the code listing precedes the trace
    pub fn listing(&self) -> bool {
        self.settings
            .trace
            .as_ref()
            .and_then(|t| t.listing)
            .unwrap_or(true)
    }

    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if a pm0.toml was found
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }
}
