//! CLI configuration via environment variables
//!
//! Only presentation settings live here. Machine sizing comes from
//! `pm0-config` (pm0.toml, ~/.pm0/config.toml and PM0_* overrides).

use crate::log::Filter;
use std::env;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Disable colored output (PM0_NO_COLOR=1 or NO_COLOR=1)
    pub no_color: bool,
    /// Log filter from PM0_LOG (info, warn, error, off)
    pub log_filter: Option<Filter>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            no_color: env::var("PM0_NO_COLOR").is_ok() || env::var("NO_COLOR").is_ok(),
            log_filter: env::var("PM0_LOG").ok().and_then(|v| v.parse().ok()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
