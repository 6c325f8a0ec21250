//! Planner configuration
//!
//! Resolution order:
//! 1. Path given on the command line (highest priority)
//! 2. `FESTIVAL_PLANNER_CONFIG` environment variable
//! 3. Built-in defaults
//!
//! Every key is optional in the TOML file; missing keys take the default.

use crate::error::{ConfigError, ValueError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Floor surface taken by one ticket holder, in square meters
pub const AVERAGE_AREA_PER_PERSON: f64 = 0.42;

pub const CONFIG_ENV_VAR: &str = "FESTIVAL_PLANNER_CONFIG";

/// How the area constraint charges a ticket class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaCharging {
    /// Every ticket sold takes floor space once
    #[default]
    PerTicketClass,

    /// Legacy weighting: one area term per benefit, so a class with three
    /// benefits is charged three times and a class with none is free
    PerBenefit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub area_per_person: f64,
    pub area_charging: AreaCharging,
    /// `tracing` filter directive used when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            area_per_person: AVERAGE_AREA_PER_PERSON,
            area_charging: AreaCharging::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl PlannerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PlannerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Pick the config file by priority, falling back to defaults
    pub fn resolve(cli_path: Option<&Path>) -> Result<Self, ConfigError> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_path {
            info!("Loading config from {}", path.display());
            return Self::load(path);
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(path);
            info!("Loading config from {} ({})", path.display(), CONFIG_ENV_VAR);
            return Self::load(&path);
        }

        // Priority 3: Defaults
        Ok(Self::default())
    }

    fn validate(&self) -> Result<(), ValueError> {
        let field = "area_per_person";
        if !self.area_per_person.is_finite() {
            return Err(ValueError::NotFinite { field });
        }
        if self.area_per_person <= 0.0 {
            return Err(ValueError::NotPositive {
                field,
                value: self.area_per_person,
            });
        }
        Ok(())
    }
}
