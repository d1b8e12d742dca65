//! Engine configuration.
//!
//! One JSON document with three sections (`env`, `explorer`, `run`), every
//! field optional. `FERRET_*` environment variables override file values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use ferret_env::EnvConfig;
use ferret_explore::ExplorerConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value {value:?} in {var}")]
    EnvOverride { var: String, value: String },

    #[error("Invalid config: {field} {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Run-level budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub episodes: u32,
    /// Run seed; episode `i` uses `seed + i` (wrapping).
    pub seed: u64,
    pub max_concurrent_episodes: u32,
    /// Where anomalous episodes are written.
    pub artifact_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            episodes: 10,
            seed: 42,
            max_concurrent_episodes: 4,
            artifact_dir: PathBuf::from("artifacts/episodes"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub env: EnvConfig,
    pub explorer: ExplorerConfig,
    pub run: RunConfig,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a file, apply environment overrides, then validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_json(&std::fs::read_to_string(path)?)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from any variable source.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("FERRET_BASE_URL") {
            self.env.base_url = v;
        }
        if let Some(v) = lookup("FERRET_ARTIFACT_DIR") {
            self.run.artifact_dir = PathBuf::from(v);
        }
        override_parsed(&lookup, "FERRET_REQUEST_TIMEOUT_MS", &mut self.env.request_timeout_ms)?;
        override_parsed(&lookup, "FERRET_SLOW_THRESHOLD_MS", &mut self.env.slow_threshold_ms)?;
        override_parsed(&lookup, "FERRET_EPSILON", &mut self.explorer.epsilon)?;
        override_parsed(&lookup, "FERRET_MAX_STEPS", &mut self.explorer.max_steps)?;
        override_parsed(&lookup, "FERRET_EPISODES", &mut self.run.episodes)?;
        override_parsed(&lookup, "FERRET_SEED", &mut self.run.seed)?;
        override_parsed(
            &lookup,
            "FERRET_MAX_CONCURRENT_EPISODES",
            &mut self.run.max_concurrent_episodes,
        )?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: &str| ConfigError::Invalid {
            field,
            reason: reason.to_string(),
        };
        if !(0.0..=1.0).contains(&self.explorer.epsilon) {
            return Err(invalid("explorer.epsilon", "must be within [0, 1]"));
        }
        if self.explorer.max_steps == 0 {
            return Err(invalid("explorer.max_steps", "must be non-zero"));
        }
        if self.run.episodes == 0 {
            return Err(invalid("run.episodes", "must be non-zero"));
        }
        if self.run.max_concurrent_episodes == 0 {
            return Err(invalid("run.max_concurrent_episodes", "must be non-zero"));
        }
        if self.env.request_timeout_ms == 0 {
            return Err(invalid("env.request_timeout_ms", "must be non-zero"));
        }
        if self.env.base_url.trim().is_empty() {
            return Err(invalid("env.base_url", "must not be empty"));
        }
        Ok(())
    }
}

fn override_parsed<F, T>(lookup: &F, var: &str, slot: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(value) = lookup(var) {
        *slot = value.trim().parse().map_err(|_| ConfigError::EnvOverride {
            var: var.to_string(),
            value,
        })?;
    }
    Ok(())
}
