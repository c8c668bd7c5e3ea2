//! Configuration service.
//!
//! Loads the engine configuration from `~/.config/intervox/config.toml` and
//! caches it to avoid repeated file I/O.

use intervox_core::config::EnginePolicy;
use intervox_core::error::{InterviewError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Top-level configuration file contents.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Path to the question bank JSON file. When absent the engine runs
    /// with an empty bank and relies on generated questions.
    pub question_bank_path: Option<PathBuf>,
    pub policy: EnginePolicy,
}

/// Loads and caches the engine configuration.
///
/// Missing or unreadable files fall back to defaults; a file that exists
/// but fails to parse is an error, so typos never silently vanish.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: Option<PathBuf>,
    config: Arc<RwLock<Option<EngineConfig>>>,
}

impl ConfigService {
    /// Creates a service reading from the default platform location.
    pub fn new() -> Self {
        Self {
            path: None,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a service reading from an explicit path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> Result<EngineConfig> {
        {
            let read_lock = self
                .config
                .read()
                .map_err(|_| InterviewError::internal("config lock poisoned"))?;
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let loaded = self.load_config()?;

        {
            let mut write_lock = self
                .config
                .write()
                .map_err(|_| InterviewError::internal("config lock poisoned"))?;
            *write_lock = Some(loaded.clone());
        }

        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut write_lock) = self.config.write() {
            *write_lock = None;
        }
    }

    fn load_config(&self) -> Result<EngineConfig> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => Self::default_config_path()?,
        };
        if !path.exists() {
            debug!(path = %path.display(), "config file missing, using defaults");
            return Ok(EngineConfig::default());
        }
        let contents = std::fs::read_to_string(&path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| InterviewError::config("Cannot find config directory"))?;
        Ok(config_dir.join("intervox").join("config.toml"))
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}
