//! TOML run configuration.
//!
//! ```toml
//! [store]
//! path = "gods.db"          # omit or ":memory:" for an in-memory store
//! transactions = true
//! geoshape = true
//! auto_schema = true
//!
//! [store.pragmas]
//! cache_size = "-8000"
//!
//! [run]
//! cycles = 3
//! pacing_base_ms = 500
//! pacing_jitter_ms = 500
//! ```

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{errors::GraphLifeError, store::StoreFeatures};

const MEMORY_PATH: &str = ":memory:";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,
    pub transactions: bool,
    pub geoshape: bool,
    pub auto_schema: bool,
    pub create_if_missing: bool,
    pub pragmas: BTreeMap<String, String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            transactions: true,
            geoshape: true,
            auto_schema: true,
            create_if_missing: true,
            pragmas: BTreeMap::new(),
        }
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// On-disk location, or `None` for an in-memory store.
    pub fn file_path(&self) -> Option<&Path> {
        match self.path.as_deref() {
            Some(path) if path.as_os_str() == MEMORY_PATH => None,
            Some(path) if path.as_os_str().is_empty() => None,
            other => other,
        }
    }

    pub fn features(&self) -> StoreFeatures {
        StoreFeatures {
            transactions: self.transactions,
            geoshape: self.geoshape,
            auto_schema: self.auto_schema,
        }
    }

    /// Pragmas are interpolated into SQL, so names must be identifiers and
    /// values plain words or numbers.
    pub fn validate(&self) -> Result<(), GraphLifeError> {
        for (key, value) in &self.pragmas {
            let key_ok = !key.is_empty()
                && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !key_ok {
                return Err(GraphLifeError::connection(format!(
                    "invalid pragma name '{key}'"
                )));
            }
            let value_ok = !value.is_empty()
                && value
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if !value_ok {
                return Err(GraphLifeError::connection(format!(
                    "invalid value '{value}' for pragma {key}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub cycles: usize,
    pub pacing_base_ms: u64,
    pub pacing_jitter_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            cycles: 3,
            pacing_base_ms: 500,
            pacing_jitter_ms: 500,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub run: RunConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}
