//! Runtime configuration.
//!
//! Selects which durable storage medium a [`StateRuntime`](crate::runtime::StateRuntime)
//! attaches. The global runtime reads its configuration from the
//! `CUBBY_STORAGE` environment variable.

use crate::error::{Result, StateError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Environment variable consulted by [`RuntimeConfig::from_env`].
pub const STORAGE_ENV_VAR: &str = "CUBBY_STORAGE";

/// Which storage medium backs persistent state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageBackend {
    /// No durable storage; persistent state behaves like shared memory.
    None,
    /// Process-local map, lost on exit.
    Memory,
    /// JSON file at `path`.
    File { path: PathBuf },
    /// Browser `localStorage`, when reachable.
    Web,
}

impl Default for StorageBackend {
    fn default() -> Self {
        if cfg!(all(feature = "web", target_arch = "wasm32")) {
            StorageBackend::Web
        } else {
            StorageBackend::None
        }
    }
}

impl FromStr for StorageBackend {
    type Err = StateError;

    /// Parses `none`, `memory`, `web` or `file:<path>`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(path) = s.strip_prefix("file:") {
            if path.is_empty() {
                return Err(StateError::Config("file backend requires a path".to_string()));
            }
            return Ok(StorageBackend::File {
                path: PathBuf::from(path),
            });
        }

        match s.to_ascii_lowercase().as_str() {
            "" | "none" => Ok(StorageBackend::None),
            "memory" => Ok(StorageBackend::Memory),
            "web" => Ok(StorageBackend::Web),
            other => Err(StateError::Config(format!("unknown storage backend '{}'", other))),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::None => write!(f, "none"),
            StorageBackend::Memory => write!(f, "memory"),
            StorageBackend::File { path } => write!(f, "file:{}", path.display()),
            StorageBackend::Web => write!(f, "web"),
        }
    }
}

/// Configuration for a [`StateRuntime`](crate::runtime::StateRuntime).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

impl RuntimeConfig {
    pub fn new(backend: StorageBackend) -> Self {
        Self { backend }
    }

    /// Read the backend from `CUBBY_STORAGE`, defaulting when unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var(STORAGE_ENV_VAR) {
            Ok(value) => Ok(Self::new(value.parse()?)),
            Err(std::env::VarError::NotPresent) => Ok(Self::default()),
            Err(e) => Err(StateError::Config(format!("{}: {}", STORAGE_ENV_VAR, e))),
        }
    }
}
