// Copyright (c) 2025 Robert August Vincent II <pillarsdotnet@gmail.com>
// Co-author: Cursor-AI.

//! Persisted settings: where the time file lives.
//!
//! ```json
//! {
//!     "path": "/home/me/work/time.json"
//! }
//! ```
//!
//! Without a `path` the time file is `time.json` in the current directory.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::store;

/// Time file name used when no path is configured.
pub const DEFAULT_TIME_FILE: &str = "time.json";

/// Environment variable that overrides the config file location.
const CONFIG_ENV: &str = "JIRATRACK_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Configured time file; `None` means `time.json` in the working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Reads the config file. A missing or empty file is the default config.
    pub fn load(file: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(file) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: file.to_path_buf(),
                    source,
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: file.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, file: &Path) -> Result<(), ConfigError> {
        let json = store::to_pretty_json(self).map_err(|source| ConfigError::Parse {
            path: file.to_path_buf(),
            source,
        })?;
        store::write_atomic(file, json.as_bytes()).map_err(|source| ConfigError::Io {
            path: file.to_path_buf(),
            source,
        })
    }

    /// The time file to use, relative paths resolved against `cwd`.
    pub fn store_path(&self, cwd: &Path) -> PathBuf {
        match &self.path {
            Some(p) => cwd.join(p),
            None => cwd.join(DEFAULT_TIME_FILE),
        }
    }
}

/// Config file location: `$JIRATRACK_CONFIG`, else `$XDG_CONFIG_HOME/jiratrack/config.json`,
/// else `$HOME/.config/jiratrack/config.json`, else `./jiratrack.json`.
pub fn config_file() -> PathBuf {
    if let Some(explicit) = env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(explicit);
    }
    let base = env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")));
    match base {
        Some(dir) => dir.join("jiratrack").join("config.json"),
        None => PathBuf::from("jiratrack.json"),
    }
}

/// Persists `path` as the time file. It must name a `.json` file; relative
/// paths are stored resolved against `cwd`.
pub fn set_time_path(file: &Path, path: &str, cwd: &Path) -> Result<Config, ConfigError> {
    let candidate = PathBuf::from(path);
    let is_json = candidate.extension().is_some_and(|ext| ext == "json")
        && candidate.file_stem().is_some_and(|stem| !stem.is_empty());
    if !is_json {
        return Err(ConfigError::NotJson { path: candidate });
    }
    let mut config = Config::load(file)?;
    config.path = Some(cwd.join(candidate));
    config.save(file)?;
    tracing::debug!(config = %file.display(), "time path changed");
    Ok(config)
}

/// Forgets any configured path so the working directory's `time.json` is used.
pub fn set_default_path(file: &Path) -> Result<(), ConfigError> {
    Config::default().save(file)
}
