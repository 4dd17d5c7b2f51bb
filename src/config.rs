// src/config.rs
// =============================================================================
// This module holds the crawl configuration.
//
// Where the values come from:
// 1. Built-in defaults (see the Default impl below)
// 2. An optional JSON file passed with --config, which overrides the
//    defaults one key at a time
// 3. A couple of CLI flags (--workers, --timeout) applied on top in main.rs
//
// Once the crawl starts the Config is never modified again.
//
// Example config file:
//   {
//     "tags": ["a"],
//     "attrs": ["href"],
//     "exclude_scheme_prefixes": ["tel:", "javascript:"],
//     "threads": 25,
//     "timeout": 30,
//     "OK": [200, 999],
//     "graceful_exit": true
//   }
//
// Rust concepts:
// - serde(default): Missing keys fall back to Default::default()
// - thiserror: Deriving std::error::Error for our own error enum
// =============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// Everything the crawler needs to know before it starts
//
// The serde renames keep the JSON keys short and compatible with existing
// config files ("threads", "timeout", "OK").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tag names whose attributes are searched for links
    pub tags: Vec<String>,
    /// Attribute names that hold links
    pub attrs: Vec<String>,
    /// Links starting with any of these prefixes are ignored (case-sensitive)
    #[serde(rename = "exclude_scheme_prefixes")]
    pub excluded_scheme_prefixes: Vec<String>,
    /// Number of concurrent crawl workers
    #[serde(rename = "threads")]
    pub worker_count: usize,
    /// Seconds to wait for a single HTTP response
    #[serde(rename = "timeout")]
    pub fetch_timeout_secs: u64,
    /// Status codes that are never reported as broken
    #[serde(rename = "OK")]
    pub ok_status_codes: BTreeSet<u16>,
    /// Exit with code 0 even when broken links are found
    pub graceful_exit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tags: vec!["a".into(), "link".into(), "img".into(), "script".into()],
            attrs: vec!["href".into(), "src".into()],
            excluded_scheme_prefixes: vec!["tel:".into()],
            worker_count: 50,
            fetch_timeout_secs: 60,
            // 999 is what some sites (LinkedIn, for one) answer to crawlers
            ok_status_codes: [200, 999].into_iter().collect(),
            graceful_exit: false,
        }
    }
}

// Things that can go wrong while loading a config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl Config {
    // Loads the config from an optional JSON file
    //
    // No path means "use the defaults". With a path, every key present in the
    // file replaces the default value and every missing key keeps it.
    // Nothing is validated here: call validate() once the command-line
    // overrides have been applied.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_json(&raw)?
            }
            None => Self::default(),
        };

        Ok(config)
    }

    // Parses a JSON document on top of the defaults
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    // Rejects configurations the crawler cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::Invalid("threads must be greater than 0".into()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout must be greater than 0".into()));
        }
        if self.tags.is_empty() {
            return Err(ConfigError::Invalid("tags must not be empty".into()));
        }
        if self.attrs.is_empty() {
            return Err(ConfigError::Invalid("attrs must not be empty".into()));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn is_ok_status(&self, status: u16) -> bool {
        self.ok_status_codes.contains(&status)
    }
}
