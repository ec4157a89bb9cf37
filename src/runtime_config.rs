//! # Runtime Configuration Module
//!
//! Environment-driven settings for `mockzure serve`. CLI flags bind the same
//! variables through clap's `env` attribute, so both paths agree on defaults.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Meaning |
//! | --- | --- | --- |
//! | `MOCKZURE_CONFIG` | `config.yaml` | data file (YAML or JSON) |
//! | `MOCKZURE_SPECS_DIR` | `specs` | description-file root |
//! | `MOCKZURE_ADDR` | `0.0.0.0:8090` | bind address |
//! | `MOCKZURE_STACK_SIZE` | `0x8000` | coroutine stack size |
//!
//! ### `MOCKZURE_STACK_SIZE`
//!
//! Accepts decimal (`32768`) or hexadecimal (`0x8000`). Unparseable values
//! fall back to the default.
//!
//! ```rust
//! use mockzure::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Stack size: {} bytes", config.stack_size);
//! ```

use std::env;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
pub const DEFAULT_SPECS_DIR: &str = "specs";
pub const DEFAULT_ADDR: &str = "0.0.0.0:8090";
pub const DEFAULT_STACK_SIZE: usize = 0x8000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub config_path: PathBuf,
    pub specs_dir: PathBuf,
    pub addr: String,
    /// Stack size for coroutines in bytes (default: 32 KB / 0x8000)
    pub stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            specs_dir: PathBuf::from(DEFAULT_SPECS_DIR),
            addr: DEFAULT_ADDR.to_string(),
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            config_path: lookup("MOCKZURE_CONFIG")
                .map(PathBuf::from)
                .unwrap_or(defaults.config_path),
            specs_dir: lookup("MOCKZURE_SPECS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.specs_dir),
            addr: lookup("MOCKZURE_ADDR").unwrap_or(defaults.addr),
            stack_size: lookup("MOCKZURE_STACK_SIZE")
                .as_deref()
                .and_then(parse_stack_size)
                .unwrap_or(defaults.stack_size),
        }
    }
}

/// Parse a stack size in decimal or `0x` hexadecimal.
#[must_use]
pub fn parse_stack_size(val: &str) -> Option<usize> {
    let val = val.trim();
    if let Some(hex) = val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16).ok()
    } else {
        val.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_stack_size() {
        assert_eq!(parse_stack_size("0x8000"), Some(0x8000));
        assert_eq!(parse_stack_size("0X4000"), Some(0x4000));
        assert_eq!(parse_stack_size("16384"), Some(16384));
        assert_eq!(parse_stack_size("lots"), None);
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = RuntimeConfig::from_lookup(|_| None);
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.addr, "0.0.0.0:8090");
        assert_eq!(config.stack_size, 0x8000);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("MOCKZURE_CONFIG", "/etc/mockzure/data.json"),
            ("MOCKZURE_SPECS_DIR", "/srv/specs"),
            ("MOCKZURE_ADDR", "127.0.0.1:9000"),
            ("MOCKZURE_STACK_SIZE", "bogus"),
        ]
        .into_iter()
        .collect();
        let config = RuntimeConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_string()));
        assert_eq!(config.config_path, PathBuf::from("/etc/mockzure/data.json"));
        assert_eq!(config.specs_dir, PathBuf::from("/srv/specs"));
        assert_eq!(config.addr, "127.0.0.1:9000");
        assert_eq!(config.stack_size, DEFAULT_STACK_SIZE);
    }
}
