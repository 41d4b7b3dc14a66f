//! key=value config file loader.
//!
//! One `key = value` pair per line. Blank lines and lines starting with `#`
//! are skipped, as are lines without `=`. Keys and values are trimmed and a
//! later duplicate wins.

use srp_interactive::{ClientConfig, ConfigError};
use std::collections::HashMap;
use std::path::Path;

pub fn parse_key_values(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Read `path` and extract the client keys.
pub fn load_client_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    ClientConfig::from_map(&parse_key_values(&text))
}
