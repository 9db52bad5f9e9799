use crate::config::types::Config;
use crate::config::validation::validate;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// Missing tables and keys fall back to their defaults, so an empty file is a
/// valid configuration.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use harvest_dl::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("File type: {}", config.catalog.file_type);
/// ```
pub fn load_config(path: &Path) -> crate::ConfigResult<Config> {
    let config = read_config(path)?;
    validate(&config)?;
    Ok(config)
}

/// Parses a configuration file without validating its values
///
/// Used when other sources may still override the file before the run
/// configuration is built, which validates the final result.
pub fn read_config(path: &Path) -> crate::ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Computes a SHA-256 hash of the configuration file content
pub fn compute_config_hash(path: &Path) -> crate::ConfigResult<String> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> crate::ConfigResult<(Config, String)> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Parses a configuration without validation and returns it with its hash
pub fn read_config_with_hash(path: &Path) -> crate::ConfigResult<(Config, String)> {
    let config = read_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
