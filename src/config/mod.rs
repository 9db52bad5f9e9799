//! Configuration module for Harvest-DL
//!
//! This module handles loading TOML configuration files, validating them, and
//! freezing the result into the [`RunConfiguration`] a harvest run consumes.
//!
//! # Example
//!
//! ```no_run
//! use harvest_dl::config::{load_config, RunConfiguration};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! let run = RunConfiguration::new(&config).unwrap();
//! println!("First catalog page: {}", run.base_url());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CatalogConfig, Config, DispatchMode, DownloadConfig, EngineKind, FileType, RunConfiguration,
    DEFAULT_ROOT_URL,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, read_config, read_config_with_hash,
};
