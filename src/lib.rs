//! Harvest-DL: a paginated catalog downloader
//!
//! This crate walks a remote harvest catalog page by page, downloads every
//! archive it links to exactly once (subject to an overwrite policy), and can
//! unpack the results afterwards.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod files;
pub mod output;
pub mod state;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Harvest-DL operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cannot create directory {}: {source}", path.display())]
    FileSystemSetup {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Host unreachable for {url}: {message}")]
    HostUnreachable { url: String, message: String },

    #[error("Fetch of {url} failed ({kind}): {message}")]
    Fetch {
        url: String,
        kind: crawler::FetchErrorKind,
        message: String,
    },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] files::ArchiveError),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::RunState,
        to: state::RunState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Wrong file type '{0}' (expected txt, epub or html)")]
    InvalidFileType(String),
}

/// Errors raised while classifying or resolving a single catalog link
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Malformed link '{link}': {reason}")]
    Malformed { link: String, reason: String },
}

/// Result type alias for Harvest-DL operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{DispatchMode, EngineKind, FileType, RunConfiguration};
pub use crawler::{run_harvest, FetchResult, Orchestrator};
pub use output::RunSummary;
pub use state::RunState;
