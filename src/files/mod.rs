//! Local file handling
//!
//! This module covers everything that touches the save directory:
//! - Creating the save and archive directories before a run
//! - Mapping links to local file names
//! - Unpacking downloaded archives after a run

mod archive;
mod naming;

pub use archive::{unzip_all, ArchiveError, ExtractionReport};
pub use naming::{local_file_exists, local_file_name, local_file_path, FALLBACK_FILE_NAME};

use crate::config::RunConfiguration;
use crate::HarvestError;
use std::path::Path;

/// Creates the save directory and the archive directory below it
///
/// # Errors
///
/// Returns [`HarvestError::FileSystemSetup`] naming the directory that could
/// not be created.
pub fn prepare_directories(config: &RunConfiguration) -> crate::Result<()> {
    create_dir(config.save_path())?;
    create_dir(&config.zips_path())?;
    Ok(())
}

fn create_dir(path: &Path) -> crate::Result<()> {
    if !path.exists() {
        tracing::warn!("Path {} doesn't exist, creating it", path.display());
    }
    std::fs::create_dir_all(path).map_err(|source| HarvestError::FileSystemSetup {
        path: path.to_path_buf(),
        source,
    })
}
