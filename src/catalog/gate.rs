//! Dedup/overwrite gate

use crate::catalog::CatalogLink;
use crate::files::local_file_exists;
use std::path::PathBuf;

/// Decides whether a link should be acted on
///
/// A link is acted on when nothing is stored for it yet, when overwriting was
/// requested, or when it is a continuation link. Continuation links are always
/// followed since they lead to more links, not to an artifact.
pub fn should_act(exists_locally: bool, overwrite: bool, is_pagination_link: bool) -> bool {
    !exists_locally || overwrite || is_pagination_link
}

/// [`should_act`] bound to a download directory and overwrite policy
#[derive(Debug, Clone)]
pub struct Gate {
    download_dir: PathBuf,
    overwrite: bool,
}

impl Gate {
    pub fn new(download_dir: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            download_dir: download_dir.into(),
            overwrite,
        }
    }

    /// Applies the gate to a link, checking the download directory
    pub fn admits(&self, link: &CatalogLink) -> bool {
        should_act(
            local_file_exists(&self.download_dir, link.href()),
            self.overwrite,
            link.is_pagination(),
        )
    }
}
