//! Local file naming for downloaded resources

use std::path::{Path, PathBuf};

/// Name used when a URL has no usable final path segment
pub const FALLBACK_FILE_NAME: &str = "index.html";

/// Derives the local file name of a link
///
/// The name is the part after the last `/`, with `?` replaced by `_` and
/// `&amp;` unescaped, so `harvest?a=1&amp;b=2` is stored as `harvest_a=1&b=2`.
pub fn local_file_name(link: &str) -> String {
    let segment = link.rsplit('/').next().unwrap_or(link);
    let name = segment.replace('?', "_").replace("&amp;", "&");

    match name.as_str() {
        "" | "." | ".." => FALLBACK_FILE_NAME.to_string(),
        _ => name,
    }
}

/// Full path where a link is stored inside `dir`
pub fn local_file_path(dir: &Path, link: &str) -> PathBuf {
    dir.join(local_file_name(link))
}

/// Whether a link has already been stored inside `dir`
pub fn local_file_exists(dir: &Path, link: &str) -> bool {
    local_file_path(dir, link).exists()
}
