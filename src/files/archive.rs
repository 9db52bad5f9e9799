//! Archive extraction for downloaded zip files
//!
//! Every `*.zip` in the download directory is unpacked flat into the output
//! directory: only the last component of each entry name is kept.

use std::fs::File;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use zip::ZipArchive;

/// Errors that can occur during archive operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Entry is trying to leave the target dir: {0}")]
    UnsafeEntry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Outcome of an extraction pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Archives fully unpacked
    pub archives: usize,
    /// Files written to the output directory
    pub files: usize,
    /// Archives that could not be read
    pub corrupt: Vec<PathBuf>,
    /// Entries skipped because their name cannot be used as a file name
    pub rejected: Vec<String>,
}

/// Unpacks every zip archive of `input_dir` into `output_dir`
///
/// A corrupt archive is logged and skipped. An entry whose last name
/// component would escape the output directory is skipped as well.
pub fn unzip_all(input_dir: &Path, output_dir: &Path) -> Result<ExtractionReport, ArchiveError> {
    let mut report = ExtractionReport::default();

    for archive_path in list_zip_files(input_dir)? {
        match extract_archive(&archive_path, output_dir, &mut report.rejected) {
            Ok(count) => {
                tracing::debug!("Unzipped {} files from {}", count, archive_path.display());
                report.archives += 1;
                report.files += count;
            }
            Err(e) => {
                tracing::error!("Cannot unzip {}: {}", archive_path.display(), e);
                report.corrupt.push(archive_path);
            }
        }
    }

    Ok(report)
}

/// Lists the `*.zip` files of a directory in name order
fn list_zip_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut zips = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_zip = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
        if is_zip && path.is_file() {
            zips.push(path);
        }
    }
    zips.sort();
    Ok(zips)
}

/// Extracts a single archive, returning the number of files written
///
/// Unusable entry names are appended to `rejected` and skipped.
fn extract_archive(
    archive_path: &Path,
    output_dir: &Path,
    rejected: &mut Vec<String>,
) -> Result<usize, ArchiveError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut written = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }

        let name = match entry_file_name(entry.name()) {
            Ok("") => continue,
            Ok(name) => name.to_string(),
            Err(e) => {
                tracing::warn!("Skipping entry of {}: {}", archive_path.display(), e);
                rejected.push(entry.name().to_string());
                continue;
            }
        };

        let mut target = File::create(output_dir.join(name))?;
        io::copy(&mut entry, &mut target)?;
        written += 1;
    }

    Ok(written)
}

/// Last component of an entry name
///
/// The result is either empty (a directory entry) or a single plain file
/// name; `.` and `..` are rejected.
fn entry_file_name(entry_name: &str) -> Result<&str, ArchiveError> {
    let name = entry_name.rsplit(['/', '\\']).next().unwrap_or(entry_name);
    if name.is_empty() {
        return Ok(name);
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(ArchiveError::UnsafeEntry(entry_name.to_string())),
    }
}
