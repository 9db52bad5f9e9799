use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::ConfigError;

/// Catalog endpoint used when no root URL is configured
pub const DEFAULT_ROOT_URL: &str = "https://www.gutenberg.org/robot/";

/// Main configuration structure for Harvest-DL, as read from TOML
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub download: DownloadConfig,
}

/// Which catalog to walk
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Root of the harvest endpoint; the listing query is appended to it
    #[serde(rename = "root-url")]
    pub root_url: String,

    /// Type of files to download (txt, epub or html)
    #[serde(rename = "file-type")]
    pub file_type: String,

    /// Language code of the files to download (es, en, fr, ...)
    pub language: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            root_url: DEFAULT_ROOT_URL.to_string(),
            file_type: "txt".to_string(),
            language: "es".to_string(),
        }
    }
}

/// Download behavior configuration
///
/// Numeric limits are signed so that negative values coming from a file or
/// the command line reach validation instead of failing inside the parser.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Directory where downloads are stored
    #[serde(rename = "save-path")]
    pub save_path: PathBuf,

    /// Replace files that already exist locally
    pub overwrite: bool,

    /// Pause before each sequential download (milliseconds)
    #[serde(rename = "delay-ms")]
    pub delay_ms: i64,

    /// Maximum number of files to dispatch, 0 for all
    #[serde(rename = "max-files")]
    pub max_files: i64,

    /// Fetch engine implementation
    pub engine: EngineKind,

    /// Sequential or concurrent dispatch
    pub mode: DispatchMode,

    /// Unpack the downloaded archives when the run finishes
    pub unzip: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            save_path: PathBuf::from("books"),
            overwrite: false,
            delay_ms: 2000,
            max_files: 10,
            engine: EngineKind::default(),
            mode: DispatchMode::default(),
            unzip: true,
        }
    }
}

/// File types published by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Txt,
    Epub,
    Html,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Epub => "epub",
            Self::Html => "html",
        }
    }
}

impl FromStr for FileType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "txt" => Ok(Self::Txt),
            "epub" => Ok(Self::Epub),
            "html" => Ok(Self::Html),
            other => Err(ConfigError::InvalidFileType(other.to_string())),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Available fetch engine implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    /// Plain HTTP(S) connection with a browser-like header set
    #[default]
    HttpConnection,
}

impl FromStr for EngineKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "http-connection" => Ok(Self::HttpConnection),
            other => Err(ConfigError::Validation(format!(
                "unknown engine '{}', expected http-connection",
                other
            ))),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpConnection => f.write_str("http-connection"),
        }
    }
}

/// How terminal downloads are dispatched, fixed for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchMode {
    /// One fetch at a time on the control task, with the politeness delay
    #[default]
    Sequential,

    /// Terminal downloads handed to a bounded worker pool, no delay
    Concurrent,
}

impl FromStr for DispatchMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" | "soft" => Ok(Self::Sequential),
            "concurrent" | "greedy" => Ok(Self::Concurrent),
            other => Err(ConfigError::Validation(format!(
                "unknown dispatch mode '{}', expected sequential or concurrent",
                other
            ))),
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => f.write_str("sequential"),
            Self::Concurrent => f.write_str("concurrent"),
        }
    }
}

/// Validated, immutable parameters of one harvest run
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    file_type: FileType,
    language: String,
    base_url: Url,
    save_path: PathBuf,
    overwrite: bool,
    delay: Duration,
    max_files: usize,
    engine: EngineKind,
    mode: DispatchMode,
    unzip: bool,
}

impl RunConfiguration {
    /// Validates a configuration and freezes it for a run
    ///
    /// `max-files = 0` is normalized to `usize::MAX` here so the traversal
    /// loop never has to special-case it.
    pub fn new(config: &Config) -> crate::ConfigResult<Self> {
        super::validation::validate(config)?;

        let file_type: FileType = config.catalog.file_type.parse()?;
        let base_url = build_harvest_url(
            &config.catalog.root_url,
            file_type,
            &config.catalog.language,
        )?;

        let max_files = match config.download.max_files {
            0 => usize::MAX,
            n => usize::try_from(n).map_err(|_| {
                ConfigError::Validation(format!("max-files out of range: {}", n))
            })?,
        };
        let delay_ms = u64::try_from(config.download.delay_ms).map_err(|_| {
            ConfigError::Validation(format!(
                "delay-ms out of range: {}",
                config.download.delay_ms
            ))
        })?;

        Ok(Self {
            file_type,
            language: config.catalog.language.clone(),
            base_url,
            save_path: config.download.save_path.clone(),
            overwrite: config.download.overwrite,
            delay: Duration::from_millis(delay_ms),
            max_files,
            engine: config.download.engine,
            mode: config.download.mode,
            unzip: config.download.unzip,
        })
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// First catalog page of the run
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    /// Directory receiving archives and catalog pages
    pub fn zips_path(&self) -> PathBuf {
        self.save_path.join("zips")
    }

    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Dispatch cap; `usize::MAX` when every file was requested
    pub fn max_files(&self) -> usize {
        self.max_files
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_files == usize::MAX
    }

    pub fn engine(&self) -> EngineKind {
        self.engine
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn unzip(&self) -> bool {
        self.unzip
    }
}

/// Builds the first listing URL from the catalog root, file type and language
fn build_harvest_url(root: &str, file_type: FileType, language: &str) -> crate::ConfigResult<Url> {
    let root = if root.ends_with('/') {
        root.to_string()
    } else {
        format!("{}/", root)
    };
    let raw = format!(
        "{}harvest?filetypes[]={}&langs[]={}",
        root, file_type, language
    );
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", raw, e)))
}
