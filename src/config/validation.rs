use crate::config::types::{CatalogConfig, Config, DownloadConfig, FileType};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> crate::ConfigResult<()> {
    validate_catalog_config(&config.catalog)?;
    validate_download_config(&config.download)?;
    Ok(())
}

/// Validates the catalog section
fn validate_catalog_config(config: &CatalogConfig) -> crate::ConfigResult<()> {
    config.file_type.parse::<FileType>()?;

    if config.language.is_empty() {
        return Err(ConfigError::Validation(
            "language cannot be empty".to_string(),
        ));
    }

    if !config
        .language
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "language must be a catalog language code, got '{}'",
            config.language
        )));
    }

    let root = Url::parse(&config.root_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid root-url: {}", e)))?;

    if root.scheme() != "http" && root.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "root-url '{}' must use http or https",
            config.root_url
        )));
    }

    Ok(())
}

/// Validates the download section
fn validate_download_config(config: &DownloadConfig) -> crate::ConfigResult<()> {
    if config.delay_ms < 0 {
        return Err(ConfigError::Validation(format!(
            "delay-ms cannot be less than zero, got {}",
            config.delay_ms
        )));
    }

    if config.max_files < 0 {
        return Err(ConfigError::Validation(format!(
            "max-files cannot be less than zero, got {}",
            config.max_files
        )));
    }

    if config.save_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "save-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
