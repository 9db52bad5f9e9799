//! Resource fetch engine
//!
//! This module performs single fetches for the traversal, including:
//! - Building the HTTP client with a browser-like header set
//! - Streaming the response body into the download directory
//! - Classifying failures into soft and fatal outcomes

use crate::catalog::PAGINATION_MARKER;
use crate::config::EngineKind;
use crate::files::local_file_path;
use crate::HarvestError;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_LOCATION, CONTENT_TYPE,
    UPGRADE_INSECURE_REQUESTS,
};
use reqwest::{Client, Response};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Connection timeout applied to every request
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 6.3; Win64; x64; rv:58.0) Gecko/20100101 Firefox/58.0";

/// Why a fetch failed fatally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Host name could not be resolved or reached
    HostUnreachable,
    /// Server answered with a non-success status
    HttpStatus(u16),
    /// Any other transport or file system failure
    Io,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostUnreachable => write!(f, "host unreachable"),
            Self::HttpStatus(code) => write!(f, "HTTP {}", code),
            Self::Io => write!(f, "I/O"),
        }
    }
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// The body was saved to disk
    Success {
        /// Content-Type header value
        content_type: String,
        /// Content-Location header value, or the final URL when absent
        content_location: String,
        /// Where the body was written
        saved_path: PathBuf,
    },

    /// Nothing was downloaded but the run may continue (connect timeout)
    SoftFailure,

    /// The fetch failed in a way that must abort the run
    FatalError {
        kind: FetchErrorKind,
        message: String,
    },
}

impl FetchResult {
    /// Returns true if this result is a saved harvest listing page
    pub fn is_catalog_page(&self) -> bool {
        match self {
            Self::Success {
                content_type,
                content_location,
                ..
            } => content_type.contains("text/html") && content_location.contains(PAGINATION_MARKER),
            _ => false,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn saved_path(&self) -> Option<&Path> {
        match self {
            Self::Success { saved_path, .. } => Some(saved_path),
            _ => None,
        }
    }

    /// Converts a fatal result into the matching crate error
    pub fn into_error(self, url: &Url) -> Option<HarvestError> {
        match self {
            Self::FatalError {
                kind: FetchErrorKind::HostUnreachable,
                message,
            } => Some(HarvestError::HostUnreachable {
                url: url.to_string(),
                message,
            }),
            Self::FatalError { kind, message } => Some(HarvestError::Fetch {
                url: url.to_string(),
                kind,
                message,
            }),
            _ => None,
        }
    }
}

/// Builds an HTTP client for the given engine
///
/// # Example
///
/// ```no_run
/// use harvest_dl::config::EngineKind;
/// use harvest_dl::crawler::build_http_client;
///
/// let client = build_http_client(EngineKind::HttpConnection).unwrap();
/// ```
pub fn build_http_client(kind: EngineKind) -> Result<Client, reqwest::Error> {
    match kind {
        EngineKind::HttpConnection => {
            let mut headers = HeaderMap::new();
            headers.insert(
                ACCEPT,
                HeaderValue::from_static(
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                ),
            );
            headers.insert(
                ACCEPT_LANGUAGE,
                HeaderValue::from_static("es-ES,es;q=0.8,en-US;q=0.5,en;q=0.3"),
            );
            headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

            Client::builder()
                .user_agent(BROWSER_USER_AGENT)
                .default_headers(headers)
                .connect_timeout(CONNECT_TIMEOUT)
                .gzip(true)
                .brotli(true)
                .build()
        }
    }
}

/// Performs single fetches into a local directory
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct FetchEngine {
    client: Client,
    kind: EngineKind,
}

impl FetchEngine {
    pub fn new(kind: EngineKind) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(kind)?,
            kind,
        })
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    /// Fetches `url` and saves its body into `save_dir`
    ///
    /// # Failure Policy
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | Connect timeout / connection refused | SoftFailure |
    /// | Host cannot be resolved or reached | FatalError(HostUnreachable) |
    /// | Non-success HTTP status | FatalError(HttpStatus) |
    /// | Any other transport or write error | FatalError(Io) |
    pub async fn fetch(&self, url: &Url, save_dir: &Path) -> FetchResult {
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return classify_request_error(url, e),
        };

        let status = response.status();
        if !status.is_success() {
            tracing::error!("{} answered {}", url, status);
            return FetchResult::FatalError {
                kind: FetchErrorKind::HttpStatus(status.as_u16()),
                message: format!("unexpected status {}", status),
            };
        }

        let content_type = header_value(&response, CONTENT_TYPE).unwrap_or_default();
        let content_location = header_value(&response, CONTENT_LOCATION)
            .unwrap_or_else(|| response.url().to_string());

        let saved_path = local_file_path(save_dir, url.as_str());
        match save_body(response, &saved_path).await {
            Ok(bytes) => {
                tracing::debug!(
                    "Downloaded {} ({} bytes, {})",
                    saved_path.display(),
                    bytes,
                    content_type
                );
                FetchResult::Success {
                    content_type,
                    content_location,
                    saved_path,
                }
            }
            Err(e) => {
                // A partial file would make the next run believe it is done
                let _ = tokio::fs::remove_file(&saved_path).await;
                match e {
                    BodyError::Http(e) if e.is_timeout() => {
                        tracing::warn!("Download timeout exceeded for {}", url);
                        FetchResult::SoftFailure
                    }
                    other => {
                        tracing::error!("Cannot save {}: {}", url, other);
                        FetchResult::FatalError {
                            kind: FetchErrorKind::Io,
                            message: other.to_string(),
                        }
                    }
                }
            }
        }
    }
}

#[derive(Debug)]
enum BodyError {
    Http(reqwest::Error),
    Io(std::io::Error),
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "{}", e),
            Self::Io(e) => write!(f, "{}", e),
        }
    }
}

/// Streams the response body into `path`, returning the byte count
async fn save_body(mut response: Response, path: &Path) -> Result<u64, BodyError> {
    let mut file = tokio::fs::File::create(path).await.map_err(BodyError::Io)?;
    let mut written = 0u64;

    while let Some(chunk) = response.chunk().await.map_err(BodyError::Http)? {
        file.write_all(&chunk).await.map_err(BodyError::Io)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(BodyError::Io)?;

    Ok(written)
}

fn header_value(response: &Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn classify_request_error(url: &Url, e: reqwest::Error) -> FetchResult {
    if e.is_timeout() || (e.is_connect() && is_connection_refused(&e)) {
        tracing::warn!("Download timeout exceeded for {}: {}", url, e);
        FetchResult::SoftFailure
    } else if e.is_connect() {
        tracing::error!("Host unreachable for {}: {}", url, e);
        FetchResult::FatalError {
            kind: FetchErrorKind::HostUnreachable,
            message: e.to_string(),
        }
    } else {
        tracing::error!("Request to {} failed: {}", url, e);
        FetchResult::FatalError {
            kind: FetchErrorKind::Io,
            message: e.to_string(),
        }
    }
}

/// Walks the error chain looking for a refused or timed out connection
fn is_connection_refused(e: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(e);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            return matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::TimedOut
            );
        }
        source = err.source();
    }
    false
}
