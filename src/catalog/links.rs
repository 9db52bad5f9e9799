//! Catalog link classification and resolution

use crate::LinkError;
use url::Url;

/// Substring identifying a catalog continuation link
pub const PAGINATION_MARKER: &str = "harvest";

/// What a catalog link points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// Next listing page; carries more links rather than an artifact
    Pagination,
    /// Downloadable archive
    Resource,
}

/// A raw href taken from a listing page, plus its classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogLink {
    href: String,
    kind: LinkKind,
}

impl CatalogLink {
    pub fn new(href: impl Into<String>) -> Self {
        let href = href.into();
        let kind = if href.contains(PAGINATION_MARKER) {
            LinkKind::Pagination
        } else {
            LinkKind::Resource
        };
        Self { href, kind }
    }

    pub fn href(&self) -> &str {
        &self.href
    }

    pub fn kind(&self) -> LinkKind {
        self.kind
    }

    pub fn is_pagination(&self) -> bool {
        self.kind == LinkKind::Pagination
    }

    /// Parses the href as an absolute http(s) URL
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Url))` - The href is absolute
    /// * `Ok(None)` - The href is relative and needs a base
    /// * `Err(LinkError)` - The href is absolute but not http(s)
    pub fn absolute_url(&self) -> Result<Option<Url>, LinkError> {
        match Url::parse(self.href.trim()) {
            Ok(url) if is_http(&url) => Ok(Some(url)),
            Ok(url) => Err(LinkError::Malformed {
                link: self.href.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            }),
            Err(_) => Ok(None),
        }
    }

    /// Resolves the href as a continuation of the catalog rooted at `base`
    ///
    /// Listing pages escape the ampersands of their continuation query, so
    /// `&amp;` is turned back into `&` before joining.
    pub fn resolve_continuation(&self, base: &Url) -> Result<Url, LinkError> {
        let unescaped = unescape_ampersands(self.href.trim());
        let url = base.join(&unescaped).map_err(|e| LinkError::Malformed {
            link: self.href.clone(),
            reason: e.to_string(),
        })?;

        if !is_http(&url) {
            return Err(LinkError::Malformed {
                link: self.href.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        Ok(url)
    }
}

/// Replaces HTML-escaped ampersands with plain ones
pub fn unescape_ampersands(raw: &str) -> String {
    raw.replace("&amp;", "&")
}

fn is_http(url: &Url) -> bool {
    url.scheme() == "http" || url.scheme() == "https"
}
