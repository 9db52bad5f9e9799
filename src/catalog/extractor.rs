//! Link extraction from saved listing pages
//!
//! The traversal relies on document order: the last link of a listing page,
//! when it is a continuation link, is the next page. Links are therefore
//! returned exactly in the order the anchors appear.

use scraper::{Html, Selector};
use std::path::Path;

/// Extracts the ordered anchor hrefs of a saved HTML page
///
/// Listing pages are not guaranteed to be UTF-8, so the file is decoded
/// lossily.
///
/// # Errors
///
/// Returns the I/O error if the page cannot be read.
pub fn extract_links(path: &Path) -> std::io::Result<Vec<String>> {
    let bytes = std::fs::read(path)?;
    let html = String::from_utf8_lossy(&bytes);
    Ok(extract_links_from_html(&html))
}

/// Extracts the ordered anchor hrefs of an HTML document
///
/// Hrefs are returned as written (apart from entity decoding), without being
/// resolved. Empty, fragment-only, `javascript:` and `mailto:` hrefs are
/// dropped.
pub fn extract_links_from_html(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&a_selector) {
        if let Some(href) = element.value().attr("href") {
            let href = href.trim();
            if is_followable(href) {
                links.push(href.to_string());
            }
        }
    }

    links
}

fn is_followable(href: &str) -> bool {
    !(href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:"))
}
