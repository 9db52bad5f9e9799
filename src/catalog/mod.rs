//! Catalog page handling
//!
//! This module knows what a harvest listing looks like:
//! - Pulling the ordered hrefs out of a saved listing page
//! - Telling continuation links from terminal archive links
//! - Deciding whether a link needs to be acted on at all

mod extractor;
mod gate;
mod links;

pub use extractor::{extract_links, extract_links_from_html};
pub use gate::{should_act, Gate};
pub use links::{unescape_ampersands, CatalogLink, LinkKind, PAGINATION_MARKER};
