//! Item-link discovery on marketplace search-results pages.
//!
//! Search pages on Grailed, Depop and similar sites link every listing with a
//! plain anchor. Discovery loads the page once, selects anchors with a CSS
//! selector, keeps those whose resolved URL matches an optional pattern, and
//! returns absolute, deduplicated URLs ready for the fetch pool.
//!
//! # URL Pattern
//!
//! Relative links resolve against the search page, so `/listings/123-jacket`
//! on `https://www.grailed.com/shop?query=jacket` becomes
//! `https://www.grailed.com/listings/123-jacket`.

use crate::error::FetchError;
use crate::renderer::{ClientGuard, PageRenderer, RendererFactory};
use itertools::Itertools;
use regex::Regex;
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, info, instrument};
use url::Url;

pub const DEFAULT_ITEM_SELECTOR: &str = "a[href]";

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("invalid search page url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("invalid item selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("failed to load search page: {0}")]
    Fetch(#[from] FetchError),
}

/// How to recognise item links on a search page.
#[derive(Debug, Clone)]
pub struct ListingFilter {
    selector: Selector,
    pattern: Option<Regex>,
}

impl ListingFilter {
    pub fn new(selector: &str, pattern: Option<Regex>) -> Result<Self, DiscoveryError> {
        let parsed = Selector::parse(selector).map_err(|e| DiscoveryError::InvalidSelector {
            selector: selector.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            selector: parsed,
            pattern,
        })
    }

    fn accepts(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
            && self
                .pattern
                .as_ref()
                .is_none_or(|pattern| pattern.is_match(url.as_str()))
    }
}

/// Extract absolute item URLs from search-page markup.
pub fn extract_listing_urls(html: &str, base: &Url, filter: &ListingFilter) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&filter.selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .map(|mut url| {
            url.set_fragment(None);
            url
        })
        .filter(|url| filter.accepts(url))
        .map(String::from)
        .unique()
        .collect()
}

/// Load `page_url` with a fresh renderer and return the item URLs it links.
#[instrument(level = "info", skip(factory, filter))]
pub async fn discover_listing_urls<F: RendererFactory>(
    factory: &F,
    page_url: &str,
    filter: &ListingFilter,
) -> Result<Vec<String>, DiscoveryError> {
    let base = Url::parse(page_url)?;
    let html = {
        let mut client = ClientGuard::new(factory.create().await?);
        client.load(page_url).await?
    };

    let urls = extract_listing_urls(&html, &base, filter);
    info!(count = urls.len(), source = page_url, "Indexed listing URLs");
    debug!(urls = ?urls, "Listing URLs");
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Step, StubFactory};

    const SEARCH_PAGE: &str = r##"
        <html><body>
          <div class="feed-item"><a href="/listings/101-denim-jacket">Denim</a></div>
          <div class="feed-item"><a href="/listings/102-wool-coat#photos">Coat</a></div>
          <div class="feed-item"><a href="https://www.grailed.com/listings/101-denim-jacket">Dup</a></div>
          <a href="/designers/acne-studios">Designer</a>
          <a href="mailto:help@grailed.com">Mail</a>
          <a>No href</a>
        </body></html>
    "##;

    fn base() -> Url {
        Url::parse("https://www.grailed.com/shop?query=jacket").unwrap()
    }

    #[test]
    fn test_extract_with_pattern() {
        let filter = ListingFilter::new(
            DEFAULT_ITEM_SELECTOR,
            Some(Regex::new(r"/listings/\d+").unwrap()),
        )
        .unwrap();
        let urls = extract_listing_urls(SEARCH_PAGE, &base(), &filter);
        assert_eq!(
            urls,
            vec![
                "https://www.grailed.com/listings/101-denim-jacket",
                "https://www.grailed.com/listings/102-wool-coat",
            ]
        );
    }

    #[test]
    fn test_extract_with_selector_only() {
        let filter = ListingFilter::new(".feed-item a[href]", None).unwrap();
        let urls = extract_listing_urls(SEARCH_PAGE, &base(), &filter);
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn test_non_http_links_skipped() {
        let filter = ListingFilter::new(DEFAULT_ITEM_SELECTOR, None).unwrap();
        let urls = extract_listing_urls(SEARCH_PAGE, &base(), &filter);
        assert!(urls.iter().all(|u| u.starts_with("https://")));
        assert_eq!(urls.len(), 3);
    }

    #[test]
    fn test_invalid_selector() {
        let err = ListingFilter::new("a[", None).unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidSelector { .. }));
    }

    #[tokio::test]
    async fn test_discover_through_renderer() {
        let page = "https://www.grailed.com/shop?query=jacket";
        let factory = StubFactory::new().script(page, vec![Step::Ok(SEARCH_PAGE)]);
        let filter = ListingFilter::new(".feed-item a[href]", None).unwrap();

        let urls = discover_listing_urls(&factory, page, &filter).await.unwrap();

        assert_eq!(urls.len(), 2);
        assert_eq!(factory.disposed(), 1);
    }

    #[tokio::test]
    async fn test_discover_propagates_fetch_error() {
        let page = "https://www.depop.com/search/?q=vintage";
        let factory = StubFactory::new().script(page, vec![Step::Fatal]);
        let filter = ListingFilter::new(DEFAULT_ITEM_SELECTOR, None).unwrap();

        let err = discover_listing_urls(&factory, page, &filter).await.unwrap_err();

        assert!(matches!(err, DiscoveryError::Fetch(FetchError::Fatal(_))));
        assert_eq!(factory.disposed(), 1);
    }
}
