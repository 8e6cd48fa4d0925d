//! Marketplace-facing pieces of the crawler.
//!
//! Each submodule covers one side of talking to a marketplace:
//!
//! | Module | Role |
//! |--------|------|
//! | [`http`] | [`PageRenderer`](crate::renderer::PageRenderer) backed by `reqwest` |
//! | [`listing`] | Item-link discovery on search-results pages |
//!
//! The crawl is two-phase, as for every marketplace the crawler handles:
//!
//! 1. **Indexing**: load a search page and collect item URLs
//! 2. **Fetching**: hand the URLs to the
//!    [`FetchAggregator`](crate::aggregator::FetchAggregator), which loads
//!    every item page through a bounded pool

pub mod http;
pub mod listing;
