//! # fashioncrawler
//!
//! Crawl fashion-marketplace search results and listing pages.
//!
//! The heart of the crate is [`FetchAggregator`]: it takes the item URLs found
//! on a search-results page and loads them through a bounded pool of
//! single-use page renderers, retrying transient failures with linear
//! backoff, isolating per-URL failures, and draining gracefully on
//! cancellation.
//!
//! ## Architecture
//!
//! 1. **Indexing**: [`scrapers::listing`] collects item URLs from a search page
//! 2. **Fetching**: [`FetchAggregator::fetch_all`] loads every item page
//! 3. **Output**: [`outputs::report`] writes results and failures as JSON/YAML
//!
//! ```no_run
//! use fashioncrawler::{FetchAggregator, HttpRendererFactory, FetchConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FetchConfig::default();
//! let aggregator = FetchAggregator::from_config(HttpRendererFactory::from_config(&config), &config)?;
//! let report = aggregator
//!     .fetch_all(["https://www.grailed.com/listings/1"], &CancellationToken::new())
//!     .await;
//! println!("{} fetched, {} failed", report.results.len(), report.failures.len());
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod config;
pub mod error;
pub mod models;
pub mod outputs;
pub mod renderer;
pub mod retry;
pub mod scrapers;
pub mod store;
pub mod utils;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::FetchAggregator;
pub use config::{FetchConfig, load_config};
pub use error::{ConfigError, FetchError};
pub use models::{FetchFailure, FetchOutcome, FetchTask, TaskState};
pub use renderer::{ClientGuard, PageRenderer, RendererFactory};
pub use retry::RetryPolicy;
pub use scrapers::http::{HttpRenderer, HttpRendererFactory};
pub use store::{FetchReport, ResultStore};
pub use worker::{AttemptTimeouts, FetchWorker};
