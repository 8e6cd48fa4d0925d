//! Command-line interface definitions for fashioncrawler.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Pool tuning flags override values from the optional YAML config file.

use clap::Parser;
use fashioncrawler::FetchConfig;
use fashioncrawler::outputs::report::OutputFormat;
use fashioncrawler::scrapers::listing::DEFAULT_ITEM_SELECTOR;
use std::path::PathBuf;

/// Command-line arguments for the fashioncrawler application.
///
/// # Examples
///
/// ```sh
/// # Fetch a few listing pages and print a summary
/// fashioncrawler https://www.grailed.com/listings/1 https://www.grailed.com/listings/2
///
/// # Discover listings on a search page and write them as YAML
/// fashioncrawler --search-page "https://www.grailed.com/shop?query=jacket" \
///     --item-pattern '/listings/\d+' -o out/jackets.yaml --format yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Item page URLs to fetch
    pub urls: Vec<String>,

    /// File with one URL per line (`#` starts a comment)
    #[arg(long)]
    pub urls_file: Option<PathBuf>,

    /// Search-results page to discover item URLs from
    #[arg(short, long)]
    pub search_page: Option<String>,

    /// CSS selector for item links on the search page
    #[arg(long, default_value = DEFAULT_ITEM_SELECTOR)]
    pub item_selector: String,

    /// Regex a discovered link must match to count as an item
    #[arg(long)]
    pub item_pattern: Option<String>,

    /// Optional path to config.yaml file
    #[arg(short, long, env = "FASHIONCRAWLER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of concurrent fetch workers
    #[arg(short, long)]
    pub pool_size: Option<usize>,

    /// Total attempts per URL, including the first
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Backoff unit in milliseconds (attempt n waits n * base delay)
    #[arg(long)]
    pub base_delay_ms: Option<u64>,

    /// Per-attempt load timeout in milliseconds
    #[arg(long)]
    pub attempt_timeout_ms: Option<u64>,

    /// Cancel the whole batch after this many milliseconds
    #[arg(long)]
    pub batch_timeout_ms: Option<u64>,

    /// Output file for the report; prints a summary when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

impl Cli {
    /// Apply flag overrides on top of file/default configuration.
    pub fn apply_overrides(&self, config: &mut FetchConfig) {
        if let Some(pool_size) = self.pool_size {
            config.pool_size = pool_size;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.max_attempts = max_attempts;
        }
        if let Some(base_delay_ms) = self.base_delay_ms {
            config.base_delay_ms = base_delay_ms;
        }
        if let Some(attempt_timeout_ms) = self.attempt_timeout_ms {
            config.attempt_timeout_ms = attempt_timeout_ms;
        }
        if let Some(batch_timeout_ms) = self.batch_timeout_ms {
            config.batch_timeout_ms = Some(batch_timeout_ms);
        }
    }
}
