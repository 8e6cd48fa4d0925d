//! # fashioncrawler
//!
//! Fetch fashion-marketplace listing pages concurrently and write the raw
//! pages, plus the URLs that could not be fetched, to a report.
//!
//! ## Usage
//!
//! ```sh
//! fashioncrawler --search-page "https://www.grailed.com/shop?query=jacket" -o jackets.json
//! ```
//!
//! ## Pipeline
//!
//! 1. **Indexing**: collect item URLs from arguments, a URL file, or a search page
//! 2. **Fetching**: load every item page through the bounded retrying pool
//! 3. **Output**: write a JSON/YAML report or print a summary
//!
//! Ctrl-C stops admitting new pages; pages already loading finish first.

use clap::Parser;
use fashioncrawler::outputs::report;
use fashioncrawler::scrapers::listing::{ListingFilter, discover_listing_urls};
use fashioncrawler::utils::{ensure_writable_dir, read_url_list, truncate_for_log};
use fashioncrawler::{FetchAggregator, FetchConfig, HttpRendererFactory, load_config};
use regex::Regex;
use std::error::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::Cli;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("fashioncrawler starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Configuration ----
    let mut config = match &args.config {
        Some(path) => load_config(path).inspect_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to load configuration");
        })?,
        None => FetchConfig::default(),
    };
    args.apply_overrides(&mut config);
    let factory = HttpRendererFactory::from_config(&config);

    // Early check: ensure output dir is writable before spending time fetching
    if let Some(dir) = args
        .output
        .as_deref()
        .and_then(|p| p.parent())
        .filter(|p| !p.as_os_str().is_empty())
    {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir.display(), error = %e, "Output directory is not writable");
            return Err(e);
        }
    }

    // ---- Index item URLs ----
    let mut urls = args.urls.clone();
    if let Some(path) = &args.urls_file {
        urls.extend(read_url_list(path).await?);
    }
    if let Some(page) = &args.search_page {
        let pattern = args.item_pattern.as_deref().map(Regex::new).transpose()?;
        let filter = ListingFilter::new(&args.item_selector, pattern)?;
        match discover_listing_urls(&factory, page, &filter).await {
            Ok(found) => urls.extend(found),
            Err(e) => {
                error!(page = %page, error = %e, "Failed to index search page");
                return Err(e.into());
            }
        }
    }
    if urls.is_empty() {
        error!("No URLs to fetch; pass URLs, --urls-file or --search-page");
        return Err("no URLs to fetch".into());
    }
    info!(count = urls.len(), "Collected item URLs");

    // ---- Fetch ----
    let aggregator = FetchAggregator::from_config(factory, &config)
        .inspect_err(|e| error!(error = %e, "Invalid fetch configuration"))?
        .with_span(info_span!("fetch_batch", urls = urls.len()));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; cancelling remaining pages and waiting for running fetches");
            on_interrupt.cancel();
        }
    });

    let report = aggregator.fetch_all(urls, &cancel).await;

    // ---- Output ----
    match &args.output {
        Some(path) => {
            let path = match path.extension() {
                Some(_) => path.clone(),
                None => path.with_extension(args.format.extension()),
            };
            if let Err(e) = report::write_report(&report, &path, args.format).await {
                error!(path = %path.display(), error = %e, "Failed to write report");
                return Err(e.into());
            }
        }
        None => {
            for (url, content) in &report.results {
                println!("ok     {url} ({} bytes)", content.len());
                debug!(%url, preview = %truncate_for_log(content, 200), "Page preview");
            }
            for failure in &report.failures {
                println!(
                    "failed {} after {} attempt(s): {}",
                    failure.url, failure.attempts, failure.last_error
                );
            }
        }
    }

    if !report.is_complete() {
        warn!(
            failed = report.failures.len(),
            "Some pages could not be fetched; see the failures in the report"
        );
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        fetched = report.results.len(),
        failed = report.failures.len(),
        "Execution complete"
    );

    Ok(())
}
