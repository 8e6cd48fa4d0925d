//! Output generation for fetch reports.
//!
//! # Submodules
//!
//! - [`report`]: Serializes a [`FetchReport`](crate::store::FetchReport) to
//!   JSON or YAML and writes it to disk
//!
//! # Output Structure
//!
//! ```text
//! {
//!   "fetched_at": "2025-05-06T20:30:00+02:00",
//!   "results": { "<url>": "<page content>", ... },
//!   "failures": [ { "url": "...", "error": "...", "attempts": 3 } ]
//! }
//! ```

pub mod report;
