//! Report serialization.
//!
//! A [`FetchReport`] is turned into a [`ReportDocument`] with sorted results
//! (so repeated runs diff cleanly) and flattened failures, then serialized
//! as pretty JSON or YAML.

use crate::models::FetchFailure;
use crate::store::FetchReport;
use chrono::Local;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::{error, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("failed to serialize report as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to serialize report as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Serializable view of a finished batch.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ReportDocument {
    pub fetched_at: String,
    pub results: BTreeMap<String, String>,
    pub failures: Vec<FailureRecord>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct FailureRecord {
    pub url: String,
    pub error: String,
    pub attempts: u32,
}

impl From<&FetchFailure> for FailureRecord {
    fn from(failure: &FetchFailure) -> Self {
        Self {
            url: failure.url.clone(),
            error: failure.last_error.to_string(),
            attempts: failure.attempts,
        }
    }
}

impl ReportDocument {
    pub fn from_report(report: &FetchReport) -> Self {
        let mut failures: Vec<FailureRecord> = report.failures.iter().map(Into::into).collect();
        failures.sort_by(|a, b| a.url.cmp(&b.url));
        Self {
            fetched_at: Local::now().to_rfc3339(),
            results: report
                .results
                .iter()
                .map(|(url, content)| (url.clone(), content.clone()))
                .collect(),
            failures,
        }
    }
}

pub fn render_report(report: &FetchReport, format: OutputFormat) -> Result<String, OutputError> {
    let document = ReportDocument::from_report(report);
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(&document)?,
        OutputFormat::Yaml => serde_yaml::to_string(&document)?,
    })
}

/// Write `report` to `path` in `format`, creating parent directories.
///
/// # Arguments
///
/// * `report` - The finished batch
/// * `path` - Destination file; missing parent directories are created
/// * `format` - JSON or YAML
///
/// # Errors
///
/// Returns [`OutputError`] if serialization fails or the file cannot be written.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_report(
    report: &FetchReport,
    path: &Path,
    format: OutputFormat,
) -> Result<(), OutputError> {
    let body = render_report(report, format)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(dir = %parent.display(), error = %e, "Failed to create output dir");
            return Err(OutputError::Write {
                path: parent.display().to_string(),
                source: e,
            });
        }
    }

    fs::write(path, body).await.map_err(|source| OutputError::Write {
        path: path.display().to_string(),
        source,
    })?;
    info!(
        results = report.results.len(),
        failures = report.failures.len(),
        "Wrote fetch report"
    );
    Ok(())
}
