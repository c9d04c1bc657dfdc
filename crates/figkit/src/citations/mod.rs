//! Citation counts per bibliography entry, cached on disk.
//!
//! Purpose
//! - Turn the paper's bibliography into `(year, count1, count2)` rows, one per
//!   entry carrying both a DOI and a year, using two independent services.
//!
//! Model
//! - `CitationSource` is the seam: the HTTP sources live in `sources`, tests
//!   plug in counting stubs.
//! - `load_or_fetch` returns the cache verbatim when it can be read. A failed
//!   read is the only swallowed error; it triggers a full fetch pass followed
//!   by a cache write.
//!
//! Invariants
//! - A fetch pass is all-or-nothing: the first failing request aborts it and
//!   nothing is written.
//! - Records keep bibliography order.
//! - A service answering without a count yields `None`, stored as an empty
//!   CSV field.

mod cache;
mod sources;

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::bib::{BibEntry, BibError};

pub use cache::{read_cache, write_cache};
pub use sources::{Crossref, FetchCfg, OpenCitations};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CitationRecord {
    pub year: i64,
    pub count1: Option<i64>,
    pub count2: Option<i64>,
}

pub trait CitationSource {
    fn name(&self) -> &str;
    /// `Ok(None)` when the service knows the DOI but reports no count.
    fn citation_count(&self, doi: &str) -> Result<Option<i64>, CitationError>;
}

#[derive(Debug)]
pub enum CitationError {
    Http(reqwest::Error),
    Parse { doi: String, message: String },
    BadBaseUrl { url: String, message: String },
    Io(std::io::Error),
    Cache(polars::error::PolarsError),
    Bib(BibError),
}

impl fmt::Display for CitationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "citation request failed: {e}"),
            Self::Parse { doi, message } => write!(f, "bad citation count for {doi}: {message}"),
            Self::BadBaseUrl { url, message } => write!(f, "bad service url {url:?}: {message}"),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Cache(e) => write!(f, "citation cache: {e}"),
            Self::Bib(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CitationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Cache(e) => Some(e),
            Self::Bib(e) => Some(e),
            Self::Parse { .. } | Self::BadBaseUrl { .. } => None,
        }
    }
}

impl From<reqwest::Error> for CitationError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

impl From<std::io::Error> for CitationError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<polars::error::PolarsError> for CitationError {
    fn from(e: polars::error::PolarsError) -> Self {
        Self::Cache(e)
    }
}

impl From<BibError> for CitationError {
    fn from(e: BibError) -> Self {
        Self::Bib(e)
    }
}

/// Query both sources for every entry with a DOI and a year.
pub fn fetch_records(
    entries: &[BibEntry],
    first: &dyn CitationSource,
    second: &dyn CitationSource,
) -> Result<Vec<CitationRecord>, CitationError> {
    let mut records = Vec::new();
    for entry in entries {
        let (Some(doi), Some(year)) = (entry.doi(), entry.year()) else {
            tracing::debug!(key = %entry.key, "skipping entry without doi/year");
            continue;
        };
        let count1 = query(first, doi)?;
        let count2 = query(second, doi)?;
        tracing::debug!(key = %entry.key, doi, year, ?count1, ?count2, "fetched");
        records.push(CitationRecord {
            year,
            count1,
            count2,
        });
    }
    Ok(records)
}

fn query(source: &dyn CitationSource, doi: &str) -> Result<Option<i64>, CitationError> {
    let count = source.citation_count(doi)?;
    if count.is_none() {
        tracing::warn!(source = source.name(), doi, "no citation count reported");
    }
    Ok(count)
}

/// Cached records if `cache` is readable, otherwise fetch and write the cache.
pub fn load_or_fetch(
    cache: &Path,
    entries: &[BibEntry],
    first: &dyn CitationSource,
    second: &dyn CitationSource,
) -> Result<Vec<CitationRecord>, CitationError> {
    match read_cache(cache) {
        Ok(records) => {
            tracing::info!(path = %cache.display(), rows = records.len(), "using citation cache");
            return Ok(records);
        }
        Err(e) => tracing::info!(path = %cache.display(), reason = %e, "citation cache miss"),
    }
    let records = fetch_records(entries, first, second)?;
    write_cache(cache, &records)?;
    tracing::info!(path = %cache.display(), rows = records.len(), "wrote citation cache");
    Ok(records)
}
