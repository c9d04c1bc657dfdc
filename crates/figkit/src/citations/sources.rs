//! HTTP citation-count services (blocking reqwest, JSON bodies).

use reqwest::blocking::Client;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::{CitationError, CitationSource};

/// Endpoints and client identity. No retries or timeouts beyond reqwest's
/// defaults.
#[derive(Clone, Debug, Serialize)]
pub struct FetchCfg {
    pub opencitations_base: String,
    pub crossref_base: String,
    pub user_agent: String,
}

impl Default for FetchCfg {
    fn default() -> Self {
        Self {
            opencitations_base: "https://opencitations.net".to_string(),
            crossref_base: "https://api.crossref.org".to_string(),
            user_agent: concat!("figkit/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

fn client(cfg: &FetchCfg) -> Result<Client, CitationError> {
    Ok(Client::builder().user_agent(cfg.user_agent.clone()).build()?)
}

fn parse_base(base: &str) -> Result<Url, CitationError> {
    let url = Url::parse(base).map_err(|e| CitationError::BadBaseUrl {
        url: base.to_string(),
        message: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(CitationError::BadBaseUrl {
            url: base.to_string(),
            message: "not a hierarchical url".to_string(),
        });
    }
    Ok(url)
}

/// `base/route.../doi`, with each `/`-separated part of the DOI escaped as
/// one path segment so `#`, `?` and `%` stay inside the path.
fn endpoint(base: &Url, route: &[&str], doi: &str) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .extend(route.iter().copied().chain(doi.split('/')));
    }
    url
}

/// OpenCitations COCI: `GET /index/coci/api/v1/citation-count/{doi}` →
/// `[{"count": "N"}]`.
pub struct OpenCitations {
    http: Client,
    base: Url,
}

const COCI_ROUTE: [&str; 5] = ["index", "coci", "api", "v1", "citation-count"];

impl OpenCitations {
    pub fn new(cfg: &FetchCfg) -> Result<Self, CitationError> {
        Ok(Self {
            http: client(cfg)?,
            base: parse_base(&cfg.opencitations_base)?,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CountValue {
    Int(i64),
    Text(String),
}

#[derive(Deserialize)]
struct CociRow {
    count: Option<CountValue>,
}

fn parse_coci(doi: &str, rows: Vec<CociRow>) -> Result<Option<i64>, CitationError> {
    let Some(count) = rows.into_iter().next().and_then(|r| r.count) else {
        return Ok(None);
    };
    match count {
        CountValue::Int(n) => Ok(Some(n)),
        CountValue::Text(s) if s.trim().is_empty() => Ok(None),
        CountValue::Text(s) => s.trim().parse().map(Some).map_err(|e| CitationError::Parse {
            doi: doi.to_string(),
            message: format!("{s:?}: {e}"),
        }),
    }
}

impl CitationSource for OpenCitations {
    fn name(&self) -> &str {
        "opencitations"
    }

    fn citation_count(&self, doi: &str) -> Result<Option<i64>, CitationError> {
        let url = endpoint(&self.base, &COCI_ROUTE, doi);
        let rows: Vec<CociRow> = self.http.get(url).send()?.error_for_status()?.json()?;
        parse_coci(doi, rows)
    }
}

/// Crossref REST: `GET /works/{doi}` → `message.is-referenced-by-count`.
pub struct Crossref {
    http: Client,
    base: Url,
}

impl Crossref {
    pub fn new(cfg: &FetchCfg) -> Result<Self, CitationError> {
        Ok(Self {
            http: client(cfg)?,
            base: parse_base(&cfg.crossref_base)?,
        })
    }
}

#[derive(Deserialize)]
struct CrossrefWork {
    message: CrossrefMessage,
}

#[derive(Deserialize)]
struct CrossrefMessage {
    #[serde(rename = "is-referenced-by-count")]
    referenced_by: Option<i64>,
}

impl CitationSource for Crossref {
    fn name(&self) -> &str {
        "crossref"
    }

    fn citation_count(&self, doi: &str) -> Result<Option<i64>, CitationError> {
        let url = endpoint(&self.base, &["works"], doi);
        let work: CrossrefWork = self.http.get(url).send()?.error_for_status()?.json()?;
        Ok(work.message.referenced_by)
    }
}
