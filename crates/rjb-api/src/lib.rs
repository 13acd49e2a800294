//! Job and category gateway: source contracts plus the Remotive HTTP source and a
//! fixture-backed source used offline and in tests.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use rjb_core::{FilterPair, RawChip, RawJob};
use rjb_storage::{FetchError, HttpClientConfig, HttpFetcher};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub const CRATE_NAME: &str = "rjb-api";

pub const DEFAULT_JOBS_ENDPOINT: &str = "https://remotive.com/api/remote-jobs";
pub const DEFAULT_CATEGORIES_ENDPOINT: &str = "https://remotive.com/api/remote-jobs/categories";

pub const JOBS_FIXTURE: &str = "jobs.json";
pub const CATEGORIES_FIXTURE: &str = "categories.json";

/// Per-request context. `generation` is the filter-state generation observed when
/// the request was issued and only travels into logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceContext {
    pub session_id: Uuid,
    pub generation: u64,
}

impl SourceContext {
    pub fn new(session_id: Uuid, generation: u64) -> Self {
        Self {
            session_id,
            generation,
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("invalid endpoint `{url}`: {reason}")]
    InvalidEndpoint { url: String, reason: String },
    #[error(transparent)]
    Fixture(#[from] anyhow::Error),
}

impl SourceError {
    pub fn code(&self) -> Option<u16> {
        match self {
            SourceError::Fetch(err) => err.code(),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct JobsEnvelope {
    #[serde(default)]
    jobs: Vec<RawJob>,
}

#[derive(Debug, Deserialize)]
struct ChipsEnvelope {
    #[serde(default)]
    jobs: Vec<RawChip>,
}

#[async_trait]
pub trait JobSource: Send + Sync {
    fn source_id(&self) -> &'static str;

    /// Raw job listing, narrowed server-side when `pair` carries a key the API
    /// filters on.
    async fn query(
        &self,
        ctx: &SourceContext,
        pair: Option<&FilterPair>,
    ) -> Result<Vec<RawJob>, SourceError>;

    async fn fetch_chips(&self, ctx: &SourceContext) -> Result<Vec<RawChip>, SourceError>;

    async fn fetch_corpus(&self, ctx: &SourceContext) -> Result<Vec<RawJob>, SourceError> {
        self.query(ctx, None).await
    }

    async fn fetch_jobs(
        &self,
        ctx: &SourceContext,
        pair: &FilterPair,
        limit: usize,
    ) -> Result<Vec<RawJob>, SourceError> {
        let raw = self.query(ctx, Some(pair)).await?;
        let total = raw.len();
        let selected = select_jobs(raw, pair, limit);
        debug!(
            source = self.source_id(),
            generation = ctx.generation,
            %pair,
            total,
            selected = selected.len(),
            "jobs selected"
        );
        Ok(selected)
    }
}

/// Client-side half of a filtered fetch. Every job is re-checked against `pair`,
/// including keys the API already narrowed on, since upstream narrowing is
/// looser than the board's exact match. Truncates to `limit`.
pub fn select_jobs(raw: Vec<RawJob>, pair: &FilterPair, limit: usize) -> Vec<RawJob> {
    raw.into_iter()
        .filter(|job| job.matches(pair))
        .take(limit)
        .collect()
}

#[derive(Debug)]
pub struct RemotiveSource {
    http: HttpFetcher,
    jobs_endpoint: String,
    categories_endpoint: String,
}

impl RemotiveSource {
    pub fn new(
        http: HttpFetcher,
        jobs_endpoint: impl Into<String>,
        categories_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            http,
            jobs_endpoint: jobs_endpoint.into(),
            categories_endpoint: categories_endpoint.into(),
        }
    }

    pub fn jobs_url(&self, pair: Option<&FilterPair>) -> Result<String, SourceError> {
        let param = pair.and_then(|p| p.key.query_param().map(|param| (param, p.value.as_str())));
        let parsed = match param {
            Some(param) => reqwest::Url::parse_with_params(&self.jobs_endpoint, [param]),
            None => reqwest::Url::parse(&self.jobs_endpoint),
        };
        parsed
            .map(|url| url.to_string())
            .map_err(|err| SourceError::InvalidEndpoint {
                url: self.jobs_endpoint.clone(),
                reason: err.to_string(),
            })
    }
}

#[async_trait]
impl JobSource for RemotiveSource {
    fn source_id(&self) -> &'static str {
        "remotive"
    }

    async fn query(
        &self,
        ctx: &SourceContext,
        pair: Option<&FilterPair>,
    ) -> Result<Vec<RawJob>, SourceError> {
        let url = self.jobs_url(pair)?;
        let envelope: JobsEnvelope = self.http.fetch_json(ctx.session_id, &url).await?;
        Ok(envelope.jobs)
    }

    async fn fetch_chips(&self, ctx: &SourceContext) -> Result<Vec<RawChip>, SourceError> {
        let envelope: ChipsEnvelope = self
            .http
            .fetch_json(ctx.session_id, &self.categories_endpoint)
            .await?;
        Ok(envelope.jobs)
    }
}

/// Serves `jobs.json` and `categories.json` from a directory, emulating the
/// server-side narrowing of the live API.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    dir: PathBuf,
}

impl FixtureSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

async fn read_json_file<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

#[async_trait]
impl JobSource for FixtureSource {
    fn source_id(&self) -> &'static str {
        "fixture"
    }

    async fn query(
        &self,
        _ctx: &SourceContext,
        pair: Option<&FilterPair>,
    ) -> Result<Vec<RawJob>, SourceError> {
        let envelope: JobsEnvelope = read_json_file(&self.dir.join(JOBS_FIXTURE)).await?;
        let narrowed = match pair {
            Some(pair) if pair.key.query_param().is_some() => envelope
                .jobs
                .into_iter()
                .filter(|job| job.matches(pair))
                .collect(),
            _ => envelope.jobs,
        };
        Ok(narrowed)
    }

    async fn fetch_chips(&self, _ctx: &SourceContext) -> Result<Vec<RawChip>, SourceError> {
        let envelope: ChipsEnvelope = read_json_file(&self.dir.join(CATEGORIES_FIXTURE)).await?;
        Ok(envelope.jobs)
    }
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub jobs_endpoint: String,
    pub categories_endpoint: String,
    pub fixtures_dir: Option<PathBuf>,
    pub http: HttpClientConfig,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            jobs_endpoint: DEFAULT_JOBS_ENDPOINT.to_string(),
            categories_endpoint: DEFAULT_CATEGORIES_ENDPOINT.to_string(),
            fixtures_dir: None,
            http: HttpClientConfig::default(),
        }
    }
}

/// A fixtures directory wins over the HTTP endpoints.
pub fn source_from_settings(settings: &SourceSettings) -> anyhow::Result<Box<dyn JobSource>> {
    if let Some(dir) = &settings.fixtures_dir {
        return Ok(Box::new(FixtureSource::new(dir.clone())));
    }
    let http = HttpFetcher::new(settings.http.clone())?;
    Ok(Box::new(RemotiveSource::new(
        http,
        settings.jobs_endpoint.clone(),
        settings.categories_endpoint.clone(),
    )))
}
