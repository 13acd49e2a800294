//! HTTP fetch utilities, the durable key-value store and the preferences gateway
//! (seen jobs, favorite filters, theme) built on top of it.

use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use rjb_core::{Filter, Job, Theme};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

pub const CRATE_NAME: &str = "rjb-storage";

pub const SEEN_JOBS_KEY: &str = "seenJobs";
pub const FAVORITE_FILTERS_KEY: &str = "favoriteFilters";
pub const THEME_KEY: &str = "theme";

/// Every key the board writes. Clearing all preferences touches only these.
pub const PREFERENCE_KEYS: [&str; 3] = [SEEN_JOBS_KEY, FAVORITE_FILTERS_KEY, THEME_KEY];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retryable,
    NonRetryable,
}

pub fn classify_status(status: StatusCode) -> RetryDisposition {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

pub fn classify_reqwest_error(err: &reqwest::Error) -> RetryDisposition {
    if err.is_timeout() || err.is_connect() {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

/// Transport-level retry policy. Failed user events are never replayed; only a
/// single request is retried on transient transport faults.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl BackoffPolicy {
    pub fn delay_for_attempt(&self, attempt_index: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt_index as u32).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor);
        delay.min(self.max_delay)
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub max_in_flight: usize,
    pub backoff: BackoffPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: None,
            max_in_flight: 4,
            backoff: BackoffPolicy::default(),
        }
    }
}

#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    in_flight: Arc<Semaphore>,
    backoff: BackoffPolicy,
}

#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: StatusCode,
    pub final_url: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("decoding response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("http fetcher is shut down")]
    Closed,
}

impl FetchError {
    /// Numeric code surfaced in diagnostics (HTTP status when there is one).
    pub fn code(&self) -> Option<u16> {
        match self {
            FetchError::HttpStatus { status, .. } => Some(*status),
            FetchError::Request(err) => err.status().map(|s| s.as_u16()),
            FetchError::Decode { .. } | FetchError::Closed => None,
        }
    }
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().context("building reqwest client")?;

        Ok(Self {
            client,
            in_flight: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            backoff: config.backoff,
        })
    }

    pub async fn fetch_bytes(
        &self,
        session_id: Uuid,
        url: &str,
    ) -> Result<FetchedResponse, FetchError> {
        let span = info_span!("http_fetch", %session_id, url);
        self.fetch_with_retries(url).instrument(span).await
    }

    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        session_id: Uuid,
        url: &str,
    ) -> Result<T, FetchError> {
        let response = self.fetch_bytes(session_id, url).await?;
        serde_json::from_slice(&response.body).map_err(|source| FetchError::Decode {
            url: response.final_url,
            source,
        })
    }

    async fn fetch_with_retries(&self, url: &str) -> Result<FetchedResponse, FetchError> {
        let _permit = self
            .in_flight
            .acquire()
            .await
            .map_err(|_| FetchError::Closed)?;

        let mut attempt = 0usize;
        loop {
            match self.client.get(url).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let final_url = resp.url().to_string();

                    if status.is_success() {
                        let body = resp.bytes().await?.to_vec();
                        debug!(status = status.as_u16(), bytes = body.len(), "fetched");
                        return Ok(FetchedResponse {
                            status,
                            final_url,
                            body,
                        });
                    }

                    if classify_status(status) == RetryDisposition::Retryable
                        && attempt < self.backoff.max_retries
                    {
                        warn!(status = status.as_u16(), attempt, "retrying after http status");
                        tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
                        attempt += 1;
                        continue;
                    }

                    return Err(FetchError::HttpStatus {
                        status: status.as_u16(),
                        url: final_url,
                    });
                }
                Err(err) => {
                    if classify_reqwest_error(&err) == RetryDisposition::Retryable
                        && attempt < self.backoff.max_retries
                    {
                        warn!(error = %err, attempt, "retrying after transport error");
                        tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(FetchError::Request(err));
                }
            }
        }
    }
}

/// Durable string key-value storage. A missing key is `Ok(None)`, never an error.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    async fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// One `<key>.json` file per key under `root`, written through an atomic
/// temp-file rename.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        anyhow::ensure!(valid, "invalid storage key `{key}`");
        Ok(self.root.join(format!("{key}.json")))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("reading {}", path.display())),
        }
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("creating storage directory {}", self.root.display()))?;

        let temp_path = self
            .root
            .join(format!(".{}.{}.tmp", Uuid::new_v4(), value.len()));
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await
            .with_context(|| format!("opening temp file {}", temp_path.display()))?;
        file.write_all(value.as_bytes())
            .await
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;
        file.flush()
            .await
            .with_context(|| format!("flushing temp file {}", temp_path.display()))?;
        drop(file);

        if let Err(err) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(err).with_context(|| {
                format!(
                    "atomically renaming {} -> {}",
                    temp_path.display(),
                    path.display()
                )
            });
        }
        debug!(key, bytes = value.len(), "stored");
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("removing {}", path.display())),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// Persistence gateway for user state. Collections are deduplicated by id before
/// every write.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load_seen_jobs(&self) -> anyhow::Result<Vec<Job>> {
        self.load_list(SEEN_JOBS_KEY).await
    }

    /// Returns how many jobs were written.
    pub async fn save_seen_jobs(&self, jobs: &[Job]) -> anyhow::Result<usize> {
        let unique = dedup_by(jobs, |job| job.id_job);
        self.save_list(SEEN_JOBS_KEY, &unique).await?;
        Ok(unique.len())
    }

    pub async fn load_favorite_filters(&self) -> anyhow::Result<Vec<Filter>> {
        self.load_list(FAVORITE_FILTERS_KEY).await
    }

    /// Returns how many filters were written.
    pub async fn save_favorite_filters(&self, filters: &[Filter]) -> anyhow::Result<usize> {
        let unique = dedup_by(filters, |filter| filter.id_filter);
        self.save_list(FAVORITE_FILTERS_KEY, &unique).await?;
        Ok(unique.len())
    }

    pub async fn load_theme(&self) -> anyhow::Result<Theme> {
        match self.store.get(THEME_KEY).await? {
            Some(raw) => raw.parse().map_err(anyhow::Error::msg),
            None => Ok(Theme::default()),
        }
    }

    pub async fn save_theme(&self, theme: Theme) -> anyhow::Result<()> {
        self.store.set(THEME_KEY, theme.as_str()).await
    }

    /// Removes one key, or every key in [`PREFERENCE_KEYS`] when `target` is `None`.
    /// Other entries sharing the store are left alone.
    pub async fn clear(&self, target: Option<&str>) -> anyhow::Result<()> {
        match target {
            Some(key) => self.store.remove(key).await,
            None => {
                for key in PREFERENCE_KEYS {
                    self.store.remove(key).await?;
                }
                Ok(())
            }
        }
    }

    async fn load_list<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Vec<T>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(Vec::new());
        };
        let parsed: Option<Vec<T>> =
            serde_json::from_str(&raw).with_context(|| format!("parsing stored `{key}`"))?;
        Ok(parsed.unwrap_or_default())
    }

    async fn save_list<T: Serialize>(&self, key: &str, items: &[&T]) -> anyhow::Result<()> {
        let json = serde_json::to_string(items).with_context(|| format!("serializing `{key}`"))?;
        self.store.set(key, &json).await
    }
}

fn dedup_by<T, K: Hash + Eq>(items: &[T], id: impl Fn(&T) -> K) -> Vec<&T> {
    let mut seen = HashSet::new();
    items.iter().filter(|item| seen.insert(id(*item))).collect()
}
