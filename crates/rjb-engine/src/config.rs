use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use rjb_api::{SourceSettings, DEFAULT_CATEGORIES_ENDPOINT, DEFAULT_JOBS_ENDPOINT};
use rjb_storage::{BackoffPolicy, HttpClientConfig};
use serde::Deserialize;
use tracing::warn;

use crate::JobCount;

pub const DEFAULT_CONFIG_FILE: &str = "rjb.yaml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub jobs_endpoint: String,
    pub categories_endpoint: String,
    pub storage_dir: PathBuf,
    pub fixtures_dir: Option<PathBuf>,
    pub job_count: usize,
    pub user_agent: String,
    pub http_timeout_secs: u64,
    pub http_max_retries: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            jobs_endpoint: DEFAULT_JOBS_ENDPOINT.to_string(),
            categories_endpoint: DEFAULT_CATEGORIES_ENDPOINT.to_string(),
            storage_dir: PathBuf::from("./.rjb"),
            fixtures_dir: None,
            job_count: JobCount::SEARCH.get(),
            user_agent: "rjb/0.1".to_string(),
            http_timeout_secs: 20,
            http_max_retries: BackoffPolicy::default().max_retries,
        }
    }
}

impl BoardConfig {
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Reads `path` (required to exist when given) or `rjb.yaml` in the current
    /// directory (optional), then applies `RJB_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_yaml_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        Ok(base.with_overrides(|name| std::env::var(name).ok()))
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("RJB_JOBS_ENDPOINT") {
            self.jobs_endpoint = v;
        }
        if let Some(v) = lookup("RJB_CATEGORIES_ENDPOINT") {
            self.categories_endpoint = v;
        }
        if let Some(v) = lookup("RJB_STORAGE_DIR") {
            self.storage_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("RJB_FIXTURES_DIR") {
            self.fixtures_dir = (!v.trim().is_empty()).then(|| PathBuf::from(v));
        }
        if let Some(v) = lookup("RJB_USER_AGENT") {
            self.user_agent = v;
        }
        parse_override(&lookup, "RJB_JOB_COUNT", &mut self.job_count);
        parse_override(&lookup, "RJB_HTTP_TIMEOUT_SECS", &mut self.http_timeout_secs);
        parse_override(&lookup, "RJB_HTTP_MAX_RETRIES", &mut self.http_max_retries);
        self
    }

    /// Configured job count, or the search default when it is out of range.
    pub fn job_count(&self) -> JobCount {
        JobCount::new(self.job_count).unwrap_or_else(|err| {
            warn!(error = %err, "configured job count ignored");
            JobCount::SEARCH
        })
    }

    pub fn source_settings(&self) -> SourceSettings {
        SourceSettings {
            jobs_endpoint: self.jobs_endpoint.clone(),
            categories_endpoint: self.categories_endpoint.clone(),
            fixtures_dir: self.fixtures_dir.clone(),
            http: HttpClientConfig {
                timeout: Duration::from_secs(self.http_timeout_secs),
                user_agent: Some(self.user_agent.clone()),
                backoff: BackoffPolicy {
                    max_retries: self.http_max_retries,
                    ..BackoffPolicy::default()
                },
                ..HttpClientConfig::default()
            },
        }
    }
}

fn parse_override<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    slot: &mut T,
) {
    let Some(raw) = lookup(name) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(_) => warn!(name, value = %raw, "ignoring unparsable override"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn yaml_fills_missing_fields_with_defaults() {
        let config = BoardConfig::from_yaml_str("job_count: 7\nfixtures_dir: fixtures/remotive\n")
            .unwrap();
        assert_eq!(config.job_count, 7);
        assert_eq!(config.fixtures_dir, Some(PathBuf::from("fixtures/remotive")));
        assert_eq!(config.jobs_endpoint, DEFAULT_JOBS_ENDPOINT);
        assert_eq!(BoardConfig::from_yaml_str("").unwrap(), BoardConfig::default());
    }

    #[test]
    fn env_overrides_win_and_bad_numbers_are_ignored() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("RJB_JOB_COUNT", "12"),
            ("RJB_HTTP_TIMEOUT_SECS", "soon"),
            ("RJB_STORAGE_DIR", "/tmp/rjb"),
            ("RJB_FIXTURES_DIR", ""),
        ]);
        let config = BoardConfig {
            fixtures_dir: Some(PathBuf::from("x")),
            ..BoardConfig::default()
        }
        .with_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.job_count, 12);
        assert_eq!(config.http_timeout_secs, 20);
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/rjb"));
        assert_eq!(config.fixtures_dir, None);
    }

    #[test]
    fn out_of_range_job_count_falls_back() {
        let config = BoardConfig {
            job_count: 99,
            ..BoardConfig::default()
        };
        assert_eq!(config.job_count(), JobCount::SEARCH);
        assert_eq!(config.source_settings().http.backoff.max_retries, 2);
    }

    #[test]
    fn unknown_yaml_shape_is_an_error() {
        assert!(BoardConfig::from_yaml_str("job_count: [1, 2]").is_err());
    }
}
