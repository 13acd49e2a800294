//! Core domain model for the remote job board: entities, identity allocation and
//! the pure helpers shared by the gateway and the filter engine.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub const CRATE_NAME: &str = "rjb-core";

/// Size of the id space drawn from for kinds without a natural id.
pub const ID_SPACE: u64 = 10_000;

pub type JobId = u64;
pub type ChipId = u64;
pub type FilterId = u64;
pub type CategoryId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdKind {
    Job,
    Chip,
    Filter,
    Category,
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdKind::Job => "job",
            IdKind::Chip => "chip",
            IdKind::Filter => "filter",
            IdKind::Category => "category",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("{kind} ids must come from the source record")]
    MissingExternalId { kind: IdKind },
    #[error("no free {kind} id left below {}", ID_SPACE)]
    Exhausted { kind: IdKind },
}

/// Source of candidate ids for kinds that have no natural identity.
pub trait IdAllocator: Send {
    fn candidate(&mut self, kind: IdKind) -> u64;
}

#[derive(Debug)]
pub struct RandomIdAllocator {
    rng: StdRng,
}

impl RandomIdAllocator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator for RandomIdAllocator {
    fn candidate(&mut self, _kind: IdKind) -> u64 {
        self.rng.gen_range(0..ID_SPACE)
    }
}

/// Deterministic allocator handing out 0, 1, 2, ... (wrapping at [`ID_SPACE`]).
#[derive(Debug, Default)]
pub struct SequentialIdAllocator {
    next: u64,
}

impl SequentialIdAllocator {
    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }
}

impl IdAllocator for SequentialIdAllocator {
    fn candidate(&mut self, _kind: IdKind) -> u64 {
        let id = self.next % ID_SPACE;
        self.next = self.next.wrapping_add(1);
        id
    }
}

/// Per-kind registry of used ids. Only used to avoid collisions, never for lookup.
pub struct IdManager {
    used: HashMap<IdKind, HashSet<u64>>,
    allocator: Box<dyn IdAllocator>,
}

impl fmt::Debug for IdManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdManager").field("used", &self.used).finish_non_exhaustive()
    }
}

impl Default for IdManager {
    fn default() -> Self {
        Self::new(Box::new(RandomIdAllocator::new()))
    }
}

impl IdManager {
    pub fn new(allocator: Box<dyn IdAllocator>) -> Self {
        Self {
            used: HashMap::new(),
            allocator,
        }
    }

    /// Jobs and chips keep their external id; filters and categories keep a supplied
    /// id or get a fresh collision-free one.
    pub fn assign(&mut self, kind: IdKind, external: Option<u64>) -> Result<u64, IdError> {
        match (kind, external) {
            (_, Some(id)) => {
                self.used.entry(kind).or_default().insert(id);
                Ok(id)
            }
            (IdKind::Job | IdKind::Chip, None) => Err(IdError::MissingExternalId { kind }),
            (IdKind::Filter | IdKind::Category, None) => self.allocate(kind),
        }
    }

    pub fn is_registered(&self, kind: IdKind, id: u64) -> bool {
        self.used.get(&kind).is_some_and(|ids| ids.contains(&id))
    }

    pub fn registered(&self, kind: IdKind) -> usize {
        self.used.get(&kind).map_or(0, HashSet::len)
    }

    fn allocate(&mut self, kind: IdKind) -> Result<u64, IdError> {
        let used = self.used.entry(kind).or_default();
        let in_space = used.iter().filter(|id| **id < ID_SPACE).count() as u64;
        if in_space >= ID_SPACE {
            return Err(IdError::Exhausted { kind });
        }

        for _ in 0..ID_SPACE * 4 {
            let candidate = self.allocator.candidate(kind);
            if candidate < ID_SPACE && used.insert(candidate) {
                return Ok(candidate);
            }
        }

        // A misbehaving allocator must not spin forever.
        let free = (0..ID_SPACE)
            .find(|id| !used.contains(id))
            .ok_or(IdError::Exhausted { kind })?;
        used.insert(free);
        Ok(free)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown filter key `{0}`")]
pub struct UnknownFilterKey(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKey {
    Category,
    JobType,
    CandidateRequiredLocation,
    CompanyName,
    Tags,
    Salary,
    SearchByTitle,
    SearchByTag,
    SearchByLocation,
    SearchByCompany,
    SearchPartial,
}

impl FilterKey {
    /// Dimensions aggregated into categories, in display order.
    pub const DIMENSIONS: [FilterKey; 5] = [
        FilterKey::JobType,
        FilterKey::CompanyName,
        FilterKey::CandidateRequiredLocation,
        FilterKey::Tags,
        FilterKey::Salary,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterKey::Category => "category",
            FilterKey::JobType => "job_type",
            FilterKey::CandidateRequiredLocation => "candidate_required_location",
            FilterKey::CompanyName => "company_name",
            FilterKey::Tags => "tags",
            FilterKey::Salary => "salary",
            FilterKey::SearchByTitle => "search_by_title",
            FilterKey::SearchByTag => "search_by_tag",
            FilterKey::SearchByLocation => "search_by_location",
            FilterKey::SearchByCompany => "search_by_company",
            FilterKey::SearchPartial => "search_partial",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            FilterKey::Category => "Category",
            FilterKey::JobType => "Job Type",
            FilterKey::CandidateRequiredLocation => "Location",
            FilterKey::CompanyName => "Company Name",
            FilterKey::Tags => "Job Tags",
            FilterKey::Salary => "Salary",
            FilterKey::SearchByTitle
            | FilterKey::SearchByTag
            | FilterKey::SearchByLocation
            | FilterKey::SearchByCompany
            | FilterKey::SearchPartial => "Search",
        }
    }

    pub fn slug(self) -> String {
        self.as_str().to_ascii_lowercase().replace('_', "-")
    }

    /// Query parameter the job API filters on server-side; other keys are filtered
    /// client-side over the full corpus.
    pub fn query_param(self) -> Option<&'static str> {
        match self {
            FilterKey::Category | FilterKey::CompanyName => Some(self.as_str()),
            _ => None,
        }
    }

    pub fn is_search(self) -> bool {
        matches!(
            self,
            FilterKey::SearchByTitle
                | FilterKey::SearchByTag
                | FilterKey::SearchByLocation
                | FilterKey::SearchByCompany
                | FilterKey::SearchPartial
        )
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKey {
    type Err = UnknownFilterKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "category" => FilterKey::Category,
            "job_type" => FilterKey::JobType,
            "candidate_required_location" | "location" => FilterKey::CandidateRequiredLocation,
            "company_name" | "company" => FilterKey::CompanyName,
            "tags" | "tag" => FilterKey::Tags,
            "salary" => FilterKey::Salary,
            "search_by_title" => FilterKey::SearchByTitle,
            "search_by_tag" => FilterKey::SearchByTag,
            "search_by_location" => FilterKey::SearchByLocation,
            "search_by_company" => FilterKey::SearchByCompany,
            "search_partial" => FilterKey::SearchPartial,
            _ => return Err(UnknownFilterKey(s.to_string())),
        };
        Ok(key)
    }
}

/// A `(key, value)` constraint, the identity used for active-filter membership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterPair {
    pub key: FilterKey,
    pub value: String,
}

impl FilterPair {
    pub fn new(key: FilterKey, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    pub fn partial_search(term: &str) -> Self {
        Self::new(FilterKey::SearchPartial, format!("{SEARCH_LABEL}{term}"))
    }
}

impl fmt::Display for FilterPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub id_filter: FilterId,
    pub key: FilterKey,
    pub value: String,
}

impl Filter {
    pub fn new(id_filter: FilterId, key: FilterKey, value: impl Into<String>) -> Self {
        Self {
            id_filter,
            key,
            value: value.into(),
        }
    }

    pub fn from_pair(id_filter: FilterId, pair: FilterPair) -> Self {
        Self {
            id_filter,
            key: pair.key,
            value: pair.value,
        }
    }

    pub fn pair(&self) -> FilterPair {
        FilterPair::new(self.key, self.value.clone())
    }

    pub fn matches(&self, pair: &FilterPair) -> bool {
        self.key == pair.key && self.value == pair.value
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChip {
    pub id: ChipId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chip {
    pub id_chip: ChipId,
    pub name: String,
    pub slug: String,
}

impl Chip {
    pub fn from_raw(raw: &RawChip, ids: &mut IdManager) -> Result<Self, IdError> {
        Ok(Self {
            id_chip: ids.assign(IdKind::Chip, Some(raw.id))?,
            name: raw.name.clone(),
            slug: raw.slug.clone(),
        })
    }
}

const TITLE_LABEL: &str = "Title: ";
const TAG_LABEL: &str = "Tag: ";
const LOCATION_LABEL: &str = "Location: ";
const COMPANY_LABEL: &str = "Company: ";
const SEARCH_LABEL: &str = "Search: ";

/// Job record as returned by the job API.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawJob {
    pub id: JobId,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub company_logo: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub candidate_required_location: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl RawJob {
    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.candidate_required_location
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|loc| !loc.is_empty())
    }

    pub fn normalized_salary(&self) -> Option<String> {
        normalize_salary(self.salary.as_deref())
    }

    /// Client-side selection rule for `pair`.
    pub fn matches(&self, pair: &FilterPair) -> bool {
        let value = pair.value.as_str();
        match pair.key {
            FilterKey::Category => self.category.as_deref() == Some(value),
            FilterKey::JobType => self.job_type.as_deref() == Some(value),
            FilterKey::CompanyName => self.company_name.as_deref() == Some(value),
            FilterKey::CandidateRequiredLocation => self.locations().any(|loc| loc == value),
            FilterKey::Tags => self.tags.iter().any(|tag| tag == value),
            FilterKey::Salary => self.normalized_salary().as_deref() == Some(value),
            FilterKey::SearchByTitle => {
                labelled(TITLE_LABEL, self.title.as_deref()).as_deref() == Some(value)
            }
            FilterKey::SearchByTag => self
                .tags
                .iter()
                .any(|tag| labelled(TAG_LABEL, Some(tag.as_str())).as_deref() == Some(value)),
            FilterKey::SearchByLocation => {
                labelled(LOCATION_LABEL, self.candidate_required_location.as_deref()).as_deref()
                    == Some(value)
            }
            FilterKey::SearchByCompany => {
                labelled(COMPANY_LABEL, self.company_name.as_deref()).as_deref() == Some(value)
            }
            FilterKey::SearchPartial => value
                .strip_prefix(SEARCH_LABEL)
                .is_some_and(|term| self.partially_matches(term)),
        }
    }

    /// Case-insensitive exact match of `term` against title, tags, location or
    /// company, in that precedence. Returns the labelled search filter it produced.
    pub fn exact_search_match(&self, term: &str) -> Option<FilterPair> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        let eq = |field: &str| field.to_lowercase() == needle;

        if let Some(title) = self.title.as_deref().filter(|t| eq(t)) {
            return Some(FilterPair::new(FilterKey::SearchByTitle, format!("{TITLE_LABEL}{title}")));
        }
        if let Some(tag) = self.tags.iter().find(|t| eq(t)) {
            return Some(FilterPair::new(FilterKey::SearchByTag, format!("{TAG_LABEL}{tag}")));
        }
        if let Some(loc) = self.candidate_required_location.as_deref().filter(|l| eq(l)) {
            return Some(FilterPair::new(
                FilterKey::SearchByLocation,
                format!("{LOCATION_LABEL}{loc}"),
            ));
        }
        if let Some(company) = self.company_name.as_deref().filter(|c| eq(c)) {
            return Some(FilterPair::new(
                FilterKey::SearchByCompany,
                format!("{COMPANY_LABEL}{company}"),
            ));
        }
        None
    }

    pub fn partially_matches(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        let contains = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&needle));

        contains(self.title.as_deref())
            || self.tags.iter().any(|tag| contains(Some(tag.as_str())))
            || contains(self.candidate_required_location.as_deref())
            || contains(self.company_name.as_deref())
    }
}

fn labelled(label: &str, field: Option<&str>) -> Option<String> {
    field.map(|f| format!("{label}{f}"))
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Job {
    pub id_job: JobId,
    pub title: String,
    pub job_url: Option<String>,
    pub job_format: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub is_seen: bool,
    pub company_logo: Option<String>,
    pub posting_date: Option<String>,
    pub description: Option<String>,
    pub salary: Option<String>,
    pub tags: Vec<String>,
    pub filter_key: Option<FilterKey>,
    pub filter_value: Option<String>,
    /// Every active filter currently selecting this job; the first one is mirrored
    /// into `filter_key`/`filter_value`.
    #[serde(skip)]
    pub matched_by: Vec<FilterPair>,
}

impl Job {
    pub fn from_raw(
        raw: &RawJob,
        ids: &mut IdManager,
        origin: Option<FilterPair>,
    ) -> Result<Self, IdError> {
        let mut job = Self {
            id_job: ids.assign(IdKind::Job, Some(raw.id))?,
            title: raw.title.clone().unwrap_or_default(),
            job_url: raw.url.clone(),
            job_format: raw.job_type.clone(),
            company: raw.company_name.clone(),
            location: raw.candidate_required_location.clone(),
            is_seen: false,
            company_logo: raw.company_logo.clone(),
            posting_date: raw.publication_date.clone(),
            description: raw.description.clone(),
            salary: raw.normalized_salary(),
            tags: raw.tags.clone(),
            filter_key: None,
            filter_value: None,
            matched_by: Vec::new(),
        };
        if let Some(pair) = origin {
            job.attach(pair);
        }
        Ok(job)
    }

    pub fn origin(&self) -> Option<FilterPair> {
        match (self.filter_key, &self.filter_value) {
            (Some(key), Some(value)) => Some(FilterPair::new(key, value.clone())),
            _ => None,
        }
    }

    pub fn is_selected_by(&self, pair: &FilterPair) -> bool {
        self.matched_by.contains(pair)
    }

    pub fn attach(&mut self, pair: FilterPair) {
        if self.matched_by.is_empty() {
            self.filter_key = Some(pair.key);
            self.filter_value = Some(pair.value.clone());
        }
        if !self.matched_by.contains(&pair) {
            self.matched_by.push(pair);
        }
    }

    /// Drops `pair` from the selecting filters and re-attributes the job to the next
    /// one. Returns whether any filter still selects the job.
    pub fn detach(&mut self, pair: &FilterPair) -> bool {
        self.matched_by.retain(|p| p != pair);
        match self.matched_by.first() {
            Some(next) => {
                self.filter_key = Some(next.key);
                self.filter_value = Some(next.value.clone());
                true
            }
            None => {
                self.filter_key = None;
                self.filter_value = None;
                false
            }
        }
    }

    pub fn posted_on(&self) -> Option<NaiveDate> {
        let raw = self.posting_date.as_deref()?.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.date_naive());
        }
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
            return Some(ts.date());
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
    }

    pub fn formatted_posting_date(&self) -> Option<String> {
        self.posted_on().map(|d| d.format("%d %B %Y").to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id_category: CategoryId,
    pub key: FilterKey,
    pub key_slug: String,
    pub values: Vec<String>,
    pub description: String,
}

/// Builds one category per [`FilterKey::DIMENSIONS`] entry from the full corpus.
/// Values keep first-occurrence order.
pub fn aggregate_categories(
    corpus: &[RawJob],
    ids: &mut IdManager,
) -> Result<Vec<Category>, IdError> {
    FilterKey::DIMENSIONS
        .iter()
        .map(|&key| {
            let values = match key {
                FilterKey::CandidateRequiredLocation => unique_in_order(
                    corpus.iter().flat_map(|job| job.locations().map(str::to_string)),
                ),
                FilterKey::Salary => {
                    unique_in_order(corpus.iter().filter_map(RawJob::normalized_salary))
                }
                FilterKey::Tags => unique_in_order(corpus.iter().flat_map(|job| job.tags.clone())),
                FilterKey::JobType => {
                    unique_in_order(corpus.iter().filter_map(|job| job.job_type.clone()))
                }
                _ => unique_in_order(corpus.iter().filter_map(|job| job.company_name.clone())),
            };
            Ok(Category {
                id_category: ids.assign(IdKind::Category, None)?,
                key,
                key_slug: key.slug(),
                values,
                description: key.description().to_string(),
            })
        })
        .collect()
}

fn unique_in_order(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| !v.trim().is_empty())
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

fn salary_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"([$£€])?\s*(\d+(?:,\d{3})*)(?:\s*-\s*([$£€])?\s*(\d+(?:,\d{3})*))?")
            .expect("salary pattern compiles")
    })
}

/// Normalizes free-text salaries into `"<min>-<max><currency>"` or
/// `"<amount><currency>"`. The result is compared as a string, never as a number.
pub fn normalize_salary(input: Option<&str>) -> Option<String> {
    let text = input?.trim();
    if text.is_empty() {
        return None;
    }
    let caps = salary_pattern().captures(text)?;
    let currency = caps
        .get(1)
        .or_else(|| caps.get(3))
        .map_or("$", |m| m.as_str());
    let min = strip_separators(caps.get(2)?.as_str())?;

    match caps.get(4) {
        Some(max) => {
            let max = strip_separators(max.as_str())?;
            Some(format!("{min}-{max}{currency}"))
        }
        None => Some(format!("{min}{currency}")),
    }
}

fn strip_separators(number: &str) -> Option<u64> {
    number.replace(',', "").parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_matches('"') {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme `{other}`")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: JobId) -> RawJob {
        RawJob {
            id,
            title: Some(format!("Job {id}")),
            ..RawJob::default()
        }
    }

    /// Always proposes the same id, to exercise collision handling.
    struct StuckAllocator(u64);

    impl IdAllocator for StuckAllocator {
        fn candidate(&mut self, _kind: IdKind) -> u64 {
            self.0
        }
    }

    #[test]
    fn salary_examples_normalize() {
        assert_eq!(
            normalize_salary(Some("$50,000 - $70,000")).as_deref(),
            Some("50000-70000$")
        );
        assert_eq!(normalize_salary(Some("£40000")).as_deref(), Some("40000£"));
        assert_eq!(normalize_salary(Some("")), None);
        assert_eq!(normalize_salary(None), None);
    }

    #[test]
    fn salary_currency_falls_back_to_second_symbol_then_dollar() {
        assert_eq!(
            normalize_salary(Some("40,000 - €55,000 per year")).as_deref(),
            Some("40000-55000€")
        );
        assert_eq!(normalize_salary(Some("90000-120000")).as_deref(), Some("90000-120000$"));
        assert_eq!(normalize_salary(Some("Competitive")), None);
    }

    #[test]
    fn external_ids_are_registered_and_returned_unchanged() {
        let mut ids = IdManager::new(Box::new(SequentialIdAllocator::default()));
        assert_eq!(ids.assign(IdKind::Job, Some(1_234_567)).unwrap(), 1_234_567);
        assert_eq!(ids.assign(IdKind::Job, Some(1_234_567)).unwrap(), 1_234_567);
        assert_eq!(ids.registered(IdKind::Job), 1);
        assert!(ids.is_registered(IdKind::Job, 1_234_567));
        assert_eq!(
            ids.assign(IdKind::Chip, None),
            Err(IdError::MissingExternalId { kind: IdKind::Chip })
        );
    }

    #[test]
    fn allocated_ids_never_collide_within_a_kind() {
        let mut ids = IdManager::new(Box::new(StuckAllocator(7)));
        let first = ids.assign(IdKind::Filter, None).unwrap();
        let second = ids.assign(IdKind::Filter, None).unwrap();
        assert_eq!(first, 7);
        assert_ne!(first, second);
        // Kinds have independent registries.
        assert_eq!(ids.assign(IdKind::Category, None).unwrap(), 7);
    }

    #[test]
    fn random_allocator_stays_in_id_space() {
        let mut ids = IdManager::new(Box::new(RandomIdAllocator::seeded(42)));
        for _ in 0..200 {
            let id = ids.assign(IdKind::Filter, None).unwrap();
            assert!(id < ID_SPACE);
        }
        assert_eq!(ids.registered(IdKind::Filter), 200);
    }

    #[test]
    fn exhausted_id_space_is_an_error() {
        let mut ids = IdManager::new(Box::new(SequentialIdAllocator::default()));
        for _ in 0..ID_SPACE {
            ids.assign(IdKind::Category, None).unwrap();
        }
        assert_eq!(
            ids.assign(IdKind::Category, None),
            Err(IdError::Exhausted { kind: IdKind::Category })
        );
    }

    #[test]
    fn categories_follow_dimension_order_and_first_occurrence() {
        let mut a = raw(1);
        a.job_type = Some("full_time".into());
        a.company_name = Some("Acme".into());
        a.candidate_required_location = Some("USA, Canada".into());
        a.tags = vec!["rust".into(), "qa".into()];
        a.salary = Some("$50,000 - $70,000".into());

        let mut b = raw(2);
        b.job_type = Some("contract".into());
        b.company_name = Some("Acme".into());
        b.candidate_required_location = Some("Canada ,Worldwide".into());
        b.tags = vec!["qa".into(), "selenium".into()];
        b.salary = Some("competitive".into());

        let mut ids = IdManager::new(Box::new(SequentialIdAllocator::default()));
        let categories = aggregate_categories(&[a, b], &mut ids).unwrap();

        let keys: Vec<_> = categories.iter().map(|c| c.key).collect();
        assert_eq!(keys, FilterKey::DIMENSIONS.to_vec());
        assert_eq!(categories[0].values, vec!["full_time", "contract"]);
        assert_eq!(categories[1].values, vec!["Acme"]);
        assert_eq!(categories[2].values, vec!["USA", "Canada", "Worldwide"]);
        assert_eq!(categories[2].key_slug, "candidate-required-location");
        assert_eq!(categories[3].values, vec!["rust", "qa", "selenium"]);
        assert_eq!(categories[4].values, vec!["50000-70000$"]);
        assert_eq!(categories[4].description, "Salary");
    }

    #[test]
    fn raw_job_matching_rules() {
        let mut job = raw(9);
        job.title = Some("Senior QA Engineer".into());
        job.candidate_required_location = Some("USA, Canada".into());
        job.tags = vec!["selenium".into()];
        job.salary = Some("£40000".into());
        job.category = Some("QA".into());

        assert!(job.matches(&FilterPair::new(FilterKey::Category, "QA")));
        assert!(job.matches(&FilterPair::new(FilterKey::CandidateRequiredLocation, "Canada")));
        assert!(job.matches(&FilterPair::new(FilterKey::Tags, "selenium")));
        assert!(job.matches(&FilterPair::new(FilterKey::Salary, "40000£")));
        assert!(!job.matches(&FilterPair::new(FilterKey::JobType, "full_time")));
        assert!(job.matches(&FilterPair::new(FilterKey::SearchByTitle, "Title: Senior QA Engineer")));
        assert!(job.matches(&FilterPair::partial_search("qa eng")));
    }

    #[test]
    fn exact_search_prefers_title_over_tags() {
        let mut job = raw(3);
        job.title = Some("Rust".into());
        job.tags = vec!["rust".into()];
        assert_eq!(
            job.exact_search_match("RUST"),
            Some(FilterPair::new(FilterKey::SearchByTitle, "Title: Rust"))
        );
        assert_eq!(job.exact_search_match("   "), None);
    }

    #[test]
    fn job_projection_uses_camel_case_and_skips_match_set() {
        let mut ids = IdManager::new(Box::new(SequentialIdAllocator::default()));
        let mut source = raw(77);
        source.salary = Some("$1,000".into());
        source.publication_date = Some("2024-03-05T10:11:12".into());
        let job = Job::from_raw(
            &source,
            &mut ids,
            Some(FilterPair::new(FilterKey::Category, "QA")),
        )
        .unwrap();

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["idJob"], 77);
        assert_eq!(value["salary"], "1000$");
        assert_eq!(value["filterKey"], "category");
        assert_eq!(value["filterValue"], "QA");
        assert!(value.get("matchedBy").is_none());
        assert_eq!(job.formatted_posting_date().as_deref(), Some("05 March 2024"));

        let back: Job = serde_json::from_value(value).unwrap();
        assert!(back.matched_by.is_empty());
        assert_eq!(back.origin(), job.origin());
    }

    #[test]
    fn detach_retags_to_remaining_filter() {
        let qa = FilterPair::new(FilterKey::Category, "QA");
        let full_time = FilterPair::new(FilterKey::JobType, "full_time");
        let mut ids = IdManager::new(Box::new(SequentialIdAllocator::default()));
        let mut job = Job::from_raw(&raw(1), &mut ids, Some(qa.clone())).unwrap();
        job.attach(full_time.clone());
        job.attach(full_time.clone());
        assert_eq!(job.matched_by.len(), 2);

        assert!(job.detach(&qa));
        assert_eq!(job.origin(), Some(full_time.clone()));
        assert!(!job.detach(&full_time));
        assert_eq!(job.origin(), None);
    }

    #[test]
    fn filter_keys_parse_from_wire_names_and_aliases() {
        assert_eq!("job_type".parse::<FilterKey>().unwrap(), FilterKey::JobType);
        assert_eq!("location".parse::<FilterKey>().unwrap(), FilterKey::CandidateRequiredLocation);
        assert!("colour".parse::<FilterKey>().is_err());
        assert_eq!(FilterKey::CompanyName.query_param(), Some("company_name"));
        assert_eq!(FilterKey::Tags.query_param(), None);
    }

    #[test]
    fn null_tags_deserialize_as_empty() {
        let job: RawJob = serde_json::from_str(r#"{"id": 5, "tags": null}"#).unwrap();
        assert!(job.tags.is_empty());
        assert_eq!("\"dark\"".parse::<Theme>().unwrap(), Theme::Dark);
    }
}
