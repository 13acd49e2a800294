//! Filter/search orchestration for the job board: startup, the four-way filter
//! reconciliation, the search bar, seen/favorite/theme toggles and the error funnel.

mod config;
mod notice;
mod state;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rjb_api::{source_from_settings, JobSource, SourceContext, SourceError};
use rjb_core::{
    aggregate_categories, Category, Chip, Filter, FilterId, FilterKey, FilterPair, IdAllocator,
    IdError, IdKind, IdManager, Job, JobId, RawChip, RawJob, Theme,
};
use rjb_storage::{FileKeyValueStore, Preferences};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub use config::{BoardConfig, DEFAULT_CONFIG_FILE};
pub use notice::{ErrorKind, ErrorNotice, NoticeRegion, SuccessKind, SuccessNotice};
pub use state::{
    FavoriteRegistry, FilterState, Placeholder, SeenRegistry, StaleGeneration, ToggleOutcome,
    Transition,
};

pub const CRATE_NAME: &str = "rjb-engine";

/// Chip used for the random fallback when no chips are known.
pub const FALLBACK_CATEGORY: &str = "QA";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("job count must be between {} and {}, got `{input}`", JobCount::MIN, JobCount::MAX)]
pub struct InvalidJobCount {
    pub input: String,
}

/// Number of jobs requested per fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobCount(usize);

impl JobCount {
    pub const MIN: usize = 1;
    pub const MAX: usize = 30;
    pub const SEARCH: JobCount = JobCount(15);
    pub const LANDING: JobCount = JobCount(4);

    pub fn new(n: usize) -> Result<Self, InvalidJobCount> {
        if (Self::MIN..=Self::MAX).contains(&n) {
            Ok(Self(n))
        } else {
            Err(InvalidJobCount {
                input: n.to_string(),
            })
        }
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for JobCount {
    fn default() -> Self {
        Self::SEARCH
    }
}

impl FromStr for JobCount {
    type Err = InvalidJobCount;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        input
            .parse::<usize>()
            .ok()
            .and_then(|n| Self::new(n).ok())
            .ok_or_else(|| InvalidJobCount {
                input: input.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSource {
    Chip,
    Filter,
    Searchbar,
}

impl fmt::Display for SearchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchSource::Chip => "chip",
            SearchSource::Filter => "filter",
            SearchSource::Searchbar => "searchbar",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Clear the list and show `jobs`.
    Replace,
    /// Append `jobs` to what is shown.
    Adding,
    /// Show exactly `jobs`.
    Display,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderUpdate {
    pub jobs: Vec<Job>,
    pub categories: Vec<Category>,
    pub chips: Vec<Chip>,
    pub mode: RenderMode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Rendered(RenderUpdate),
    /// The fetch finished after another transition committed.
    Discarded { generation: u64 },
    NotFound,
    /// Blank search term.
    Ignored,
}

/// A user intent on a chip, a category value or the search bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEvent {
    pub source: SearchSource,
    pub pair: FilterPair,
    pub filter_id: Option<FilterId>,
    /// What the caller believes; only used to flag disagreement.
    pub is_currently_active: Option<bool>,
}

impl SearchEvent {
    pub fn new(source: SearchSource, key: FilterKey, value: impl Into<String>) -> Self {
        Self {
            source,
            pair: FilterPair::new(key, value),
            filter_id: None,
            is_currently_active: None,
        }
    }

    pub fn with_filter_id(mut self, id: FilterId) -> Self {
        self.filter_id = Some(id);
        self
    }

    pub fn with_active_hint(mut self, is_active: bool) -> Self {
        self.is_currently_active = Some(is_active);
        self
    }
}

/// Rendering side of the board. Called after state has been committed, never
/// while the state lock is held.
pub trait UiCollaborator: Send + Sync {
    fn update_ui(&self, update: &RenderUpdate);

    fn update_ui_selected(&self, _source: SearchSource, _pair: &FilterPair, _is_active: bool) {}

    fn display_error(&self, notice: &ErrorNotice);

    fn display_success(&self, _notice: &SuccessNotice) {}

    fn favorite_filters_changed(&self, _filters: &[Filter]) {}

    fn seen_jobs_changed(&self, _jobs: &[Job]) {}

    fn theme_changed(&self, _theme: Theme) {}
}

/// Collaborator that renders nothing.
#[derive(Debug, Default)]
pub struct NullUi;

impl UiCollaborator for NullUi {
    fn update_ui(&self, _update: &RenderUpdate) {}

    fn display_error(&self, _notice: &ErrorNotice) {}
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{kind}: {source}")]
    Source {
        kind: ErrorKind,
        #[source]
        source: SourceError,
    },
    #[error(transparent)]
    Id(#[from] IdError),
    #[error("{action}: {error:#}")]
    Storage {
        action: &'static str,
        error: anyhow::Error,
    },
    #[error("job {0} is not displayed or seen")]
    UnknownJob(JobId),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Source { kind, .. } => *kind,
            EngineError::Id(_) | EngineError::UnknownJob(_) => ErrorKind::HandleSearchingEvent,
            EngineError::Storage { .. } => ErrorKind::SavingPreferences,
        }
    }
}

struct Board {
    ids: IdManager,
    filters: FilterState,
    chips: Vec<Chip>,
    categories: Vec<Category>,
    favorites: FavoriteRegistry,
    seen: SeenRegistry,
    job_count: JobCount,
    theme: Theme,
    rng: StdRng,
}

impl Board {
    fn render(&self, jobs: Vec<Job>, mode: RenderMode) -> RenderUpdate {
        RenderUpdate {
            jobs,
            categories: self.categories.clone(),
            chips: self.chips.clone(),
            mode,
        }
    }

    /// Projects raw records into jobs tagged with `origin`, dropping repeated ids.
    fn project(&mut self, raw: &[RawJob], origin: &FilterPair) -> Result<Vec<Job>, IdError> {
        let tagged: Vec<(&RawJob, FilterPair)> = raw.iter().map(|r| (r, origin.clone())).collect();
        self.project_tagged(&tagged)
    }

    fn project_tagged(&mut self, raw: &[(&RawJob, FilterPair)]) -> Result<Vec<Job>, IdError> {
        let mut ids = HashSet::new();
        let mut jobs = Vec::with_capacity(raw.len());
        for (record, origin) in raw {
            if !ids.insert(record.id) {
                continue;
            }
            let mut job = Job::from_raw(record, &mut self.ids, Some(origin.clone()))?;
            job.is_seen = self.seen.contains(job.id_job);
            jobs.push(job);
        }
        Ok(jobs)
    }

    /// Registers `raw` chips and picks the landing category among them.
    fn install_chips(&mut self, raw: &[RawChip]) -> Result<FilterPair, IdError> {
        self.chips = raw
            .iter()
            .map(|raw| Chip::from_raw(raw, &mut self.ids))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FilterPair::new(FilterKey::Category, self.random_category(None)))
    }

    fn commit_landing(
        &mut self,
        generation: u64,
        corpus: &[RawJob],
        landing: &[RawJob],
        origin: FilterPair,
    ) -> Result<RenderUpdate, IdError> {
        let categories = aggregate_categories(corpus, &mut self.ids)?;
        let jobs = self.project(landing, &origin)?;
        let visible = match self.filters.commit_landing(generation, Placeholder { origin, jobs }) {
            Ok(jobs) => jobs.to_vec(),
            Err(stale) => {
                warn!(%stale, "landing view superseded");
                self.filters.visible_jobs().to_vec()
            }
        };
        self.categories = categories;
        Ok(self.render(visible, RenderMode::Replace))
    }

    /// Applies a fetched result for `transition`. The outer error is an id failure,
    /// the inner one a result that lost the race to a newer commit.
    fn commit_fetch(
        &mut self,
        transition: Transition,
        generation: u64,
        pair: &FilterPair,
        filter_id: Option<FilterId>,
        target: &FilterPair,
        raw: &[RawJob],
    ) -> Result<Result<(RenderUpdate, bool), StaleGeneration>, IdError> {
        let jobs = self.project(raw, target)?;
        let committed = match transition {
            Transition::First | Transition::Add => {
                let id = self.ids.assign(IdKind::Filter, filter_id)?;
                let filter = Filter::from_pair(id, pair.clone());
                if transition == Transition::First {
                    self.filters
                        .commit_first(generation, filter, jobs)
                        .map(|shown| (shown.to_vec(), RenderMode::Replace))
                } else {
                    self.filters
                        .commit_add(generation, filter, jobs)
                        .map(|added| (added, RenderMode::Adding))
                }
            }
            Transition::RemoveLast | Transition::RemoveOne => self
                .filters
                .commit_remove_last(
                    generation,
                    Placeholder {
                        origin: target.clone(),
                        jobs,
                    },
                )
                .map(|shown| (shown.to_vec(), RenderMode::Replace)),
        };
        Ok(committed.map(|(jobs, mode)| (self.render(jobs, mode), self.filters.is_active(pair))))
    }

    fn commit_search(
        &mut self,
        generation: u64,
        matches: &[(&RawJob, FilterPair)],
    ) -> Result<Result<RenderUpdate, StaleGeneration>, IdError> {
        let jobs = self.project_tagged(matches)?;

        let mut pairs: Vec<FilterPair> = Vec::new();
        for (_, pair) in matches {
            if !pairs.contains(pair) {
                pairs.push(pair.clone());
            }
        }
        let filters = pairs
            .into_iter()
            .map(|pair| {
                self.ids
                    .assign(IdKind::Filter, None)
                    .map(|id| Filter::from_pair(id, pair))
            })
            .collect::<Result<Vec<_>, IdError>>()?;

        let shown = self
            .filters
            .commit_replace(generation, filters, jobs)
            .map(|shown| shown.to_vec());
        Ok(shown.map(|shown| self.render(shown, RenderMode::Replace)))
    }

    fn random_category(&mut self, avoid: Option<&str>) -> String {
        let names: Vec<&str> = self.chips.iter().map(|c| c.name.as_str()).collect();
        let preferred: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| Some(*name) != avoid)
            .collect();
        let pool = if preferred.is_empty() { &names } else { &preferred };
        pool.choose(&mut self.rng)
            .map_or_else(|| FALLBACK_CATEGORY.to_string(), |name| name.to_string())
    }
}

pub struct Engine {
    session_id: Uuid,
    source: Box<dyn JobSource>,
    prefs: Preferences,
    ui: Arc<dyn UiCollaborator>,
    board: Mutex<Board>,
}

impl Engine {
    pub fn new(source: Box<dyn JobSource>, prefs: Preferences, ui: Arc<dyn UiCollaborator>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            source,
            prefs,
            ui,
            board: Mutex::new(Board {
                ids: IdManager::default(),
                filters: FilterState::new(),
                chips: Vec::new(),
                categories: Vec::new(),
                favorites: FavoriteRegistry::default(),
                seen: SeenRegistry::default(),
                job_count: JobCount::default(),
                theme: Theme::default(),
                rng: StdRng::from_entropy(),
            }),
        }
    }

    pub fn from_config(config: &BoardConfig, ui: Arc<dyn UiCollaborator>) -> anyhow::Result<Self> {
        let source = source_from_settings(&config.source_settings())?;
        let store = FileKeyValueStore::new(config.storage_dir.clone());
        let prefs = Preferences::new(Arc::new(store));
        let mut engine = Self::new(source, prefs, ui);
        engine.board.get_mut().job_count = config.job_count();
        Ok(engine)
    }

    pub fn with_id_allocator(mut self, allocator: Box<dyn IdAllocator>) -> Self {
        self.board.get_mut().ids = IdManager::new(allocator);
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.board.get_mut().rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// Logs `kind` and hands its notice to the UI.
    pub fn report_error(&self, kind: ErrorKind, code: Option<u16>, detail: &str) {
        if kind.is_blocking() {
            error!(session_id = %self.session_id, %kind, ?code, detail, "board error");
        } else {
            warn!(session_id = %self.session_id, %kind, ?code, detail, "board error");
        }
        self.ui.display_error(&ErrorNotice::new(kind, code, detail));
    }

    fn fail(&self, err: EngineError) -> EngineError {
        let code = match &err {
            EngineError::Source { source, .. } => source.code(),
            _ => None,
        };
        self.report_error(err.kind(), code, &err.to_string());
        err
    }

    /// Loads preferences, then chips, then categories and the landing jobs together.
    /// Nothing is committed unless every fetch succeeds.
    pub async fn initialize(&self) -> Result<RenderUpdate, EngineError> {
        info!(session_id = %self.session_id, source = self.source.source_id(), "initializing board");
        self.load_preferences().await;

        let generation = self.board.lock().await.filters.generation();
        let ctx = SourceContext::new(self.session_id, generation);

        let raw_chips = self
            .source
            .fetch_chips(&ctx)
            .await
            .map_err(|source| self.fail(EngineError::Source {
                kind: ErrorKind::Initialize,
                source,
            }))?;

        let installed = self.board.lock().await.install_chips(&raw_chips);
        let origin = installed.map_err(|err| self.fail(err.into()))?;

        let (corpus, landing) = tokio::try_join!(
            self.source.fetch_corpus(&ctx),
            self.source.fetch_jobs(&ctx, &origin, JobCount::LANDING.get()),
        )
        .map_err(|source| self.fail(EngineError::Source {
            kind: ErrorKind::Initialize,
            source,
        }))?;

        let committed = self
            .board
            .lock()
            .await
            .commit_landing(generation, &corpus, &landing, origin.clone());
        let update = committed.map_err(|err| self.fail(err.into()))?;

        info!(
            jobs = update.jobs.len(),
            categories = update.categories.len(),
            chips = update.chips.len(),
            landing = %origin,
            "board initialized"
        );
        self.ui.update_ui(&update);
        Ok(update)
    }

    async fn load_preferences(&self) {
        let seen = match self.prefs.load_seen_jobs().await {
            Ok(jobs) => jobs,
            Err(err) => {
                self.report_error(ErrorKind::GettingSeenJobs, None, &format!("{err:#}"));
                Vec::new()
            }
        };
        let favorites = match self.prefs.load_favorite_filters().await {
            Ok(filters) => filters,
            Err(err) => {
                self.report_error(ErrorKind::GettingFavorites, None, &format!("{err:#}"));
                Vec::new()
            }
        };
        let theme = self.prefs.load_theme().await.unwrap_or_else(|err| {
            let detail = format!("{err:#}");
            warn!(error = %detail, "stored theme ignored");
            Theme::default()
        });

        let (seen, favorites) = {
            let mut board = self.board.lock().await;
            for job in &seen {
                board.ids.assign(IdKind::Job, Some(job.id_job)).ok();
            }
            for filter in &favorites {
                board.ids.assign(IdKind::Filter, Some(filter.id_filter)).ok();
            }
            board.seen = SeenRegistry::from_saved(seen);
            board.favorites = FavoriteRegistry::from_saved(favorites);
            board.theme = theme;
            (board.seen.jobs().to_vec(), board.favorites.filters().to_vec())
        };
        debug!(
            seen = seen.len(),
            favorites = favorites.len(),
            theme = theme.as_str(),
            "preferences loaded"
        );
        self.ui.seen_jobs_changed(&seen);
        self.ui.favorite_filters_changed(&favorites);
        self.ui.theme_changed(theme);
    }

    /// Applies a chip, category or search-bar selection.
    pub async fn handle_search_event(&self, event: SearchEvent) -> Result<SearchOutcome, EngineError> {
        let SearchEvent {
            source,
            pair,
            filter_id,
            is_currently_active,
        } = event;

        let (transition, generation, count, removed) = {
            let mut board = self.board.lock().await;
            let is_active = board.filters.is_active(&pair);
            if let Some(hint) = is_currently_active.filter(|hint| *hint != is_active) {
                warn!(%pair, hint, is_active, "caller disagrees on filter membership");
            }
            let transition = board.filters.classify(&pair);
            let count = board.job_count;
            if transition == Transition::RemoveOne {
                let survivors = board.filters.remove_one(&pair).to_vec();
                let update = board.render(survivors, RenderMode::Display);
                (transition, board.filters.generation(), count, Some(update))
            } else {
                (transition, board.filters.generation(), count, None)
            }
        };
        debug!(%source, %pair, ?transition, generation, "search event");

        if let Some(update) = removed {
            return Ok(self.rendered(source, &pair, false, update));
        }

        let ctx = SourceContext::new(self.session_id, generation);
        let target = match transition {
            Transition::RemoveLast => {
                let name = self.board.lock().await.random_category(Some(&pair.value));
                FilterPair::new(FilterKey::Category, name)
            }
            _ => pair.clone(),
        };

        let raw = self
            .source
            .fetch_jobs(&ctx, &target, count.get())
            .await
            .map_err(|source| self.fail(EngineError::Source {
                kind: ErrorKind::FetchingJobs,
                source,
            }))?;

        let committed = self.board.lock().await.commit_fetch(
            transition,
            generation,
            &pair,
            filter_id,
            &target,
            &raw,
        );
        let committed = committed.map_err(|err| self.fail(err.into()))?;

        match committed {
            Ok((update, is_active)) => Ok(self.rendered(source, &pair, is_active, update)),
            Err(stale) => {
                warn!(%pair, %stale, "discarding stale result");
                Ok(SearchOutcome::Discarded {
                    generation: stale.issued,
                })
            }
        }
    }

    fn rendered(
        &self,
        source: SearchSource,
        pair: &FilterPair,
        is_active: bool,
        update: RenderUpdate,
    ) -> SearchOutcome {
        self.ui.update_ui_selected(source, pair, is_active);
        self.ui.update_ui(&update);
        SearchOutcome::Rendered(update)
    }

    /// Search bar: known category values and chip names become a regular selection,
    /// anything else runs an advanced search over the corpus.
    pub async fn search(&self, term: &str) -> Result<SearchOutcome, EngineError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(SearchOutcome::Ignored);
        }

        let (known, generation, count) = {
            let board = self.board.lock().await;
            let known = board
                .categories
                .iter()
                .find_map(|category| {
                    category
                        .values
                        .iter()
                        .find(|value| value.eq_ignore_ascii_case(term))
                        .map(|value| FilterPair::new(category.key, value.clone()))
                })
                .or_else(|| {
                    board
                        .chips
                        .iter()
                        .find(|chip| chip.name.eq_ignore_ascii_case(term))
                        .map(|chip| FilterPair::new(FilterKey::Category, chip.name.clone()))
                });
            (known, board.filters.generation(), board.job_count)
        };

        if let Some(pair) = known {
            debug!(term, %pair, "search term names a known filter");
            let event = SearchEvent {
                source: SearchSource::Searchbar,
                pair,
                filter_id: None,
                is_currently_active: None,
            };
            return self.handle_search_event(event).await;
        }

        let ctx = SourceContext::new(self.session_id, generation);
        let corpus = self
            .source
            .fetch_corpus(&ctx)
            .await
            .map_err(|source| self.fail(EngineError::Source {
                kind: ErrorKind::FetchingJobs,
                source,
            }))?;

        let matches = advanced_matches(&corpus, term, count.get());
        if matches.is_empty() {
            self.report_error(ErrorKind::SearchNotFound, None, term);
            return Ok(SearchOutcome::NotFound);
        }

        let committed = self.board.lock().await.commit_search(generation, &matches);
        let committed = committed.map_err(|err| self.fail(err.into()))?;

        match committed {
            Ok(update) => {
                info!(term, jobs = update.jobs.len(), "advanced search matched");
                self.ui.update_ui(&update);
                self.ui
                    .display_success(&SuccessNotice::new(SuccessKind::SearchSuccess));
                Ok(SearchOutcome::Rendered(update))
            }
            Err(stale) => {
                warn!(term, %stale, "discarding stale search result");
                Ok(SearchOutcome::Discarded {
                    generation: stale.issued,
                })
            }
        }
    }

    /// Flips the seen mark of a displayed, placeholder or already-seen job.
    pub async fn toggle_seen(&self, job_id: JobId) -> Result<ToggleOutcome, EngineError> {
        let (outcome, seen) = {
            let mut board = self.board.lock().await;
            let job = board
                .filters
                .find_job(job_id)
                .or_else(|| board.seen.get(job_id))
                .cloned()
                .ok_or(EngineError::UnknownJob(job_id))?;
            let outcome = board.seen.toggle(job);
            board
                .filters
                .mark_seen(job_id, outcome == ToggleOutcome::Added);
            (outcome, board.seen.jobs().to_vec())
        };

        info!(job_id, ?outcome, "seen toggled");
        self.prefs
            .save_seen_jobs(&seen)
            .await
            .map_err(|error| self.fail(EngineError::Storage {
                action: "saving seen jobs",
                error,
            }))?;
        self.ui.seen_jobs_changed(&seen);
        Ok(outcome)
    }

    /// Removes a favorite with the same id or `(key, value)`, otherwise adds one.
    pub async fn toggle_favorite(
        &self,
        filter_id: Option<FilterId>,
        key: FilterKey,
        value: &str,
    ) -> Result<ToggleOutcome, EngineError> {
        let pair = FilterPair::new(key, value);
        let toggled = {
            let mut board = self.board.lock().await;
            let board = &mut *board;
            let outcome = match board.favorites.position(filter_id, &pair) {
                Some(index) => {
                    board.favorites.remove_at(index);
                    Ok(ToggleOutcome::Removed)
                }
                None => board.ids.assign(IdKind::Filter, filter_id).map(|id| {
                    board.favorites.add(Filter::from_pair(id, pair.clone()));
                    ToggleOutcome::Added
                }),
            };
            outcome.map(|outcome| (outcome, board.favorites.filters().to_vec()))
        };
        let (outcome, favorites) = toggled.map_err(|err| self.fail(err.into()))?;

        info!(%pair, ?outcome, "favorite toggled");
        self.prefs
            .save_favorite_filters(&favorites)
            .await
            .map_err(|error| self.fail(EngineError::Storage {
                action: "saving favorite filters",
                error,
            }))?;
        self.ui.favorite_filters_changed(&favorites);
        Ok(outcome)
    }

    /// Accepts `1..=30`; anything else is reported and the search default applies.
    pub async fn set_job_count(&self, input: &str) -> JobCount {
        let count = input.parse::<JobCount>().unwrap_or_else(|err| {
            self.report_error(ErrorKind::JobCountInvalid, None, &err.to_string());
            JobCount::SEARCH
        });
        self.board.lock().await.job_count = count;
        count
    }

    pub async fn toggle_theme(&self) -> Result<Theme, EngineError> {
        let theme = {
            let mut board = self.board.lock().await;
            board.theme = board.theme.toggled();
            board.theme
        };
        self.prefs
            .save_theme(theme)
            .await
            .map_err(|error| self.fail(EngineError::Storage {
                action: "saving theme",
                error,
            }))?;
        self.ui.theme_changed(theme);
        Ok(theme)
    }

    /// Clears one stored preference (or all of them) and the matching in-memory state.
    pub async fn clear(&self, key: Option<&str>) -> Result<(), EngineError> {
        self.prefs
            .clear(key)
            .await
            .map_err(|error| self.fail(EngineError::Storage {
                action: "clearing preferences",
                error,
            }))?;

        let all = key.is_none();
        let (seen, favorites) = {
            let mut board = self.board.lock().await;
            if all || key == Some(rjb_storage::SEEN_JOBS_KEY) {
                board.seen.clear();
                board.filters.clear_seen();
            }
            if all || key == Some(rjb_storage::FAVORITE_FILTERS_KEY) {
                board.favorites.clear();
            }
            if all || key == Some(rjb_storage::THEME_KEY) {
                board.theme = Theme::default();
            }
            (board.seen.jobs().to_vec(), board.favorites.filters().to_vec())
        };
        info!(key = key.unwrap_or("*"), "preferences cleared");
        self.ui.seen_jobs_changed(&seen);
        self.ui.favorite_filters_changed(&favorites);
        Ok(())
    }

    pub async fn active_filters(&self) -> Vec<Filter> {
        self.board.lock().await.filters.active().to_vec()
    }

    pub async fn displayed_jobs(&self) -> Vec<Job> {
        self.board.lock().await.filters.displayed().to_vec()
    }

    pub async fn visible_jobs(&self) -> Vec<Job> {
        self.board.lock().await.filters.visible_jobs().to_vec()
    }

    pub async fn placeholder(&self) -> Option<Placeholder> {
        self.board.lock().await.filters.placeholder().cloned()
    }

    pub async fn favorite_filters(&self) -> Vec<Filter> {
        self.board.lock().await.favorites.filters().to_vec()
    }

    pub async fn seen_jobs(&self) -> Vec<Job> {
        self.board.lock().await.seen.jobs().to_vec()
    }

    pub async fn chips(&self) -> Vec<Chip> {
        self.board.lock().await.chips.clone()
    }

    pub async fn categories(&self) -> Vec<Category> {
        self.board.lock().await.categories.clone()
    }

    pub async fn job_count(&self) -> JobCount {
        self.board.lock().await.job_count
    }

    pub async fn theme(&self) -> Theme {
        self.board.lock().await.theme
    }

    pub async fn generation(&self) -> u64 {
        self.board.lock().await.filters.generation()
    }

    pub async fn is_consistent(&self) -> bool {
        self.board.lock().await.filters.is_consistent()
    }
}

/// Every exact match (title, tag, location, company), then partial matches
/// filling up to `limit` records. Exact matches are never truncated.
fn advanced_matches<'a>(corpus: &'a [RawJob], term: &str, limit: usize) -> Vec<(&'a RawJob, FilterPair)> {
    let mut matches: Vec<_> = corpus
        .iter()
        .filter_map(|job| job.exact_search_match(term).map(|pair| (job, pair)))
        .collect();
    let room = limit.saturating_sub(matches.len());
    matches.extend(
        corpus
            .iter()
            .filter(|job| job.exact_search_match(term).is_none() && job.partially_matches(term))
            .map(|job| (job, FilterPair::partial_search(term)))
            .take(room),
    );
    matches
}
