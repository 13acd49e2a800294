//! Filter state machine plus the favorite and seen registries. Everything here is
//! synchronous; fetching happens in [`crate::Engine`] outside the lock.

use std::collections::HashSet;

use rjb_core::{Filter, FilterId, FilterPair, Job, JobId};
use serde::Serialize;
use thiserror::Error;

/// Which of the four reconciliation rules an event falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    First,
    RemoveLast,
    RemoveOne,
    Add,
}

impl Transition {
    pub fn needs_fetch(self) -> bool {
        !matches!(self, Transition::RemoveOne)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("result issued at generation {issued} is stale (state is at {current})")]
pub struct StaleGeneration {
    pub issued: u64,
    pub current: u64,
}

/// Jobs shown while no filter is active.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub origin: FilterPair,
    pub jobs: Vec<Job>,
}

#[derive(Debug, Default)]
pub struct FilterState {
    active: Vec<Filter>,
    displayed: Vec<Job>,
    placeholder: Option<Placeholder>,
    generation: u64,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn active(&self) -> &[Filter] {
        &self.active
    }

    pub fn active_pairs(&self) -> Vec<FilterPair> {
        self.active.iter().map(Filter::pair).collect()
    }

    pub fn displayed(&self) -> &[Job] {
        &self.displayed
    }

    pub fn placeholder(&self) -> Option<&Placeholder> {
        self.placeholder.as_ref()
    }

    /// The filtered list, or the placeholder jobs when nothing is selected.
    pub fn visible_jobs(&self) -> &[Job] {
        match (&self.placeholder, self.active.is_empty()) {
            (Some(placeholder), true) => &placeholder.jobs,
            _ => &self.displayed,
        }
    }

    pub fn is_active(&self, pair: &FilterPair) -> bool {
        self.active.iter().any(|f| f.matches(pair))
    }

    pub fn classify(&self, pair: &FilterPair) -> Transition {
        match (self.active.len(), self.is_active(pair)) {
            (0, _) => Transition::First,
            (1, true) => Transition::RemoveLast,
            (_, true) => Transition::RemoveOne,
            (_, false) => Transition::Add,
        }
    }

    fn check(&self, issued: u64) -> Result<(), StaleGeneration> {
        if issued == self.generation {
            Ok(())
        } else {
            Err(StaleGeneration {
                issued,
                current: self.generation,
            })
        }
    }

    fn bump(&mut self) {
        self.generation += 1;
    }

    /// Landing view: no active filters, `placeholder` shown.
    pub fn commit_landing(
        &mut self,
        issued: u64,
        placeholder: Placeholder,
    ) -> Result<&[Job], StaleGeneration> {
        self.check(issued)?;
        self.active.clear();
        self.displayed.clear();
        self.placeholder = Some(placeholder);
        self.bump();
        Ok(self.visible_jobs())
    }

    pub fn commit_first(
        &mut self,
        issued: u64,
        filter: Filter,
        jobs: Vec<Job>,
    ) -> Result<&[Job], StaleGeneration> {
        self.check(issued)?;
        self.active = vec![filter];
        self.displayed = jobs;
        self.placeholder = None;
        self.bump();
        Ok(&self.displayed)
    }

    /// The sole filter goes away; `placeholder` holds the random-category jobs.
    pub fn commit_remove_last(
        &mut self,
        issued: u64,
        placeholder: Placeholder,
    ) -> Result<&[Job], StaleGeneration> {
        self.commit_landing(issued, placeholder)
    }

    /// Drops `pair` without fetching. Returns the surviving displayed jobs.
    pub fn remove_one(&mut self, pair: &FilterPair) -> &[Job] {
        self.active.retain(|f| !f.matches(pair));
        self.displayed.retain_mut(|job| job.detach(pair));
        self.bump();
        &self.displayed
    }

    /// Appends `filter`; jobs already displayed gain the pair. Returns only the jobs
    /// that were not displayed before.
    pub fn commit_add(
        &mut self,
        issued: u64,
        filter: Filter,
        jobs: Vec<Job>,
    ) -> Result<Vec<Job>, StaleGeneration> {
        self.check(issued)?;
        let pair = filter.pair();
        self.active.push(filter);

        let mut added = Vec::new();
        for job in jobs {
            match self.displayed.iter_mut().find(|shown| shown.id_job == job.id_job) {
                Some(shown) => shown.attach(pair.clone()),
                None => {
                    let mut job = job;
                    job.attach(pair.clone());
                    added.push(job.clone());
                    self.displayed.push(job);
                }
            }
        }
        self.bump();
        Ok(added)
    }

    /// Search-bar results replace everything.
    pub fn commit_replace(
        &mut self,
        issued: u64,
        filters: Vec<Filter>,
        jobs: Vec<Job>,
    ) -> Result<&[Job], StaleGeneration> {
        self.check(issued)?;
        self.active = filters;
        self.displayed = jobs;
        self.placeholder = None;
        self.bump();
        Ok(&self.displayed)
    }

    pub fn find_job(&self, id: JobId) -> Option<&Job> {
        self.displayed
            .iter()
            .chain(self.placeholder.iter().flat_map(|p| p.jobs.iter()))
            .find(|job| job.id_job == id)
    }

    pub fn mark_seen(&mut self, id: JobId, seen: bool) {
        let placeholder_jobs = self.placeholder.iter_mut().flat_map(|p| p.jobs.iter_mut());
        for job in self.displayed.iter_mut().chain(placeholder_jobs) {
            if job.id_job == id {
                job.is_seen = seen;
            }
        }
    }

    pub fn clear_seen(&mut self) {
        let placeholder_jobs = self.placeholder.iter_mut().flat_map(|p| p.jobs.iter_mut());
        for job in self.displayed.iter_mut().chain(placeholder_jobs) {
            job.is_seen = false;
        }
    }

    /// No duplicate active pairs, and every displayed job is selected by a
    /// non-empty subset of them.
    pub fn is_consistent(&self) -> bool {
        let pairs: Vec<FilterPair> = self.active_pairs();
        let unique: HashSet<&FilterPair> = pairs.iter().collect();
        if unique.len() != pairs.len() {
            return false;
        }
        self.displayed.iter().all(|job| {
            !job.matched_by.is_empty() && job.matched_by.iter().all(|p| unique.contains(p))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ToggleOutcome {
    Added,
    Removed,
}

#[derive(Debug, Clone, Default)]
pub struct FavoriteRegistry {
    filters: Vec<Filter>,
}

impl FavoriteRegistry {
    pub fn from_saved(saved: Vec<Filter>) -> Self {
        let mut ids = HashSet::new();
        let filters = saved
            .into_iter()
            .filter(|f| ids.insert(f.id_filter))
            .collect();
        Self { filters }
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn contains(&self, pair: &FilterPair) -> bool {
        self.filters.iter().any(|f| f.matches(pair))
    }

    /// Position of a favorite with the same id or the same `(key, value)`.
    pub fn position(&self, id: Option<FilterId>, pair: &FilterPair) -> Option<usize> {
        self.filters
            .iter()
            .position(|f| Some(f.id_filter) == id || f.matches(pair))
    }

    pub fn remove_at(&mut self, index: usize) -> Filter {
        self.filters.remove(index)
    }

    pub fn add(&mut self, filter: Filter) {
        if self.filters.iter().all(|f| f.id_filter != filter.id_filter) {
            self.filters.push(filter);
        }
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }
}

#[derive(Debug, Clone, Default)]
pub struct SeenRegistry {
    jobs: Vec<Job>,
}

impl SeenRegistry {
    pub fn from_saved(saved: Vec<Job>) -> Self {
        let mut ids = HashSet::new();
        let jobs = saved
            .into_iter()
            .filter(|j| ids.insert(j.id_job))
            .map(|mut j| {
                j.is_seen = true;
                j
            })
            .collect();
        Self { jobs }
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.jobs.iter().any(|j| j.id_job == id)
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id_job == id)
    }

    pub fn toggle(&mut self, job: Job) -> ToggleOutcome {
        match self.jobs.iter().position(|j| j.id_job == job.id_job) {
            Some(index) => {
                self.jobs.remove(index);
                ToggleOutcome::Removed
            }
            None => {
                let mut job = job;
                job.is_seen = true;
                job.matched_by.clear();
                self.jobs.push(job);
                ToggleOutcome::Added
            }
        }
    }

    pub fn clear(&mut self) {
        self.jobs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rjb_core::FilterKey;

    fn pair(key: FilterKey, value: &str) -> FilterPair {
        FilterPair::new(key, value)
    }

    fn job(id: JobId, origin: &FilterPair) -> Job {
        let mut job = Job {
            id_job: id,
            title: format!("Job {id}"),
            ..Job::default()
        };
        job.attach(origin.clone());
        job
    }

    fn ids(jobs: &[Job]) -> Vec<JobId> {
        jobs.iter().map(|j| j.id_job).collect()
    }

    #[test]
    fn classification_follows_rule_order() {
        let qa = pair(FilterKey::Category, "QA");
        let ft = pair(FilterKey::JobType, "full_time");
        let mut state = FilterState::new();
        assert_eq!(state.classify(&qa), Transition::First);

        state
            .commit_first(0, Filter::from_pair(1, qa.clone()), vec![job(1, &qa)])
            .unwrap();
        assert_eq!(state.classify(&qa), Transition::RemoveLast);
        assert_eq!(state.classify(&ft), Transition::Add);

        state
            .commit_add(1, Filter::from_pair(2, ft.clone()), vec![])
            .unwrap();
        assert_eq!(state.classify(&qa), Transition::RemoveOne);
        assert!(!Transition::RemoveOne.needs_fetch());
    }

    #[test]
    fn add_merges_overlapping_jobs_and_returns_only_new_ones() {
        let qa = pair(FilterKey::Category, "QA");
        let ft = pair(FilterKey::JobType, "full_time");
        let mut state = FilterState::new();
        state
            .commit_first(0, Filter::from_pair(1, qa.clone()), vec![job(1, &qa), job(2, &qa)])
            .unwrap();

        let added = state
            .commit_add(1, Filter::from_pair(2, ft.clone()), vec![job(2, &ft), job(3, &ft)])
            .unwrap();
        assert_eq!(ids(&added), vec![3]);
        assert_eq!(ids(state.displayed()), vec![1, 2, 3]);
        assert_eq!(state.displayed()[1].matched_by, vec![qa.clone(), ft.clone()]);
        assert!(state.is_consistent());

        let survivors = ids(state.remove_one(&qa));
        assert_eq!(survivors, vec![2, 3]);
        assert_eq!(state.displayed()[0].origin(), Some(ft));
        assert!(state.is_consistent());
    }

    #[test]
    fn stale_results_are_rejected_without_mutation() {
        let qa = pair(FilterKey::Category, "QA");
        let mut state = FilterState::new();
        state
            .commit_first(0, Filter::from_pair(1, qa.clone()), vec![job(1, &qa)])
            .unwrap();

        let err = state
            .commit_add(0, Filter::from_pair(2, pair(FilterKey::Tags, "qa")), vec![])
            .unwrap_err();
        assert_eq!(err, StaleGeneration { issued: 0, current: 1 });
        assert_eq!(state.active().len(), 1);
        assert_eq!(state.generation(), 1);
    }

    #[test]
    fn placeholder_is_visible_only_without_active_filters() {
        let qa = pair(FilterKey::Category, "QA");
        let devops = pair(FilterKey::Category, "DevOps");
        let mut state = FilterState::new();
        state
            .commit_first(0, Filter::from_pair(1, qa.clone()), vec![job(1, &qa)])
            .unwrap();
        let visible = ids(
            state
                .commit_remove_last(
                    1,
                    Placeholder {
                        origin: devops.clone(),
                        jobs: vec![job(9, &devops)],
                    },
                )
                .unwrap(),
        );
        assert_eq!(visible, vec![9]);
        assert!(state.active().is_empty());
        assert!(state.displayed().is_empty());
        assert_eq!(state.find_job(9).map(|j| j.id_job), Some(9));

        state.mark_seen(9, true);
        assert!(state.visible_jobs()[0].is_seen);
    }

    #[test]
    fn favorites_match_by_id_or_pair() {
        let mut favs = FavoriteRegistry::from_saved(vec![
            Filter::new(1, FilterKey::Tags, "rust"),
            Filter::new(1, FilterKey::Tags, "rust"),
        ]);
        assert_eq!(favs.filters().len(), 1);
        assert_eq!(favs.position(Some(1), &pair(FilterKey::Salary, "x")), Some(0));
        assert_eq!(favs.position(None, &pair(FilterKey::Tags, "rust")), Some(0));
        assert_eq!(favs.position(Some(5), &pair(FilterKey::Tags, "go")), None);
        favs.add(Filter::new(1, FilterKey::Tags, "go"));
        assert_eq!(favs.filters().len(), 1);
    }

    #[test]
    fn seen_toggle_twice_restores_state() {
        let mut seen = SeenRegistry::default();
        let qa = pair(FilterKey::Category, "QA");
        assert_eq!(seen.toggle(job(4, &qa)), ToggleOutcome::Added);
        assert!(seen.get(4).is_some_and(|j| j.is_seen && j.matched_by.is_empty()));
        assert_eq!(seen.toggle(job(4, &qa)), ToggleOutcome::Removed);
        assert!(seen.jobs().is_empty());
    }
}
