use std::path::{Path, PathBuf};
use std::sync::Arc;

use rjb_core::{FilterKey, SequentialIdAllocator, Theme};
use rjb_engine::{
    BoardConfig, Engine, NullUi, RenderMode, SearchEvent, SearchOutcome, SearchSource,
    ToggleOutcome,
};
use tempfile::tempdir;

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures/remotive")
        .canonicalize()
        .expect("fixtures dir")
}

fn engine(storage: &Path) -> Engine {
    let config = BoardConfig {
        fixtures_dir: Some(fixtures_dir()),
        storage_dir: storage.to_path_buf(),
        ..BoardConfig::default()
    };
    Engine::from_config(&config, Arc::new(NullUi))
        .expect("engine")
        .with_id_allocator(Box::new(SequentialIdAllocator::default()))
        .with_rng_seed(11)
}

fn chip(name: &str) -> SearchEvent {
    SearchEvent::new(SearchSource::Chip, FilterKey::Category, name)
}

#[tokio::test]
async fn browsing_session_keeps_the_filter_set_consistent() {
    let dir = tempdir().expect("tempdir");
    let engine = engine(dir.path());

    let landing = engine.initialize().await.unwrap();
    assert_eq!(landing.mode, RenderMode::Replace);
    assert!(!landing.jobs.is_empty());
    assert_eq!(landing.chips.len(), 3);
    let salaries = &landing.categories[4];
    assert_eq!(salaries.key, FilterKey::Salary);
    assert!(salaries.values.contains(&"50000-70000$".to_string()));
    assert!(salaries.values.contains(&"40000£".to_string()));

    engine.handle_search_event(chip("QA")).await.unwrap();
    let added = engine
        .handle_search_event(SearchEvent::new(
            SearchSource::Filter,
            FilterKey::CandidateRequiredLocation,
            "Canada",
        ))
        .await
        .unwrap();
    let SearchOutcome::Rendered(added) = added else {
        panic!("expected render");
    };
    assert_eq!(added.mode, RenderMode::Adding);
    let added_ids: Vec<_> = added.jobs.iter().map(|j| j.id_job).collect();
    assert_eq!(added_ids, vec![1008, 1009]);
    assert!(engine.is_consistent().await);

    engine.handle_search_event(chip("QA")).await.unwrap();
    let remaining: Vec<_> = engine.displayed_jobs().await.iter().map(|j| j.id_job).collect();
    assert_eq!(remaining, vec![1001, 1008, 1009]);
    assert!(engine.is_consistent().await);
}

#[tokio::test]
async fn preferences_survive_a_restart() {
    let dir = tempdir().expect("tempdir");
    {
        let engine = engine(dir.path());
        engine.initialize().await.unwrap();
        engine.handle_search_event(chip("DevOps / Sysadmin")).await.unwrap();
        assert_eq!(engine.toggle_seen(1004).await.unwrap(), ToggleOutcome::Added);
        engine
            .toggle_favorite(None, FilterKey::Tags, "rust")
            .await
            .unwrap();
        assert_eq!(engine.toggle_theme().await.unwrap(), Theme::Dark);
    }

    let engine = engine(dir.path());
    engine.initialize().await.unwrap();
    assert_eq!(engine.theme().await, Theme::Dark);
    assert_eq!(engine.favorite_filters().await.len(), 1);

    engine.handle_search_event(chip("DevOps / Sysadmin")).await.unwrap();
    let seen: Vec<_> = engine
        .displayed_jobs()
        .await
        .into_iter()
        .filter(|j| j.is_seen)
        .map(|j| j.id_job)
        .collect();
    assert_eq!(seen, vec![1004]);
}

#[tokio::test]
async fn search_bar_finds_tags_and_partial_terms() {
    let dir = tempdir().expect("tempdir");
    let engine = engine(dir.path());
    engine.initialize().await.unwrap();

    let SearchOutcome::Rendered(update) = engine.search("Kubernetes").await.unwrap() else {
        panic!("expected render");
    };
    let found: Vec<_> = update.jobs.iter().map(|j| j.id_job).collect();
    assert_eq!(found, vec![1004, 1009]);

    let SearchOutcome::Rendered(update) = engine.search("engineer").await.unwrap() else {
        panic!("expected render");
    };
    assert!(update
        .jobs
        .iter()
        .all(|j| j.filter_value.as_deref() == Some("Search: engineer")));
    assert_eq!(update.jobs.len(), 6);

    assert_eq!(engine.search("cobol").await.unwrap(), SearchOutcome::NotFound);
}
