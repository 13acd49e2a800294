use std::path::{Path, PathBuf};

use rjb_api::{JobSource, FixtureSource, SourceContext};
use rjb_core::{FilterKey, FilterPair};
use uuid::Uuid;

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures/remotive")
        .canonicalize()
        .expect("fixtures dir")
}

fn ctx() -> SourceContext {
    SourceContext::new(Uuid::new_v4(), 0)
}

#[tokio::test]
async fn fixture_corpus_and_chips_load() {
    let source = FixtureSource::new(fixtures_dir());
    let corpus = source.fetch_corpus(&ctx()).await.unwrap();
    let chips = source.fetch_chips(&ctx()).await.unwrap();

    assert_eq!(corpus.len(), 10);
    assert!(corpus.iter().any(|job| job.tags.is_empty()));
    let names: Vec<_> = chips.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["QA", "DevOps / Sysadmin", "Software Development"]);
}

#[tokio::test]
async fn fixture_source_narrows_like_the_live_api() {
    let source = FixtureSource::new(fixtures_dir());

    let qa = source
        .fetch_jobs(&ctx(), &FilterPair::new(FilterKey::Category, "QA"), 15)
        .await
        .unwrap();
    assert_eq!(qa.iter().map(|j| j.id).collect::<Vec<_>>(), vec![1001, 1002, 1003, 1010]);

    let canada = source
        .fetch_jobs(
            &ctx(),
            &FilterPair::new(FilterKey::CandidateRequiredLocation, "Canada"),
            2,
        )
        .await
        .unwrap();
    assert_eq!(canada.iter().map(|j| j.id).collect::<Vec<_>>(), vec![1001, 1008]);
}

#[tokio::test]
async fn missing_fixture_dir_is_an_error() {
    let source = FixtureSource::new("/definitely/not/here");
    assert!(source.fetch_corpus(&ctx()).await.is_err());
}
