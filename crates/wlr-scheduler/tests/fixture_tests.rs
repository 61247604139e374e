//! Offline runs of the job fixtures under `testing/fixtures`.

use std::path::PathBuf;
use std::sync::Arc;

use wlr_core::Decision;
use wlr_scheduler::{AnalysisStatus, InMemoryStore, JobFixture, JobOutcome, ReviewConfig, ReviewScheduler};

fn fixture(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../testing/fixtures")
        .join(relative)
}

async fn run_offline(job: &str) -> JobOutcome {
    let config = ReviewConfig::load(&fixture("config/offline.yaml")).unwrap();
    let job = JobFixture::load(&fixture(job)).unwrap();

    let store = Arc::new(InMemoryStore::new());
    store.insert(job.input()).unwrap();
    for c in job.corrections {
        store.add_correction(c).unwrap();
    }
    ReviewScheduler::new(store, config.build_judge())
        .process(job.entry.id)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_sample_job_offline() {
    let outcome = run_offline("jobs/sample.yaml").await;
    let record = outcome.record().cloned().unwrap();

    assert_eq!(record.status, AnalysisStatus::Analyzed);
    // intent and relevance could not be judged
    assert_eq!(record.semantic_failures, 2);
    assert_eq!(record.decision, Decision::Flag);
}

#[tokio::test]
async fn test_padded_job_offline() {
    let outcome = run_offline("jobs/padded.yaml").await;
    let record = outcome.record().cloned().unwrap();

    assert_eq!(record.semantic_failures, 4);
    assert_eq!(record.decision, Decision::Pending);
    assert_eq!(record.entry_status, "pending");
}
