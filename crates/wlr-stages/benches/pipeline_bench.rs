//! Benchmarks for the deterministic hot paths and a full offline run.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use wlr_core::{EntrySnapshot, EvaluationInput, Intent, LearnerSnapshot, TopicSnapshot, WisdomCorpus};
use wlr_judge::UnavailableJudge;
use wlr_stages::risk::RiskAssessment;
use wlr_stages::{decision, standard_pipeline, time};

const DESCRIPTION: &str = "Implemented a REST endpoint that validates the request body with serde, \
                           wrote integration tests against a Postgres container and fixed a \
                           migration ordering issue in the schema.";

fn input(hours: f64) -> EvaluationInput {
    EvaluationInput {
        entry: EntrySnapshot {
            id: 1,
            hours,
            description: DESCRIPTION.to_string(),
            blocker: Some("Other: the office network was down".to_string()),
        },
        topic: TopicSnapshot {
            name: "Rust Web Services".to_string(),
            difficulty: 4,
            benchmark_hours: Some(3.5),
        },
        learner: LearnerSnapshot {
            experience_years: 1.5,
            historical_avg_hours: 2.5,
            prior_entries: 2,
        },
    }
}

fn bench_heuristics(c: &mut Criterion) {
    let mut group = c.benchmark_group("stages/heuristics");
    let sample = input(3.0);

    group.bench_function("time_assess", |b| {
        b.iter(|| {
            time::assess(
                black_box(sample.entry.hours),
                Intent::ProjectWork,
                &sample.topic,
                &sample.learner,
            )
        })
    });

    for hours in [0.5, 3.0, 10.0] {
        group.bench_with_input(BenchmarkId::new("risk", hours), &hours, |b, &h| {
            b.iter(|| RiskAssessment::evaluate(black_box(DESCRIPTION), h, Intent::DeepLearning))
        });
    }

    group.bench_function("combine", |b| {
        b.iter(|| decision::combine(Intent::Review, black_box(0.8), 0.7, 0.9, 0.1, 2))
    });

    group.finish();
}

fn bench_offline_run(c: &mut Criterion) {
    let pipeline = standard_pipeline();
    let corpus = WisdomCorpus::default();

    c.bench_function("pipeline/offline_run", |b| {
        b.iter(|| pipeline.evaluate(black_box(input(3.0)), &corpus, &UnavailableJudge))
    });
}

criterion_group!(benches, bench_heuristics, bench_offline_run);
criterion_main!(benches);
