//! Stage 1: Time Reasonableness Analyzer.
//!
//! Pure heuristics. Expected hours start from the topic benchmark and are
//! scaled by four independent multipliers; the score is then a function of
//! the actual-to-expected ratio.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::json;
use tracing::debug;
use wlr_core::{
    EvaluationState, Intent, LearnerSnapshot, PathTaken, Stage, StageContext, StageError,
    TopicSnapshot, TraceRecord,
};

pub const ID: &str = "1.time";

/// Minimum time score for a learner's first entry on a topic.
pub const FIRST_ENTRY_FLOOR: f64 = 0.6;

/// Prior entries from which the learner's own average replaces the benchmark.
pub const VELOCITY_TRUSTED_ENTRIES: u32 = 3;

static INTENT_MULTIPLIERS: Lazy<HashMap<Intent, f64>> = Lazy::new(|| {
    HashMap::from([
        (Intent::DeepLearning, 1.0),
        (Intent::Review, 0.5),
        (Intent::ProjectWork, 1.5),
        (Intent::Debugging, 2.0),
    ])
});

// ============================================================================
// MULTIPLIERS
// ============================================================================

/// 1 → 0.70, 3 → 1.00, 5 → 1.30.
pub fn difficulty_multiplier(difficulty: u8) -> f64 {
    let d = f64::from(difficulty.clamp(1, 5));
    0.7 + (d - 1.0) * 0.15
}

pub fn experience_multiplier(years: f64) -> f64 {
    if years <= 1.0 {
        1.5
    } else if years >= 3.0 {
        0.8
    } else {
        1.2
    }
}

pub fn intent_multiplier(intent: Intent) -> f64 {
    INTENT_MULTIPLIERS.get(&intent).copied().unwrap_or(1.0)
}

/// Blend toward neutral for one or two prior entries; neutral otherwise.
pub fn velocity_multiplier(learner: &LearnerSnapshot, static_expected: f64) -> f64 {
    match learner.prior_entries {
        1 | 2 if learner.historical_avg_hours > 0.0 && static_expected > 0.0 => {
            0.5 + 0.5 * (learner.historical_avg_hours / static_expected)
        }
        _ => 1.0,
    }
}

// ============================================================================
// SCORING
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TimeAssessment {
    pub expected_hours: f64,
    pub ratio: f64,
    pub score: f64,
    pub baseline: &'static str,
    pub first_entry: bool,
}

/// ≤1.2 → 1.0, 1.2..2.0 → linear 1.0 down to 0.1, >2.0 → 0.1.
pub fn ratio_score(ratio: f64) -> f64 {
    if ratio <= 1.2 {
        1.0
    } else if ratio <= 2.0 {
        1.0 - (ratio - 1.2) / 0.8 * 0.9
    } else {
        0.1
    }
}

pub fn assess(hours: f64, intent: Intent, topic: &TopicSnapshot, learner: &LearnerSnapshot) -> TimeAssessment {
    let static_expected = topic.effective_benchmark()
        * difficulty_multiplier(topic.clamped_difficulty())
        * experience_multiplier(learner.experience_years)
        * intent_multiplier(intent);

    let (expected_hours, baseline) =
        if learner.prior_entries >= VELOCITY_TRUSTED_ENTRIES && learner.historical_avg_hours > 0.0 {
            (learner.historical_avg_hours, "historical_average")
        } else {
            (
                static_expected * velocity_multiplier(learner, static_expected),
                "benchmark",
            )
        };

    let ratio = if expected_hours > 0.0 {
        hours / expected_hours
    } else {
        0.0
    };

    let first_entry = learner.prior_entries == 0;
    let mut score = ratio_score(ratio);
    if first_entry {
        score = score.max(FIRST_ENTRY_FLOOR);
    }

    TimeAssessment {
        expected_hours,
        ratio,
        score,
        baseline,
        first_entry,
    }
}

// ============================================================================
// STAGE
// ============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct TimeStage;

impl Stage for TimeStage {
    fn id(&self) -> &'static str {
        ID
    }

    fn name(&self) -> &'static str {
        "Time Reasonableness"
    }

    fn run(&self, state: &mut EvaluationState, _ctx: &StageContext<'_>) -> Result<(), StageError> {
        let intent = state.intent().unwrap_or_default();
        let input = state.input();
        let a = assess(input.entry.hours, intent, &input.topic, &input.learner);
        let hours = input.entry.hours;

        debug!(ratio = a.ratio, score = a.score, "time assessed");
        state.set_time_score(a.score)?;

        let mut reason = format!(
            "{:.1}h logged against {:.1}h expected ({} baseline), ratio {:.0}%.",
            hours,
            a.expected_hours,
            a.baseline,
            a.ratio * 100.0
        );
        if a.first_entry && ratio_score(a.ratio) < FIRST_ENTRY_FLOOR {
            reason.push_str(" First entry on this topic: score held at the leniency floor.");
        }

        state.write_trace(
            ID,
            TraceRecord::new(format!("Time score {:.2}", a.score), PathTaken::Deterministic, reason)
                .with_score(a.score)
                .with_details(json!({
                    "expected_hours": a.expected_hours,
                    "ratio": a.ratio,
                    "baseline": a.baseline,
                    "first_entry": a.first_entry,
                })),
        );
        Ok(())
    }
}
