//! Stage 5: Decision Synthesizer.
//!
//! Weighted sum of time (plus blocker boost), quality and relevance, scaled
//! to a percentage and reduced by the safety penalty for every stage that
//! went without a judgment.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::json;
use tracing::info;
use wlr_core::{
    Decision, EvaluationState, Intent, PathTaken, Stage, StageContext, StageError, TraceRecord,
};

pub const ID: &str = "5.decision";

/// Lowest penalty factor, however many judgments were missed.
pub const MIN_PENALTY_FACTOR: f64 = 0.5;

/// Penalty per missed judgment.
pub const PENALTY_PER_FAILURE: f64 = 0.1;

/// Weights of (time, quality, relevance) per intent; each row sums to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Weights {
    pub time: f64,
    pub quality: f64,
    pub relevance: f64,
}

static WEIGHTS: Lazy<HashMap<Intent, Weights>> = Lazy::new(|| {
    HashMap::from([
        (Intent::DeepLearning, Weights { time: 0.4, quality: 0.4, relevance: 0.2 }),
        (Intent::Review, Weights { time: 0.2, quality: 0.5, relevance: 0.3 }),
        (Intent::ProjectWork, Weights { time: 0.5, quality: 0.3, relevance: 0.2 }),
        (Intent::Debugging, Weights { time: 0.3, quality: 0.3, relevance: 0.4 }),
    ])
});

pub fn weights_for(intent: Intent) -> Weights {
    WEIGHTS
        .get(&intent)
        .copied()
        .unwrap_or(Weights { time: 0.4, quality: 0.4, relevance: 0.2 })
}

pub fn penalty_factor(failures: u32) -> f64 {
    (1.0 - f64::from(failures) * PENALTY_PER_FAILURE).max(MIN_PENALTY_FACTOR)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Synthesis {
    pub weights: Weights,
    pub adjusted_time: f64,
    pub raw_confidence: f64,
    pub penalty_factor: f64,
    pub final_confidence: f64,
    pub decision: Decision,
}

/// Pure synthesis; confidences are rounded to two decimals.
pub fn combine(
    intent: Intent,
    time: f64,
    quality: f64,
    relevance: f64,
    boost: f64,
    failures: u32,
) -> Synthesis {
    let weights = weights_for(intent);
    let adjusted_time = (time + boost).min(1.0);
    let raw = (adjusted_time * weights.time + quality * weights.quality + relevance * weights.relevance) * 100.0;
    let raw_confidence = round2(raw.clamp(0.0, 100.0));
    let factor = penalty_factor(failures);
    let final_confidence = round2(raw_confidence * factor);

    Synthesis {
        weights,
        adjusted_time,
        raw_confidence,
        penalty_factor: factor,
        final_confidence,
        decision: Decision::from_confidence(final_confidence),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DecisionStage;

impl Stage for DecisionStage {
    fn id(&self) -> &'static str {
        ID
    }

    fn name(&self) -> &'static str {
        "Decision Synthesizer"
    }

    fn run(&self, state: &mut EvaluationState, _ctx: &StageContext<'_>) -> Result<(), StageError> {
        let intent = state.intent().ok_or(StageError::MissingInput("intent"))?;
        let failures = state.semantic_failures();
        let s = combine(
            intent,
            state.time_score().unwrap_or(0.5),
            state.quality_score().unwrap_or(0.5),
            state.relevance_score().unwrap_or(0.5),
            state.blocker_boost().unwrap_or(0.0),
            failures,
        );

        let fell_back: Vec<&str> = state
            .trace()
            .iter()
            .filter(|(_, r)| matches!(r.path, PathTaken::Fallback | PathTaken::Breaker | PathTaken::Failed))
            .map(|(stage, _)| stage.as_str())
            .collect();
        let penalty_cause = if failures == 0 {
            "every judgment obtained".to_string()
        } else {
            format!("{} missed judgment(s): {}", failures, fell_back.join(", "))
        };
        let details = json!({
            "intent": intent,
            "weights": s.weights,
            "adjusted_time": s.adjusted_time,
            "raw_confidence": s.raw_confidence,
            "penalty_factor": s.penalty_factor,
            "penalty_cause": penalty_cause,
            "fell_back": fell_back,
        });

        let decision = state.set_outcome(s.final_confidence)?;
        debug_assert_eq!(decision, s.decision);
        info!(entry_id = state.entry_id(), stage = ID, confidence = s.final_confidence, decision = %decision, "decision synthesized");

        let verdict = match decision {
            Decision::Approve => "auto-approved",
            Decision::Flag => "flagged for review",
            Decision::Pending => "held for human review",
        };
        state.write_trace(
            ID,
            TraceRecord::new(
                format!("{:.2}% → {}", s.final_confidence, decision),
                PathTaken::Deterministic,
                format!(
                    "Raw {:.2}% × penalty {:.2} ({}); {}.",
                    s.raw_confidence, s.penalty_factor, penalty_cause, verdict
                ),
            )
            .with_score(s.final_confidence)
            .with_details(details),
        );
        Ok(())
    }
}
