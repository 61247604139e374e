//! Evaluation State: the single record threaded through all stages
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::data_model::{Decision, EvaluationInput, Intent, TraceRecord};
use crate::stage::StageError;
use crate::{BREAKER_TRIP_SECS, MAX_BLOCKER_BOOST};

/// Score substituted when a stage never produced one.
const NEUTRAL_SCORE: f64 = 0.5;

/// Owned exclusively by the orchestrator for one run. Inputs are read-only;
/// each output is written once by its stage; the latency reading is written
/// once by Stage 0; the failure counter only grows.
#[derive(Debug, Clone)]
pub struct EvaluationState {
    input: EvaluationInput,

    intent: Option<Intent>,
    time_score: Option<f64>,
    quality_score: Option<f64>,
    relevance_score: Option<f64>,
    blocker_boost: Option<f64>,
    outcome: Option<(f64, Decision)>,

    semantic_latency_secs: Option<f64>,
    semantic_failures: u32,
    trace: BTreeMap<String, TraceRecord>,
    errors: Vec<String>,
}

impl EvaluationState {
    pub fn new(input: EvaluationInput) -> Self {
        Self {
            input,
            intent: None,
            time_score: None,
            quality_score: None,
            relevance_score: None,
            blocker_boost: None,
            outcome: None,
            semantic_latency_secs: None,
            semantic_failures: 0,
            trace: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    // === Inputs ===

    pub fn input(&self) -> &EvaluationInput {
        &self.input
    }

    pub fn entry_id(&self) -> u64 {
        self.input.entry.id
    }

    // === Outputs (write-once) ===

    pub fn intent(&self) -> Option<Intent> {
        self.intent
    }

    pub fn set_intent(&mut self, intent: Intent) -> Result<(), StageError> {
        write_once(&mut self.intent, intent, "intent")
    }

    pub fn time_score(&self) -> Option<f64> {
        self.time_score
    }

    pub fn set_time_score(&mut self, score: f64) -> Result<(), StageError> {
        write_once(&mut self.time_score, unit(score), "time_score")
    }

    pub fn quality_score(&self) -> Option<f64> {
        self.quality_score
    }

    pub fn set_quality_score(&mut self, score: f64) -> Result<(), StageError> {
        write_once(&mut self.quality_score, unit(score), "quality_score")
    }

    pub fn relevance_score(&self) -> Option<f64> {
        self.relevance_score
    }

    pub fn set_relevance_score(&mut self, score: f64) -> Result<(), StageError> {
        write_once(&mut self.relevance_score, unit(score), "relevance_score")
    }

    pub fn blocker_boost(&self) -> Option<f64> {
        self.blocker_boost
    }

    pub fn set_blocker_boost(&mut self, boost: f64) -> Result<(), StageError> {
        let boost = if boost.is_finite() {
            boost.clamp(0.0, MAX_BLOCKER_BOOST)
        } else {
            0.0
        };
        write_once(&mut self.blocker_boost, boost, "blocker_boost")
    }

    pub fn final_confidence(&self) -> Option<f64> {
        self.outcome.map(|(c, _)| c)
    }

    pub fn decision(&self) -> Option<Decision> {
        self.outcome.map(|(_, d)| d)
    }

    /// Record the final confidence (clamped to 0..=100) and the decision the
    /// thresholds give for it.
    pub fn set_outcome(&mut self, confidence: f64) -> Result<Decision, StageError> {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 100.0)
        } else {
            0.0
        };
        let decision = Decision::from_confidence(confidence);
        write_once(&mut self.outcome, (confidence, decision), "final_confidence")?;
        Ok(decision)
    }

    // === Cross-cutting ===

    pub fn semantic_latency_secs(&self) -> Option<f64> {
        self.semantic_latency_secs
    }

    pub fn record_latency(&mut self, secs: f64) -> Result<(), StageError> {
        write_once(&mut self.semantic_latency_secs, secs.max(0.0), "semantic_latency")
    }

    /// Circuit breaker: tripped once Stage 0's measured latency exceeds the
    /// threshold. No reading means not tripped.
    pub fn breaker_tripped(&self) -> bool {
        self.semantic_latency_secs
            .map(|l| l > BREAKER_TRIP_SECS)
            .unwrap_or(false)
    }

    pub fn semantic_failures(&self) -> u32 {
        self.semantic_failures
    }

    /// Count one stage that could not, or chose not to, obtain a judgment.
    pub fn record_semantic_failure(&mut self) {
        self.semantic_failures = self.semantic_failures.saturating_add(1);
    }

    pub fn trace(&self) -> &BTreeMap<String, TraceRecord> {
        &self.trace
    }

    pub fn has_trace(&self, stage: &str) -> bool {
        self.trace.contains_key(stage)
    }

    pub fn write_trace(&mut self, stage: &str, record: TraceRecord) {
        self.trace.insert(stage.to_string(), record);
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn push_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Freeze into the terminal contract. Outputs a failed stage never wrote
    /// take neutral values; a missing outcome is reported as 0% / pending.
    pub fn into_terminal(self) -> TerminalState {
        let (final_confidence, decision) = self.outcome.unwrap_or((0.0, Decision::Pending));
        TerminalState {
            entry_id: self.input.entry.id,
            intent: self.intent.unwrap_or_default(),
            time_score: self.time_score.unwrap_or(NEUTRAL_SCORE),
            quality_score: self.quality_score.unwrap_or(NEUTRAL_SCORE),
            relevance_score: self.relevance_score.unwrap_or(NEUTRAL_SCORE),
            blocker_boost: self.blocker_boost.unwrap_or(0.0),
            semantic_latency_secs: self.semantic_latency_secs.unwrap_or(0.0),
            semantic_failures: self.semantic_failures,
            final_confidence,
            decision,
            trace: self.trace,
            errors: self.errors,
        }
    }
}

fn write_once<T>(slot: &mut Option<T>, value: T, field: &'static str) -> Result<(), StageError> {
    if slot.is_some() {
        return Err(StageError::AlreadyWritten(field));
    }
    *slot = Some(value);
    Ok(())
}

fn unit(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        NEUTRAL_SCORE
    }
}

/// What a finished run hands back to the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalState {
    pub entry_id: u64,
    pub intent: Intent,
    pub time_score: f64,
    pub quality_score: f64,
    pub relevance_score: f64,
    pub blocker_boost: f64,
    pub semantic_latency_secs: f64,
    pub semantic_failures: u32,
    /// 0..=100, after the confidence penalty
    pub final_confidence: f64,
    pub decision: Decision,
    pub trace: BTreeMap<String, TraceRecord>,
    pub errors: Vec<String>,
}

impl TerminalState {
    /// Content hash of the terminal state.
    pub fn digest(&self) -> Result<String, crate::ReviewError> {
        let bytes = serde_json::to_vec(self)?;
        Ok(format!("blake3:{}", blake3::hash(&bytes)))
    }
}
