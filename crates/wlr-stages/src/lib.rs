//! Work-log review stages: the six steps of one integrity evaluation.
//!
//! # Pipeline Flow
//!
//! ```text
//! Entry → Intent → Time → Quality → Relevance → Blocker → Decision → Terminal State
//!           ↓        ↓        ↓          ↓          ↓          ↓
//!        latency   ratio   risk route  wisdom    boost    penalty
//!        (breaker)                                        × weights
//! ```
//!
//! Stage 0 times its judge call; the reading drives the circuit breaker that
//! Stages 2 and 4 consult. Stage 3 always asks the judge. Stages 1 and 5
//! never do.

pub mod blocker;
pub mod decision;
pub mod intent;
pub mod keywords;
pub mod prompts;
pub mod quality;
pub mod relevance;
pub mod risk;
pub mod time;

pub use blocker::BlockerStage;
pub use decision::DecisionStage;
pub use intent::IntentStage;
pub use quality::QualityStage;
pub use relevance::RelevanceStage;
pub use time::TimeStage;

use wlr_core::{
    EvaluationInput, EvaluationState, JudgeError, PipelineRunner, ReviewError, SemanticJudge,
    Stage, TerminalState, WisdomCorpus,
};

/// The six stages in their fixed order.
pub fn standard_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(IntentStage),
        Box::new(TimeStage),
        Box::new(QualityStage),
        Box::new(RelevanceStage),
        Box::new(BlockerStage),
        Box::new(DecisionStage),
    ]
}

pub fn standard_pipeline() -> PipelineRunner {
    PipelineRunner::new(standard_stages())
}

/// The judgment a stage gives up on because Stage 0's latency tripped the breaker.
pub(crate) fn breaker_skip(state: &EvaluationState) -> JudgeError {
    JudgeError::Skipped(format!(
        "circuit breaker tripped ({:.2}s judge latency)",
        state.semantic_latency_secs().unwrap_or_default()
    ))
}

/// Evaluate one entry with the standard pipeline and a wall clock.
pub fn evaluate(
    input: EvaluationInput,
    corpus: &WisdomCorpus,
    judge: &dyn SemanticJudge,
) -> Result<TerminalState, ReviewError> {
    standard_pipeline().evaluate(input, corpus, judge)
}

#[cfg(test)]
pub(crate) mod test_support {
    use wlr_core::{
        Clock, EntrySnapshot, EvaluationInput, EvaluationState, Intent, LearnerSnapshot,
        SemanticJudge, Stage, StageContext, TopicSnapshot, WisdomCorpus,
    };

    pub fn input(hours: f64, description: &str) -> EvaluationInput {
        EvaluationInput {
            entry: EntrySnapshot {
                id: 1,
                hours,
                description: description.to_string(),
                blocker: None,
            },
            topic: TopicSnapshot {
                name: "Rust".to_string(),
                difficulty: 3,
                benchmark_hours: Some(4.0),
            },
            learner: LearnerSnapshot {
                experience_years: 2.0,
                historical_avg_hours: 0.0,
                prior_entries: 0,
            },
        }
    }

    pub fn input_with_blocker(blocker: &str) -> EvaluationInput {
        let mut i = input(2.0, "Read about trait objects and dynamic dispatch");
        i.entry.blocker = Some(blocker.to_string());
        i
    }

    /// State as it stands after Stage 0.
    pub fn state_with_latency(input: EvaluationInput, latency: f64, intent: Intent) -> EvaluationState {
        let mut state = EvaluationState::new(input);
        state.record_latency(latency).unwrap();
        state.set_intent(intent).unwrap();
        state
    }

    pub fn run_stage(stage: &dyn Stage, state: &mut EvaluationState, judge: &dyn SemanticJudge, clock: &dyn Clock) {
        run_stage_with_corpus(stage, state, judge, clock, &WisdomCorpus::default());
    }

    pub fn run_stage_with_corpus(
        stage: &dyn Stage,
        state: &mut EvaluationState,
        judge: &dyn SemanticJudge,
        clock: &dyn Clock,
        corpus: &WisdomCorpus,
    ) {
        let ctx = StageContext::new(judge, clock, corpus);
        stage.run(state, &ctx).unwrap();
    }
}
