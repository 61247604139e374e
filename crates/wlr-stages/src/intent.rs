//! Stage 0: Intent Classifier.
//!
//! Always asks the judge (it is the circuit breaker's timer source) and
//! records the measured latency on the state before anything else.

use serde_json::json;
use tracing::{debug, warn};
use wlr_core::{
    EvaluationState, Intent, PathTaken, Stage, StageContext, StageError, TraceRecord,
    BREAKER_TRIP_SECS,
};
use wlr_judge::{extract_category, sanitize_input};

use crate::prompts;

pub const ID: &str = "0.intent";

#[derive(Debug, Default, Clone, Copy)]
pub struct IntentStage;

impl Stage for IntentStage {
    fn id(&self) -> &'static str {
        ID
    }

    fn name(&self) -> &'static str {
        "Intent Classifier"
    }

    fn consults_judge(&self) -> bool {
        true
    }

    fn run(&self, state: &mut EvaluationState, ctx: &StageContext<'_>) -> Result<(), StageError> {
        let input = state.input();
        let prompt = prompts::intent_prompt(
            &sanitize_input(&input.topic.name),
            &sanitize_input(&input.entry.description),
        );

        let reply = ctx.ask(ID, prompt);
        let latency = reply.elapsed_secs;
        state.record_latency(latency)?;

        let details = json!({
            "latency_secs": latency,
            "breaker_tripped": latency > BREAKER_TRIP_SECS,
        });

        let (intent, record) = match reply.result {
            Ok(raw) => match extract_category(&raw) {
                Ok(found) => {
                    debug!(entry_id = state.entry_id(), intent = %found.intent, "intent classified");
                    let record = TraceRecord::new(
                        format!("Intent: {}", found.intent),
                        PathTaken::Semantic,
                        format!("Judge classified the entry ({} match) in {:.2}s.", found.method, latency),
                    )
                    .with_semantic_output(raw);
                    (found.intent, record)
                }
                Err(e) => {
                    warn!(entry_id = state.entry_id(), error = %e, "unusable intent reply");
                    state.record_semantic_failure();
                    let record = TraceRecord::new(
                        format!("Intent: {} (default)", Intent::DeepLearning),
                        PathTaken::Fallback,
                        format!("{}; defaulted to deep_learning.", e),
                    )
                    .with_semantic_output(raw);
                    (Intent::DeepLearning, record)
                }
            },
            Err(e) => {
                warn!(entry_id = state.entry_id(), error = %e, "intent classification failed");
                state.record_semantic_failure();
                let record = TraceRecord::new(
                    format!("Intent: {} (default)", Intent::DeepLearning),
                    PathTaken::Fallback,
                    format!("{}; defaulted to deep_learning.", e),
                );
                (Intent::DeepLearning, record)
            }
        };

        state.set_intent(intent)?;
        state.write_trace(ID, record.with_details(details));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{input, run_stage};
    use std::sync::Arc;
    use std::time::Duration;
    use wlr_core::{JudgeError, ManualClock};
    use wlr_judge::ScriptedJudge;

    #[test]
    fn test_classifies_and_records_latency() {
        let clock = Arc::new(ManualClock::new());
        let judge = ScriptedJudge::new().with_clock(clock.clone()).respond_after(
            ID,
            "Reasoning: fixing a crash.\nCategory: debugging",
            Duration::from_millis(1200),
        );
        let mut state = wlr_core::EvaluationState::new(input(2.0, "Fixed a panic in the parser"));
        run_stage(&IntentStage, &mut state, &judge, clock.as_ref());

        assert_eq!(state.intent(), Some(Intent::Debugging));
        assert!((state.semantic_latency_secs().unwrap() - 1.2).abs() < 1e-9);
        assert_eq!(state.semantic_failures(), 0);
        assert_eq!(state.trace()[ID].path, PathTaken::Semantic);
        assert!(state.trace()[ID].semantic_output.is_some());
    }

    #[test]
    fn test_out_of_enum_reply_counts_as_failure() {
        let clock = ManualClock::new();
        let judge = ScriptedJudge::new().respond(ID, "Category: gardening");
        let mut state = wlr_core::EvaluationState::new(input(2.0, "Pruned the roses"));
        run_stage(&IntentStage, &mut state, &judge, &clock);

        assert_eq!(state.intent(), Some(Intent::DeepLearning));
        assert_eq!(state.semantic_failures(), 1);
        assert_eq!(state.trace()[ID].path, PathTaken::Fallback);
    }

    #[test]
    fn test_unknown_label_ignores_words_in_reasoning() {
        let clock = ManualClock::new();
        let judge = ScriptedJudge::new().respond(
            ID,
            "Reasoning: reads like a review of garden tips.\nCategory: gardening",
        );
        let mut state = wlr_core::EvaluationState::new(input(2.0, "Read about composting"));
        run_stage(&IntentStage, &mut state, &judge, &clock);

        assert_eq!(state.intent(), Some(Intent::DeepLearning));
        assert_eq!(state.semantic_failures(), 1);
        assert_eq!(state.trace()[ID].path, PathTaken::Fallback);
    }

    #[test]
    fn test_timeout_trips_breaker_reading() {
        let clock = Arc::new(ManualClock::new());
        let judge = ScriptedJudge::new().with_clock(clock.clone()).fail_after(
            ID,
            JudgeError::Timeout {
                limit_secs: 8.0,
                elapsed_secs: 8.0,
            },
            Duration::from_secs(8),
        );
        let mut state = wlr_core::EvaluationState::new(input(2.0, "Studied closures"));
        run_stage(&IntentStage, &mut state, &judge, clock.as_ref());

        assert_eq!(state.intent(), Some(Intent::DeepLearning));
        assert_eq!(state.semantic_failures(), 1);
        assert!(state.breaker_tripped());
    }
}
