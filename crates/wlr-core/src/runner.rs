//! Pipeline Runner: runs the stages in order against one Evaluation State
use tracing::{debug, info, info_span, warn};

use crate::clock::{Clock, SystemClock};
use crate::context::StageContext;
use crate::data_model::{EvaluationInput, PathTaken, TraceRecord, WisdomCorpus};
use crate::error::ReviewError;
use crate::judge::SemanticJudge;
use crate::stage::Stage;
use crate::state::{EvaluationState, TerminalState};

pub struct PipelineRunner {
    stages: Vec<Box<dyn Stage>>,
    pipeline_id: String,
}

impl PipelineRunner {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        let pipeline_id = stages
            .iter()
            .map(|s| s.id().split('.').nth(1).unwrap_or("?"))
            .collect::<Vec<_>>()
            .join("→");

        Self { stages, pipeline_id }
    }

    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage once, in order, with a wall clock and no deadline.
    pub fn evaluate(
        &self,
        input: EvaluationInput,
        corpus: &WisdomCorpus,
        judge: &dyn SemanticJudge,
    ) -> Result<TerminalState, ReviewError> {
        let clock = SystemClock::new();
        self.evaluate_with(input, corpus, judge, &clock, None)
    }

    /// Run every stage once, in order. `soft_deadline` is an absolute reading
    /// of `clock`; when it has passed between two stages the run is abandoned
    /// with [`ReviewError::SoftTimeLimit`] so the caller can substitute its
    /// fail-safe decision.
    pub fn evaluate_with(
        &self,
        input: EvaluationInput,
        corpus: &WisdomCorpus,
        judge: &dyn SemanticJudge,
        clock: &dyn Clock,
        soft_deadline: Option<f64>,
    ) -> Result<TerminalState, ReviewError> {
        validate(&input)?;

        let ctx = StageContext::new(judge, clock, corpus);
        let span = info_span!(
            "evaluate",
            entry_id = input.entry.id,
            run_id = %ctx.run_id,
            pipeline = %self.pipeline_id,
        );
        let _guard = span.enter();

        let started = clock.now_secs();
        let mut state = EvaluationState::new(input);

        for stage in &self.stages {
            if let Some(deadline) = soft_deadline {
                let now = clock.now_secs();
                if now >= deadline {
                    warn!(stage = stage.id(), "soft time limit reached, abandoning run");
                    return Err(ReviewError::SoftTimeLimit {
                        stage: stage.id(),
                        elapsed_secs: now - started,
                    });
                }
            }

            let failures_before = state.semantic_failures();
            debug!(stage = stage.id(), judge = stage.consults_judge(), "running stage");

            if let Err(e) = stage.run(&mut state, &ctx) {
                warn!(stage = stage.id(), error = %e, "stage failed, continuing");
                state.push_error(format!("{}: {}", stage.id(), e));
                if !state.has_trace(stage.id()) {
                    state.write_trace(
                        stage.id(),
                        TraceRecord::new(
                            format!("{} failed", stage.name()),
                            PathTaken::Failed,
                            e.to_string(),
                        ),
                    );
                }
            }

            if !state.has_trace(stage.id()) {
                state.push_error(format!("{}: stage wrote no trace record", stage.id()));
                state.write_trace(
                    stage.id(),
                    TraceRecord::new(
                        format!("{} left no record", stage.name()),
                        PathTaken::Failed,
                        "stage returned without tracing its path",
                    ),
                );
            }

            debug_assert!(state.semantic_failures() >= failures_before);
        }

        let terminal = state.into_terminal();
        info!(
            decision = %terminal.decision,
            confidence = terminal.final_confidence,
            semantic_failures = terminal.semantic_failures,
            "evaluation finished"
        );
        Ok(terminal)
    }
}

fn validate(input: &EvaluationInput) -> Result<(), ReviewError> {
    if input.entry.id == 0 {
        return Err(ReviewError::InvalidInput("entry id must be set".to_string()));
    }
    if !input.entry.hours.is_finite() || input.entry.hours < 0.0 {
        return Err(ReviewError::InvalidInput(format!(
            "hours must be a non-negative number, got {}",
            input.entry.hours
        )));
    }
    if !(1..=5).contains(&input.topic.difficulty) {
        return Err(ReviewError::InvalidInput(format!(
            "topic difficulty must be within 1..=5, got {}",
            input.topic.difficulty
        )));
    }
    if !input.learner.experience_years.is_finite() || !input.learner.historical_avg_hours.is_finite() {
        return Err(ReviewError::InvalidInput(
            "learner figures must be finite".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::{EntrySnapshot, LearnerSnapshot, TopicSnapshot};
    use crate::judge::{JudgeError, JudgeRequest};
    use crate::stage::StageError;

    struct NoJudge;

    impl SemanticJudge for NoJudge {
        fn name(&self) -> &str {
            "none"
        }

        fn complete(&self, _request: &JudgeRequest) -> Result<String, JudgeError> {
            Err(JudgeError::Unavailable("offline".into()))
        }
    }

    struct Recorder(&'static str);

    impl Stage for Recorder {
        fn id(&self) -> &'static str {
            self.0
        }

        fn name(&self) -> &'static str {
            "Recorder"
        }

        fn run(&self, state: &mut EvaluationState, _ctx: &StageContext<'_>) -> Result<(), StageError> {
            let n = state.trace().len();
            state.write_trace(
                self.0,
                TraceRecord::new(format!("ran after {}", n), PathTaken::Deterministic, "test"),
            );
            Ok(())
        }
    }

    struct Broken;

    impl Stage for Broken {
        fn id(&self) -> &'static str {
            "1.broken"
        }

        fn name(&self) -> &'static str {
            "Broken"
        }

        fn run(&self, _state: &mut EvaluationState, _ctx: &StageContext<'_>) -> Result<(), StageError> {
            Err(StageError::ExecutionFailed("boom".into()))
        }
    }

    fn input(hours: f64) -> EvaluationInput {
        EvaluationInput {
            entry: EntrySnapshot {
                id: 1,
                hours,
                description: "Studied traits".into(),
                blocker: None,
            },
            topic: TopicSnapshot {
                name: "Rust".into(),
                difficulty: 3,
                benchmark_hours: None,
            },
            learner: LearnerSnapshot::default(),
        }
    }

    #[test]
    fn test_pipeline_id() {
        let runner = PipelineRunner::new(vec![Box::new(Recorder("0.a")), Box::new(Recorder("1.b"))]);
        assert_eq!(runner.pipeline_id(), "a→b");
        assert_eq!(runner.len(), 2);
    }

    #[test]
    fn test_stages_run_in_order() {
        let runner = PipelineRunner::new(vec![
            Box::new(Recorder("0.a")),
            Box::new(Recorder("1.b")),
            Box::new(Recorder("2.c")),
        ]);
        let t = runner
            .evaluate(input(1.0), &WisdomCorpus::default(), &NoJudge)
            .unwrap();
        assert_eq!(t.trace["0.a"].summary, "ran after 0");
        assert_eq!(t.trace["1.b"].summary, "ran after 1");
        assert_eq!(t.trace["2.c"].summary, "ran after 2");
    }

    #[test]
    fn test_failed_stage_still_traced() {
        let runner = PipelineRunner::new(vec![Box::new(Recorder("0.a")), Box::new(Broken)]);
        let t = runner
            .evaluate(input(1.0), &WisdomCorpus::default(), &NoJudge)
            .unwrap();
        assert_eq!(t.trace["1.broken"].path, PathTaken::Failed);
        assert_eq!(t.errors.len(), 1);
        assert!(t.errors[0].contains("boom"));
    }

    #[test]
    fn test_invalid_hours_rejected() {
        let runner = PipelineRunner::new(vec![Box::new(Recorder("0.a"))]);
        let err = runner
            .evaluate(input(f64::NAN), &WisdomCorpus::default(), &NoJudge)
            .unwrap_err();
        assert!(matches!(err, ReviewError::InvalidInput(_)));
    }

    #[test]
    fn test_difficulty_out_of_range_rejected() {
        let runner = PipelineRunner::new(vec![Box::new(Recorder("0.a"))]);
        for difficulty in [0, 6] {
            let mut i = input(1.0);
            i.topic.difficulty = difficulty;
            let err = runner
                .evaluate(i, &WisdomCorpus::default(), &NoJudge)
                .unwrap_err();
            assert!(matches!(err, ReviewError::InvalidInput(_)));
        }
    }

    #[test]
    fn test_soft_deadline_interrupts_between_stages() {
        let clock = crate::clock::ManualClock::new();
        clock.set(std::time::Duration::from_secs(30));
        let runner = PipelineRunner::new(vec![Box::new(Recorder("0.a"))]);
        let err = runner
            .evaluate_with(input(1.0), &WisdomCorpus::default(), &NoJudge, &clock, Some(25.0))
            .unwrap_err();
        assert!(err.is_soft_timeout());
    }
}
