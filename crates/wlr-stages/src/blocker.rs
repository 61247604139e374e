//! Stage 4: Blocker Impact Analyzer.
//!
//! Blockers arrive as `"Category: comment"`. Recognized categories earn a
//! deterministic boost; "Other" and unparseable text need a judgment,
//! which the circuit breaker may skip.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use wlr_core::{EvaluationState, PathTaken, Stage, StageContext, StageError, TraceRecord};
use wlr_judge::{extract_judgment, sanitize_input};

use crate::{breaker_skip, prompts};

pub const ID: &str = "4.blocker";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockerCategory {
    Technical,
    Environmental,
    Personal,
    Resource,
    Other,
}

impl BlockerCategory {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "technical" => Some(Self::Technical),
            "environmental" => Some(Self::Environmental),
            "personal" => Some(Self::Personal),
            "resource" | "resources" => Some(Self::Resource),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBlocker {
    None,
    Categorized {
        category: BlockerCategory,
        comment: String,
    },
    Unparseable(String),
}

pub fn parse_blocker(text: Option<&str>) -> ParsedBlocker {
    let text = match text.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return ParsedBlocker::None,
    };

    let (label, comment) = match text.split_once(':') {
        Some((label, comment)) => (label, comment.trim()),
        None => (text, ""),
    };
    match BlockerCategory::from_label(label) {
        Some(category) => ParsedBlocker::Categorized {
            category,
            comment: comment.to_string(),
        },
        None => ParsedBlocker::Unparseable(text.to_string()),
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// 0.15 to 0.20 for a recognized category with a comment, growing with detail.
pub fn commented_boost(comment: &str) -> f64 {
    0.15 + 0.05 * (word_count(comment) as f64 / 12.0).min(1.0)
}

/// 0.05 to 0.10 when the judgment was skipped or failed.
pub fn partial_credit(text: &str) -> f64 {
    0.05 + 0.05 * (word_count(text) as f64 / 10.0).min(1.0)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BlockerStage;

impl Stage for BlockerStage {
    fn id(&self) -> &'static str {
        ID
    }

    fn name(&self) -> &'static str {
        "Blocker Impact"
    }

    fn consults_judge(&self) -> bool {
        true
    }

    fn run(&self, state: &mut EvaluationState, ctx: &StageContext<'_>) -> Result<(), StageError> {
        let input = state.input();
        let parsed = parse_blocker(input.entry.blocker.as_deref());
        let topic = input.topic.name.clone();
        let hours = input.entry.hours;

        let text = match parsed {
            ParsedBlocker::None => {
                state.set_blocker_boost(0.0)?;
                state.write_trace(
                    ID,
                    TraceRecord::new("No blocker reported", PathTaken::Deterministic, "Nothing to weigh.")
                        .with_score(0.0),
                );
                return Ok(());
            }
            ParsedBlocker::Categorized { category, comment } if category != BlockerCategory::Other => {
                let (boost, reason) = if comment.is_empty() {
                    (0.10, format!("{:?} blocker without a comment.", category))
                } else {
                    (
                        commented_boost(&comment),
                        format!("{:?} blocker with a {}-word comment.", category, word_count(&comment)),
                    )
                };
                state.set_blocker_boost(boost)?;
                state.write_trace(
                    ID,
                    TraceRecord::new(format!("Blocker boost {:.2}", boost), PathTaken::Deterministic, reason)
                        .with_score(boost)
                        .with_details(json!({ "category": category })),
                );
                return Ok(());
            }
            ParsedBlocker::Categorized { comment, .. } => {
                if comment.is_empty() {
                    "Other".to_string()
                } else {
                    comment
                }
            }
            ParsedBlocker::Unparseable(text) => text,
        };

        if state.breaker_tripped() {
            let skipped = breaker_skip(state);
            warn!(entry_id = state.entry_id(), error = %skipped, "blocker judgment skipped");
            state.record_semantic_failure();
            let boost = partial_credit(&text);
            state.set_blocker_boost(boost)?;
            state.write_trace(
                ID,
                TraceRecord::new(
                    format!("Blocker boost {:.2} (partial credit)", boost),
                    PathTaken::Breaker,
                    format!("{}; partial credit given.", skipped),
                )
                .with_score(boost),
            );
            return Ok(());
        }

        let prompt = prompts::blocker_prompt(&sanitize_input(&topic), &sanitize_input(&text), hours);
        let reply = ctx.ask(ID, prompt);
        let judged = reply
            .result
            .and_then(|raw| extract_judgment(&raw).map(|j| (j, raw)));

        match judged {
            Ok((judgment, raw)) => {
                let boost = 0.2 * judgment.score;
                state.set_blocker_boost(boost)?;
                state.write_trace(
                    ID,
                    TraceRecord::new(
                        format!("Blocker boost {:.2}", boost),
                        PathTaken::Semantic,
                        format!("Legitimacy judged at {:.2}.", judgment.score),
                    )
                    .with_score(boost)
                    .with_semantic_output(raw),
                );
            }
            Err(e) => {
                warn!(entry_id = state.entry_id(), error = %e, "blocker judgment failed");
                state.record_semantic_failure();
                let boost = partial_credit(&text);
                state.set_blocker_boost(boost)?;
                state.write_trace(
                    ID,
                    TraceRecord::new(
                        format!("Blocker boost {:.2} (partial credit)", boost),
                        PathTaken::Fallback,
                        format!("{}; partial credit given.", e),
                    )
                    .with_score(boost),
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{input_with_blocker, run_stage, state_with_latency};
    use wlr_core::{Intent, ManualClock};
    use wlr_judge::ScriptedJudge;

    #[test]
    fn test_parse_shapes() {
        assert_eq!(parse_blocker(None), ParsedBlocker::None);
        assert_eq!(parse_blocker(Some("  ")), ParsedBlocker::None);
        assert_eq!(
            parse_blocker(Some("Technical: GPU driver crash")),
            ParsedBlocker::Categorized {
                category: BlockerCategory::Technical,
                comment: "GPU driver crash".into()
            }
        );
        assert_eq!(
            parse_blocker(Some("personal")),
            ParsedBlocker::Categorized {
                category: BlockerCategory::Personal,
                comment: String::new()
            }
        );
        assert!(matches!(parse_blocker(Some("my cat sat on the keyboard")), ParsedBlocker::Unparseable(_)));
    }

    #[test]
    fn test_gpu_crash_needs_no_judgment() {
        let judge = ScriptedJudge::new();
        let mut state = state_with_latency(
            input_with_blocker("Technical: GPU driver crash"),
            1.0,
            Intent::DeepLearning,
        );
        run_stage(&BlockerStage, &mut state, &judge, &ManualClock::new());

        let boost = state.blocker_boost().unwrap();
        assert!((0.15..=0.20).contains(&boost), "boost {}", boost);
        assert!(judge.calls().is_empty());
        assert_eq!(state.semantic_failures(), 0);
    }

    #[test]
    fn test_category_without_comment() {
        let mut state = state_with_latency(input_with_blocker("Resource:"), 1.0, Intent::DeepLearning);
        run_stage(&BlockerStage, &mut state, &ScriptedJudge::new(), &ManualClock::new());
        assert_eq!(state.blocker_boost(), Some(0.10));
    }

    #[test]
    fn test_other_is_judged() {
        let judge = ScriptedJudge::new().respond(ID, "Verdict: PASS\nScore: 0.5");
        let mut state = state_with_latency(
            input_with_blocker("Other: power outage in the building"),
            1.0,
            Intent::DeepLearning,
        );
        run_stage(&BlockerStage, &mut state, &judge, &ManualClock::new());

        assert_eq!(judge.calls_for(ID), 1);
        assert!((state.blocker_boost().unwrap() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_breaker_gives_partial_credit() {
        let judge = ScriptedJudge::new().respond(ID, "Score: 1.0");
        let mut state = state_with_latency(
            input_with_blocker("my cat sat on the keyboard"),
            6.5,
            Intent::DeepLearning,
        );
        run_stage(&BlockerStage, &mut state, &judge, &ManualClock::new());

        let boost = state.blocker_boost().unwrap();
        assert!((0.05..=0.10).contains(&boost));
        assert_eq!(judge.calls_for(ID), 0);
        assert_eq!(state.semantic_failures(), 1);
        assert_eq!(state.trace()[ID].path, PathTaken::Breaker);
    }
}
