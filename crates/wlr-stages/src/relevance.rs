//! Stage 3: Relevance Scorer.
//!
//! Always asks the judge, breaker or not. Matching admin corrections from
//! the wisdom corpus go into the prompt as extra context.

use serde_json::json;
use tracing::warn;
use wlr_core::{EvaluationState, PathTaken, Stage, StageContext, StageError, TraceRecord};
use wlr_judge::{extract_judgment, sanitize_input};

use crate::prompts;

pub const ID: &str = "3.relevance";

/// Corrections surfaced per prompt.
pub const WISDOM_LIMIT: usize = 3;

/// Keyword fallback: full topic name, then topic words, then neutral.
pub fn keyword_relevance(topic: &str, description: &str) -> (f64, &'static str) {
    let topic = topic.trim().to_lowercase();
    let text = description.to_lowercase();

    if !topic.is_empty() && text.contains(&topic) {
        return (0.9, "full topic name found");
    }

    let words: Vec<&str> = topic
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2)
        .collect();
    if !words.is_empty() {
        let hits = words.iter().filter(|w| text.contains(*w)).count();
        if hits > 0 {
            let fraction = hits as f64 / words.len() as f64;
            return (0.6 + 0.2 * fraction, "topic words found");
        }
    }

    (0.5, "no topic terms found")
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RelevanceStage;

impl Stage for RelevanceStage {
    fn id(&self) -> &'static str {
        ID
    }

    fn name(&self) -> &'static str {
        "Relevance Scorer"
    }

    fn consults_judge(&self) -> bool {
        true
    }

    fn run(&self, state: &mut EvaluationState, ctx: &StageContext<'_>) -> Result<(), StageError> {
        let input = state.input();
        let topic_name = input.topic.name.clone();
        let description = input.entry.description.clone();
        let prior_entries = input.learner.prior_entries;

        let wisdom = ctx.corpus.matching(&topic_name, WISDOM_LIMIT);
        let prompt = prompts::relevance_prompt(
            &sanitize_input(&topic_name),
            &sanitize_input(&description),
            prior_entries,
            &wisdom,
        );
        let details = json!({
            "wisdom_matches": wisdom.len(),
            "breaker_tripped": state.breaker_tripped(),
        });

        let reply = ctx.ask(ID, prompt);
        let judged = reply
            .result
            .and_then(|raw| extract_judgment(&raw).map(|j| (j, raw)));

        match judged {
            Ok((judgment, raw)) => {
                state.set_relevance_score(judgment.score)?;
                state.write_trace(
                    ID,
                    TraceRecord::new(
                        format!("Relevance {:.2}", judgment.score),
                        PathTaken::Semantic,
                        if judgment.reasoning.is_empty() {
                            "Judge scored topic relevance.".to_string()
                        } else {
                            judgment.reasoning.clone()
                        },
                    )
                    .with_score(judgment.score)
                    .with_semantic_output(raw)
                    .with_details(details),
                );
            }
            Err(e) => {
                warn!(entry_id = state.entry_id(), error = %e, "relevance judgment failed");
                state.record_semantic_failure();
                let (score, tier) = keyword_relevance(&topic_name, &description);
                state.set_relevance_score(score)?;
                state.write_trace(
                    ID,
                    TraceRecord::new(
                        format!("Relevance {:.2} (keyword fallback)", score),
                        PathTaken::Fallback,
                        format!("{}; {}.", e, tier),
                    )
                    .with_score(score)
                    .with_details(details),
                );
            }
        }
        Ok(())
    }
}
