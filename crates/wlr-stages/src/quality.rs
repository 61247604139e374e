//! Stage 2: Quality Risk Router.
//!
//! # Routing
//!
//! ```text
//! risk 0-1 ──────────────────────────────→ fast blend
//! risk 2   ── breaker ok ──→ substance check  ──(fail)──→ fast blend
//! risk 3-4 ── breaker ok ──→ legitimacy check ──(fail)──→ fast blend
//!          └─ breaker tripped ───────────────────────────→ fast blend
//! ```
//!
//! Every route that wanted a judgment and did not get one counts one
//! semantic failure.

use serde_json::json;
use tracing::warn;
use wlr_core::{EvaluationState, PathTaken, Stage, StageContext, StageError, TraceRecord};
use wlr_judge::{extract_judgment, sanitize_input};

use crate::{breaker_skip, prompts};
use crate::risk::{RiskAssessment, RiskLevel, TextMetrics};

pub const ID: &str = "2.quality";

/// Deterministic quality from density, word variety and technical vocabulary.
pub fn fast_blend(metrics: &TextMetrics, threshold: f64) -> f64 {
    let density = if threshold > 0.0 {
        (metrics.chars_per_hour / (2.0 * threshold)).min(1.0)
    } else {
        1.0
    };
    let variety = (metrics.unique_ratio / 0.7).min(1.0);
    let technical = (metrics.technical_hits as f64 / 3.0).min(1.0);
    (0.4 * density + 0.3 * variety + 0.3 * technical).clamp(0.0, 1.0)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct QualityStage;

impl Stage for QualityStage {
    fn id(&self) -> &'static str {
        ID
    }

    fn name(&self) -> &'static str {
        "Quality Risk Router"
    }

    fn consults_judge(&self) -> bool {
        true
    }

    fn run(&self, state: &mut EvaluationState, ctx: &StageContext<'_>) -> Result<(), StageError> {
        let intent = state.intent().unwrap_or_default();
        let input = state.input();
        let hours = input.entry.hours;
        let risk = RiskAssessment::evaluate(&input.entry.description, hours, intent);
        let blend = fast_blend(&risk.metrics, risk.threshold);

        let details = json!({
            "risk_count": risk.count(),
            "risk_level": risk.level,
            "signals": risk.signals,
            "metrics": risk.metrics,
            "fast_blend": blend,
        });

        if risk.level == RiskLevel::Low {
            state.set_quality_score(blend)?;
            state.write_trace(
                ID,
                TraceRecord::new(
                    format!("Quality {:.2} (risk {})", blend, risk.count()),
                    PathTaken::Deterministic,
                    "Low risk: fast heuristic blend, no judgment needed.",
                )
                .with_score(blend)
                .with_details(details),
            );
            return Ok(());
        }

        if state.breaker_tripped() {
            let skipped = breaker_skip(state);
            warn!(entry_id = state.entry_id(), error = %skipped, "quality judgment skipped");
            state.record_semantic_failure();
            state.set_quality_score(blend)?;
            state.write_trace(
                ID,
                TraceRecord::new(
                    format!("Quality {:.2} (risk {}, {})", blend, risk.count(), risk.level),
                    PathTaken::Breaker,
                    format!("{}; fast blend used.", skipped),
                )
                .with_score(blend)
                .with_details(details),
            );
            return Ok(());
        }

        let topic = sanitize_input(&input.topic.name);
        let description = sanitize_input(&input.entry.description);
        let (check, prompt) = match risk.level {
            RiskLevel::Medium => (
                "substance",
                prompts::substance_prompt(&topic, &description, hours, intent),
            ),
            _ => (
                "legitimacy",
                prompts::legitimacy_prompt(&topic, &description, hours, intent, &risk.signals),
            ),
        };

        let reply = ctx.ask(ID, prompt);
        let judged = reply
            .result
            .and_then(|raw| extract_judgment(&raw).map(|j| (j, raw)));

        match judged {
            Ok((judgment, raw)) => {
                state.set_quality_score(judgment.score)?;
                state.write_trace(
                    ID,
                    TraceRecord::new(
                        format!("Quality {:.2} ({} check, risk {})", judgment.score, check, risk.count()),
                        PathTaken::Semantic,
                        format!("Risk {}: {} check answered.", risk.level, check),
                    )
                    .with_score(judgment.score)
                    .with_semantic_output(raw)
                    .with_details(details),
                );
            }
            Err(e) => {
                warn!(entry_id = state.entry_id(), error = %e, check, "quality judgment failed");
                state.record_semantic_failure();
                state.set_quality_score(blend)?;
                state.write_trace(
                    ID,
                    TraceRecord::new(
                        format!("Quality {:.2} (risk {}, {})", blend, risk.count(), risk.level),
                        PathTaken::Fallback,
                        format!("{} check failed ({}); fast blend used.", check, e),
                    )
                    .with_score(blend)
                    .with_details(details),
                );
            }
        }
        Ok(())
    }
}
