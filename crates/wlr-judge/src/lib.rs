//! Semantic judge backends and reply extraction.
//!
//! # Backends
//!
//! - [`OllamaJudge`]: local Ollama HTTP API, one blocking request per call
//! - [`ScriptedJudge`]: canned replies and simulated latency, for tests
//! - [`UnavailableJudge`]: every call fails, for offline runs
//!
//! Judge replies are free-form text. [`extract`] turns them into scores and
//! categories; [`sanitize`] cleans learner text before it enters a prompt.

pub mod extract;
pub mod ollama;
pub mod sanitize;
pub mod scripted;

pub use extract::{extract_category, extract_judgment, CategoryMatch, Judgment, Verdict};
pub use ollama::OllamaJudge;
pub use sanitize::sanitize_input;
pub use scripted::ScriptedJudge;

use wlr_core::{JudgeError, JudgeRequest, SemanticJudge};

/// Judge that is never reachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableJudge;

impl SemanticJudge for UnavailableJudge {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn complete(&self, _request: &JudgeRequest) -> Result<String, JudgeError> {
        Err(JudgeError::Unavailable("semantic judge disabled".to_string()))
    }
}
