//! Unified Error Model
use thiserror::Error;

/// Errors that end a pipeline run. Everything else (semantic failures,
/// stage errors) is absorbed into the state and the run continues.
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("INPUT/{0}")]
    InvalidInput(String),

    #[error("TIMEOUT/SOFT: limit reached before stage {stage} ({elapsed_secs:.2}s elapsed)")]
    SoftTimeLimit { stage: &'static str, elapsed_secs: f64 },

    #[error("SERIALIZE/{0}")]
    Serialize(#[from] serde_json::Error),
}

impl ReviewError {
    /// Whether the scheduler should substitute the fail-safe decision.
    pub fn is_soft_timeout(&self) -> bool {
        matches!(self, ReviewError::SoftTimeLimit { .. })
    }
}
