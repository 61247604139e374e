//! Stage Trait: the contract every pipeline stage fulfils
use crate::context::StageContext;
use crate::state::EvaluationState;

/// One ordered step of the evaluation pipeline.
pub trait Stage: Send + Sync {
    /// Trace key, ordered by stage number (ex: "2.quality")
    fn id(&self) -> &'static str;

    /// Human-readable name (ex: "Quality Risk Router")
    fn name(&self) -> &'static str;

    /// Whether the stage may ever call the semantic judge (default: false)
    fn consults_judge(&self) -> bool {
        false
    }

    /// Executes the stage against the shared state. A stage must write its
    /// trace record before returning, including on its fallback paths.
    fn run(&self, state: &mut EvaluationState, ctx: &StageContext<'_>) -> Result<(), StageError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageError {
    /// An output field owned by a stage was written twice
    AlreadyWritten(&'static str),
    /// A field an earlier stage should have produced is absent
    MissingInput(&'static str),
    ExecutionFailed(String),
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::AlreadyWritten(field) => write!(f, "STATE/WRITE_ONCE: {} already written", field),
            Self::MissingInput(field) => write!(f, "STATE/MISSING: {} not produced upstream", field),
            Self::ExecutionFailed(msg) => write!(f, "STAGE/EXEC: {}", msg),
        }
    }
}

impl std::error::Error for StageError {}
