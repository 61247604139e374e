//! Work-log review core: Evaluation State, Stage contract and Orchestrator.
//!
//! A run threads one [`EvaluationState`] through six ordered stages. Stages may
//! consult an unreliable [`SemanticJudge`]; everything else is deterministic.

pub mod clock;
pub mod context;
pub mod data_model;
pub mod error;
pub mod judge;
pub mod runner;
pub mod stage;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::StageContext;
pub use data_model::{
    CorrectionType, Decision, EntrySnapshot, EvaluationInput, Intent, LearnerSnapshot, PathTaken,
    TopicSnapshot, TraceRecord, WisdomCorpus, WisdomCorrection,
};
pub use error::ReviewError;
pub use judge::{JudgeError, JudgeRequest, SemanticJudge, TimedReply};
pub use runner::PipelineRunner;
pub use stage::{Stage, StageError};
pub use state::{EvaluationState, TerminalState};

use std::time::Duration;

/// Benchmark hours used when a topic has none (or a non-positive one).
pub const DEFAULT_BENCHMARK_HOURS: f64 = 3.0;

/// Per-call timeout for every semantic judgment.
pub const SEMANTIC_TIMEOUT: Duration = Duration::from_secs(8);

/// Stage 0 latency above this many seconds trips the circuit breaker.
pub const BREAKER_TRIP_SECS: f64 = 6.0;

/// Soft limit imposed on a whole run by the scheduler.
pub const SOFT_TIME_LIMIT: Duration = Duration::from_secs(25);

/// Hard limit imposed on a whole run by the scheduler.
pub const HARD_TIME_LIMIT: Duration = Duration::from_secs(30);

/// Retries the scheduler grants a run after a generic failure.
pub const RETRY_COUNT: u32 = 3;

/// Delay between scheduler retries.
pub const RETRY_DELAY: Duration = Duration::from_secs(10);

/// Final confidence at or above which an entry is auto-approved.
pub const APPROVE_THRESHOLD: f64 = 85.0;

/// Final confidence at or above which an entry is flagged (below: pending).
pub const FLAG_THRESHOLD: f64 = 70.0;

/// Upper bound of the blocker-impact boost.
pub const MAX_BLOCKER_BOOST: f64 = 0.2;
