//! Work-log review scheduler: the layer that invokes the pipeline.
//!
//! Loads entry snapshots from an [`EntryStore`], runs the standard pipeline
//! under the soft and hard time limits, retries generic failures and
//! commits a [`DecisionRecord`] with a conditional write that yields to
//! admin overrides.

pub mod config;
pub mod job;
pub mod scheduler;
pub mod store;
pub mod telemetry;

pub use config::{ConfigError, JudgeBackend, ReviewConfig};
pub use job::JobFixture;
pub use scheduler::{JobOutcome, RetryPolicy, ReviewScheduler, SchedulerError, TimeLimits};
pub use store::{AnalysisStatus, DecisionRecord, EntryStore, InMemoryStore, LoadedEntry, StoreError};
