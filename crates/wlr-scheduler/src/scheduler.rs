//! Review scheduler: runs one evaluation job per entry under the soft and
//! hard time limits, retries generic failures, and commits the outcome
//! through the store's conditional write.
//!
//! # Job lifecycle
//!
//! ```text
//! load ─┬─ missing ──────────────→ Dropped
//!       ├─ admin override ───────→ SkippedOverride
//!       └─ run (≤ 1 + retries) ─┬─ terminal ──────→ commit → Committed | Abandoned
//!                               ├─ soft limit ────→ commit → TimedOut
//!                               ├─ hard limit ────→ commit → HardKilled
//!                               └─ generic error ─→ retry … → RetriesExhausted
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument};
use wlr_core::{
    Clock, PipelineRunner, ReviewError, SemanticJudge, SystemClock, TerminalState, HARD_TIME_LIMIT,
    RETRY_COUNT, RETRY_DELAY, SOFT_TIME_LIMIT,
};

use crate::store::{DecisionRecord, EntryStore, StoreError};

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("SCHEDULER/STORE: {0}")]
    Store(#[from] StoreError),

    #[error("SCHEDULER/RECORD: {0}")]
    Record(#[from] ReviewError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeLimits {
    /// Past this, the run is abandoned and a fail-safe flag is written
    pub soft: Duration,
    /// Past this, the run is killed outright
    pub hard: Duration,
}

impl Default for TimeLimits {
    fn default() -> Self {
        Self {
            soft: SOFT_TIME_LIMIT,
            hard: HARD_TIME_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: RETRY_COUNT,
            delay: RETRY_DELAY,
        }
    }
}

/// How one job ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Entry vanished before the run
    Dropped,
    /// Human priority lock: an admin already decided
    SkippedOverride,
    Committed {
        record: DecisionRecord,
        attempts: u32,
    },
    /// An admin override landed first; nothing written. Carries the terminal
    /// state when the run itself had finished.
    Abandoned { terminal: Option<TerminalState> },
    TimedOut { record: DecisionRecord },
    HardKilled { record: DecisionRecord },
    RetriesExhausted {
        record: DecisionRecord,
        attempts: u32,
    },
}

impl JobOutcome {
    /// Record written to the store, if any.
    pub fn record(&self) -> Option<&DecisionRecord> {
        match self {
            JobOutcome::Committed { record, .. }
            | JobOutcome::TimedOut { record }
            | JobOutcome::HardKilled { record }
            | JobOutcome::RetriesExhausted { record, .. } => Some(record),
            _ => None,
        }
    }
}

enum Attempt {
    Finished(TerminalState),
    SoftLimit,
    HardLimit,
    Failed(String),
}

pub struct ReviewScheduler {
    store: Arc<dyn EntryStore>,
    judge: Arc<dyn SemanticJudge>,
    clock: Arc<dyn Clock>,
    pipeline: Arc<PipelineRunner>,
    limits: TimeLimits,
    retry: RetryPolicy,
}

impl ReviewScheduler {
    pub fn new(store: Arc<dyn EntryStore>, judge: Arc<dyn SemanticJudge>) -> Self {
        Self {
            store,
            judge,
            clock: Arc::new(SystemClock::new()),
            pipeline: Arc::new(wlr_stages::standard_pipeline()),
            limits: TimeLimits::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_limits(mut self, limits: TimeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_pipeline(mut self, pipeline: PipelineRunner) -> Self {
        self.pipeline = Arc::new(pipeline);
        self
    }

    /// Evaluate one entry and persist the outcome.
    pub async fn process(&self, entry_id: u64) -> Result<JobOutcome, SchedulerError> {
        let span = info_span!("review_job", entry_id);
        self.process_inner(entry_id).instrument(span).await
    }

    async fn process_inner(&self, entry_id: u64) -> Result<JobOutcome, SchedulerError> {
        let loaded = match self.store.load(entry_id)? {
            Some(loaded) => loaded,
            None => {
                warn!("entry vanished before evaluation, dropping job");
                return Ok(JobOutcome::Dropped);
            }
        };
        if loaded.admin_override {
            info!("entry has an admin override, skipping");
            return Ok(JobOutcome::SkippedOverride);
        }
        let corpus = self.store.wisdom()?;

        let mut attempts = 0;
        let mut last_error = String::new();
        while attempts <= self.retry.max_retries {
            if attempts > 0 {
                info!(attempt = attempts + 1, delay_secs = self.retry.delay.as_secs_f64(), "retrying");
                tokio::time::sleep(self.retry.delay).await;
            }
            attempts += 1;

            match self.attempt(loaded.input.clone(), corpus.clone()).await {
                Attempt::Finished(terminal) => {
                    let record = DecisionRecord::analyzed(&terminal, Utc::now())?;
                    if !self.commit(entry_id, loaded.version, record.clone())? {
                        return Ok(JobOutcome::Abandoned {
                            terminal: Some(terminal),
                        });
                    }
                    info!(decision = %record.decision, confidence = record.confidence, "decision committed");
                    return Ok(JobOutcome::Committed { record, attempts });
                }
                Attempt::SoftLimit => {
                    warn!("soft time limit exceeded, flagging for manual review");
                    let record = DecisionRecord::timed_out(entry_id, Utc::now());
                    if !self.commit(entry_id, loaded.version, record.clone())? {
                        return Ok(JobOutcome::Abandoned { terminal: None });
                    }
                    return Ok(JobOutcome::TimedOut { record });
                }
                Attempt::HardLimit => {
                    error!(limit_secs = self.limits.hard.as_secs_f64(), "hard time limit exceeded, run killed");
                    let record = DecisionRecord::failed(entry_id, "Analysis killed at the hard time limit.", Utc::now());
                    if !self.commit(entry_id, loaded.version, record.clone())? {
                        return Ok(JobOutcome::Abandoned { terminal: None });
                    }
                    return Ok(JobOutcome::HardKilled { record });
                }
                Attempt::Failed(reason) => {
                    warn!(attempt = attempts, error = %reason, "evaluation failed");
                    last_error = reason;
                }
            }
        }

        error!(attempts, error = %last_error, "retry budget exhausted");
        let record = DecisionRecord::failed(
            entry_id,
            &format!("Analysis failed after {} attempts: {}", attempts, last_error),
            Utc::now(),
        );
        if !self.commit(entry_id, loaded.version, record.clone())? {
            return Ok(JobOutcome::Abandoned { terminal: None });
        }
        Ok(JobOutcome::RetriesExhausted { record, attempts })
    }

    /// One pipeline run on the blocking pool. The soft limit applies on the
    /// wall clock around the whole run and, on the injected clock, between
    /// stages. The hard limit only decides when it is not later than the
    /// soft one.
    async fn attempt(&self, input: wlr_core::EvaluationInput, corpus: wlr_core::WisdomCorpus) -> Attempt {
        let pipeline = Arc::clone(&self.pipeline);
        let judge = Arc::clone(&self.judge);
        let clock = Arc::clone(&self.clock);
        let soft_deadline = clock.now_secs() + self.limits.soft.as_secs_f64();

        let mut handle = tokio::task::spawn_blocking(move || {
            pipeline.evaluate_with(input, &corpus, judge.as_ref(), clock.as_ref(), Some(soft_deadline))
        });

        let soft_first = self.limits.soft < self.limits.hard;
        let first_limit = self.limits.soft.min(self.limits.hard);
        let joined = match tokio::time::timeout(first_limit, &mut handle).await {
            Ok(joined) => joined,
            // the blocking thread cannot be cancelled; its late result is dropped with the handle
            Err(_) if soft_first => return Attempt::SoftLimit,
            Err(_) => return Attempt::HardLimit,
        };

        match joined {
            Err(join) => Attempt::Failed(format!("evaluation task aborted: {}", join)),
            Ok(Err(e)) if e.is_soft_timeout() => Attempt::SoftLimit,
            Ok(Err(e)) => Attempt::Failed(e.to_string()),
            Ok(Ok(terminal)) => Attempt::Finished(terminal),
        }
    }

    /// Conditional write. `Ok(false)` means the write lost a race with an
    /// admin and was abandoned.
    fn commit(&self, entry_id: u64, version: u64, record: DecisionRecord) -> Result<bool, SchedulerError> {
        match self.store.commit_if_version(entry_id, version, record) {
            Ok(()) => Ok(true),
            Err(e) if e.is_race() => {
                info!(error = %e, "entry changed during analysis, write abandoned");
                Ok(false)
            }
            Err(StoreError::NotFound(_)) => {
                warn!("entry vanished during analysis, write abandoned");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}
