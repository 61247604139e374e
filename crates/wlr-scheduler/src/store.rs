//! Persistence boundary: entry snapshots in, decision records out.
//!
//! Every write is conditional on the version read before the run started
//! and on the entry carrying no admin override (human priority lock).

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use wlr_core::{Decision, EvaluationInput, ReviewError, TerminalState, WisdomCorpus, WisdomCorrection};

/// Trace stored when the soft time limit cut a run short.
pub const TIMEOUT_MESSAGE: &str = "Analysis timed out. Flagged for manual review.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("STORE/NOT_FOUND: entry {0}")]
    NotFound(u64),

    #[error("STORE/LOCKED: entry {0} carries an admin override")]
    Locked(u64),

    #[error("STORE/CONFLICT: entry {entry_id} moved from version {expected} to {found}")]
    Conflict { entry_id: u64, expected: u64, found: u64 },

    #[error("STORE/BACKEND: {0}")]
    Backend(String),
}

impl StoreError {
    /// True when a write was refused because someone else got there first.
    pub fn is_race(&self) -> bool {
        matches!(self, StoreError::Locked(_) | StoreError::Conflict { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Analyzed,
    Timeout,
    Error,
}

/// What gets written back for one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub entry_id: u64,
    pub status: AnalysisStatus,
    pub decision: Decision,
    /// approved | flagged | pending
    pub entry_status: String,
    pub confidence: f64,
    pub semantic_failures: u32,
    pub trace: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    pub analyzed_at: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn analyzed(terminal: &TerminalState, at: DateTime<Utc>) -> Result<Self, ReviewError> {
        Ok(Self {
            entry_id: terminal.entry_id,
            status: AnalysisStatus::Analyzed,
            decision: terminal.decision,
            entry_status: terminal.decision.entry_status().to_string(),
            confidence: terminal.final_confidence,
            semantic_failures: terminal.semantic_failures,
            trace: serde_json::to_value(&terminal.trace)?,
            digest: Some(terminal.digest()?),
            analyzed_at: at,
        })
    }

    /// Fail-safe after the soft limit: flagged at 0%.
    pub fn timed_out(entry_id: u64, at: DateTime<Utc>) -> Self {
        Self::failure(entry_id, AnalysisStatus::Timeout, Decision::Flag, TIMEOUT_MESSAGE, at)
    }

    /// Hard kill or exhausted retries: pending for a human.
    pub fn failed(entry_id: u64, reason: &str, at: DateTime<Utc>) -> Self {
        Self::failure(entry_id, AnalysisStatus::Error, Decision::Pending, reason, at)
    }

    fn failure(
        entry_id: u64,
        status: AnalysisStatus,
        decision: Decision,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            entry_id,
            status,
            decision,
            entry_status: decision.entry_status().to_string(),
            confidence: 0.0,
            semantic_failures: 0,
            trace: json!({ "error": reason }),
            digest: None,
            analyzed_at: at,
        }
    }
}

/// An entry as read at the start of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedEntry {
    pub input: EvaluationInput,
    pub version: u64,
    pub admin_override: bool,
}

pub trait EntryStore: Send + Sync {
    /// `None` when the entry no longer exists.
    fn load(&self, entry_id: u64) -> Result<Option<LoadedEntry>, StoreError>;

    /// Snapshot of the admin correction corpus.
    fn wisdom(&self) -> Result<WisdomCorpus, StoreError>;

    /// Write `record` only if the entry is still at `expected_version` and
    /// carries no admin override.
    fn commit_if_version(
        &self,
        entry_id: u64,
        expected_version: u64,
        record: DecisionRecord,
    ) -> Result<(), StoreError>;
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

#[derive(Debug, Clone)]
struct StoredEntry {
    input: EvaluationInput,
    version: u64,
    admin_override: Option<Decision>,
    record: Option<DecisionRecord>,
}

/// Process-local store used by the CLI and tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<u64, StoredEntry>>,
    corrections: Mutex<Vec<WisdomCorrection>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<u64, StoredEntry>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Backend("entry table poisoned".to_string()))
    }

    /// Insert or replace an entry; returns its new version.
    pub fn insert(&self, input: EvaluationInput) -> Result<u64, StoreError> {
        let mut entries = self.entries()?;
        let id = input.entry.id;
        let version = entries.get(&id).map(|e| e.version + 1).unwrap_or(1);
        entries.insert(
            id,
            StoredEntry {
                input,
                version,
                admin_override: None,
                record: None,
            },
        );
        Ok(version)
    }

    pub fn remove(&self, entry_id: u64) -> Result<bool, StoreError> {
        Ok(self.entries()?.remove(&entry_id).is_some())
    }

    pub fn add_correction(&self, correction: WisdomCorrection) -> Result<(), StoreError> {
        self.corrections
            .lock()
            .map_err(|_| StoreError::Backend("corrections poisoned".to_string()))?
            .push(correction);
        Ok(())
    }

    /// An administrator sets the entry's status by hand.
    pub fn admin_override(&self, entry_id: u64, decision: Decision) -> Result<(), StoreError> {
        let mut entries = self.entries()?;
        let entry = entries.get_mut(&entry_id).ok_or(StoreError::NotFound(entry_id))?;
        entry.admin_override = Some(decision);
        entry.version += 1;
        Ok(())
    }

    pub fn override_of(&self, entry_id: u64) -> Result<Option<Decision>, StoreError> {
        Ok(self.entries()?.get(&entry_id).and_then(|e| e.admin_override))
    }

    pub fn record(&self, entry_id: u64) -> Result<Option<DecisionRecord>, StoreError> {
        Ok(self.entries()?.get(&entry_id).and_then(|e| e.record.clone()))
    }
}

impl EntryStore for InMemoryStore {
    fn load(&self, entry_id: u64) -> Result<Option<LoadedEntry>, StoreError> {
        Ok(self.entries()?.get(&entry_id).map(|e| LoadedEntry {
            input: e.input.clone(),
            version: e.version,
            admin_override: e.admin_override.is_some(),
        }))
    }

    fn wisdom(&self) -> Result<WisdomCorpus, StoreError> {
        let corrections = self
            .corrections
            .lock()
            .map_err(|_| StoreError::Backend("corrections poisoned".to_string()))?
            .clone();
        Ok(WisdomCorpus::new(corrections))
    }

    fn commit_if_version(
        &self,
        entry_id: u64,
        expected_version: u64,
        record: DecisionRecord,
    ) -> Result<(), StoreError> {
        let mut entries = self.entries()?;
        let entry = entries.get_mut(&entry_id).ok_or(StoreError::NotFound(entry_id))?;
        if entry.admin_override.is_some() {
            return Err(StoreError::Locked(entry_id));
        }
        if entry.version != expected_version {
            return Err(StoreError::Conflict {
                entry_id,
                expected: expected_version,
                found: entry.version,
            });
        }
        entry.record = Some(record);
        entry.version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wlr_core::{EntrySnapshot, LearnerSnapshot, TopicSnapshot};

    fn input(id: u64) -> EvaluationInput {
        EvaluationInput {
            entry: EntrySnapshot {
                id,
                hours: 1.0,
                description: "Read the borrow checker chapter".into(),
                blocker: None,
            },
            topic: TopicSnapshot {
                name: "Rust".into(),
                difficulty: 2,
                benchmark_hours: None,
            },
            learner: LearnerSnapshot::default(),
        }
    }

    #[test]
    fn test_commit_requires_matching_version() {
        let store = InMemoryStore::new();
        let v = store.insert(input(1)).unwrap();
        let record = DecisionRecord::timed_out(1, Utc::now());

        assert_eq!(
            store.commit_if_version(1, v + 5, record.clone()),
            Err(StoreError::Conflict {
                entry_id: 1,
                expected: v + 5,
                found: v
            })
        );
        store.commit_if_version(1, v, record).unwrap();
        assert_eq!(store.record(1).unwrap().unwrap().status, AnalysisStatus::Timeout);
    }

    #[test]
    fn test_override_locks_entry() {
        let store = InMemoryStore::new();
        let v = store.insert(input(2)).unwrap();
        store.admin_override(2, Decision::Approve).unwrap();

        let err = store
            .commit_if_version(2, v, DecisionRecord::failed(2, "boom", Utc::now()))
            .unwrap_err();
        assert!(err.is_race());
        assert!(store.record(2).unwrap().is_none());
        assert!(store.load(2).unwrap().unwrap().admin_override);
    }

    #[test]
    fn test_failure_records() {
        let t = DecisionRecord::timed_out(3, Utc::now());
        assert_eq!(t.decision, Decision::Flag);
        assert_eq!(t.entry_status, "flagged");
        assert_eq!(t.confidence, 0.0);
        assert_eq!(t.trace["error"], TIMEOUT_MESSAGE);

        let f = DecisionRecord::failed(3, "retries exhausted", Utc::now());
        assert_eq!(f.status, AnalysisStatus::Error);
        assert_eq!(f.entry_status, "pending");
    }

    #[test]
    fn test_missing_entry() {
        let store = InMemoryStore::new();
        assert!(store.load(9).unwrap().is_none());
        assert_eq!(
            store.commit_if_version(9, 1, DecisionRecord::timed_out(9, Utc::now())),
            Err(StoreError::NotFound(9))
        );
    }
}
