//! Data Model: read-only snapshots, intent/decision enums, trace records
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::{APPROVE_THRESHOLD, DEFAULT_BENCHMARK_HOURS, FLAG_THRESHOLD};

// ============================================================================
// CLASSIFICATIONS
// ============================================================================

/// Activity category of an entry, decided by Stage 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Studying new material
    #[default]
    DeepLearning,
    /// Revisiting material already covered
    Review,
    /// Building something
    ProjectWork,
    /// Chasing a defect
    Debugging,
}

impl Intent {
    pub const ALL: [Intent; 4] = [
        Intent::DeepLearning,
        Intent::Review,
        Intent::ProjectWork,
        Intent::Debugging,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::DeepLearning => "deep_learning",
            Intent::Review => "review",
            Intent::ProjectWork => "project_work",
            Intent::Debugging => "debugging",
        }
    }

    /// Parse a label such as `"Deep Learning"`, `"project-work"` or `"debugging"`.
    /// Anything outside the four categories yields `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized: String = label
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();
        match normalized.as_str() {
            "deep_learning" | "deeplearning" => Some(Intent::DeepLearning),
            "review" => Some(Intent::Review),
            "project_work" | "projectwork" => Some(Intent::ProjectWork),
            "debugging" => Some(Intent::Debugging),
            _ => None,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal decision of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Flag,
    /// Needs a human
    #[default]
    Pending,
}

impl Decision {
    /// Apply the decision thresholds to a final (already penalised) confidence.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= APPROVE_THRESHOLD {
            Decision::Approve
        } else if confidence >= FLAG_THRESHOLD {
            Decision::Flag
        } else {
            Decision::Pending
        }
    }

    /// Entry status the persistence layer writes for this decision.
    pub fn entry_status(&self) -> &'static str {
        match self {
            Decision::Approve => "approved",
            Decision::Flag => "flagged",
            Decision::Pending => "pending",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Flag => "flag",
            Decision::Pending => "pending",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SNAPSHOTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySnapshot {
    pub id: u64,
    /// Hours the learner logged
    pub hours: f64,
    /// "What I learned today"
    pub description: String,
    /// Optional `"Category: comment"` text
    #[serde(default)]
    pub blocker: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSnapshot {
    pub name: String,
    /// 1 (easy) to 5 (hard)
    pub difficulty: u8,
    #[serde(default)]
    pub benchmark_hours: Option<f64>,
}

impl TopicSnapshot {
    /// Benchmark hours with the 3.0 default applied to missing or non-positive values.
    pub fn effective_benchmark(&self) -> f64 {
        match self.benchmark_hours {
            Some(h) if h.is_finite() && h > 0.0 => h,
            _ => DEFAULT_BENCHMARK_HOURS,
        }
    }

    /// Difficulty clamped into 1..=5.
    pub fn clamped_difficulty(&self) -> u8 {
        self.difficulty.clamp(1, 5)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LearnerSnapshot {
    pub experience_years: f64,
    /// Average hours of the learner's earlier entries on this topic
    #[serde(default)]
    pub historical_avg_hours: f64,
    /// Number of earlier entries on this topic
    #[serde(default)]
    pub prior_entries: u32,
}

/// Everything the scheduler hands the pipeline for one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationInput {
    pub entry: EntrySnapshot,
    pub topic: TopicSnapshot,
    pub learner: LearnerSnapshot,
}

// ============================================================================
// GLOBAL WISDOM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionType {
    /// Judged suspicious, admin approved
    FalseFlag,
    /// Judged fine, admin flagged
    FalseApprove,
    ContextMiss,
}

/// One admin correction of an earlier automated decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WisdomCorrection {
    pub topic_name: String,
    pub correction_type: CorrectionType,
    pub original_decision: Decision,
    pub corrected_decision: Decision,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Read-only snapshot of the admin-curated correction corpus. Cloning shares
/// the underlying list; admin edits only show up in snapshots taken later.
#[derive(Debug, Clone, Default)]
pub struct WisdomCorpus {
    corrections: Arc<Vec<WisdomCorrection>>,
}

impl WisdomCorpus {
    pub fn new(mut corrections: Vec<WisdomCorrection>) -> Self {
        corrections.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self {
            corrections: Arc::new(corrections),
        }
    }

    pub fn len(&self) -> usize {
        self.corrections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }

    /// Newest corrections whose topic name contains any word (longer than two
    /// characters) of `topic`, case-insensitively. At most `limit` are returned.
    pub fn matching(&self, topic: &str, limit: usize) -> Vec<&WisdomCorrection> {
        let words: Vec<String> = topic
            .to_lowercase()
            .split_whitespace()
            .filter(|w| w.chars().count() > 2)
            .map(str::to_string)
            .collect();
        if words.is_empty() {
            return Vec::new();
        }

        self.corrections
            .iter()
            .filter(|c| {
                let name = c.topic_name.to_lowercase();
                words.iter().any(|w| name.contains(w.as_str()))
            })
            .take(limit)
            .collect()
    }
}

// ============================================================================
// REASONING TRACE
// ============================================================================

/// Which route a stage took to produce its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathTaken {
    /// Pure heuristics, no judge involved
    Deterministic,
    /// Judge answered and its answer was used
    Semantic,
    /// Judge was asked but failed; heuristics substituted
    Fallback,
    /// Circuit breaker was tripped; judge never asked
    Breaker,
    /// Stage itself errored
    Failed,
}

/// One stage's entry in the reasoning trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub path: PathTaken,
    pub path_reason: String,
    /// Raw judge reply, when there was one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl TraceRecord {
    pub fn new(summary: impl Into<String>, path: PathTaken, path_reason: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            score: None,
            path,
            path_reason: path_reason.into(),
            semantic_output: None,
            details: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_semantic_output(mut self, raw: impl Into<String>) -> Self {
        self.semantic_output = Some(raw.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn correction(topic: &str, day: u32) -> WisdomCorrection {
        WisdomCorrection {
            topic_name: topic.to_string(),
            correction_type: CorrectionType::FalseFlag,
            original_decision: Decision::Flag,
            corrected_decision: Decision::Approve,
            reason: format!("{} phrasing is legitimate", topic),
            created_at: Utc.with_ymd_and_hms(2026, 1, day, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_intent_labels() {
        assert_eq!(Intent::from_label("Deep Learning"), Some(Intent::DeepLearning));
        assert_eq!(Intent::from_label("project-work"), Some(Intent::ProjectWork));
        assert_eq!(Intent::from_label(" REVIEW "), Some(Intent::Review));
        assert_eq!(Intent::from_label("debugging"), Some(Intent::Debugging));
        assert_eq!(Intent::from_label("gardening"), None);
    }

    #[test]
    fn test_decision_thresholds() {
        assert_eq!(Decision::from_confidence(100.0), Decision::Approve);
        assert_eq!(Decision::from_confidence(85.0), Decision::Approve);
        assert_eq!(Decision::from_confidence(84.99), Decision::Flag);
        assert_eq!(Decision::from_confidence(70.0), Decision::Flag);
        assert_eq!(Decision::from_confidence(69.99), Decision::Pending);
        assert_eq!(Decision::from_confidence(0.0), Decision::Pending);
    }

    #[test]
    fn test_effective_benchmark_defaults() {
        let mut topic = TopicSnapshot {
            name: "Rust".into(),
            difficulty: 3,
            benchmark_hours: None,
        };
        assert_eq!(topic.effective_benchmark(), 3.0);
        topic.benchmark_hours = Some(-2.0);
        assert_eq!(topic.effective_benchmark(), 3.0);
        topic.benchmark_hours = Some(0.0);
        assert_eq!(topic.effective_benchmark(), 3.0);
        topic.benchmark_hours = Some(4.5);
        assert_eq!(topic.effective_benchmark(), 4.5);
    }

    #[test]
    fn test_corpus_matching_is_or_and_newest_first() {
        let corpus = WisdomCorpus::new(vec![
            correction("React Hooks", 1),
            correction("Python Basics", 2),
            correction("Advanced React", 3),
            correction("Docker", 4),
        ]);

        let hits = corpus.matching("React State Management", 3);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].topic_name, "Advanced React");
        assert_eq!(hits[1].topic_name, "React Hooks");

        // Short words never match on their own
        assert!(corpus.matching("Go", 3).is_empty());
    }

    #[test]
    fn test_corpus_matching_respects_limit() {
        let corpus = WisdomCorpus::new((1..=5).map(|d| correction("Kubernetes", d)).collect());
        assert_eq!(corpus.matching("kubernetes networking", 3).len(), 3);
    }
}
