//! Job fixtures: one entry with its topic, learner and correction corpus,
//! as read by `wlr evaluate`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use wlr_core::{EntrySnapshot, EvaluationInput, LearnerSnapshot, TopicSnapshot, WisdomCorrection};

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFixture {
    pub entry: EntrySnapshot,
    pub topic: TopicSnapshot,
    #[serde(default)]
    pub learner: LearnerSnapshot,
    #[serde(default)]
    pub corrections: Vec<WisdomCorrection>,
}

impl JobFixture {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let job: JobFixture = serde_yaml::from_str(yaml)?;
        if !(1..=5).contains(&job.topic.difficulty) {
            return Err(ConfigError::Invalid(format!(
                "topic.difficulty must be 1-5, got {}",
                job.topic.difficulty
            )));
        }
        Ok(job)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn input(&self) -> EvaluationInput {
        EvaluationInput {
            entry: self.entry.clone(),
            topic: self.topic.clone(),
            learner: self.learner.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOB: &str = r#"
entry:
  id: 7
  hours: 2.5
  description: "Wrote a tokio TCP echo server and load-tested it"
  blocker: "Environmental: noisy neighbours"
topic:
  name: Async Rust
  difficulty: 4
  benchmark_hours: 3
learner:
  experience_years: 1.5
  historical_avg_hours: 2.0
  prior_entries: 2
corrections:
  - topic_name: Async Rust
    correction_type: false_flag
    original_decision: flag
    corrected_decision: approve
    reason: Runtime internals count as async work
    created_at: 2024-05-01T10:00:00Z
"#;

    #[test]
    fn test_parses_fixture() {
        let job = JobFixture::from_yaml(JOB).unwrap();
        assert_eq!(job.entry.id, 7);
        assert_eq!(job.topic.benchmark_hours, Some(3.0));
        assert_eq!(job.learner.prior_entries, 2);
        assert_eq!(job.corrections.len(), 1);
        assert_eq!(job.input().entry.blocker.as_deref(), Some("Environmental: noisy neighbours"));
    }

    #[test]
    fn test_rejects_difficulty_out_of_range() {
        let bad = JOB.replace("difficulty: 4", "difficulty: 9");
        assert!(matches!(JobFixture::from_yaml(&bad), Err(ConfigError::Invalid(_))));
    }
}
