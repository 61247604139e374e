//! Deterministic risk signals for the quality router.
//!
//! Four binary signals are evaluated against the description; their count
//! selects the quality path.

use serde::{Deserialize, Serialize};
use wlr_core::Intent;

use crate::keywords::count_technical_markers;

/// Characters per logged hour below which an entry looks thin.
pub const BASE_CHARS_PER_HOUR: f64 = 25.0;

/// Unique-word ratio below which text looks padded.
pub const MIN_UNIQUE_RATIO: f64 = 0.40;

/// Hours at or above which a short description is an extreme mismatch.
pub const LONG_SESSION_HOURS: f64 = 5.0;

/// Word count below which a long session's description is too short.
pub const SHORT_DESCRIPTION_WORDS: usize = 25;

/// Risk level derived from the number of raised signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// 0-1 signals: deterministic fast path
    #[default]
    Low,
    /// 2 signals: semantic substance check
    Medium,
    /// 3-4 signals: semantic legitimacy check
    High,
}

impl RiskLevel {
    pub fn from_count(count: usize) -> Self {
        match count {
            0..=1 => RiskLevel::Low,
            2 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }

    pub fn consults_judge(&self) -> bool {
        !matches!(self, RiskLevel::Low)
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

/// Chars-per-hour threshold scaled for the kind of work. Debugging and
/// project sessions legitimately produce less prose per hour.
pub fn chars_per_hour_threshold(intent: Intent) -> f64 {
    let factor = match intent {
        Intent::DeepLearning => 1.0,
        Intent::Review => 0.8,
        Intent::ProjectWork => 0.6,
        Intent::Debugging => 0.5,
    };
    BASE_CHARS_PER_HOUR * factor
}

/// Raw measurements of a description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextMetrics {
    pub chars: usize,
    pub words: usize,
    pub unique_ratio: f64,
    pub chars_per_hour: f64,
    pub technical_hits: usize,
}

impl TextMetrics {
    pub fn measure(description: &str, hours: f64) -> Self {
        let trimmed = description.trim();
        let chars = trimmed.chars().count();
        let words: Vec<String> = trimmed
            .split_whitespace()
            .map(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .filter(|w| !w.is_empty())
            .collect();
        let unique = words.iter().collect::<std::collections::HashSet<_>>().len();
        let unique_ratio = if words.is_empty() {
            0.0
        } else {
            unique as f64 / words.len() as f64
        };
        let chars_per_hour = if hours > 0.0 {
            chars as f64 / hours
        } else {
            chars as f64
        };

        Self {
            chars,
            words: words.len(),
            unique_ratio,
            chars_per_hour,
            technical_hits: count_technical_markers(trimmed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskAssessment {
    pub metrics: TextMetrics,
    pub threshold: f64,
    pub signals: Vec<String>,
    pub level: RiskLevel,
}

impl RiskAssessment {
    pub fn evaluate(description: &str, hours: f64, intent: Intent) -> Self {
        let metrics = TextMetrics::measure(description, hours);
        let threshold = chars_per_hour_threshold(intent);
        let mut signals = Vec::new();

        if metrics.chars_per_hour < threshold {
            signals.push(format!(
                "low density: {:.0} chars/hour (threshold {:.0})",
                metrics.chars_per_hour, threshold
            ));
        }
        if metrics.unique_ratio < MIN_UNIQUE_RATIO {
            signals.push(format!(
                "repetitive wording: {:.0}% unique words",
                metrics.unique_ratio * 100.0
            ));
        }
        if metrics.technical_hits == 0 {
            signals.push("no technical vocabulary".to_string());
        }
        if hours >= LONG_SESSION_HOURS && metrics.words < SHORT_DESCRIPTION_WORDS {
            signals.push(format!(
                "length mismatch: {} words for {:.1}h",
                metrics.words, hours
            ));
        }

        let level = RiskLevel::from_count(signals.len());
        Self {
            metrics,
            threshold,
            signals,
            level,
        }
    }

    pub fn count(&self) -> usize {
        self.signals.len()
    }
}
