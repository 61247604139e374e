//! Extraction of structured judgments from free-form judge replies.
//!
//! Expected reply shape (any order, extra prose tolerated):
//!
//! ```text
//! Reasoning: <chain of thought>
//! Score: 0.82            (or 82, 82%, 8/10)
//! Verdict: PASS | CONCERN | FAIL
//! Confidence: 0-100
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use wlr_core::{Intent, JudgeError};

/// Longest reasoning excerpt kept from a reply.
const MAX_REASONING_CHARS: usize = 1000;

lazy_static! {
    static ref SCORE: Regex =
        Regex::new(r"(?i)\bscore\s*[:=]\s*\**\s*(\d{1,3}(?:\.\d+)?)\s*(?:(%)|/\s*(\d{1,3}(?:\.\d+)?))?").unwrap();

    static ref VERDICT: Regex = Regex::new(
        r"(?i)\b(?:verdict|decision)\s*[:=]\s*\**\s*(PASS|CONCERN|FAIL|APPROVE|FLAG|PENDING)\b"
    )
    .unwrap();

    static ref CONFIDENCE: Regex = Regex::new(r"(?i)\bconfidence\s*[:=]\s*(\d{1,3})").unwrap();

    static ref REASONING: Regex = Regex::new(
        r"(?is)(?:reasoning|analysis|assessment)\s*:\s*(.+?)(?:\n\s*(?:verdict|decision|score|confidence|category|intent)\s*[:=]|\z)"
    )
    .unwrap();

    /// `Category: project_work` and friends
    static ref CATEGORY: Regex = Regex::new(
        r#"(?i)\b(?:category|intent|classification|activity)\s*[:=]\s*\**\s*["'`]?([a-z][a-z _-]*[a-z])"#
    )
    .unwrap();

    /// Bare category mentions anywhere in the reply
    static ref CATEGORY_KEYWORD: Regex = Regex::new(
        r"(?i)\b(deep[\s_-]?learning|review|project[\s_-]?work|debugging)\b"
    )
    .unwrap();

    static ref BLANK_LINES: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// Coarse judge verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Pass,
    Concern,
    Fail,
}

impl Verdict {
    fn from_token(token: &str) -> Self {
        match token.to_uppercase().as_str() {
            "PASS" | "APPROVE" => Verdict::Pass,
            "CONCERN" | "FLAG" => Verdict::Concern,
            _ => Verdict::Fail,
        }
    }

    /// Score implied by a verdict, sharpened by the judge's confidence.
    fn implied_score(&self, confidence: Option<f64>) -> f64 {
        match (self, confidence) {
            (Verdict::Pass, Some(c)) => 0.5 + 0.5 * c,
            (Verdict::Pass, None) => 0.85,
            (Verdict::Concern, _) => 0.55,
            (Verdict::Fail, Some(c)) => 0.5 - 0.5 * c,
            (Verdict::Fail, None) => 0.2,
        }
    }
}

/// A judge reply reduced to a unit score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    /// 0.0 ..= 1.0
    pub score: f64,
    pub verdict: Option<Verdict>,
    /// 0.0 ..= 1.0
    pub confidence: Option<f64>,
    pub reasoning: String,
}

/// Read a unit score from a reply: an explicit `Score:` wins, then the
/// verdict (with confidence if given). Anything else is malformed.
pub fn extract_judgment(response: &str) -> Result<Judgment, JudgeError> {
    let response = response.trim();
    if response.is_empty() {
        return Err(JudgeError::Malformed("empty reply".to_string()));
    }

    let verdict = VERDICT
        .captures(response)
        .map(|c| Verdict::from_token(&c[1]));
    let confidence = CONFIDENCE
        .captures(response)
        .and_then(|c| c[1].parse::<f64>().ok())
        .map(|c| c.clamp(0.0, 100.0) / 100.0);

    let score = match SCORE.captures(response) {
        Some(caps) => {
            let raw: f64 = caps[1]
                .parse()
                .map_err(|_| JudgeError::Malformed(format!("unreadable score '{}'", &caps[1])))?;
            let denominator = caps.get(3).and_then(|d| d.as_str().parse::<f64>().ok());
            scale_score(raw, caps.get(2).is_some(), denominator)?
        }
        None => match verdict {
            Some(v) => v.implied_score(confidence),
            None => {
                return Err(JudgeError::Malformed(
                    "reply carries neither a score nor a verdict".to_string(),
                ))
            }
        },
    };

    Ok(Judgment {
        score: score.clamp(0.0, 1.0),
        verdict,
        confidence,
        reasoning: extract_reasoning(response),
    })
}

/// Bring a raw score onto [0, 1]. Bare values above 1 are read as
/// percentages only when whole; `7.5` or `1.5` is an unknown scale.
fn scale_score(raw: f64, percent: bool, denominator: Option<f64>) -> Result<f64, JudgeError> {
    let out_of_range = || JudgeError::Malformed(format!("score {} out of range", raw));
    match denominator {
        Some(d) if d > 0.0 && raw <= d => Ok(raw / d),
        Some(d) => Err(JudgeError::Malformed(format!("score {}/{} out of range", raw, d))),
        None if percent => {
            if raw <= 100.0 {
                Ok(raw / 100.0)
            } else {
                Err(out_of_range())
            }
        }
        None if raw <= 1.0 => Ok(raw),
        None if raw <= 100.0 && raw.fract() == 0.0 => Ok(raw / 100.0),
        None => Err(out_of_range()),
    }
}

/// Category pulled from a classification reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryMatch {
    pub intent: Intent,
    /// "structured" or "keyword"
    pub method: &'static str,
}

/// Structured `Category:` line first. The keyword scan runs only when the
/// reply has no such line, and only counts when exactly one category is
/// mentioned. A structured label outside the four categories is malformed.
pub fn extract_category(response: &str) -> Result<CategoryMatch, JudgeError> {
    let mut labels = Vec::new();
    for caps in CATEGORY.captures_iter(response) {
        // "Category: review of last week's notes" should still read as review
        let label = caps[1].trim();
        let words: Vec<&str> = label.split_whitespace().collect();
        let candidates = [
            label.to_string(),
            words.iter().take(2).copied().collect::<Vec<_>>().join(" "),
            words.first().copied().unwrap_or_default().to_string(),
        ];
        if let Some(intent) = candidates.iter().find_map(|c| Intent::from_label(c)) {
            return Ok(CategoryMatch {
                intent,
                method: "structured",
            });
        }
        labels.push(label.to_string());
    }
    if !labels.is_empty() {
        return Err(JudgeError::Malformed(format!(
            "category '{}' is not one of the four intents",
            labels.join("', '")
        )));
    }

    let mut mentioned: Vec<Intent> = CATEGORY_KEYWORD
        .captures_iter(response)
        .filter_map(|c| Intent::from_label(&c[1]))
        .collect();
    mentioned.sort();
    mentioned.dedup();

    match mentioned.as_slice() {
        [only] => Ok(CategoryMatch {
            intent: *only,
            method: "keyword",
        }),
        [] => Err(JudgeError::Malformed(
            "no recognised category in reply".to_string(),
        )),
        _ => Err(JudgeError::Malformed(format!(
            "ambiguous reply mentions {} categories",
            mentioned.len()
        ))),
    }
}

fn extract_reasoning(response: &str) -> String {
    let reasoning = match REASONING.captures(response) {
        Some(caps) => caps[1].trim().to_string(),
        None => match VERDICT.find(response) {
            Some(m) => response[..m.start()].trim().to_string(),
            None => response.to_string(),
        },
    };

    let reasoning = BLANK_LINES.replace_all(&reasoning, "\n\n").trim().to_string();
    if reasoning.chars().count() > MAX_REASONING_CHARS {
        let cut: String = reasoning.chars().take(MAX_REASONING_CHARS).collect();
        format!("{}...", cut)
    } else {
        reasoning
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_score_wins() {
        let j = extract_judgment("Reasoning: solid detail.\nScore: 0.72\nVerdict: FAIL").unwrap();
        assert!((j.score - 0.72).abs() < 1e-9);
        assert_eq!(j.verdict, Some(Verdict::Fail));
        assert_eq!(j.reasoning, "solid detail.");
    }

    #[test]
    fn test_percent_scores() {
        assert!((extract_judgment("Score: 64%").unwrap().score - 0.64).abs() < 1e-9);
        assert!((extract_judgment("score = 90").unwrap().score - 0.9).abs() < 1e-9);
        assert!(extract_judgment("Score: 250").is_err());
    }

    #[test]
    fn test_fraction_scores() {
        assert!((extract_judgment("Score: 8/10").unwrap().score - 0.8).abs() < 1e-9);
        assert!((extract_judgment("Score: 3.5 / 5").unwrap().score - 0.7).abs() < 1e-9);
        assert!(matches!(extract_judgment("Score: 12/10"), Err(JudgeError::Malformed(_))));
        assert!(matches!(extract_judgment("Score: 4/0"), Err(JudgeError::Malformed(_))));
    }

    #[test]
    fn test_fractional_score_above_one_is_malformed() {
        assert!(matches!(extract_judgment("Score: 1.5"), Err(JudgeError::Malformed(_))));
        assert!(matches!(extract_judgment("Score: 7.5\nVerdict: PASS"), Err(JudgeError::Malformed(_))));
        assert!((extract_judgment("Score: 1").unwrap().score - 1.0).abs() < 1e-9);
        assert!((extract_judgment("Score: 62.5%").unwrap().score - 0.625).abs() < 1e-9);
    }

    #[test]
    fn test_verdict_with_confidence() {
        let j = extract_judgment("Reasoning: fine\nVerdict: PASS\nConfidence: 80").unwrap();
        assert!((j.score - 0.9).abs() < 1e-9);

        let j = extract_judgment("Verdict: FAIL\nConfidence: 80").unwrap();
        assert!((j.score - 0.1).abs() < 1e-9);

        let j = extract_judgment("Decision: FLAG").unwrap();
        assert!((j.score - 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_reply() {
        assert!(matches!(
            extract_judgment("I think it is probably fine."),
            Err(JudgeError::Malformed(_))
        ));
        assert!(matches!(extract_judgment("   "), Err(JudgeError::Malformed(_))));
    }

    #[test]
    fn test_category_structured() {
        let m = extract_category("Reasoning: fixing a crash is debugging work.\nCategory: Debugging").unwrap();
        assert_eq!(m.intent, Intent::Debugging);
        assert_eq!(m.method, "structured");

        let m = extract_category("Intent: project-work").unwrap();
        assert_eq!(m.intent, Intent::ProjectWork);

        let m = extract_category("Category: review of last week's notes").unwrap();
        assert_eq!(m.intent, Intent::Review);
    }

    #[test]
    fn test_category_keyword_scan() {
        let m = extract_category("This reads like deep learning of new material.").unwrap();
        assert_eq!(m.intent, Intent::DeepLearning);
        assert_eq!(m.method, "keyword");
    }

    #[test]
    fn test_category_out_of_enum_or_ambiguous() {
        assert!(extract_category("Category: gardening").is_err());
        assert!(matches!(
            extract_category("Reasoning: reads like a review of garden tips.\nCategory: gardening"),
            Err(JudgeError::Malformed(_))
        ));
        assert!(extract_category("Either review or debugging, hard to say").is_err());
        assert!(extract_category("").is_err());
    }
}
