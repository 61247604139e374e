//! Review configuration, loaded from YAML.
//!
//! Only the judge backend and logging are configurable. Thresholds, timeouts
//! and retry budgets are fixed constants of `wlr-core`.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wlr_core::SemanticJudge;
use wlr_judge::ollama::{OLLAMA_DEFAULT_MODEL, OLLAMA_DEFAULT_URL};
use wlr_judge::{OllamaJudge, UnavailableJudge};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JudgeBackend {
    #[default]
    Ollama,
    /// Every judgment fails; the pipeline runs on heuristics alone
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub backend: JudgeBackend,
    pub ollama_url: String,
    pub model: String,
    pub temperature: f32,
    /// Fallback filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            backend: JudgeBackend::Ollama,
            ollama_url: OLLAMA_DEFAULT_URL.to_string(),
            model: OLLAMA_DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            log_level: "info".to_string(),
        }
    }
}

impl ReviewConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: ReviewConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == JudgeBackend::Ollama && self.ollama_url.trim().is_empty() {
            return Err(ConfigError::Invalid("ollama_url must not be empty".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }
        Ok(())
    }

    pub fn build_judge(&self) -> Arc<dyn SemanticJudge> {
        match self.backend {
            JudgeBackend::Ollama => Arc::new(
                OllamaJudge::new(&self.ollama_url, &self.model).with_temperature(self.temperature),
            ),
            JudgeBackend::Offline => Arc::new(UnavailableJudge),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = ReviewConfig::from_yaml("{}").unwrap();
        assert_eq!(config, ReviewConfig::default());
        assert_eq!(config.build_judge().name(), "ollama:llama3.1");
    }

    #[test]
    fn test_offline_backend() {
        let config = ReviewConfig::from_yaml("backend: offline\nlog_level: debug\n").unwrap();
        assert_eq!(config.backend, JudgeBackend::Offline);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.build_judge().name(), "unavailable");
    }

    #[test]
    fn test_rejects_bad_temperature() {
        let err = ReviewConfig::from_yaml("temperature: 3.5").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_unknown_backend() {
        assert!(matches!(
            ReviewConfig::from_yaml("backend: openai").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }
}
