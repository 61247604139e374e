//! Ollama-backed semantic judge.
//!
//! Uses the local Ollama HTTP API (`POST /api/generate`, non-streaming).
//! Pipeline runs are synchronous, so each call is one blocking request
//! bounded by the request's timeout.

use serde::{Deserialize, Serialize};
use tracing::debug;
use wlr_core::{JudgeError, JudgeRequest, SemanticJudge};

/// Default Ollama API endpoint
pub const OLLAMA_DEFAULT_URL: &str = "http://127.0.0.1:11434";

/// Default model
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3.1";

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Clone, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: i32,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Clone)]
pub struct OllamaJudge {
    base_url: String,
    model: String,
    temperature: f32,
    label: String,
}

impl OllamaJudge {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            label: format!("ollama:{}", model),
            model,
            temperature: 0.0,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for OllamaJudge {
    fn default() -> Self {
        Self::new(OLLAMA_DEFAULT_URL, OLLAMA_DEFAULT_MODEL)
    }
}

impl SemanticJudge for OllamaJudge {
    fn name(&self) -> &str {
        &self.label
    }

    fn complete(&self, request: &JudgeRequest) -> Result<String, JudgeError> {
        let limit_secs = request.timeout.as_secs_f64();
        let client = reqwest::blocking::Client::builder()
            .timeout(request.timeout)
            .build()
            .map_err(|e| JudgeError::Unavailable(e.to_string()))?;

        let body = GenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: 400,
            },
        };

        let url = format!("{}/api/generate", self.base_url);
        debug!(stage = request.stage, url = %url, "calling ollama");
        let resp = client.post(&url).json(&body).send().map_err(|e| {
            if e.is_timeout() {
                JudgeError::Timeout {
                    limit_secs,
                    elapsed_secs: limit_secs,
                }
            } else {
                JudgeError::Unavailable(e.to_string())
            }
        })?;

        if !resp.status().is_success() {
            return Err(JudgeError::Unavailable(format!(
                "ollama answered {}",
                resp.status()
            )));
        }

        let parsed: GenerateResponse = resp.json().map_err(|e| {
            if e.is_timeout() {
                JudgeError::Timeout {
                    limit_secs,
                    elapsed_secs: limit_secs,
                }
            } else {
                JudgeError::Malformed(e.to_string())
            }
        })?;

        if !parsed.done || parsed.response.trim().is_empty() {
            return Err(JudgeError::Malformed("incomplete generation".to_string()));
        }
        Ok(parsed.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_label_and_url() {
        let judge = OllamaJudge::new("http://localhost:11434/", "qwen2");
        assert_eq!(judge.name(), "ollama:qwen2");
        assert_eq!(judge.base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_unreachable_server_is_unavailable() {
        // Port 9 (discard) is closed on test machines
        let judge = OllamaJudge::new("http://127.0.0.1:9", "llama3.1");
        let mut request = JudgeRequest::new("test", "hello");
        request.timeout = Duration::from_secs(2);
        let err = judge.complete(&request).unwrap_err();
        assert!(matches!(
            err,
            JudgeError::Unavailable(_) | JudgeError::Timeout { .. }
        ));
    }
}
