//! Semantic judge contract: one call, one timeout, no retry.
use std::time::Duration;
use thiserror::Error;

use crate::clock::Clock;

/// Why a semantic judgment could not be used. Always non-fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JudgeError {
    #[error("JUDGE/TIMEOUT: no usable reply within {limit_secs:.1}s ({elapsed_secs:.2}s elapsed)")]
    Timeout { limit_secs: f64, elapsed_secs: f64 },

    #[error("JUDGE/UNAVAILABLE: {0}")]
    Unavailable(String),

    #[error("JUDGE/MALFORMED: {0}")]
    Malformed(String),

    #[error("JUDGE/SKIPPED: {0}")]
    Skipped(String),
}

/// A prompt addressed to the judge by one stage.
#[derive(Debug, Clone)]
pub struct JudgeRequest {
    pub stage: &'static str,
    pub prompt: String,
    pub timeout: Duration,
}

impl JudgeRequest {
    pub fn new(stage: &'static str, prompt: impl Into<String>) -> Self {
        Self {
            stage,
            prompt: prompt.into(),
            timeout: crate::SEMANTIC_TIMEOUT,
        }
    }
}

/// The external large-language-model service, treated as an opaque,
/// slow and unreliable capability.
pub trait SemanticJudge: Send + Sync {
    /// Short identifier for logs and traces (e.g. "ollama:llama3.1").
    fn name(&self) -> &str;

    /// Answer one prompt. Implementations should honour `request.timeout`;
    /// the caller enforces it again on the measured elapsed time.
    fn complete(&self, request: &JudgeRequest) -> Result<String, JudgeError>;
}

/// Judge reply plus the wall time the call took.
#[derive(Debug, Clone)]
pub struct TimedReply {
    pub result: Result<String, JudgeError>,
    pub elapsed_secs: f64,
}

/// Invoke the judge once, measuring from just before to just after the call.
/// A reply that arrives after the request's timeout counts as a timeout.
pub fn timed_call(judge: &dyn SemanticJudge, clock: &dyn Clock, request: &JudgeRequest) -> TimedReply {
    let start = clock.now_secs();
    let result = judge.complete(request);
    let elapsed_secs = (clock.now_secs() - start).max(0.0);

    let limit_secs = request.timeout.as_secs_f64();
    let result = match result {
        Ok(_) if elapsed_secs > limit_secs => Err(JudgeError::Timeout {
            limit_secs,
            elapsed_secs,
        }),
        other => other,
    };

    TimedReply {
        result,
        elapsed_secs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    struct SlowEcho<'a> {
        clock: &'a ManualClock,
        delay: Duration,
    }

    impl SemanticJudge for SlowEcho<'_> {
        fn name(&self) -> &str {
            "slow-echo"
        }

        fn complete(&self, request: &JudgeRequest) -> Result<String, JudgeError> {
            self.clock.advance(self.delay);
            Ok(request.prompt.clone())
        }
    }

    #[test]
    fn test_timed_call_measures_latency() {
        let clock = ManualClock::new();
        let judge = SlowEcho {
            clock: &clock,
            delay: Duration::from_millis(2500),
        };
        let reply = timed_call(&judge, &clock, &JudgeRequest::new("test", "hello"));
        assert_eq!(reply.result, Ok("hello".to_string()));
        assert!((reply.elapsed_secs - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_late_reply_is_a_timeout() {
        let clock = ManualClock::new();
        let judge = SlowEcho {
            clock: &clock,
            delay: Duration::from_secs(9),
        };
        let reply = timed_call(&judge, &clock, &JudgeRequest::new("test", "hello"));
        assert!(matches!(reply.result, Err(JudgeError::Timeout { .. })));
        assert!((reply.elapsed_secs - 9.0).abs() < 1e-9);
    }
}
