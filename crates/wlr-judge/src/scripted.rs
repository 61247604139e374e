//! Deterministic judge with canned replies per stage.
//!
//! Latency is simulated by advancing a shared [`ManualClock`] when one is
//! attached, or by really sleeping otherwise.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wlr_core::{JudgeError, JudgeRequest, ManualClock, SemanticJudge};

#[derive(Debug, Clone)]
struct Script {
    reply: Result<String, JudgeError>,
    latency: Duration,
}

#[derive(Debug)]
pub struct ScriptedJudge {
    clock: Option<Arc<ManualClock>>,
    scripts: HashMap<String, Script>,
    fallback: Script,
    calls: Mutex<Vec<String>>,
}

impl ScriptedJudge {
    /// A judge with no scripts: every call fails as unavailable.
    pub fn new() -> Self {
        Self {
            clock: None,
            scripts: HashMap::new(),
            fallback: Script {
                reply: Err(JudgeError::Unavailable("no script".to_string())),
                latency: Duration::ZERO,
            },
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<ManualClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Reply to every call from `stage` (a stage id such as "2.quality").
    pub fn respond(self, stage: &str, reply: impl Into<String>) -> Self {
        self.script(stage, Ok(reply.into()), Duration::ZERO)
    }

    pub fn respond_after(self, stage: &str, reply: impl Into<String>, latency: Duration) -> Self {
        self.script(stage, Ok(reply.into()), latency)
    }

    pub fn fail(self, stage: &str, error: JudgeError) -> Self {
        self.script(stage, Err(error), Duration::ZERO)
    }

    pub fn fail_after(self, stage: &str, error: JudgeError, latency: Duration) -> Self {
        self.script(stage, Err(error), latency)
    }

    /// Reply for stages without their own script.
    pub fn otherwise(mut self, reply: impl Into<String>) -> Self {
        self.fallback = Script {
            reply: Ok(reply.into()),
            latency: Duration::ZERO,
        };
        self
    }

    fn script(mut self, stage: &str, reply: Result<String, JudgeError>, latency: Duration) -> Self {
        self.scripts.insert(stage.to_string(), Script { reply, latency });
        self
    }

    /// Stage ids of every call received, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn calls_for(&self, stage: &str) -> usize {
        self.calls().iter().filter(|s| s.as_str() == stage).count()
    }
}

impl Default for ScriptedJudge {
    fn default() -> Self {
        Self::new()
    }
}

impl SemanticJudge for ScriptedJudge {
    fn name(&self) -> &str {
        "scripted"
    }

    fn complete(&self, request: &JudgeRequest) -> Result<String, JudgeError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.stage.to_string());
        }

        let script = self.scripts.get(request.stage).unwrap_or(&self.fallback);
        if !script.latency.is_zero() {
            match &self.clock {
                Some(clock) => clock.advance(script.latency),
                None => std::thread::sleep(script.latency),
            }
        }
        script.reply.clone()
    }
}
