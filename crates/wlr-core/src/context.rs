//! Stage Context: collaborators shared by every stage of one run
use crate::clock::Clock;
use crate::data_model::WisdomCorpus;
use crate::judge::{timed_call, JudgeRequest, SemanticJudge, TimedReply};

pub struct StageContext<'a> {
    pub judge: &'a dyn SemanticJudge,
    pub clock: &'a dyn Clock,
    pub corpus: &'a WisdomCorpus,
    /// Correlates log lines of one run; never written into the trace
    pub run_id: String,
}

impl<'a> StageContext<'a> {
    pub fn new(judge: &'a dyn SemanticJudge, clock: &'a dyn Clock, corpus: &'a WisdomCorpus) -> Self {
        Self {
            judge,
            clock,
            corpus,
            run_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Single timed semantic call with the standard timeout.
    pub fn ask(&self, stage: &'static str, prompt: impl Into<String>) -> TimedReply {
        let request = JudgeRequest::new(stage, prompt);
        timed_call(self.judge, self.clock, &request)
    }
}
