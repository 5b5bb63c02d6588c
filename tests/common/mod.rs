#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use prompt_golem::analytics::Analytics;
use prompt_golem::coordinator::Optimizer;
use prompt_golem::golem_error::Result;
use prompt_golem::memory_store::MemoryStore;
use prompt_golem::model::MockModelService;
use prompt_golem::session::PollSettings;
use prompt_golem::types::{
    AnalysisType, Finding, Optimization, OptimizationState, Suggestion,
};

pub const PROMPT: &str = "You are a helpful assistant. Answer briefly.";

/// Analytics double that remembers every captured `(event, job_id)`.
#[derive(Default)]
pub struct RecordingAnalytics {
    events: Mutex<Vec<(String, String)>>,
}

impl RecordingAnalytics {
    pub fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .map(|e| e.iter().map(|(event, _)| event.clone()).collect())
            .unwrap_or_default()
    }
}

impl Analytics for RecordingAnalytics {
    async fn capture(&self, event: &str, job_id: &str) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push((event.to_string(), job_id.to_string()));
        Ok(())
    }
}

/// Worker polling as configured in production: 100 s deadline, 1 s interval.
///
/// Tests that hit the deadline run with a paused clock.
pub fn worker_poll() -> PollSettings {
    PollSettings {
        timeout: Duration::from_secs(100),
        interval: Duration::from_secs(1),
    }
}

pub fn apply_poll() -> PollSettings {
    PollSettings {
        timeout: Duration::from_secs(120),
        interval: Duration::from_secs(1),
    }
}

pub type TestOptimizer = Optimizer<MemoryStore, MockModelService, RecordingAnalytics>;

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub model: Arc<MockModelService>,
    pub analytics: Arc<RecordingAnalytics>,
    pub optimizer: TestOptimizer,
}

pub fn harness(store: MemoryStore, model: MockModelService) -> Harness {
    let store = Arc::new(store);
    let model = Arc::new(model);
    let analytics = Arc::new(RecordingAnalytics::default());
    let optimizer = Optimizer::with_poll_settings(
        Arc::clone(&store),
        Arc::clone(&model),
        Arc::clone(&analytics),
        worker_poll(),
        apply_poll(),
    );
    Harness {
        store,
        model,
        analytics,
        optimizer,
    }
}

/// JSON reply of an analysis assistant proposing one change to `target`.
pub fn one_finding_reply(target: &str, suggestion: &str) -> String {
    format!(
        r#"{{"suggestions": [{{"target": "{}", "suggestion": "{}", "reasoning": "because"}}]}}"#,
        target, suggestion
    )
}

pub fn completed_job(id: &str) -> Optimization {
    let mut job = Optimization::new(id, PROMPT, "", None);
    job.state = OptimizationState::Completed;
    job.optimized_prompt = "Previously revised".to_string();
    job
}

pub fn suggestion(
    job_id: &str,
    analysis_type: AnalysisType,
    target: &str,
    feedback: i16,
) -> Suggestion {
    let finding = Finding {
        analysis_type,
        target: target.to_string(),
        suggestion: format!("rewrite {}", target),
        reasoning: "earlier run".to_string(),
    };
    let mut suggestion = Suggestion::from_finding(&finding, "run-parent", job_id);
    suggestion.user_feedback = feedback;
    suggestion
}
