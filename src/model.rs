use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use crate::golem_error::{GolemError, Result};
use crate::types::AnalysisType;

/// Which assistant a model run is started against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssistantKind {
    Analysis(AnalysisType),
    Apply,
}

impl std::fmt::Display for AssistantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssistantKind::Analysis(t) => write!(f, "{}", t),
            AssistantKind::Apply => write!(f, "apply"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelRunStatus {
    Pending,
    Completed,
    /// Terminal non-success status reported by the service.
    Failed(String),
}

/// Stateful conversation API of the external model service.
///
/// Trait so the orchestrator can be driven by `MockModelService` in tests.
pub trait ModelService: Send + Sync {
    fn open_session(&self) -> impl Future<Output = Result<String>> + Send;

    fn close_session(&self, session_id: &str) -> impl Future<Output = Result<()>> + Send;

    fn post_user_message(
        &self,
        session_id: &str,
        text: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Start a run and return its handle.
    fn start_run(
        &self,
        session_id: &str,
        kind: AssistantKind,
    ) -> impl Future<Output = Result<String>> + Send;

    fn poll_run(
        &self,
        session_id: &str,
        run_id: &str,
    ) -> impl Future<Output = Result<ModelRunStatus>> + Send;

    fn read_latest_assistant_message(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<String>> + Send;
}

// --- Mock ---

/// Scripted behavior of one assistant in `MockModelService`.
#[derive(Clone, Debug)]
pub enum MockReply {
    /// Complete after `delay`, answering with `text`.
    Respond { text: String, delay: Duration },
    /// Stay pending forever.
    NeverCompletes,
    /// Report a terminal failure status when polled.
    RunFails(String),
    /// Fail the poll call itself, as a network error would.
    TransportError(String),
}

impl MockReply {
    pub fn text(text: &str) -> Self {
        MockReply::Respond {
            text: text.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(text: &str, delay: Duration) -> Self {
        MockReply::Respond {
            text: text.to_string(),
            delay,
        }
    }
}

struct MockRun {
    id: String,
    kind: AssistantKind,
    started: tokio::time::Instant,
}

#[derive(Default)]
struct MockSession {
    messages: Vec<String>,
    run: Option<MockRun>,
}

#[derive(Default)]
struct MockState {
    next_id: u64,
    sessions: HashMap<String, MockSession>,
    opened: usize,
    closed: usize,
    /// (assistant, prompt) for every started run.
    started: Vec<(AssistantKind, String)>,
}

/// Mock model service for orchestration tests.
///
/// Analysis assistants answer `{"suggestions": []}` and the apply assistant
/// answers `"Revised prompt"` unless scripted otherwise with `reply`.
pub struct MockModelService {
    replies: HashMap<AssistantKind, MockReply>,
    fail_open: bool,
    state: Mutex<MockState>,
}

impl Default for MockModelService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockModelService {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            fail_open: false,
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn reply(mut self, kind: AssistantKind, reply: MockReply) -> Self {
        self.replies.insert(kind, reply);
        self
    }

    /// Every `open_session` call fails.
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    fn reply_for(&self, kind: AssistantKind) -> MockReply {
        self.replies.get(&kind).cloned().unwrap_or_else(|| match kind {
            AssistantKind::Analysis(_) => MockReply::text(r#"{"suggestions": []}"#),
            AssistantKind::Apply => MockReply::text("Revised prompt"),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MockState>> {
        self.state
            .lock()
            .map_err(|_| GolemError::Session("mock state poisoned".to_string()))
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.lock().map(|s| s.opened).unwrap_or(0)
    }

    pub fn sessions_closed(&self) -> usize {
        self.state.lock().map(|s| s.closed).unwrap_or(0)
    }

    /// Prompts sent to runs of `kind`, in start order.
    pub fn prompts_for(&self, kind: AssistantKind) -> Vec<String> {
        self.state
            .lock()
            .map(|s| {
                s.started
                    .iter()
                    .filter(|(k, _)| *k == kind)
                    .map(|(_, p)| p.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn started_kinds(&self) -> Vec<AssistantKind> {
        self.state
            .lock()
            .map(|s| s.started.iter().map(|(k, _)| *k).collect())
            .unwrap_or_default()
    }
}

impl ModelService for MockModelService {
    async fn open_session(&self) -> Result<String> {
        if self.fail_open {
            return Err(GolemError::Session("mock: open_session refused".to_string()));
        }
        let mut state = self.lock()?;
        state.next_id += 1;
        state.opened += 1;
        let id = format!("thread_{}", state.next_id);
        state.sessions.insert(id.clone(), MockSession::default());
        Ok(id)
    }

    async fn close_session(&self, session_id: &str) -> Result<()> {
        let mut state = self.lock()?;
        state
            .sessions
            .remove(session_id)
            .ok_or_else(|| GolemError::Session(format!("unknown session {}", session_id)))?;
        state.closed += 1;
        Ok(())
    }

    async fn post_user_message(&self, session_id: &str, text: &str) -> Result<()> {
        let mut state = self.lock()?;
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| GolemError::Session(format!("unknown session {}", session_id)))?;
        session.messages.push(text.to_string());
        Ok(())
    }

    async fn start_run(&self, session_id: &str, kind: AssistantKind) -> Result<String> {
        let mut state = self.lock()?;
        state.next_id += 1;
        let run_id = format!("run_{}", state.next_id);
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| GolemError::Session(format!("unknown session {}", session_id)))?;
        let prompt = session.messages.last().cloned().unwrap_or_default();
        session.run = Some(MockRun {
            id: run_id.clone(),
            kind,
            started: tokio::time::Instant::now(),
        });
        state.started.push((kind, prompt));
        Ok(run_id)
    }

    async fn poll_run(&self, session_id: &str, run_id: &str) -> Result<ModelRunStatus> {
        let (kind, started) = {
            let state = self.lock()?;
            let run = state
                .sessions
                .get(session_id)
                .and_then(|s| s.run.as_ref())
                .filter(|r| r.id == run_id)
                .ok_or_else(|| GolemError::Session(format!("unknown run {}", run_id)))?;
            (run.kind, run.started)
        };

        match self.reply_for(kind) {
            MockReply::Respond { delay, .. } => {
                if started.elapsed() >= delay {
                    Ok(ModelRunStatus::Completed)
                } else {
                    Ok(ModelRunStatus::Pending)
                }
            }
            MockReply::NeverCompletes => Ok(ModelRunStatus::Pending),
            MockReply::RunFails(status) => Ok(ModelRunStatus::Failed(status)),
            MockReply::TransportError(msg) => Err(GolemError::UnexpectedStatus {
                status: 503,
                body: msg,
            }),
        }
    }

    async fn read_latest_assistant_message(&self, session_id: &str) -> Result<String> {
        let kind = {
            let state = self.lock()?;
            state
                .sessions
                .get(session_id)
                .and_then(|s| s.run.as_ref())
                .map(|r| r.kind)
                .ok_or_else(|| {
                    GolemError::UnexpectedResponse(format!("no run in session {}", session_id))
                })?
        };

        match self.reply_for(kind) {
            MockReply::Respond { text, .. } => Ok(text),
            _ => Err(GolemError::UnexpectedResponse(
                "no assistant message".to_string(),
            )),
        }
    }
}
