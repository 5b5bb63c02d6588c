use std::time::Duration;

/// Error enum for every failure the orchestrator can observe.
///
/// Categories:
/// - Soft: a worker degrades to zero findings, Run still completes
/// - Worker-hard: the Run is marked failed, the job proceeds without it
/// - Job-fatal: only when raised by the merge stage or job creation
/// - Caller: bad input rejected before anything is written
#[derive(Debug, thiserror::Error)]
pub enum GolemError {
    // Soft
    #[error("Model run did not complete within {0:?}")]
    ModelTimeout(Duration),

    #[error("Unparsable model output: {0}")]
    Parse(String),

    // Transport / collaborators
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unexpected model response: {0}")]
    UnexpectedResponse(String),

    #[error("Model run ended with status '{0}'")]
    ModelRunFailed(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Unknown analysis type '{0}'")]
    UnknownAnalysisType(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Optimizer is shutting down; no new jobs are accepted")]
    ShuttingDown,

    // Caller
    #[error("Invalid parent optimization: {0}")]
    InvalidParent(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl GolemError {
    /// Returns true if the error should degrade a worker to zero findings
    /// while still completing its Run.
    pub fn is_soft(&self) -> bool {
        matches!(self, GolemError::ModelTimeout(_) | GolemError::Parse(_))
    }

    /// Returns true if the error was raised by rejecting caller input.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            GolemError::InvalidParent(_) | GolemError::InvalidInput(_) | GolemError::Config(_)
        )
    }
}

pub type Result<T, E = GolemError> = std::result::Result<T, E>;
