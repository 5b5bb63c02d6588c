use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::ExecutionConfig;
use crate::golem_error::{GolemError, Result};
use crate::model::{AssistantKind, ModelRunStatus, ModelService};
use crate::{log_debug, log_warn};

/// Deadline and interval for polling one model run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollSettings {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollSettings {
    pub fn worker(config: &ExecutionConfig) -> Self {
        Self {
            timeout: config.worker_timeout(),
            interval: config.poll_interval(),
        }
    }

    pub fn apply(config: &ExecutionConfig) -> Self {
        Self {
            timeout: config.apply_timeout(),
            interval: config.poll_interval(),
        }
    }
}

/// One throwaway conversation with the model service.
///
/// Close explicitly with `close()`. If the guard is dropped while still open
/// (the owning future was cancelled or panicked), the close is spawned onto
/// the current runtime instead.
pub struct Session<M: ModelService + 'static> {
    id: String,
    model: Arc<M>,
    open: bool,
}

impl<M: ModelService + 'static> Session<M> {
    pub async fn open(model: &Arc<M>) -> Result<Self> {
        let id = model.open_session().await?;
        log_debug!("[session] Opened {}", id);
        Ok(Self {
            id,
            model: Arc::clone(model),
            open: true,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn close(mut self) -> Result<()> {
        self.open = false;
        let result = self.model.close_session(&self.id).await;
        log_debug!("[session] Closed {} (ok={})", self.id, result.is_ok());
        result
    }
}

impl<M: ModelService + 'static> Drop for Session<M> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        let id = std::mem::take(&mut self.id);
        let model = Arc::clone(&self.model);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = model.close_session(&id).await {
                        log_warn!("[session] Failed to close abandoned session {}: {}", id, e);
                    }
                });
            }
            Err(_) => log_warn!("[session] Session {} dropped outside a runtime, left open", id),
        }
    }
}

/// Run `body` inside a fresh session and close the session on every exit path.
///
/// A body error wins over a close error; a close error after a successful
/// body is returned as the result.
pub async fn with_session<M, F, Fut, T>(model: &Arc<M>, body: F) -> Result<T>
where
    M: ModelService + 'static,
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let session = Session::open(model).await?;
    let result = body(session.id().to_string()).await;
    let closed = session.close().await;

    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            log_warn!("[session] Close failed after body error: {}", close_err);
            Err(e)
        }
    }
}

/// Post `prompt`, run the assistant for `kind`, wait for it, and return its reply.
///
/// Polling stops with `ModelTimeout` once `poll.timeout` has elapsed since
/// the run was started, or with `Cancelled` when `cancel` fires. Neither
/// affects any other session.
pub async fn run_assistant<M: ModelService>(
    model: &M,
    session_id: &str,
    kind: AssistantKind,
    prompt: &str,
    poll: PollSettings,
    cancel: &CancellationToken,
) -> Result<String> {
    model.post_user_message(session_id, prompt).await?;
    let run_id = model.start_run(session_id, kind).await?;
    log_debug!("[session] {} started run {} in {}", kind, run_id, session_id);

    let polling = async {
        loop {
            match model.poll_run(session_id, &run_id).await? {
                ModelRunStatus::Completed => return Ok(()),
                ModelRunStatus::Failed(status) => return Err(GolemError::ModelRunFailed(status)),
                ModelRunStatus::Pending => tokio::time::sleep(poll.interval).await,
            }
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(GolemError::Cancelled),
        waited = tokio::time::timeout(poll.timeout, polling) => match waited {
            Ok(result) => result?,
            Err(_) => return Err(GolemError::ModelTimeout(poll.timeout)),
        },
    }

    model.read_latest_assistant_message(session_id).await
}
