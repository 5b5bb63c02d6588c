use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::analytics::{self, capture_logged, Analytics};
use crate::apply;
use crate::config::ExecutionConfig;
use crate::feedback::{self, WrongShots};
use crate::golem_error::{GolemError, Result};
use crate::log::job_tag;
use crate::model::ModelService;
use crate::session::PollSettings;
use crate::status;
use crate::store::Store;
use crate::types::{
    AnalysisState, AnalysisType, Feedback, Finding, Optimization, OptimizationUpdate, Suggestion,
};
use crate::worker::{self, WorkerParams};
use crate::{log_error, log_info, log_warn};

/// Collaborators and timing shared by every job.
struct JobContext<S, M, A> {
    store: Arc<S>,
    model: Arc<M>,
    analytics: Arc<A>,
    worker_poll: PollSettings,
    apply_poll: PollSettings,
    cancel: CancellationToken,
}

/// Owns the lifecycle of optimization jobs.
///
/// `submit` persists the job and hands the rest of the workflow to a
/// task tracker; the caller follows progress with `status` and `result`.
pub struct Optimizer<S, M, A> {
    ctx: Arc<JobContext<S, M, A>>,
    tracker: TaskTracker,
}

impl<S, M, A> Optimizer<S, M, A>
where
    S: Store + 'static,
    M: ModelService + 'static,
    A: Analytics + 'static,
{
    pub fn new(store: Arc<S>, model: Arc<M>, analytics: Arc<A>, execution: &ExecutionConfig) -> Self {
        Self::with_poll_settings(
            store,
            model,
            analytics,
            PollSettings::worker(execution),
            PollSettings::apply(execution),
        )
    }

    pub fn with_poll_settings(
        store: Arc<S>,
        model: Arc<M>,
        analytics: Arc<A>,
        worker_poll: PollSettings,
        apply_poll: PollSettings,
    ) -> Self {
        Self {
            ctx: Arc::new(JobContext {
                store,
                model,
                analytics,
                worker_poll,
                apply_poll,
                cancel: CancellationToken::new(),
            }),
            tracker: TaskTracker::new(),
        }
    }

    /// Token that aborts model polling in every running worker when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.ctx.cancel.clone()
    }

    /// Create a pending job and schedule its workflow. Returns the job id.
    ///
    /// Fails without scheduling anything after `shutdown`, if the prompt is
    /// blank, if the parent is missing or not completed, or if the job record
    /// cannot be inserted.
    pub async fn submit(
        &self,
        original_prompt: &str,
        instructions: &str,
        parent_id: Option<&str>,
    ) -> Result<String> {
        if self.tracker.is_closed() {
            return Err(GolemError::ShuttingDown);
        }
        if original_prompt.trim().is_empty() {
            return Err(GolemError::InvalidInput("prompt is empty".to_string()));
        }
        if let Some(parent_id) = parent_id {
            self.check_parent(parent_id).await?;
        }

        let job_id = uuid::Uuid::new_v4().to_string();
        let optimization = Optimization::new(&job_id, original_prompt, instructions, parent_id);
        self.ctx.store.insert_optimization(&optimization).await?;

        log_info!(
            "{} Submitted{}",
            job_tag(&job_id, None),
            parent_id
                .map(|p| format!(" (regenerating {})", p))
                .unwrap_or_default()
        );

        let ctx = Arc::clone(&self.ctx);
        self.tracker.spawn(async move {
            capture_logged(
                ctx.analytics.as_ref(),
                analytics::EVENT_REQUESTED,
                &optimization.id,
            )
            .await;
            // Errors are logged inside; the job record is the only output.
            let _ = ctx.run(&optimization).await;
        });

        Ok(job_id)
    }

    /// Run a job's workflow in the current task and wait for it.
    pub async fn run(&self, optimization: &Optimization) -> Result<()> {
        self.ctx.run(optimization).await
    }

    pub async fn status(&self, job_id: &str) -> Result<AnalysisState> {
        status::status(self.ctx.store.as_ref(), job_id).await
    }

    pub async fn result(&self, job_id: &str) -> Result<Option<(Optimization, Vec<Suggestion>)>> {
        status::result(self.ctx.store.as_ref(), job_id).await
    }

    /// Record the user's verdict on one suggestion of a completed job.
    pub async fn review(&self, suggestion_id: &str, feedback: Feedback) -> Result<()> {
        feedback::review(self.ctx.store.as_ref(), suggestion_id, feedback).await
    }

    /// Stop accepting jobs and wait for every scheduled job to finish.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    async fn check_parent(&self, parent_id: &str) -> Result<()> {
        let parent = match self.ctx.store.read_optimization(parent_id).await {
            Ok(parent) => parent,
            Err(GolemError::NotFound(_)) => {
                return Err(GolemError::InvalidParent(format!("{} does not exist", parent_id)))
            }
            Err(e) => return Err(e),
        };
        if !parent.is_completed() {
            return Err(GolemError::InvalidParent(format!(
                "{} has not completed",
                parent_id
            )));
        }
        Ok(())
    }
}

impl<S, M, A> JobContext<S, M, A>
where
    S: Store + 'static,
    M: ModelService + 'static,
    A: Analytics + 'static,
{
    /// Wrong shots → fan out all analyses → join → apply → finalize.
    async fn run(&self, optimization: &Optimization) -> Result<()> {
        let job_id = optimization.id.as_str();
        let tag = job_tag(job_id, None);

        let wrong_shots = match optimization.parent_id.as_deref() {
            Some(parent_id) => match feedback::wrong_shots(self.store.as_ref(), parent_id).await {
                Ok(shots) => shots,
                Err(e) => {
                    log_warn!("{} Could not load rejected suggestions: {}", tag, e);
                    WrongShots::new()
                }
            },
            None => WrongShots::new(),
        };

        let mut findings = self.fan_out(optimization, &wrong_shots).await;
        findings.sort_by_key(|f| f.analysis_type);

        let merged = match apply::apply(
            &self.model,
            job_id,
            &optimization.original_prompt,
            &findings,
            self.apply_poll,
            &self.cancel,
        )
        .await
        {
            Ok(merged) => merged,
            Err(e) => {
                log_error!("{} Apply failed, job left pending: {}", tag, e);
                capture_logged(self.analytics.as_ref(), analytics::EVENT_FAILED, job_id).await;
                return Err(e);
            }
        };

        let update = OptimizationUpdate::completed(&merged, optimization.parent_id.as_deref());
        if let Err(e) = self.store.update_optimization(job_id, &update).await {
            log_error!("{} Failed to store optimized prompt: {}", tag, e);
            capture_logged(self.analytics.as_ref(), analytics::EVENT_FAILED, job_id).await;
            return Err(e);
        }

        capture_logged(self.analytics.as_ref(), analytics::EVENT_COMPLETED, job_id).await;
        log_info!("{} Completed with {} finding(s)", tag, findings.len());
        Ok(())
    }

    /// Launch one worker per analysis type and collect their findings.
    ///
    /// Each worker holds a clone of the sender; the receive loop ends when
    /// the last worker exits and drops its clone.
    async fn fan_out(&self, optimization: &Optimization, wrong_shots: &WrongShots) -> Vec<Finding> {
        let (tx, mut rx) = mpsc::channel(AnalysisType::ALL.len());

        for analysis_type in AnalysisType::ALL {
            let tx = tx.clone();
            let store = Arc::clone(&self.store);
            let model = Arc::clone(&self.model);
            let job_id = optimization.id.clone();
            let original_prompt = optimization.original_prompt.clone();
            let instructions = optimization.instructions.clone();
            let shots = feedback::wrong_shots_for(wrong_shots, analysis_type);
            let poll = self.worker_poll;
            let cancel = self.cancel.child_token();

            tokio::spawn(async move {
                let params = WorkerParams {
                    job_id: &job_id,
                    analysis_type,
                    original_prompt: &original_prompt,
                    instructions: &instructions,
                    wrong_shots: &shots,
                    poll,
                };
                let outcome = worker::suggest(store.as_ref(), &model, &params, &cancel).await;
                let _ = tx.send((analysis_type, outcome)).await;
            });
        }
        drop(tx);

        let mut findings = Vec::new();
        while let Some((analysis_type, outcome)) = rx.recv().await {
            match outcome {
                Ok(found) => findings.extend(found),
                Err(e) => log_warn!(
                    "{} Continuing without findings: {}",
                    job_tag(&optimization.id, Some(analysis_type)),
                    e
                ),
            }
        }
        findings
    }
}
