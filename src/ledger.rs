//! Run ledger: one record per worker invocation, written at start and exit.
//!
//! Store failures here are logged and swallowed; losing a ledger write must
//! not stop the worker it describes.

use crate::golem_error::{GolemError, Result};
use crate::log::job_tag;
use crate::log_warn;
use crate::store::{RunFilter, RunStore};
use crate::types::{AnalysisType, Run, RunState};

/// Terminal state for a worker that exited with `outcome`.
///
/// Soft errors (model timeout, unparsable output) still count as completed.
pub fn terminal_state<T>(outcome: &Result<T>) -> RunState {
    match outcome {
        Ok(_) => RunState::Completed,
        Err(e) if e.is_soft() => RunState::Completed,
        Err(_) => RunState::Failed,
    }
}

/// Insert a running Run for this worker.
pub async fn record_start<S: RunStore>(
    store: &S,
    job_id: &str,
    analysis_type: AnalysisType,
) -> Run {
    let run = Run::started(job_id, analysis_type);
    if let Err(e) = store.insert_run(&run).await {
        log_warn!(
            "{} Failed to record run start: {}",
            job_tag(job_id, Some(analysis_type)),
            e
        );
    }
    run
}

/// Set the Run's terminal state.
pub async fn record_finish<S: RunStore>(store: &S, run: &Run, state: RunState) {
    if let Err(e) = store.update_run(&run.id, state).await {
        log_warn!(
            "{} Failed to record run state {:?}: {}",
            job_tag(&run.optimization_id, Some(run.analysis_type)),
            state,
            e
        );
    }
}

/// All runs recorded for a job.
pub async fn runs_for_job<S: RunStore>(store: &S, job_id: &str) -> Result<Vec<Run>> {
    store.read_runs(&RunFilter::for_job(job_id)).await
}

/// Number of runs per job never exceeds the number of analysis types.
pub fn check_run_count(runs: &[Run]) -> Result<()> {
    for analysis_type in AnalysisType::ALL {
        let count = runs
            .iter()
            .filter(|r| r.analysis_type == analysis_type)
            .count();
        if count > 1 {
            return Err(GolemError::Store(format!(
                "{} runs recorded for analysis type {}",
                count, analysis_type
            )));
        }
    }
    Ok(())
}
