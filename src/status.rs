use crate::golem_error::Result;
use crate::ledger;
use crate::store::{OptimizationStore, RunStore, SuggestionFilter, SuggestionStore};
use crate::types::{AnalysisState, Optimization, Run, Suggestion};

/// Project a job's runs onto per-analysis completion flags.
///
/// A slot is true once its Run reaches a terminal state, whether completed
/// or failed. Missing runs leave their slot false.
pub fn project(runs: &[Run]) -> Result<AnalysisState> {
    ledger::check_run_count(runs)?;

    let mut state = AnalysisState::default();
    for run in runs {
        state.set(run.analysis_type, run.state.is_terminal());
    }
    Ok(state)
}

/// Current progress of a job, read from the run ledger.
///
/// Runs with an analysis type outside the fixed set surface as
/// `GolemError::UnknownAnalysisType` from the store.
pub async fn status<S: RunStore>(store: &S, job_id: &str) -> Result<AnalysisState> {
    let runs = ledger::runs_for_job(store, job_id).await?;
    project(&runs)
}

/// Final record and findings of a job, or `None` while it is still pending.
///
/// A job whose runs are all terminal can still be pending here if the
/// merge stage has not finished (or failed); callers keep polling.
pub async fn result<S>(store: &S, job_id: &str) -> Result<Option<(Optimization, Vec<Suggestion>)>>
where
    S: OptimizationStore + SuggestionStore,
{
    let optimization = store.read_optimization(job_id).await?;
    if !optimization.is_completed() {
        return Ok(None);
    }
    let suggestions = store
        .read_suggestions(&SuggestionFilter::for_job(job_id))
        .await?;
    Ok(Some((optimization, suggestions)))
}
