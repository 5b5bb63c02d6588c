use std::collections::HashMap;

use crate::golem_error::{GolemError, Result};
use crate::store::{OptimizationStore, SuggestionFilter, SuggestionStore};
use crate::types::{AnalysisType, Feedback, Finding, Suggestion};

/// Rejected findings of a parent job, grouped by the analysis that produced them.
pub type WrongShots = HashMap<AnalysisType, Vec<Finding>>;

/// Load the parent job's rejected suggestions ("wrong shots").
///
/// Only `user_feedback == -1` counts; accepted or unrated suggestions are ignored.
pub async fn wrong_shots<S: SuggestionStore>(store: &S, parent_id: &str) -> Result<WrongShots> {
    let filter = SuggestionFilter::for_job(parent_id).with_feedback(Feedback::Rejected.value());
    let rejected = store.read_suggestions(&filter).await?;
    Ok(group_rejected(&rejected))
}

/// Record the user's verdict on one suggestion.
///
/// Suggestions stay immutable until their job completes, so feedback on a
/// pending job is refused.
pub async fn review<S>(store: &S, suggestion_id: &str, feedback: Feedback) -> Result<()>
where
    S: OptimizationStore + SuggestionStore,
{
    let suggestion = store.read_suggestion(suggestion_id).await?;
    let job = store.read_optimization(&suggestion.optimization_id).await?;
    if !job.is_completed() {
        return Err(GolemError::InvalidInput(format!(
            "job {} has not completed; suggestion {} cannot be reviewed yet",
            job.id, suggestion_id
        )));
    }
    store.update_suggestion(suggestion_id, feedback.value()).await
}

/// Group rejected suggestions by type, ignoring anything not rejected.
pub fn group_rejected(suggestions: &[Suggestion]) -> WrongShots {
    let mut grouped = WrongShots::new();
    for suggestion in suggestions.iter().filter(|s| s.is_rejected()) {
        grouped
            .entry(suggestion.analysis_type)
            .or_default()
            .push(suggestion.to_finding());
    }
    grouped
}

/// The wrong shots a given worker may see: only its own type.
pub fn wrong_shots_for(wrong_shots: &WrongShots, analysis_type: AnalysisType) -> Vec<Finding> {
    wrong_shots
        .get(&analysis_type)
        .cloned()
        .unwrap_or_default()
}
