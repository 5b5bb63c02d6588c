use std::future::Future;

use crate::golem_error::Result;
use crate::types::{Optimization, OptimizationUpdate, Run, RunState, Suggestion};

/// Selects the runs belonging to one job.
#[derive(Clone, Debug, PartialEq)]
pub struct RunFilter {
    pub optimization_id: String,
}

impl RunFilter {
    pub fn for_job(optimization_id: &str) -> Self {
        Self {
            optimization_id: optimization_id.to_string(),
        }
    }
}

/// Selects suggestions of one job, optionally only those with a given feedback value.
#[derive(Clone, Debug, PartialEq)]
pub struct SuggestionFilter {
    pub optimization_id: String,
    pub user_feedback: Option<i16>,
}

impl SuggestionFilter {
    pub fn for_job(optimization_id: &str) -> Self {
        Self {
            optimization_id: optimization_id.to_string(),
            user_feedback: None,
        }
    }

    pub fn with_feedback(mut self, value: i16) -> Self {
        self.user_feedback = Some(value);
        self
    }

    pub fn matches(&self, suggestion: &Suggestion) -> bool {
        suggestion.optimization_id == self.optimization_id
            && self
                .user_feedback
                .map_or(true, |v| suggestion.user_feedback == v)
    }
}

pub trait OptimizationStore: Send + Sync {
    fn insert_optimization(
        &self,
        optimization: &Optimization,
    ) -> impl Future<Output = Result<()>> + Send;

    fn update_optimization(
        &self,
        id: &str,
        update: &OptimizationUpdate,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Returns `GolemError::NotFound` when no record has this id.
    fn read_optimization(&self, id: &str) -> impl Future<Output = Result<Optimization>> + Send;
}

pub trait RunStore: Send + Sync {
    fn insert_run(&self, run: &Run) -> impl Future<Output = Result<()>> + Send;

    fn update_run(&self, id: &str, state: RunState) -> impl Future<Output = Result<()>> + Send;

    fn read_runs(&self, filter: &RunFilter) -> impl Future<Output = Result<Vec<Run>>> + Send;
}

pub trait SuggestionStore: Send + Sync {
    /// Batch insert. An empty slice is a no-op.
    fn insert_suggestions(
        &self,
        suggestions: &[Suggestion],
    ) -> impl Future<Output = Result<()>> + Send;

    fn update_suggestion(
        &self,
        id: &str,
        user_feedback: i16,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Returns `GolemError::NotFound` when no suggestion has this id.
    fn read_suggestion(&self, id: &str) -> impl Future<Output = Result<Suggestion>> + Send;

    fn read_suggestions(
        &self,
        filter: &SuggestionFilter,
    ) -> impl Future<Output = Result<Vec<Suggestion>>> + Send;
}

/// Everything the orchestrator persists, behind one bound.
pub trait Store: OptimizationStore + RunStore + SuggestionStore {}

impl<T: OptimizationStore + RunStore + SuggestionStore> Store for T {}
