use std::sync::Mutex;

use crate::golem_error::{GolemError, Result};
use crate::store::{
    OptimizationStore, RunFilter, RunStore, SuggestionFilter, SuggestionStore,
};
use crate::types::{Optimization, OptimizationUpdate, Run, RunState, Suggestion};

/// Operations that can be told to fail, for exercising store-failure paths.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InjectedFailures {
    pub insert_optimization: bool,
    pub update_optimization: bool,
    pub insert_run: bool,
    pub update_run: bool,
    pub insert_suggestions: bool,
    pub read_suggestions: bool,
}

#[derive(Default)]
struct Tables {
    optimizations: Vec<Optimization>,
    runs: Vec<Run>,
    suggestions: Vec<Suggestion>,
}

/// In-process store implementing all three store traits.
///
/// Uses `std::sync::Mutex` because every operation is a short in-memory
/// scan with no I/O or `.await` under the lock.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failures: InjectedFailures,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failures(failures: InjectedFailures) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            failures,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| GolemError::Store("memory store lock poisoned".to_string()))
    }

    fn injected(&self, enabled: bool, op: &str) -> Result<()> {
        if enabled {
            Err(GolemError::Store(format!("injected failure: {}", op)))
        } else {
            Ok(())
        }
    }

    /// Insert a record directly, bypassing injected failures.
    pub fn seed_optimization(&self, optimization: Optimization) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.optimizations.push(optimization);
        }
    }

    /// Insert suggestions directly, bypassing injected failures.
    pub fn seed_suggestions(&self, suggestions: Vec<Suggestion>) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.suggestions.extend(suggestions);
        }
    }

    pub fn optimization(&self, id: &str) -> Option<Optimization> {
        let tables = self.tables.lock().ok()?;
        tables.optimizations.iter().find(|o| o.id == id).cloned()
    }

    pub fn runs(&self, optimization_id: &str) -> Vec<Run> {
        match self.tables.lock() {
            Ok(tables) => tables
                .runs
                .iter()
                .filter(|r| r.optimization_id == optimization_id)
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn suggestions(&self, optimization_id: &str) -> Vec<Suggestion> {
        match self.tables.lock() {
            Ok(tables) => tables
                .suggestions
                .iter()
                .filter(|s| s.optimization_id == optimization_id)
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl OptimizationStore for MemoryStore {
    async fn insert_optimization(&self, optimization: &Optimization) -> Result<()> {
        self.injected(self.failures.insert_optimization, "insert_optimization")?;
        let mut tables = self.lock()?;
        if tables.optimizations.iter().any(|o| o.id == optimization.id) {
            return Err(GolemError::Store(format!(
                "duplicate optimization id {}",
                optimization.id
            )));
        }
        tables.optimizations.push(optimization.clone());
        Ok(())
    }

    async fn update_optimization(&self, id: &str, update: &OptimizationUpdate) -> Result<()> {
        self.injected(self.failures.update_optimization, "update_optimization")?;
        let mut tables = self.lock()?;
        let record = tables
            .optimizations
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| GolemError::NotFound(format!("optimization {}", id)))?;
        record.state = update.state.clone();
        record.optimized_prompt = update.optimized_prompt.clone();
        if update.parent_id.is_some() {
            record.parent_id = update.parent_id.clone();
        }
        Ok(())
    }

    async fn read_optimization(&self, id: &str) -> Result<Optimization> {
        let tables = self.lock()?;
        tables
            .optimizations
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or_else(|| GolemError::NotFound(format!("optimization {}", id)))
    }
}

impl RunStore for MemoryStore {
    async fn insert_run(&self, run: &Run) -> Result<()> {
        self.injected(self.failures.insert_run, "insert_run")?;
        self.lock()?.runs.push(run.clone());
        Ok(())
    }

    async fn update_run(&self, id: &str, state: RunState) -> Result<()> {
        self.injected(self.failures.update_run, "update_run")?;
        let mut tables = self.lock()?;
        let run = tables
            .runs
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| GolemError::NotFound(format!("run {}", id)))?;
        run.state = state;
        Ok(())
    }

    async fn read_runs(&self, filter: &RunFilter) -> Result<Vec<Run>> {
        let tables = self.lock()?;
        Ok(tables
            .runs
            .iter()
            .filter(|r| r.optimization_id == filter.optimization_id)
            .cloned()
            .collect())
    }
}

impl SuggestionStore for MemoryStore {
    async fn insert_suggestions(&self, suggestions: &[Suggestion]) -> Result<()> {
        if suggestions.is_empty() {
            return Ok(());
        }
        self.injected(self.failures.insert_suggestions, "insert_suggestions")?;
        self.lock()?.suggestions.extend_from_slice(suggestions);
        Ok(())
    }

    async fn update_suggestion(&self, id: &str, user_feedback: i16) -> Result<()> {
        let mut tables = self.lock()?;
        let suggestion = tables
            .suggestions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| GolemError::NotFound(format!("suggestion {}", id)))?;
        suggestion.user_feedback = user_feedback;
        Ok(())
    }

    async fn read_suggestion(&self, id: &str) -> Result<Suggestion> {
        let tables = self.lock()?;
        tables
            .suggestions
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| GolemError::NotFound(format!("suggestion {}", id)))
    }

    async fn read_suggestions(&self, filter: &SuggestionFilter) -> Result<Vec<Suggestion>> {
        self.injected(self.failures.read_suggestions, "read_suggestions")?;
        let tables = self.lock()?;
        Ok(tables
            .suggestions
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }
}
