use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::golem_error::GolemError;

// --- Enums ---

/// The fixed set of analyses run against every submitted prompt.
///
/// Each job fans out exactly one worker per variant, so `AnalysisState`
/// always has one slot per variant.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    ContextualRichness,
    Conciseness,
    Clarity,
    Consistency,
    Custom,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 5] = [
        AnalysisType::ContextualRichness,
        AnalysisType::Conciseness,
        AnalysisType::Clarity,
        AnalysisType::Consistency,
        AnalysisType::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::ContextualRichness => "contextual_richness",
            AnalysisType::Conciseness => "conciseness",
            AnalysisType::Clarity => "clarity",
            AnalysisType::Consistency => "consistency",
            AnalysisType::Custom => "custom",
        }
    }

    /// Human-readable name used in prompts and log prefixes.
    pub fn display_name(&self) -> &'static str {
        match self {
            AnalysisType::ContextualRichness => "Contextual Richness",
            AnalysisType::Conciseness => "Conciseness",
            AnalysisType::Clarity => "Clarity",
            AnalysisType::Consistency => "Consistency",
            AnalysisType::Custom => "Custom",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AnalysisType {
    type Err = GolemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnalysisType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| GolemError::UnknownAnalysisType(s.to_string()))
    }
}

/// Lifecycle of an optimization job.
///
/// There is no failed state: a job whose merge stage fails stays `Pending`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationState {
    #[default]
    Pending,
    Completed,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Running,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }
}

/// End-user verdict on a suggestion. Stored as a signed integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feedback {
    Accepted,
    Unrated,
    Rejected,
}

impl Feedback {
    pub fn value(&self) -> i16 {
        match self {
            Feedback::Accepted => 1,
            Feedback::Unrated => 0,
            Feedback::Rejected => -1,
        }
    }
}

// --- Records ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Optimization {
    pub id: String,
    pub original_prompt: String,
    #[serde(default)]
    pub optimized_prompt: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub state: OptimizationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Optimization {
    /// A freshly submitted job: pending, with no optimized prompt yet.
    pub fn new(id: &str, original_prompt: &str, instructions: &str, parent_id: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            original_prompt: original_prompt.to_string(),
            optimized_prompt: String::new(),
            instructions: instructions.to_string(),
            state: OptimizationState::Pending,
            parent_id: parent_id.map(str::to_string),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state == OptimizationState::Completed
    }
}

/// Partial update applied to an Optimization record.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OptimizationUpdate {
    pub state: OptimizationState,
    pub optimized_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl OptimizationUpdate {
    pub fn completed(optimized_prompt: &str, parent_id: Option<&str>) -> Self {
        Self {
            state: OptimizationState::Completed,
            optimized_prompt: optimized_prompt.to_string(),
            parent_id: parent_id.map(str::to_string),
        }
    }
}

/// One worker's execution record within a job.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Run {
    pub id: String,
    pub optimization_id: String,
    #[serde(rename = "type")]
    pub analysis_type: AnalysisType,
    pub state: RunState,
}

impl Run {
    pub fn started(optimization_id: &str, analysis_type: AnalysisType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            optimization_id: optimization_id.to_string(),
            analysis_type,
            state: RunState::Running,
        }
    }
}

/// Run row as read back from a store, with the analysis type still untyped.
///
/// Converting into `Run` rejects types outside the fixed set.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct RunRecord {
    pub id: String,
    pub optimization_id: String,
    #[serde(rename = "type")]
    pub analysis_type: String,
    pub state: RunState,
}

impl TryFrom<RunRecord> for Run {
    type Error = GolemError;

    fn try_from(record: RunRecord) -> Result<Self, Self::Error> {
        Ok(Run {
            analysis_type: record.analysis_type.parse()?,
            id: record.id,
            optimization_id: record.optimization_id,
            state: record.state,
        })
    }
}

/// A persisted finding. Only `user_feedback` changes after insertion.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Suggestion {
    pub id: String,
    pub run_id: String,
    pub optimization_id: String,
    #[serde(rename = "type")]
    pub analysis_type: AnalysisType,
    pub target: String,
    pub suggestion: String,
    pub reasoning: String,
    #[serde(default)]
    pub user_feedback: i16,
}

impl Suggestion {
    pub fn from_finding(finding: &Finding, run_id: &str, optimization_id: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            run_id: run_id.to_string(),
            optimization_id: optimization_id.to_string(),
            analysis_type: finding.analysis_type,
            target: finding.target.clone(),
            suggestion: finding.suggestion.clone(),
            reasoning: finding.reasoning.clone(),
            user_feedback: Feedback::Unrated.value(),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.user_feedback == Feedback::Rejected.value()
    }

    pub fn to_finding(&self) -> Finding {
        Finding {
            analysis_type: self.analysis_type,
            target: self.target.clone(),
            suggestion: self.suggestion.clone(),
            reasoning: self.reasoning.clone(),
        }
    }
}

/// A (target, proposed change, reasoning) triple tagged with its analysis.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Finding {
    #[serde(rename = "type")]
    pub analysis_type: AnalysisType,
    pub target: String,
    pub suggestion: String,
    pub reasoning: String,
}

// --- Projections ---

/// Per-analysis completion flags for one job, derived from its runs.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct AnalysisState {
    pub contextual_richness: bool,
    pub conciseness: bool,
    pub clarity: bool,
    pub consistency: bool,
    pub custom: bool,
}

impl AnalysisState {
    pub fn get(&self, analysis_type: AnalysisType) -> bool {
        match analysis_type {
            AnalysisType::ContextualRichness => self.contextual_richness,
            AnalysisType::Conciseness => self.conciseness,
            AnalysisType::Clarity => self.clarity,
            AnalysisType::Consistency => self.consistency,
            AnalysisType::Custom => self.custom,
        }
    }

    pub fn set(&mut self, analysis_type: AnalysisType, done: bool) {
        let slot = match analysis_type {
            AnalysisType::ContextualRichness => &mut self.contextual_richness,
            AnalysisType::Conciseness => &mut self.conciseness,
            AnalysisType::Clarity => &mut self.clarity,
            AnalysisType::Consistency => &mut self.consistency,
            AnalysisType::Custom => &mut self.custom,
        };
        *slot = done;
    }

    /// True once every analysis has reached a terminal run state.
    pub fn completed(&self) -> bool {
        AnalysisType::ALL.iter().all(|t| self.get(*t))
    }
}
