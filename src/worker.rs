use std::sync::Arc;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::golem_error::{GolemError, Result};
use crate::ledger;
use crate::log::job_tag;
use crate::model::{AssistantKind, ModelService};
use crate::prompt::{build_analysis_prompt, AnalysisPromptParams};
use crate::session::{run_assistant, with_session, PollSettings};
use crate::store::Store;
use crate::types::{AnalysisType, Finding, Suggestion};
use crate::{log_debug, log_error, log_info, log_warn};

/// Inputs for one analysis worker.
pub struct WorkerParams<'a> {
    pub job_id: &'a str,
    pub analysis_type: AnalysisType,
    pub original_prompt: &'a str,
    pub instructions: &'a str,
    /// Rejected findings of this worker's own type.
    pub wrong_shots: &'a [Finding],
    pub poll: PollSettings,
}

/// Run one analysis to completion and return the findings it persisted.
///
/// Always records a Run for the analysis and always finalizes it:
/// - success, timeout, unparsable output → Run completed
/// - any other error → Run failed, error returned
///
/// Timeouts and unparsable output return `Ok` with no findings. The custom
/// analysis with blank instructions completes immediately without touching
/// the model service.
pub async fn suggest<S, M>(
    store: &S,
    model: &Arc<M>,
    params: &WorkerParams<'_>,
    cancel: &CancellationToken,
) -> Result<Vec<Finding>>
where
    S: Store,
    M: ModelService + 'static,
{
    let tag = job_tag(params.job_id, Some(params.analysis_type));
    let run = ledger::record_start(store, params.job_id, params.analysis_type).await;

    let outcome = run_analysis(store, model, &run.id, params, cancel).await;
    ledger::record_finish(store, &run, ledger::terminal_state(&outcome)).await;

    match outcome {
        Ok(findings) => {
            log_info!("{} Completed with {} finding(s)", tag, findings.len());
            Ok(findings)
        }
        Err(e) if e.is_soft() => {
            log_warn!("{} No findings: {}", tag, e);
            Ok(Vec::new())
        }
        Err(e) => {
            log_error!("{} Failed: {}", tag, e);
            Err(e)
        }
    }
}

async fn run_analysis<S, M>(
    store: &S,
    model: &Arc<M>,
    run_id: &str,
    params: &WorkerParams<'_>,
    cancel: &CancellationToken,
) -> Result<Vec<Finding>>
where
    S: Store,
    M: ModelService + 'static,
{
    let tag = job_tag(params.job_id, Some(params.analysis_type));

    if params.analysis_type == AnalysisType::Custom && params.instructions.trim().is_empty() {
        log_info!("{} No instructions given, skipping", tag);
        return Ok(Vec::new());
    }

    let prompt = build_analysis_prompt(&AnalysisPromptParams {
        analysis_type: params.analysis_type,
        original_prompt: params.original_prompt,
        instructions: params.instructions,
        wrong_shots: params.wrong_shots,
    });
    if !params.wrong_shots.is_empty() {
        log_debug!(
            "{} Including {} rejected suggestion(s)",
            tag,
            params.wrong_shots.len()
        );
    }

    let kind = AssistantKind::Analysis(params.analysis_type);
    let output = with_session(model, |session_id| async move {
        run_assistant(
            model.as_ref(),
            &session_id,
            kind,
            &prompt,
            params.poll,
            cancel,
        )
        .await
    })
    .await?;

    let findings = parse_findings(&output, params.analysis_type)?;

    let suggestions: Vec<Suggestion> = findings
        .iter()
        .map(|f| Suggestion::from_finding(f, run_id, params.job_id))
        .collect();
    store.insert_suggestions(&suggestions).await?;

    Ok(findings)
}

// --- Output parsing ---

#[derive(Deserialize)]
struct FindingDraft {
    target: String,
    suggestion: String,
    #[serde(default)]
    reasoning: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnalysisOutput {
    Wrapped { suggestions: Vec<FindingDraft> },
    Bare(Vec<FindingDraft>),
}

/// Parse a worker's reply into findings tagged with `analysis_type`.
///
/// Accepts `{"suggestions": [...]}` or a bare array, optionally wrapped in
/// a markdown code fence. Anything else is `GolemError::Parse`.
pub fn parse_findings(output: &str, analysis_type: AnalysisType) -> Result<Vec<Finding>> {
    let body = strip_code_fence(output);
    let parsed: AnalysisOutput =
        serde_json::from_str(body).map_err(|e| GolemError::Parse(e.to_string()))?;

    let drafts = match parsed {
        AnalysisOutput::Wrapped { suggestions } => suggestions,
        AnalysisOutput::Bare(items) => items,
    };

    Ok(drafts
        .into_iter()
        .map(|d| Finding {
            analysis_type,
            target: d.target,
            suggestion: d.suggestion,
            reasoning: d.reasoning,
        })
        .collect())
}

fn strip_code_fence(output: &str) -> &str {
    let trimmed = output.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening line.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wrapped_object() {
        let findings = parse_findings(
            r#"{"suggestions": [{"target": "a", "suggestion": "b", "reasoning": "c"}]}"#,
            AnalysisType::Clarity,
        )
        .unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].analysis_type, AnalysisType::Clarity);
        assert_eq!(findings[0].target, "a");
    }

    #[test]
    fn parses_bare_array_in_code_fence() {
        let output = "```json\n[{\"target\": \"x\", \"suggestion\": \"y\"}]\n```";
        let findings = parse_findings(output, AnalysisType::Conciseness).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].reasoning, "");
    }

    #[test]
    fn empty_list_is_valid() {
        let findings = parse_findings(r#"{"suggestions": []}"#, AnalysisType::Custom).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn prose_is_a_parse_error() {
        let err = parse_findings("Looks good to me!", AnalysisType::Clarity).unwrap_err();
        assert!(matches!(err, GolemError::Parse(_)));
        assert!(err.is_soft());
    }

    #[test]
    fn missing_required_field_is_a_parse_error() {
        let err = parse_findings(r#"[{"target": "x"}]"#, AnalysisType::Clarity).unwrap_err();
        assert!(matches!(err, GolemError::Parse(_)));
    }
}
