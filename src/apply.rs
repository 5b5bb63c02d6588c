use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::golem_error::{GolemError, Result};
use crate::log::job_tag;
use crate::log_info;
use crate::model::{AssistantKind, ModelService};
use crate::prompt::build_apply_prompt;
use crate::session::{run_assistant, with_session, PollSettings};
use crate::types::Finding;

/// Merge all findings into one revised prompt with a final model call.
///
/// There is no fallback: any error here leaves the job without an
/// optimized prompt. An empty reply is treated as an error.
pub async fn apply<M: ModelService + 'static>(
    model: &Arc<M>,
    job_id: &str,
    original_prompt: &str,
    findings: &[Finding],
    poll: PollSettings,
    cancel: &CancellationToken,
) -> Result<String> {
    log_info!(
        "{} Applying {} finding(s)",
        job_tag(job_id, None),
        findings.len()
    );

    let prompt = build_apply_prompt(original_prompt, findings);
    let merged = with_session(model, |session_id| async move {
        run_assistant(
            model.as_ref(),
            &session_id,
            AssistantKind::Apply,
            &prompt,
            poll,
            cancel,
        )
        .await
    })
    .await?;

    let merged = merged.trim();
    if merged.is_empty() {
        return Err(GolemError::UnexpectedResponse(
            "apply call returned an empty prompt".to_string(),
        ));
    }
    Ok(merged.to_string())
}
