use crate::types::{AnalysisType, Finding};

/// Inputs for one analysis worker's prompt.
pub struct AnalysisPromptParams<'a> {
    pub analysis_type: AnalysisType,
    pub original_prompt: &'a str,
    /// Only used by the custom analysis.
    pub instructions: &'a str,
    /// Rejected findings of this worker's own type from the parent job.
    pub wrong_shots: &'a [Finding],
}

/// Build the user message for an analysis worker.
///
/// Structure: [Task] + [Model Instructions] + [Rejected Suggestions?] + [Output Format]
pub fn build_analysis_prompt(params: &AnalysisPromptParams) -> String {
    let task = match params.analysis_type {
        AnalysisType::Custom => format!(
            "Evaluate the following model instructions against these requirements from the user:\n\n{}",
            params.instructions.trim()
        ),
        other => format!(
            "Evaluate the {} of the following model instructions.",
            other.display_name().to_lowercase()
        ),
    };

    let mut sections = vec![
        task,
        format!("## Model Instructions\n\n{}", params.original_prompt),
    ];

    if let Some(rejected) = build_wrong_shot_section(params.wrong_shots) {
        sections.push(rejected);
    }

    sections.push(build_output_format());
    sections.join("\n\n")
}

/// List previously rejected findings so the model does not propose them again.
///
/// Returns `None` when there are no wrong shots.
pub fn build_wrong_shot_section(wrong_shots: &[Finding]) -> Option<String> {
    if wrong_shots.is_empty() {
        return None;
    }

    let lines: Vec<String> = wrong_shots
        .iter()
        .map(|f| {
            format!(
                "- Target: \"{}\" / Suggestion: \"{}\"",
                f.target, f.suggestion
            )
        })
        .collect();

    Some(format!(
        "## Rejected Suggestions\n\n\
        The user rejected the following suggestions in a previous attempt. \
        Do NOT repeat them or propose close variants:\n\n{}",
        lines.join("\n")
    ))
}

fn build_output_format() -> String {
    "## Output Format\n\n\
    Respond with a single JSON object and nothing else:\n\n\
    {\"suggestions\": [{\"target\": \"<exact text from the instructions>\", \
    \"suggestion\": \"<proposed change>\", \"reasoning\": \"<why>\"}]}\n\n\
    Return an empty list if nothing needs to change."
        .to_string()
}

/// Build the user message for the apply call that merges all findings.
///
/// Findings are embedded as JSON. Custom findings come from the user's own
/// instructions and must take precedence.
pub fn build_apply_prompt(original_prompt: &str, findings: &[Finding]) -> String {
    // Serializing plain strings and a unit enum cannot fail.
    let findings_json = serde_json::to_string_pretty(findings).unwrap_or_else(|_| "[]".to_string());

    [
        "Apply the following suggestions to the model instructions below and return \
        only the revised instructions, with no commentary."
            .to_string(),
        "Suggestions of type \"custom\" reflect explicit user requirements. When they \
        conflict with other suggestions, the custom suggestion wins."
            .to_string(),
        format!("## Model Instructions\n\n{}", original_prompt),
        format!("## Suggestions\n\n{}", findings_json),
    ]
    .join("\n\n")
}
