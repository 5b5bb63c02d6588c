//! Threads/runs/messages adapter for the hosted assistants API.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::config::{AssistantIds, ModelConfig};
use crate::golem_error::{GolemError, Result};
use crate::http;
use crate::model::{AssistantKind, ModelRunStatus, ModelService};

const STATUS_OK: u16 = 200;

#[derive(Deserialize)]
struct Thread {
    id: String,
}

#[derive(Deserialize)]
struct RunObject {
    id: String,
    status: String,
}

#[derive(Deserialize)]
struct MessageListing {
    data: Vec<Message>,
}

#[derive(Deserialize)]
struct Message {
    role: String,
    content: Vec<MessageContent>,
}

#[derive(Deserialize)]
struct MessageContent {
    text: Option<MessageText>,
}

#[derive(Deserialize)]
struct MessageText {
    value: String,
}

/// Map a run status string onto the three states the orchestrator cares about.
pub fn parse_run_status(status: &str) -> ModelRunStatus {
    match status {
        "completed" => ModelRunStatus::Completed,
        "failed" | "cancelled" | "expired" | "incomplete" => {
            ModelRunStatus::Failed(status.to_string())
        }
        // queued, in_progress, requires_action, cancelling
        _ => ModelRunStatus::Pending,
    }
}

#[derive(Debug, Clone)]
pub struct AssistantsClient {
    client: reqwest::Client,
    base_url: String,
    assistants: AssistantIds,
}

impl AssistantsClient {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(GolemError::Config("model.api_key is empty".to_string()));
        }
        let client = http::build_client(
            &[
                ("Authorization", format!("Bearer {}", config.api_key)),
                ("OpenAI-Beta", config.beta_header.clone()),
            ],
            Duration::from_secs(config.request_timeout_seconds),
        )?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            assistants: config.assistants.clone(),
        })
    }

    fn thread_url(&self, session_id: &str) -> String {
        format!("{}/threads/{}", self.base_url, session_id)
    }

    fn assistant_id(&self, kind: AssistantKind) -> Result<&str> {
        let id = match kind {
            AssistantKind::Analysis(t) => self.assistants.for_analysis(t),
            AssistantKind::Apply => &self.assistants.apply,
        };
        if id.is_empty() {
            return Err(GolemError::Config(format!(
                "no assistant configured for {}",
                kind
            )));
        }
        Ok(id)
    }
}

impl ModelService for AssistantsClient {
    async fn open_session(&self) -> Result<String> {
        let request = self.client.post(format!("{}/threads", self.base_url));
        let thread: Thread = http::send_json(request, STATUS_OK).await?;
        Ok(thread.id)
    }

    async fn close_session(&self, session_id: &str) -> Result<()> {
        let request = self.client.delete(self.thread_url(session_id));
        http::send(request, STATUS_OK).await?;
        Ok(())
    }

    async fn post_user_message(&self, session_id: &str, text: &str) -> Result<()> {
        let request = self
            .client
            .post(format!("{}/messages", self.thread_url(session_id)))
            .json(&json!({ "role": "user", "content": text }));
        http::send(request, STATUS_OK).await?;
        Ok(())
    }

    async fn start_run(&self, session_id: &str, kind: AssistantKind) -> Result<String> {
        let assistant_id = self.assistant_id(kind)?;
        let request = self
            .client
            .post(format!("{}/runs", self.thread_url(session_id)))
            .json(&json!({ "assistant_id": assistant_id }));
        let run: RunObject = http::send_json(request, STATUS_OK).await?;
        Ok(run.id)
    }

    async fn poll_run(&self, session_id: &str, run_id: &str) -> Result<ModelRunStatus> {
        let request = self
            .client
            .get(format!("{}/runs/{}", self.thread_url(session_id), run_id));
        let run: RunObject = http::send_json(request, STATUS_OK).await?;
        Ok(parse_run_status(&run.status))
    }

    async fn read_latest_assistant_message(&self, session_id: &str) -> Result<String> {
        // Listing is newest-first by default.
        let request = self
            .client
            .get(format!("{}/messages", self.thread_url(session_id)));
        let listing: MessageListing = http::send_json(request, STATUS_OK).await?;

        let message = listing.data.into_iter().next().ok_or_else(|| {
            GolemError::UnexpectedResponse("thread has no messages".to_string())
        })?;

        if message.role != "assistant" || message.content.len() != 1 {
            return Err(GolemError::UnexpectedResponse(format!(
                "expected one assistant content part, got role '{}' with {} parts",
                message.role,
                message.content.len()
            )));
        }

        message
            .content
            .into_iter()
            .next()
            .and_then(|c| c.text)
            .map(|t| t.value)
            .ok_or_else(|| GolemError::UnexpectedResponse("content part is not text".to_string()))
    }
}
