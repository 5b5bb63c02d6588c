//! PostgREST adapter for the optimization, run and suggestion tables.

use std::time::Duration;

use serde_json::json;

use crate::config::StoreConfig;
use crate::golem_error::{GolemError, Result};
use crate::http::{self, eq};
use crate::store::{
    OptimizationStore, RunFilter, RunStore, SuggestionFilter, SuggestionStore,
};
use crate::types::{Optimization, OptimizationUpdate, Run, RunRecord, RunState, Suggestion};

const OPTIMIZATION_TABLE: &str = "optimization";
const RUN_TABLE: &str = "run";
const SUGGESTION_TABLE: &str = "suggestion";

const STATUS_OK: u16 = 200;
const STATUS_CREATED: u16 = 201;
const STATUS_NO_CONTENT: u16 = 204;

#[derive(Debug, Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
}

impl RestStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(GolemError::Config("store.base_url is empty".to_string()));
        }
        let client = http::build_client(
            &[
                ("apikey", config.api_key.clone()),
                ("Authorization", format!("Bearer {}", config.api_key)),
            ],
            Duration::from_secs(config.request_timeout_seconds),
        )?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    async fn insert<T: serde::Serialize + ?Sized>(&self, table: &str, body: &T) -> Result<()> {
        let request = self.client.post(self.table_url(table)).json(body);
        http::send(request, STATUS_CREATED).await?;
        Ok(())
    }

    async fn patch_by_id(&self, table: &str, id: &str, body: serde_json::Value) -> Result<()> {
        let request = self
            .client
            .patch(self.table_url(table))
            .query(&[("id", eq(id))])
            .json(&body);
        http::send(request, STATUS_NO_CONTENT).await?;
        Ok(())
    }

    /// Fetch the single row with this id. Zero rows is `NotFound`, more than one a store error.
    async fn read_by_id<T: serde::de::DeserializeOwned>(&self, table: &str, id: &str) -> Result<T> {
        let request = self
            .client
            .get(self.table_url(table))
            .query(&[("id", eq(id))]);
        let mut records: Vec<T> = http::send_json(request, STATUS_OK).await?;

        match records.len() {
            0 => Err(GolemError::NotFound(format!("{} {}", table, id))),
            1 => Ok(records.remove(0)),
            n => Err(GolemError::Store(format!(
                "{} {} rows found for id {}",
                n, table, id
            ))),
        }
    }
}

impl OptimizationStore for RestStore {
    async fn insert_optimization(&self, optimization: &Optimization) -> Result<()> {
        self.insert(OPTIMIZATION_TABLE, optimization).await
    }

    async fn update_optimization(&self, id: &str, update: &OptimizationUpdate) -> Result<()> {
        self.patch_by_id(OPTIMIZATION_TABLE, id, serde_json::to_value(update)?)
            .await
    }

    async fn read_optimization(&self, id: &str) -> Result<Optimization> {
        self.read_by_id(OPTIMIZATION_TABLE, id).await
    }
}

impl RunStore for RestStore {
    async fn insert_run(&self, run: &Run) -> Result<()> {
        self.insert(RUN_TABLE, run).await
    }

    async fn update_run(&self, id: &str, state: RunState) -> Result<()> {
        self.patch_by_id(RUN_TABLE, id, json!({ "state": state }))
            .await
    }

    async fn read_runs(&self, filter: &RunFilter) -> Result<Vec<Run>> {
        let request = self
            .client
            .get(self.table_url(RUN_TABLE))
            .query(&[("optimization_id", eq(&filter.optimization_id))]);
        let records: Vec<RunRecord> = http::send_json(request, STATUS_OK).await?;
        records.into_iter().map(Run::try_from).collect()
    }
}

impl SuggestionStore for RestStore {
    async fn insert_suggestions(&self, suggestions: &[Suggestion]) -> Result<()> {
        if suggestions.is_empty() {
            return Ok(());
        }
        self.insert(SUGGESTION_TABLE, suggestions).await
    }

    async fn update_suggestion(&self, id: &str, user_feedback: i16) -> Result<()> {
        self.patch_by_id(
            SUGGESTION_TABLE,
            id,
            json!({ "user_feedback": user_feedback }),
        )
        .await
    }

    async fn read_suggestion(&self, id: &str) -> Result<Suggestion> {
        self.read_by_id(SUGGESTION_TABLE, id).await
    }

    async fn read_suggestions(&self, filter: &SuggestionFilter) -> Result<Vec<Suggestion>> {
        let mut query = vec![("optimization_id", eq(&filter.optimization_id))];
        if let Some(value) = filter.user_feedback {
            query.push(("user_feedback", eq(value)));
        }
        let request = self
            .client
            .get(self.table_url(SUGGESTION_TABLE))
            .query(&query);
        http::send_json(request, STATUS_OK).await
    }
}
