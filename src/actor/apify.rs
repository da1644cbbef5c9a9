use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

use super::error::{ActorError, Result};
use super::types::{ApiResponse, DatasetItem, RunData, RunStatus, SearchInput};
use super::ActorClient;

/// Apify REST API client bound to a single actor.
pub struct ApifyClient {
    client: reqwest::Client,
    base_url: String,
    actor_id: String,
    token: String,
}

impl ApifyClient {
    pub fn new(
        base_url: impl Into<String>,
        actor_id: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            actor_id: actor_id.into(),
            token: token.into(),
        })
    }

    /// Start an actor run. Returns immediately with run metadata.
    async fn start_run(&self, input: &SearchInput) -> Result<RunData> {
        let url = format!("{}/acts/{}/runs", self.base_url, self.actor_id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let api_resp: ApiResponse<RunData> = Self::decode(resp).await?;
        Ok(api_resp.data)
    }

    /// Poll until a run reaches a terminal status. Uses `waitForFinish=60` for long-polling.
    async fn wait_for_run(&self, run_id: &str) -> Result<RunData> {
        loop {
            let url = format!("{}/actor-runs/{}?waitForFinish=60", self.base_url, run_id);
            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await?;

            let api_resp: ApiResponse<RunData> = Self::decode(resp).await?;
            let run = api_resp.data;
            match run.run_status() {
                RunStatus::Succeeded => return Ok(run),
                RunStatus::Failed => {
                    return Err(ActorError::RunFailed {
                        run_id: run.id,
                        status: run.status,
                    });
                }
                RunStatus::Running => {
                    debug!(run_id, status = %run.status, "Run still in progress");
                }
            }
        }
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ActorError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl ActorClient for ApifyClient {
    async fn call(&self, input: &SearchInput) -> Result<RunData> {
        let run = self.start_run(input).await?;
        info!(run_id = %run.id, position = %input.position, "Actor run started, polling for completion");

        if run.run_status() == RunStatus::Succeeded {
            return Ok(run);
        }
        self.wait_for_run(&run.id).await
    }

    async fn dataset_items(&self, dataset_id: &str, limit: Option<usize>) -> Result<Vec<DatasetItem>> {
        let mut url = format!(
            "{}/datasets/{}/items?format=json",
            self.base_url, dataset_id
        );
        if let Some(limit) = limit {
            url.push_str(&format!("&limit={}", limit));
        }

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let items: Vec<DatasetItem> = Self::decode(resp).await?;
        debug!(dataset_id, count = items.len(), "Fetched dataset items");
        Ok(items)
    }
}
