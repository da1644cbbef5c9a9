use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw dataset item as produced by the actor
pub type DatasetItem = serde_json::Map<String, serde_json::Value>;

/// Input for the job-search actor, one per point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchInput {
    pub position: String,
    pub country: String,
    pub location: String,
    pub max_items: u32,
    pub parse_company_details: bool,
    pub save_only_unique_items: bool,
    pub follow_apply_redirects: bool,
}

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Actor run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Lifecycle state of an actor run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
}

impl RunData {
    pub fn run_status(&self) -> RunStatus {
        match self.status.as_str() {
            "SUCCEEDED" => RunStatus::Succeeded,
            "FAILED" | "ABORTED" | "TIMED-OUT" => RunStatus::Failed,
            _ => RunStatus::Running,
        }
    }
}
