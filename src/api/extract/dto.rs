use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use super::models::JobRecord;

/// Body of `POST /extract-text`
#[derive(Debug, Deserialize, Validate)]
pub struct ExtractRequest {
    /// Missing and `null` both count as empty
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 1, message = "No points provided"))]
    pub points: Vec<String>,
}

/// Aggregated result of one extraction
#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub points_received: Vec<String>,
    pub job_results: Vec<JobRecord>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
