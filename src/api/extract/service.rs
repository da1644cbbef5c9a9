use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::actor::{ActorClient, ActorError, ApifyClient, SearchInput};
use crate::api::validation::ErrorResponse;
use crate::config::{Config, SearchDefaults};
use crate::worker::{FanOutError, FanOutExecutor};
use super::dto::ExtractResponse;
use super::models::JobRecord;

/// Service-level errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("No points provided")]
    NoPoints,

    #[error("API key missing")]
    MissingApiKey,

    #[error("Actor call failed for point '{point}': {source}")]
    ActorCall { point: String, source: ActorError },

    #[error("Dataset processing failed for point '{point}': {source}")]
    DatasetProcessing { point: String, source: ActorError },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NoPoints => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ServiceError::NoPoints => warn!("No points provided in the request"),
            ServiceError::MissingApiKey => error!("Apify API key not found"),
            ServiceError::ActorCall { point, source } => {
                error!(point = %point, "Error calling actor: {}", source)
            }
            ServiceError::DatasetProcessing { point, source } => {
                error!(point = %point, "Error fetching or processing dataset results: {}", source)
            }
            ServiceError::Internal(msg) => error!("Error processing request: {}", msg),
        }
        HttpResponse::build(self.status_code()).json(self.envelope())
    }
}

impl ServiceError {
    /// Client-facing body for this error
    pub fn envelope(&self) -> ErrorResponse {
        match self {
            ServiceError::NoPoints => ErrorResponse::new("No points provided"),
            ServiceError::MissingApiKey => ErrorResponse::new("API key missing"),
            ServiceError::ActorCall { source, .. } => {
                ErrorResponse::with_details("Actor call failed", source.to_string())
            }
            ServiceError::DatasetProcessing { source, .. } => {
                ErrorResponse::with_details("Dataset processing failed", source.to_string())
            }
            ServiceError::Internal(msg) => {
                ErrorResponse::with_details("Internal Server Error", msg.clone())
            }
        }
    }
}

/// Why a single point failed
#[derive(Debug, Error)]
enum PointFailure {
    #[error("actor call failed: {0}")]
    Call(ActorError),

    #[error("dataset processing failed: {0}")]
    Dataset(ActorError),
}

/// Extraction service: fans points out to the actor and aggregates records
pub struct ExtractService {
    client: Option<Arc<dyn ActorClient>>,
    executor: FanOutExecutor,
    search: SearchDefaults,
    page_limit: Option<usize>,
}

impl ExtractService {
    /// Create a new ExtractService instance
    ///
    /// `client` is `None` when no API credential is configured.
    pub fn new(
        client: Option<Arc<dyn ActorClient>>,
        executor: FanOutExecutor,
        search: SearchDefaults,
        page_limit: Option<usize>,
    ) -> Self {
        Self {
            client,
            executor,
            search,
            page_limit,
        }
    }

    /// Wire the Apify client and executor from configuration
    pub fn from_config(config: &Config, permits: Arc<Semaphore>) -> Result<Self, ActorError> {
        let client = match &config.apify_api_key {
            Some(token) => {
                let apify = ApifyClient::new(
                    config.apify_base_url.clone(),
                    config.actor_id.clone(),
                    token.clone(),
                    Duration::from_secs(config.actor_timeout_secs),
                )?;
                info!("Apify client initialized successfully");
                Some(Arc::new(apify) as Arc<dyn ActorClient>)
            }
            None => {
                warn!("Apify API key not configured; extraction requests will fail");
                None
            }
        };

        Ok(Self::new(
            client,
            FanOutExecutor::new(config.fan_out_concurrency, permits),
            config.search.clone(),
            config.dataset_page_limit,
        ))
    }

    /// Override the per-request batch size
    pub fn with_concurrency(mut self, concurrency: NonZeroUsize) -> Self {
        self.executor = self.executor.with_concurrency(concurrency);
        self
    }

    /// Whether an actor credential is configured
    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Extract job records for every point
    ///
    /// # Business Logic
    /// - Rejects an empty point list before anything else
    /// - Runs the actor once per point through the fan-out executor
    /// - Keeps at most `page_limit` records per point
    /// - Any failing point fails the whole extraction
    ///
    /// # Returns
    /// - `Ok(ExtractResponse)` - points echoed, records of all points concatenated
    /// - `Err(ServiceError)` - the first failure
    pub async fn extract(&self, points: Vec<String>) -> Result<ExtractResponse, ServiceError> {
        if points.is_empty() {
            return Err(ServiceError::NoPoints);
        }

        let client = self.client.clone().ok_or(ServiceError::MissingApiKey)?;

        info!(
            points = ?points,
            concurrency = self.executor.concurrency().get(),
            "Service: Extracting job results"
        );

        let search = self.search.clone();
        let page_limit = self.page_limit;
        let outputs = self
            .executor
            .execute(points.clone(), move |point: String| {
                let client = client.clone();
                let input = search_input(&search, point);
                async move { fetch_point(client.as_ref(), input, page_limit).await }
            })
            .await
            .map_err(|err| into_service_error(err, &points))?;

        let job_results: Vec<JobRecord> = outputs
            .into_iter()
            .flat_map(|output| output.value)
            .collect();

        info!(
            points = points.len(),
            records = job_results.len(),
            "Service: Extraction completed"
        );

        Ok(ExtractResponse {
            points_received: points,
            job_results,
        })
    }
}

fn search_input(search: &SearchDefaults, point: String) -> SearchInput {
    SearchInput {
        position: point,
        country: search.country.clone(),
        location: search.location.clone(),
        max_items: search.max_items,
        parse_company_details: false,
        save_only_unique_items: true,
        follow_apply_redirects: false,
    }
}

/// Run the actor for one point and flatten its dataset
async fn fetch_point(
    client: &dyn ActorClient,
    input: SearchInput,
    page_limit: Option<usize>,
) -> Result<Vec<JobRecord>, PointFailure> {
    info!(point = %input.position, "Processing point");

    let run = client.call(&input).await.map_err(PointFailure::Call)?;
    info!(
        point = %input.position,
        run_id = %run.id,
        dataset_id = %run.default_dataset_id,
        started_at = ?run.started_at,
        finished_at = ?run.finished_at,
        "Actor run successful"
    );

    let mut items = client
        .dataset_items(&run.default_dataset_id, page_limit)
        .await
        .map_err(PointFailure::Dataset)?;

    if let Some(limit) = page_limit {
        items.truncate(limit);
    }

    let records: Vec<JobRecord> = items.iter().map(JobRecord::from_item).collect();
    info!(point = %input.position, records = records.len(), "Job results fetched");
    Ok(records)
}

fn into_service_error(err: FanOutError<PointFailure>, points: &[String]) -> ServiceError {
    let point_at = |index: usize| points.get(index).cloned().unwrap_or_default();

    match err {
        FanOutError::Item { index, error: PointFailure::Call(source) } => ServiceError::ActorCall {
            point: point_at(index),
            source,
        },
        FanOutError::Item { index, error: PointFailure::Dataset(source) } => {
            ServiceError::DatasetProcessing {
                point: point_at(index),
                source,
            }
        }
        other @ (FanOutError::Panicked { .. } | FanOutError::Closed) => {
            ServiceError::Internal(other.to_string())
        }
    }
}
