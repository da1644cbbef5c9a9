//! In-memory actor used by the extraction tests.

use async_trait::async_trait;
use serde_json::json;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use crate::actor::{ActorClient, ActorError, DatasetItem, RunData, SearchInput};
use crate::config::SearchDefaults;
use crate::worker::FanOutExecutor;
use super::service::ExtractService;

/// Returns `records` items per point; each item only carries `positionName`
/// and `company`, so the remaining columns exercise the placeholder.
pub struct FakeActor {
    records: usize,
    fail_call: Option<String>,
    fail_dataset: Option<String>,
    panic_call: Option<String>,
    calls: AtomicUsize,
    started: Mutex<Vec<String>>,
    limits: Mutex<Vec<Option<usize>>>,
}

impl FakeActor {
    pub fn new(records: usize) -> Self {
        Self {
            records,
            fail_call: None,
            fail_dataset: None,
            panic_call: None,
            calls: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
            limits: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_call(mut self, point: &str) -> Self {
        self.fail_call = Some(point.to_string());
        self
    }

    pub fn failing_dataset(mut self, point: &str) -> Self {
        self.fail_dataset = Some(point.to_string());
        self
    }

    pub fn panicking_call(mut self, point: &str) -> Self {
        self.panic_call = Some(point.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub fn requested_limits(&self) -> Vec<Option<usize>> {
        self.limits.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActorClient for FakeActor {
    async fn call(&self, input: &SearchInput) -> Result<RunData, ActorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.lock().unwrap().push(input.position.clone());

        if self.panic_call.as_deref() == Some(input.position.as_str()) {
            panic!("actor client panicked for {}", input.position);
        }

        if self.fail_call.as_deref() == Some(input.position.as_str()) {
            return Err(ActorError::RunFailed {
                run_id: format!("run-{}", input.position),
                status: "FAILED".to_string(),
            });
        }

        Ok(RunData {
            id: format!("run-{}", input.position),
            status: "SUCCEEDED".to_string(),
            // The dataset id doubles as the point so items can be traced back
            default_dataset_id: input.position.clone(),
            started_at: None,
            finished_at: None,
        })
    }

    async fn dataset_items(&self, dataset_id: &str, limit: Option<usize>) -> Result<Vec<DatasetItem>, ActorError> {
        self.limits.lock().unwrap().push(limit);

        if self.fail_dataset.as_deref() == Some(dataset_id) {
            return Err(ActorError::Api {
                status: 404,
                message: format!("dataset {} not found", dataset_id),
            });
        }

        // Ignores `limit` on purpose, like an upstream that over-delivers
        Ok((0..self.records)
            .map(|i| {
                let item = json!({
                    "positionName": format!("{} #{}", dataset_id, i),
                    "company": "Acme",
                });
                item.as_object().cloned().unwrap_or_default()
            })
            .collect())
    }
}

pub fn service_with(fake: Arc<FakeActor>, concurrency: usize, page_limit: Option<usize>) -> ExtractService {
    service_with_permits(fake, concurrency, page_limit, Arc::new(Semaphore::new(10)))
}

pub fn service_with_permits(
    fake: Arc<FakeActor>,
    concurrency: usize,
    page_limit: Option<usize>,
    permits: Arc<Semaphore>,
) -> ExtractService {
    let executor = FanOutExecutor::new(NonZeroUsize::new(concurrency).unwrap(), permits);
    ExtractService::new(Some(fake), executor, SearchDefaults::default(), page_limit)
}
