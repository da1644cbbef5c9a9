//! Client side of the external scraping actor platform.
//!
//! The extraction service only talks to the [`ActorClient`] trait; the Apify
//! REST implementation lives in [`apify`].

pub mod apify;
pub mod error;
pub mod types;

use async_trait::async_trait;

pub use apify::ApifyClient;
pub use error::{ActorError, Result};
pub use types::{DatasetItem, RunData, SearchInput};

/// Runs the job-search actor and reads back its dataset.
///
/// Shared read-only across all concurrent operations of a request.
#[async_trait]
pub trait ActorClient: Send + Sync {
    /// Start a run for `input` and wait until it reaches a terminal status.
    async fn call(&self, input: &SearchInput) -> Result<RunData>;

    /// Fetch the items of a dataset, asking for at most `limit` of them.
    async fn dataset_items(&self, dataset_id: &str, limit: Option<usize>) -> Result<Vec<DatasetItem>>;
}
