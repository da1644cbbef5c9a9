use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use super::memory::MemorySnapshot;

/// Result of one work item, tagged with its position in the input
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutput<R> {
    pub index: usize,
    pub value: R,
}

#[derive(Debug, Error)]
pub enum FanOutError<E> {
    /// The operation for one item failed; the whole execution is abandoned
    #[error("item {index} failed: {error}")]
    Item { index: usize, error: E },

    #[error("task for item {index} panicked")]
    Panicked { index: usize },

    #[error("concurrency limiter closed")]
    Closed,
}

impl<E> FanOutError<E> {
    pub fn index(&self) -> Option<usize> {
        match self {
            FanOutError::Item { index, .. } | FanOutError::Panicked { index } => Some(*index),
            FanOutError::Closed => None,
        }
    }
}

/// Runs one fallible operation per work item with bounded concurrency
///
/// # Concurrency Model
/// - Items are split into batches of `concurrency` items
/// - Every item of a batch runs as its own task; the batch is fully drained
///   before the next one starts
/// - Each task holds a permit of the shared `permits` semaphore while running,
///   which caps in-flight operations across every executor built from it
/// - The first failure aborts the remaining tasks of the batch and skips all
///   later batches
#[derive(Clone)]
pub struct FanOutExecutor {
    concurrency: NonZeroUsize,
    permits: Arc<Semaphore>,
}

impl FanOutExecutor {
    pub fn new(concurrency: NonZeroUsize, permits: Arc<Semaphore>) -> Self {
        Self { concurrency, permits }
    }

    pub fn concurrency(&self) -> NonZeroUsize {
        self.concurrency
    }

    /// Same limiter, different batch size
    pub fn with_concurrency(&self, concurrency: NonZeroUsize) -> Self {
        Self {
            concurrency,
            permits: self.permits.clone(),
        }
    }

    /// Execute `operation` once per item
    ///
    /// # Returns
    /// - `Ok(outputs)` - every item succeeded; outputs are in completion order
    ///   within a batch and batches are in input order
    /// - `Err(FanOutError)` - the first failure observed
    pub async fn execute<T, R, E, F, Fut>(
        &self,
        items: Vec<T>,
        operation: F,
    ) -> Result<Vec<ItemOutput<R>>, FanOutError<E>>
    where
        T: Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
        F: Fn(T) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        let total = items.len();
        let batch_size = self.concurrency.get();
        let batched = batch_size < total;
        let batch_count = total.div_ceil(batch_size);

        info!(total, batch_size, batch_count, "Fan-out started");

        let mut outputs = Vec::with_capacity(total);
        let mut remaining = items.into_iter().enumerate().peekable();
        let mut batch_no = 0;

        while remaining.peek().is_some() {
            batch_no += 1;
            let batch: Vec<(usize, T)> = remaining.by_ref().take(batch_size).collect();

            let batch_outputs = self.run_batch(batch, operation.clone()).await?;
            outputs.extend(batch_outputs);

            if batched {
                match MemorySnapshot::capture() {
                    Some(snapshot) => info!(
                        batch = batch_no,
                        batch_count,
                        rss_bytes = snapshot.rss_bytes,
                        memory_percent = snapshot.percent(),
                        "Batch drained"
                    ),
                    None => info!(batch = batch_no, batch_count, "Batch drained"),
                }
            }
        }

        info!(total, "Fan-out completed");
        Ok(outputs)
    }

    async fn run_batch<T, R, E, F, Fut>(
        &self,
        batch: Vec<(usize, T)>,
        operation: F,
    ) -> Result<Vec<ItemOutput<R>>, FanOutError<E>>
    where
        T: Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
        F: Fn(T) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        let mut set = JoinSet::new();
        let mut task_index = std::collections::HashMap::with_capacity(batch.len());
        let mut outputs = Vec::with_capacity(batch.len());

        for (index, item) in batch {
            let permits = self.permits.clone();
            let operation = operation.clone();

            let handle = set.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return Err(FanOutError::Closed),
                };
                debug!(index, "Item started");
                operation(item)
                    .await
                    .map(|value| ItemOutput { index, value })
                    .map_err(|error| FanOutError::Item { index, error })
            });
            task_index.insert(handle.id(), index);
        }

        // Dropping `set` on early return aborts whatever is still running
        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((_, Ok(output))) => {
                    info!(index = output.index, "Item succeeded");
                    outputs.push(output);
                }
                Ok((_, Err(err))) => {
                    error!(index = ?err.index(), "Item failed, abandoning fan-out");
                    return Err(err);
                }
                Err(join_err) => {
                    let index = task_index.get(&join_err.id()).copied().unwrap_or_default();
                    error!(index, "Item task panicked, abandoning fan-out");
                    return Err(FanOutError::Panicked { index });
                }
            }
        }

        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::{sleep, Duration};

    fn executor(concurrency: usize, permits: usize) -> FanOutExecutor {
        FanOutExecutor::new(
            NonZeroUsize::new(concurrency).unwrap(),
            Arc::new(Semaphore::new(permits)),
        )
    }

    /// Tracks how many operations run at the same time
    #[derive(Default)]
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Gauge {
        fn enter(&self) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn leave(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn sequential_mode_preserves_input_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let seen = order.clone();

        let outputs = executor(1, 10)
            .execute(vec![30u64, 10, 20], move |delay| {
                let seen = seen.clone();
                async move {
                    sleep(Duration::from_millis(delay)).await;
                    seen.lock().unwrap().push(delay);
                    Ok::<_, String>(delay * 2)
                }
            })
            .await
            .unwrap();

        assert_eq!(*order.lock().unwrap(), vec![30, 10, 20]);
        let values: Vec<u64> = outputs.iter().map(|o| o.value).collect();
        assert_eq!(values, vec![60, 20, 40]);
        let indices: Vec<usize> = outputs.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn full_concurrency_launches_everything_at_once() {
        let gauge = Arc::new(Gauge::default());
        let g = gauge.clone();

        let outputs = executor(4, 10)
            .execute(vec![1, 2, 3, 4], move |n: u32| {
                let g = g.clone();
                async move {
                    g.enter();
                    sleep(Duration::from_millis(20)).await;
                    g.leave();
                    Ok::<_, String>(n)
                }
            })
            .await
            .unwrap();

        assert_eq!(outputs.len(), 4);
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn batches_drain_before_the_next_starts() {
        let gauge = Arc::new(Gauge::default());
        let g = gauge.clone();
        let finished = Arc::new(Mutex::new(Vec::new()));
        let f = finished.clone();

        // Item 0 is slow, item 1 fast: item 2 must still wait for item 0
        let outputs = executor(2, 10)
            .execute(vec![(0usize, 40u64), (1, 1), (2, 1), (3, 1), (4, 1)], move |(id, delay)| {
                let g = g.clone();
                let f = f.clone();
                async move {
                    g.enter();
                    sleep(Duration::from_millis(delay)).await;
                    f.lock().unwrap().push(id);
                    g.leave();
                    Ok::<_, String>(id)
                }
            })
            .await
            .unwrap();

        assert_eq!(outputs.len(), 5);
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 2);

        let finished = finished.lock().unwrap().clone();
        let pos = |id| finished.iter().position(|x| *x == id).unwrap();
        assert!(pos(0) < pos(2));
        assert!(pos(1) < pos(2));
        assert_eq!(finished[4], 4);
    }

    #[tokio::test]
    async fn shared_permits_cap_in_flight_work() {
        let gauge = Arc::new(Gauge::default());
        let g = gauge.clone();

        executor(6, 2)
            .execute((0..6).collect(), move |n: u32| {
                let g = g.clone();
                async move {
                    g.enter();
                    sleep(Duration::from_millis(10)).await;
                    g.leave();
                    Ok::<_, String>(n)
                }
            })
            .await
            .unwrap();

        assert_eq!(gauge.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn one_failure_fails_everything() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();

        let err = executor(1, 10)
            .execute(vec!["a", "b", "boom", "c", "d"], move |item| {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    if item == "boom" {
                        Err(format!("{item} exploded"))
                    } else {
                        Ok(item)
                    }
                }
            })
            .await
            .unwrap_err();

        match err {
            FanOutError::Item { index, error } => {
                assert_eq!(index, 2);
                assert_eq!(error, "boom exploded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Later items never ran
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failure_aborts_slow_siblings() {
        let completed = Arc::new(AtomicUsize::new(0));
        let c = completed.clone();

        let err = executor(3, 10)
            .execute(vec![0u32, 1, 2], move |n| {
                let c = c.clone();
                async move {
                    if n == 1 {
                        return Err("failed fast");
                    }
                    sleep(Duration::from_millis(200)).await;
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(n)
                }
            })
            .await
            .unwrap_err();

        assert_eq!(err.index(), Some(1));
        sleep(Duration::from_millis(300)).await;
        assert_eq!(completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn panicking_operation_is_reported() {
        let err = executor(2, 10)
            .execute(vec![0u32, 1], |n| async move {
                if n == 1 {
                    panic!("operation panicked");
                }
                Ok::<_, String>(n)
            })
            .await
            .unwrap_err();

        assert!(matches!(err, FanOutError::Panicked { index: 1 }));
    }

    #[tokio::test]
    async fn closed_limiter_is_an_error() {
        let permits = Arc::new(Semaphore::new(1));
        permits.close();
        let executor = FanOutExecutor::new(NonZeroUsize::new(1).unwrap(), permits);

        let err = executor
            .execute(vec![1u32], |n| async move { Ok::<_, String>(n) })
            .await
            .unwrap_err();

        assert!(matches!(err, FanOutError::Closed));
    }

    #[tokio::test]
    async fn empty_input_is_a_no_op() {
        let outputs = executor(3, 3)
            .execute(Vec::<u32>::new(), |n| async move { Ok::<_, String>(n) })
            .await
            .unwrap();
        assert!(outputs.is_empty());
    }
}
