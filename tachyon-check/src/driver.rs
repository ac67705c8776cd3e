//! Bounded-concurrency batch execution
use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tachyon_check_core::{RequestError, RequestOutcome};
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

/// A fixed number of workers draining a queue of request tasks.
///
/// The only operation is a blocking batch: submit `count` tasks, get back `count` outcomes once
/// every one of them has finished. There is no partial or streaming retrieval and no way to
/// cancel a batch once it is running.
#[derive(Clone, Copy, Debug)]
pub struct WorkerPool {
    max_workers: NonZeroUsize,
}

impl WorkerPool {
    pub fn new(max_workers: NonZeroUsize) -> Self {
        Self { max_workers }
    }

    /// Run `task(0) .. task(count - 1)` with at most `max_workers` of them in flight.
    ///
    /// Always returns exactly `count` outcomes, in completion order rather than submission order.
    /// A task which panics yields a failed outcome and leaves its siblings untouched.
    #[instrument(name = "batch", skip(self, task), fields(workers = self.max_workers.get()))]
    pub async fn run_batch<T, F>(&self, count: usize, task: T) -> Vec<RequestOutcome>
    where
        T: Fn(usize) -> F + Send + Sync + 'static + Clone,
        F: Future<Output = RequestOutcome> + Send + 'static,
    {
        let (tx, rx) = async_channel::unbounded();
        for index in 0..count {
            // NOTE: Unbounded and still open, so this cannot fail
            let _ = tx.try_send(index);
        }
        tx.close();

        let workers = self.max_workers.get().min(count);
        debug!("Dispatching {count} tasks over {workers} workers");

        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let rx = rx.clone();
                let task = task.clone();
                tokio::spawn(
                    async move {
                        let mut outcomes = vec![];
                        while let Ok(index) = rx.recv().await {
                            outcomes.push(run_isolated(&task, index).await);
                        }
                        outcomes
                    }
                    .in_current_span(),
                )
            })
            .collect();

        let mut outcomes = Vec::with_capacity(count);
        for handle in handles {
            match handle.await {
                Ok(batch) => outcomes.extend(batch),
                Err(err) => error!("Worker lost: {err}"),
            }
        }

        // NOTE: A lost worker takes its finished outcomes down with it
        if outcomes.len() < count {
            warn!("{} outcomes missing after join", count - outcomes.len());
            outcomes.resize_with(count, || {
                RequestOutcome::failed(Duration::ZERO, RequestError::Aborted("worker lost".into()))
            });
        }

        outcomes
    }
}

/// Shorthand for a one-off [`WorkerPool`] batch.
pub async fn run_concurrent<T, F>(
    task: T,
    count: usize,
    max_workers: NonZeroUsize,
) -> Vec<RequestOutcome>
where
    T: Fn(usize) -> F + Send + Sync + 'static + Clone,
    F: Future<Output = RequestOutcome> + Send + 'static,
{
    WorkerPool::new(max_workers).run_batch(count, task).await
}

async fn run_isolated<T, F>(task: &T, index: usize) -> RequestOutcome
where
    T: Fn(usize) -> F,
    F: Future<Output = RequestOutcome>,
{
    let start = Instant::now();
    match AssertUnwindSafe(async { task(index).await })
        .catch_unwind()
        .await
    {
        Ok(outcome) => outcome,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!("Task {index} panicked: {message}");
            RequestOutcome::failed(start.elapsed(), RequestError::Aborted(message))
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tachyon_check_core::{BenchmarkStats, ProxiedResponse};

    fn workers(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    async fn ok_after(delay: Duration) -> RequestOutcome {
        let start = Instant::now();
        tokio::time::sleep(delay).await;
        RequestOutcome::completed(start.elapsed(), ProxiedResponse::new(200, "{}"))
    }

    #[tokio::test]
    async fn test_count_when_all_fail() {
        for (count, max_workers) in [(1, 1), (7, 3), (20, 10), (3, 8)] {
            let outcomes = run_concurrent(
                |i| async move {
                    RequestOutcome::failed(Duration::ZERO, RequestError::Network(format!("#{i}")))
                },
                count,
                workers(max_workers),
            )
            .await;

            assert_eq!(outcomes.len(), count);
            assert!(outcomes.iter().all(|o| !o.success()));
        }
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn test_panics_are_isolated() {
        let outcomes = run_concurrent(
            |i| async move {
                if i % 2 == 0 {
                    panic!("task {i} blew up");
                }
                RequestOutcome::completed(Duration::ZERO, ProxiedResponse::new(200, ""))
            },
            10,
            workers(3),
        )
        .await;

        assert_eq!(outcomes.len(), 10);
        assert_eq!(outcomes.iter().filter(|o| o.success()).count(), 5);
        assert!(outcomes
            .iter()
            .filter_map(RequestOutcome::error)
            .all(|e| e.tag() == "aborted"));
        assert!(logs_contain("panicked"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_in_flight_is_bounded() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let task = {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            move |_| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    let outcome = ok_after(Duration::from_millis(20)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    outcome
                }
            }
        };

        let outcomes = run_concurrent(task, 30, workers(4)).await;

        assert_eq!(outcomes.len(), 30);
        assert_eq!(peak.load(Ordering::SeqCst), 4);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    #[ntest::timeout(5_000)]
    async fn test_batch_timing() {
        let delay = Duration::from_millis(100);
        for max_workers in [1, 3, 10] {
            let start = Instant::now();
            let outcomes = run_concurrent(move |_| ok_after(delay), 6, workers(max_workers)).await;
            let total_elapsed = start.elapsed();

            assert!(total_elapsed >= delay);
            let stats = BenchmarkStats::from_outcomes(&outcomes, total_elapsed);
            assert_eq!(stats.success_count, 6);
            assert_eq!(
                stats.requests_per_second,
                6. / total_elapsed.as_secs_f64()
            );
        }
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let outcomes = run_concurrent(move |_| ok_after(Duration::ZERO), 0, workers(4)).await;
        assert!(outcomes.is_empty());
    }
}
