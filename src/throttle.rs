//! Bounded-concurrency task set.
//!
//! [`Throttle`] caps how many fan-out tasks run at once. [`Throttle::spawn`] waits for a free
//! slot before launching a task; the slot's permit travels with the task and is released when
//! the task finishes, whether it returns, fails, panics or is aborted. [`Throttle::drain`] waits
//! for every launched task and hands back their outputs, and is the only point at which callers
//! read fan-out results.

use crate::error::Error;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

/// Default number of simultaneous outbound provider calls per fan-out phase.
pub const DEFAULT_LIMIT: usize = 5;

pub struct Throttle<T> {
    permits: Arc<Semaphore>,
    limit: usize,
    tasks: JoinSet<T>,
}

impl<T: Send + 'static> Throttle<T> {
    /// A throttle admitting at most `limit` tasks at once. A limit of zero is treated as one.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            permits: Arc::new(Semaphore::new(limit)),
            limit,
            tasks: JoinSet::new(),
        }
    }

    /// Wait until fewer than `limit` slots are occupied and occupy one. Dropping the permit
    /// releases the slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThrottleClosed`] if the underlying semaphore was closed.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, Error> {
        self.permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::ThrottleClosed)
    }

    /// Acquire a slot, then launch `task` holding it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThrottleClosed`] if no slot can be acquired; `task` is not launched.
    pub async fn spawn<F>(&mut self, task: F) -> Result<(), Error>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permit = self.acquire().await?;
        self.tasks.spawn(async move {
            let _permit = permit;
            task.await
        });
        Ok(())
    }

    /// Wait for every launched task and return the outputs, in completion order. Tasks that
    /// panicked or were aborted produce no output.
    pub async fn drain(&mut self) -> Vec<T> {
        let mut outputs = Vec::with_capacity(self.tasks.len());
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(output) => outputs.push(output),
                Err(err) if err.is_cancelled() => tracing::debug!("fan-out task aborted"),
                Err(err) => tracing::error!("fan-out task failed: {err}"),
            }
        }
        outputs
    }

    /// Number of slots currently occupied.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.limit - self.permits.available_permits()
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl<T: Send + 'static> Default for Throttle<T> {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_limit() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut throttle = Throttle::new(3);

        for i in 0..20 {
            let running = running.clone();
            let peak = peak.clone();
            throttle
                .spawn(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    i
                })
                .await
                .unwrap();
            assert!(throttle.in_flight() <= 3);
        }

        let mut outputs = throttle.drain().await;
        outputs.sort_unstable();
        assert_eq!(outputs, (0..20).collect::<Vec<_>>());
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(running.load(Ordering::SeqCst), 0);
        assert_eq!(throttle.in_flight(), 0);
    }

    #[tokio::test]
    async fn panicking_task_releases_its_slot() {
        fn explode() -> i32 {
            panic!("provider blew up")
        }

        let mut throttle = Throttle::new(1);
        throttle.spawn(async { explode() }).await.unwrap();
        // Blocks forever if the panicked task kept its permit.
        tokio::time::timeout(Duration::from_secs(5), throttle.spawn(async { 1 }))
            .await
            .expect("slot should be released")
            .unwrap();
        assert_eq!(throttle.drain().await, vec![1]);
        assert_eq!(throttle.in_flight(), 0);
    }

    #[test]
    fn zero_limit_admits_one() {
        let throttle: Throttle<()> = Throttle::new(0);
        assert_eq!(throttle.limit(), 1);
        assert_eq!(Throttle::<()>::default().limit(), DEFAULT_LIMIT);
    }
}
