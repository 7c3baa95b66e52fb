//! In-flight update handlers
//!
//! Both transports hand each update to its own task. The tasks are kept in a
//! `JoinSet` so shutdown can wait for replies and history rows to be written
//! instead of dropping them.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::task::{JoinError, JoinSet};

#[derive(Default)]
pub struct UpdateTasks {
    set: Mutex<JoinSet<()>>,
}

impl UpdateTasks {
    /// Run `task` in the background, tracked until it finishes
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut set = self.lock();
        while let Some(result) = set.try_join_next() {
            log_outcome(result);
        }
        set.spawn(task);
    }

    /// Number of tracked tasks, including finished ones not yet reaped
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Wait until every tracked task has finished
    pub async fn drain(&self) {
        loop {
            let mut set = std::mem::take(&mut *self.lock());
            if set.is_empty() {
                return;
            }
            while let Some(result) = set.join_next().await {
                log_outcome(result);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.set.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn log_outcome(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!("Update handler panicked: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_drain_waits_for_running_tasks() {
        let tasks = UpdateTasks::default();
        let done = Arc::new(AtomicUsize::new(0));

        for delay in [30, 10, 20] {
            let done = Arc::clone(&done);
            tasks.spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(tasks.len(), 3);

        tasks.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_drain_with_nothing_running() {
        let tasks = UpdateTasks::default();
        tasks.drain().await;
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_panicking_task_does_not_stop_drain() {
        let tasks = UpdateTasks::default();
        let done = Arc::new(AtomicUsize::new(0));

        tasks.spawn(async { panic!("handler failed") });
        let counter = Arc::clone(&done);
        tasks.spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tasks.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_finished_tasks_are_reaped_on_spawn() {
        let tasks = UpdateTasks::default();
        tasks.spawn(async {});
        tokio::time::sleep(Duration::from_millis(20)).await;

        tasks.spawn(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
        });
        assert_eq!(tasks.len(), 1);
        tasks.drain().await;
    }
}
