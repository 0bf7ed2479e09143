//! Shared plumbing for the periodic batch jobs.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::shared::ShutdownSignal;

/// How often a batch runs and how far ahead of now it looks.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleConfig {
    pub interval: Duration,
    pub lookahead: chrono::Duration,
}

/// Lets at most one run of a job proceed at a time. A run that finds the
/// previous one still going is skipped rather than queued.
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    lock: Arc<Mutex<()>>,
}

impl RunGuard {
    pub async fn run_exclusive<F, T>(&self, job: &'static str, run: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        match self.lock.try_lock() {
            Ok(_held) => Some(run.await),
            Err(_) => {
                debug!(job, "Previous run still in progress, skipping");
                None
            }
        }
    }
}

/// Spawn `tick` every `interval` until shutdown is triggered.
pub(crate) fn spawn_periodic<F, Fut>(
    job: &'static str,
    interval: Duration,
    shutdown: ShutdownSignal,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        info!(job, interval_secs = interval.as_secs(), "⏰ Scheduler started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => tick().await,
                _ = shutdown.notified().wait() => {
                    info!(job, "⏰ Scheduler shutting down");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn overlapping_run_is_skipped() {
        let guard = RunGuard::default();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let first = {
            let guard = guard.clone();
            tokio::spawn(async move {
                guard
                    .run_exclusive("test", async {
                        let _ = rx.await;
                        1
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(guard.run_exclusive("test", async { 2 }).await, None);
        tx.send(()).unwrap();
        assert_eq!(first.await.unwrap(), Some(1));
        assert_eq!(guard.run_exclusive("test", async { 3 }).await, Some(3));
    }

    #[tokio::test]
    async fn periodic_task_stops_on_shutdown() {
        let shutdown = ShutdownSignal::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();

        let handle = spawn_periodic("test", Duration::from_millis(5), shutdown.clone(), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler stopped")
            .unwrap();
        assert!(ticks.load(Ordering::SeqCst) >= 1);
    }
}
