//! Ordered steps with compensations.
//!
//! Each step that succeeded may register a compensation. When a later step
//! fails, the registered compensations run newest-first before the error is
//! returned to the caller. A compensation that still fails after retrying is
//! reported as a data-integrity incident: the system is left inconsistent and
//! someone has to look at it.

use std::future::Future;

use futures_util::future::BoxFuture;
use tracing::{debug, error, warn};

use super::retry::{retry_with_backoff, RetryConfig};
use crate::shared::errors::DomainError;

type Compensation = Box<dyn Fn() -> BoxFuture<'static, Result<(), DomainError>> + Send + Sync>;

pub struct Saga {
    name: &'static str,
    compensations: Vec<(&'static str, Compensation)>,
    retry: RetryConfig,
}

impl Saga {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            compensations: Vec::new(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Await `action`. On failure every compensation registered so far is
    /// run in reverse order and the action's error is returned unchanged.
    pub async fn step<T, Fut>(&mut self, step: &'static str, action: Fut) -> Result<T, DomainError>
    where
        Fut: Future<Output = Result<T, DomainError>>,
    {
        match action.await {
            Ok(value) => {
                debug!(saga = self.name, step, "Saga step completed");
                Ok(value)
            }
            Err(e) => {
                warn!(saga = self.name, step, error = %e, "Saga step failed, compensating");
                self.compensate().await;
                Err(e)
            }
        }
    }

    /// Register the undo action for the step that just succeeded.
    pub fn on_rollback<F, Fut>(&mut self, step: &'static str, compensation: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), DomainError>> + Send + 'static,
    {
        self.compensations
            .push((step, Box::new(move || Box::pin(compensation()))));
    }

    /// Run all registered compensations newest-first. Returns how many of
    /// them could not be completed.
    pub async fn compensate(&mut self) -> usize {
        let mut failures = 0;

        while let Some((step, compensation)) = self.compensations.pop() {
            let result = retry_with_backoff(
                &self.retry,
                || compensation(),
                DomainError::is_transient,
                step,
            )
            .await;

            match result {
                Ok(()) => debug!(saga = self.name, step, "Compensation applied"),
                Err(e) => {
                    failures += 1;
                    metrics::counter!("saga_compensation_failures_total", "saga" => self.name)
                        .increment(1);
                    error!(
                        saga = self.name,
                        step,
                        error = %e,
                        "🚨 Data integrity incident: compensation failed, manual reconciliation required"
                    );
                }
            }
        }

        failures
    }

    /// Finish successfully; registered compensations are discarded.
    pub fn complete(mut self) {
        debug!(
            saga = self.name,
            steps = self.compensations.len(),
            "Saga completed"
        );
        self.compensations.clear();
    }
}
