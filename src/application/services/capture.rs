//! Capture Scheduler
//!
//! Captures held authorizations shortly before their occurrence starts.
//! Failures are left for the next run.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::payments::PaymentCoordinator;
use super::registration::RegistrationService;
use super::schedule::{spawn_periodic, RunGuard, ScheduleConfig};
use crate::domain::{DomainResult, RepositoryProvider};
use crate::shared::ShutdownSignal;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CaptureReport {
    pub selected: usize,
    pub captured: usize,
    pub failed: usize,
}

pub struct CaptureScheduler {
    repos: Arc<dyn RepositoryProvider>,
    payments: Arc<PaymentCoordinator>,
    registrations: Arc<RegistrationService>,
    config: ScheduleConfig,
    guard: RunGuard,
}

impl CaptureScheduler {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        payments: Arc<PaymentCoordinator>,
        registrations: Arc<RegistrationService>,
        config: ScheduleConfig,
    ) -> Self {
        Self {
            repos,
            payments,
            registrations,
            config,
            guard: RunGuard::default(),
        }
    }

    /// Start the capture loop in the background.
    pub fn start(self: &Arc<Self>, shutdown: ShutdownSignal) -> JoinHandle<()> {
        let scheduler = self.clone();
        spawn_periodic("payment_capture", self.config.interval, shutdown, move || {
            let scheduler = scheduler.clone();
            async move {
                scheduler.run_once().await;
            }
        })
    }

    /// One pass over `[now - interval, now + lookahead]`. The window
    /// reaches back one interval so a booking made after the previous pass,
    /// for an occurrence starting before this one, is still captured.
    /// Returns `None` when a previous pass is still running.
    pub async fn run_once(&self) -> Option<CaptureReport> {
        let now = Utc::now();
        let lookback = chrono::Duration::from_std(self.config.interval)
            .unwrap_or_else(|_| chrono::Duration::zero());
        let from = now - lookback;
        let to = now + self.config.lookahead;
        self.guard
            .run_exclusive("payment_capture", async {
                match self.capture_due(from, to).await {
                    Ok(report) => report,
                    Err(e) => {
                        error!(error = %e, "Capture run could not load due registrations");
                        CaptureReport::default()
                    }
                }
            })
            .await
    }

    pub async fn capture_due(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> DomainResult<CaptureReport> {
        let due = self
            .repos
            .registrations()
            .find_due_for_capture(window_start, window_end)
            .await?;

        let mut report = CaptureReport {
            selected: due.len(),
            ..CaptureReport::default()
        };

        for registration in due {
            let status = match self
                .payments
                .capture(&registration.authorization_id, &registration.payee_account_id)
                .await
            {
                Ok(status) => status,
                Err(e) => {
                    report.failed += 1;
                    metrics::counter!("payment_captures_total", "result" => "failed").increment(1);
                    warn!(
                        registration_id = %registration.id,
                        authorization_id = %registration.authorization_id,
                        error = %e,
                        "Capture failed, will retry next run"
                    );
                    continue;
                }
            };

            match self
                .registrations
                .update_payment_status(registration.id, status)
                .await
            {
                Ok(_) => {
                    report.captured += 1;
                    metrics::counter!("payment_captures_total", "result" => "captured")
                        .increment(1);
                }
                Err(e) => {
                    report.failed += 1;
                    metrics::counter!("payment_captures_total", "result" => "unrecorded")
                        .increment(1);
                    error!(
                        registration_id = %registration.id,
                        authorization_id = %registration.authorization_id,
                        payment_status = %status,
                        error = %e,
                        "🚨 Payment captured but status not recorded"
                    );
                }
            }
        }

        if report.selected > 0 {
            info!(
                selected = report.selected,
                captured = report.captured,
                failed = report.failed,
                "💰 Capture run finished"
            );
        }
        Ok(report)
    }
}
