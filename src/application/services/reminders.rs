//! Reminder Scheduler
//!
//! Sends one reminder per upcoming registration. The sent flag is set only
//! after the notifier accepted the message, so a crash in between can
//! produce a duplicate but never a silent miss.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::schedule::{spawn_periodic, RunGuard, ScheduleConfig};
use crate::domain::{DomainResult, ReminderMessage, ReminderNotifier, RepositoryProvider};
use crate::shared::ShutdownSignal;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReminderReport {
    pub selected: usize,
    pub sent: usize,
    pub failed: usize,
}

pub struct ReminderScheduler {
    repos: Arc<dyn RepositoryProvider>,
    notifier: Arc<dyn ReminderNotifier>,
    config: ScheduleConfig,
    guard: RunGuard,
}

impl ReminderScheduler {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        notifier: Arc<dyn ReminderNotifier>,
        config: ScheduleConfig,
    ) -> Self {
        Self {
            repos,
            notifier,
            config,
            guard: RunGuard::default(),
        }
    }

    pub fn start(self: &Arc<Self>, shutdown: ShutdownSignal) -> JoinHandle<()> {
        let scheduler = self.clone();
        spawn_periodic("event_reminders", self.config.interval, shutdown, move || {
            let scheduler = scheduler.clone();
            async move {
                scheduler.run_once().await;
            }
        })
    }

    pub async fn run_once(&self) -> Option<ReminderReport> {
        let now = Utc::now();
        let to = now + self.config.lookahead;
        self.guard
            .run_exclusive("event_reminders", async {
                match self.dispatch_due(now, to).await {
                    Ok(report) => report,
                    Err(e) => {
                        error!(error = %e, "Reminder run could not load due registrations");
                        ReminderReport::default()
                    }
                }
            })
            .await
    }

    pub async fn dispatch_due(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> DomainResult<ReminderReport> {
        let registrations = self.repos.registrations();
        let targets = registrations
            .find_due_reminders(window_start, window_end)
            .await?;

        let mut report = ReminderReport {
            selected: targets.len(),
            ..ReminderReport::default()
        };

        for target in &targets {
            let message = ReminderMessage::for_target(target);

            if let Err(e) = self.notifier.send(&message).await {
                report.failed += 1;
                metrics::counter!("reminders_dispatched_total", "result" => "failed").increment(1);
                warn!(
                    registration_id = %target.registration_id,
                    error = %e,
                    "Reminder not delivered, will retry next run"
                );
                continue;
            }

            match registrations.mark_reminder_sent(target.registration_id).await {
                Ok(()) => {
                    report.sent += 1;
                    metrics::counter!("reminders_dispatched_total", "result" => "sent")
                        .increment(1);
                }
                Err(e) => {
                    report.failed += 1;
                    metrics::counter!("reminders_dispatched_total", "result" => "unmarked")
                        .increment(1);
                    error!(
                        registration_id = %target.registration_id,
                        error = %e,
                        "Reminder sent but not marked, it may be sent again"
                    );
                }
            }
        }

        if report.selected > 0 {
            info!(
                selected = report.selected,
                sent = report.sent,
                failed = report.failed,
                "📨 Reminder run finished"
            );
        }
        Ok(report)
    }
}
