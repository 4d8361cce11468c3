//! Overdue & reminder scheduler
//!
//! Two idempotent sweeps, kept separate from the timer so they can be
//! tested (and re-run after a crash) by direct invocation. The timer is a
//! plain tokio interval loop spawned from `main`.

use chrono::{Duration, Utc};
use serde_json::json;

use crate::{
    config::CirculationConfig,
    error::AppResult,
    fines,
    models::{event::EventType, fine::FineReason, loan::LoanStatus},
    repository::Repository,
    services::notifications::{NotificationDispatcher, TemplateType},
};

#[derive(Clone)]
pub struct SchedulerService {
    repository: Repository,
    notifier: NotificationDispatcher,
    policy: CirculationConfig,
}

impl SchedulerService {
    pub fn new(
        repository: Repository,
        notifier: NotificationDispatcher,
        policy: CirculationConfig,
    ) -> Self {
        Self {
            repository,
            notifier,
            policy,
        }
    }

    /// Promote grace-expired loans to Overdue and create their fines.
    ///
    /// Safe to re-run at any time: the status flip is guarded by the
    /// current status, and the fine insert by the one-overdue-fine-per-loan
    /// unique index. Returns the number of fines actually created.
    pub async fn run_overdue_sweep(&self) -> AppResult<u64> {
        let now = Utc::now();
        let cutoff = now - Duration::days(self.policy.grace_period_days);
        let candidates = self.repository.loans.find_overdue_candidates(cutoff).await?;

        let mut fines_created: u64 = 0;

        for loan in candidates {
            if LoanStatus::from(loan.status) != LoanStatus::Overdue {
                self.repository.loans.promote_to_overdue(loan.id).await?;
            }

            let amount = fines::overdue_fine(
                loan.due_date,
                now,
                self.policy.daily_fine_rate,
                self.policy.grace_period_days,
            );
            if amount.is_zero() {
                continue;
            }

            let inserted = self
                .repository
                .fines
                .create_for_loan_if_absent(
                    loan.id,
                    loan.user_id,
                    loan.item_id,
                    amount,
                    FineReason::Overdue,
                )
                .await?;

            if let Some(fine) = inserted {
                fines_created += 1;
                if let Err(e) = self
                    .repository
                    .events
                    .record(
                        EventType::FineApplied,
                        Some(loan.user_id),
                        Some(loan.item_id),
                        Some(loan.id),
                        Some(json!({ "amount": fine.amount, "reason": FineReason::Overdue as i16 })),
                    )
                    .await
                {
                    tracing::warn!(loan_id = loan.id, "Failed to record fine event: {}", e);
                }
                self.notifier
                    .notify(
                        loan.user_id,
                        TemplateType::FineApplied,
                        json!({ "loan_id": loan.id, "amount": fine.amount }),
                    )
                    .await;
            }
        }

        Ok(fines_created)
    }

    /// Emit due-soon reminders for loans inside the reminder window, at
    /// most one per loan per calendar day. Returns the number of reminders
    /// emitted.
    pub async fn run_reminder_sweep(&self) -> AppResult<u64> {
        let now = Utc::now();
        let window_end = now + Duration::days(self.policy.reminder_window_days);
        let due_soon = self.repository.loans.find_due_between(now, window_end).await?;

        let mut reminders_sent: u64 = 0;

        for loan in due_soon {
            let inserted = self
                .repository
                .events
                .record_reminder(loan.id, loan.user_id, loan.item_id)
                .await?;
            if !inserted {
                continue;
            }

            reminders_sent += 1;
            self.notifier
                .notify(
                    loan.user_id,
                    TemplateType::DueReminder,
                    json!({ "loan_id": loan.id, "due_date": loan.due_date }),
                )
                .await;
        }

        Ok(reminders_sent)
    }

    /// Spawn the periodic sweep loop. Sweep failures are logged and the
    /// loop keeps ticking.
    pub fn spawn_sweep_loop(&self, interval: std::time::Duration) -> tokio::task::JoinHandle<()> {
        let svc = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match svc.run_overdue_sweep().await {
                    Ok(count) => tracing::info!(fines_created = count, "Overdue sweep finished"),
                    Err(e) => tracing::error!("Overdue sweep failed: {}", e),
                }
                match svc.run_reminder_sweep().await {
                    Ok(count) => tracing::info!(reminders_sent = count, "Reminder sweep finished"),
                    Err(e) => tracing::error!("Reminder sweep failed: {}", e),
                }
            }
        })
    }
}
