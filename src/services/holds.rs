//! Holds queue manager
//!
//! Maintains the per-item ordered wait lists and admits the next eligible
//! waiter whenever a copy frees up. All queue mutations for one item are
//! serialized through a per-item async mutex so position numbering and
//! "exactly one admission per freed copy" hold under concurrent requests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        event::EventType,
        hold::{HoldQueue, HoldRequest, HoldStatus, QueueMember},
        loan::Loan,
    },
    repository::Repository,
    services::notifications::{NotificationDispatcher, TemplateType},
};

/// Outcome of a queue admission attempt.
///
/// An empty or exhausted queue is not an error: the freed copy simply
/// stays Available. `skipped` counts ineligible waiters that were removed
/// along the way.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdmitOutcome {
    Admitted { loan: Loan, skipped: u32 },
    NoEligibleWaiter { skipped: u32 },
    NoCopyAvailable,
}

#[derive(Clone)]
pub struct HoldsService {
    repository: Repository,
    notifier: NotificationDispatcher,
    policy: CirculationConfig,
    locks: Arc<Mutex<HashMap<i32, Arc<tokio::sync::Mutex<()>>>>>,
}

impl HoldsService {
    pub fn new(
        repository: Repository,
        notifier: NotificationDispatcher,
        policy: CirculationConfig,
    ) -> Self {
        Self {
            repository,
            notifier,
            policy,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Single-writer-at-a-time lock for one item's queue
    pub(crate) fn item_lock(&self, item_id: i32) -> Arc<tokio::sync::Mutex<()>> {
        let mut registry = self.locks.lock().expect("item lock registry poisoned");
        registry
            .entry(item_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Join the wait list for an item.
    ///
    /// The member lands at its rank (`priority DESC, request_date ASC`) and
    /// a Pending hold request is written in the same transaction.
    pub async fn join_queue(
        &self,
        item_id: i32,
        user_id: i32,
        priority: i16,
    ) -> AppResult<HoldRequest> {
        self.repository.items.get_by_id(item_id).await?;
        let user = self.repository.users.get_by_id(user_id).await?;
        if !user.is_eligible() {
            return Err(AppError::Validation(
                "User is not eligible to place holds".to_string(),
            ));
        }

        let lock = self.item_lock(item_id);
        let _guard = lock.lock().await;

        if self.repository.loans.has_active_loan(user_id, item_id).await? {
            return Err(AppError::Conflict(
                "User already holds a copy of this item".to_string(),
            ));
        }
        if self.repository.holds.has_open_hold(user_id, item_id).await? {
            return Err(AppError::Conflict(
                "User is already queued for this item".to_string(),
            ));
        }

        let mut tx = self.repository.pool.begin().await?;
        let hold = self
            .repository
            .holds
            .create_hold(&mut tx, user_id, item_id, priority)
            .await?;
        let queue = self
            .repository
            .holds
            .get_or_create_queue(&mut tx, item_id)
            .await?;
        self.repository
            .holds
            .insert_member_ranked(&mut tx, queue.id, user_id, hold.id, priority, hold.request_date)
            .await?;
        tx.commit().await?;

        tracing::info!(item_id, user_id, priority, "User joined hold queue");
        Ok(hold)
    }

    /// Admit the next eligible waiter for an item.
    ///
    /// Invoked whenever a copy may have become available (after a return or
    /// an administrative release). Walks the ranked members in a bounded
    /// loop: ineligible waiters are rejected and removed, the first
    /// eligible one gets the copy, a loan and a Fulfilled hold.
    pub async fn admit_next(&self, item_id: i32) -> AppResult<AdmitOutcome> {
        let lock = self.item_lock(item_id);
        let _guard = lock.lock().await;

        let Some(queue) = self.repository.holds.get_queue_by_item(item_id).await? else {
            return Ok(AdmitOutcome::NoEligibleWaiter { skipped: 0 });
        };

        let members = self.repository.holds.list_members(queue.id).await?;
        let mut skipped: u32 = 0;

        // Bounded by the queue snapshot length, never recursive.
        for member in members {
            if !self.repository.users.is_eligible(member.user_id).await? {
                self.reject_member(&queue, &member).await?;
                skipped += 1;
                continue;
            }

            return match self.admit_member(&queue, &member).await? {
                Some(loan) => Ok(AdmitOutcome::Admitted { loan, skipped }),
                None => Ok(AdmitOutcome::NoCopyAvailable),
            };
        }

        Ok(AdmitOutcome::NoEligibleWaiter { skipped })
    }

    /// Administrative override: admit one specific waiter out of order.
    pub async fn allocate_direct(&self, item_id: i32, user_id: i32) -> AppResult<Loan> {
        self.repository.items.get_by_id(item_id).await?;
        if !self.repository.users.is_eligible(user_id).await? {
            return Err(AppError::Conflict(
                "User is not eligible to borrow".to_string(),
            ));
        }

        let lock = self.item_lock(item_id);
        let _guard = lock.lock().await;

        let queue = self
            .repository
            .holds
            .get_queue_by_item(item_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No hold queue for item {}", item_id))
            })?;
        let member = self
            .repository
            .holds
            .get_member_by_user(queue.id, user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("User {} is not queued for item {}", user_id, item_id))
            })?;

        match self.admit_member(&queue, &member).await? {
            Some(loan) => Ok(loan),
            None => Err(AppError::Conflict(
                "No available copy of this item".to_string(),
            )),
        }
    }

    /// Leave the queue. Only the member themselves may withdraw.
    pub async fn withdraw(&self, member_id: i32, user_id: i32) -> AppResult<()> {
        let member = self.repository.holds.get_member(member_id).await?;
        if member.user_id != user_id {
            return Err(AppError::Forbidden(
                "Queue entry belongs to another user".to_string(),
            ));
        }

        let queue = self.repository.holds.get_queue(member.queue_id).await?;
        let lock = self.item_lock(queue.item_id);
        let _guard = lock.lock().await;

        // The member may have been admitted while we waited for the lock.
        let member = self.repository.holds.get_member(member_id).await?;

        let mut tx = self.repository.pool.begin().await?;
        self.repository
            .holds
            .set_hold_status(&mut tx, member.hold_request_id, HoldStatus::Cancelled, None, None)
            .await?;
        self.repository.holds.remove_member(&mut tx, member.id).await?;
        tx.commit().await?;

        tracing::info!(item_id = queue.item_id, user_id, "User withdrew from hold queue");
        Ok(())
    }

    /// Current members of an item's queue in serving order
    pub async fn list_queue(&self, item_id: i32) -> AppResult<Vec<QueueMember>> {
        match self.repository.holds.get_queue_by_item(item_id).await? {
            Some(queue) => self.repository.holds.list_members(queue.id).await,
            None => Ok(Vec::new()),
        }
    }

    /// Atomically hand the member a freed copy: claim it, create the loan,
    /// fulfil the hold, drop the member from the queue and renumber.
    /// Returns `None` without touching anything when no copy is free.
    async fn admit_member(
        &self,
        queue: &HoldQueue,
        member: &QueueMember,
    ) -> AppResult<Option<Loan>> {
        let mut tx = self.repository.pool.begin().await?;

        let Some(copy_id) = self
            .repository
            .items
            .claim_available_copy(&mut tx, queue.item_id)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        let due_date = Utc::now() + Duration::days(self.policy.loan_duration_days);
        let loan = self
            .repository
            .loans
            .create(&mut tx, member.user_id, queue.item_id, copy_id, due_date)
            .await?;
        self.repository
            .holds
            .set_hold_status(&mut tx, member.hold_request_id, HoldStatus::Fulfilled, Some(loan.id), None)
            .await?;
        self.repository.holds.remove_member(&mut tx, member.id).await?;
        self.repository
            .holds
            .set_offer(&mut tx, queue.id, member.user_id, copy_id)
            .await?;
        tx.commit().await?;

        tracing::info!(
            item_id = queue.item_id,
            user_id = member.user_id,
            loan_id = loan.id,
            "Admitted waiter from hold queue"
        );

        if let Err(e) = self
            .repository
            .events
            .record(
                EventType::HoldFulfilled,
                Some(member.user_id),
                Some(queue.item_id),
                Some(loan.id),
                None,
            )
            .await
        {
            tracing::warn!("Failed to record hold fulfilment event: {}", e);
        }
        self.notifier
            .notify(
                member.user_id,
                TemplateType::HoldFulfilled,
                json!({ "item_id": queue.item_id, "due_date": loan.due_date }),
            )
            .await;

        Ok(Some(loan))
    }

    /// Reject an ineligible waiter and remove them from the queue
    async fn reject_member(&self, queue: &HoldQueue, member: &QueueMember) -> AppResult<()> {
        let mut tx = self.repository.pool.begin().await?;
        self.repository
            .holds
            .set_hold_status(
                &mut tx,
                member.hold_request_id,
                HoldStatus::Rejected,
                None,
                Some("user not eligible at admission time"),
            )
            .await?;
        self.repository.holds.remove_member(&mut tx, member.id).await?;
        tx.commit().await?;

        tracing::info!(
            item_id = queue.item_id,
            user_id = member.user_id,
            "Skipped ineligible waiter"
        );

        if let Err(e) = self
            .repository
            .events
            .record(
                EventType::HoldRejected,
                Some(member.user_id),
                Some(queue.item_id),
                None,
                None,
            )
            .await
        {
            tracing::warn!("Failed to record hold rejection event: {}", e);
        }
        self.notifier
            .notify(
                member.user_id,
                TemplateType::HoldRejected,
                json!({ "item_id": queue.item_id, "reason": "not eligible" }),
            )
            .await;

        Ok(())
    }
}
