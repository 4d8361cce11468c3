//! Ledger store: hold requests and per-item waiting queues
//!
//! Queue mutations and their hold_requests audit rows always travel in the
//! same transaction, so the two views of a hold can never diverge.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::hold::{HoldQueue, HoldRequest, HoldStatus, QueueMember},
};

#[derive(Clone)]
pub struct HoldsRepository {
    pool: Pool<Postgres>,
}

impl HoldsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Does the user have an open (Pending/Approved) hold on this item?
    pub async fn has_open_hold(&self, user_id: i32, item_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                 SELECT 1 FROM hold_requests
                 WHERE user_id = $1 AND item_id = $2 AND status IN ($3, $4)
             )",
        )
        .bind(user_id)
        .bind(item_id)
        .bind(HoldStatus::Pending as i16)
        .bind(HoldStatus::Approved as i16)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Find an open Borrow hold for user+item, if any (issue fulfils it)
    pub async fn find_open_hold(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: i32,
        item_id: i32,
    ) -> AppResult<Option<HoldRequest>> {
        let hold = sqlx::query_as::<_, HoldRequest>(
            "SELECT * FROM hold_requests
             WHERE user_id = $1 AND item_id = $2 AND status IN ($3, $4)",
        )
        .bind(user_id)
        .bind(item_id)
        .bind(HoldStatus::Pending as i16)
        .bind(HoldStatus::Approved as i16)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(hold)
    }

    /// Insert a Pending hold request within a transaction
    pub async fn create_hold(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: i32,
        item_id: i32,
        priority: i16,
    ) -> AppResult<HoldRequest> {
        let hold = sqlx::query_as::<_, HoldRequest>(
            r#"
            INSERT INTO hold_requests (user_id, item_id, priority)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(item_id)
        .bind(priority)
        .fetch_one(&mut **tx)
        .await?;

        Ok(hold)
    }

    /// Move a Pending hold to a terminal (or Approved) state
    pub async fn set_hold_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        hold_id: i32,
        status: HoldStatus,
        loan_id: Option<i32>,
        resolution: Option<&str>,
    ) -> AppResult<HoldRequest> {
        let hold = sqlx::query_as::<_, HoldRequest>(
            "UPDATE hold_requests
             SET status = $1, loan_id = COALESCE($2, loan_id), resolution = COALESCE($3, resolution)
             WHERE id = $4
             RETURNING *",
        )
        .bind(status as i16)
        .bind(loan_id)
        .bind(resolution)
        .bind(hold_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(hold)
    }

    /// Get the queue head record for an item, if one exists
    pub async fn get_queue_by_item(&self, item_id: i32) -> AppResult<Option<HoldQueue>> {
        let queue = sqlx::query_as::<_, HoldQueue>(
            "SELECT * FROM hold_queues WHERE item_id = $1",
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(queue)
    }

    /// Get queue head record by ID
    pub async fn get_queue(&self, queue_id: i32) -> AppResult<HoldQueue> {
        sqlx::query_as::<_, HoldQueue>("SELECT * FROM hold_queues WHERE id = $1")
            .bind(queue_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Queue with id {} not found", queue_id)))
    }

    /// Get or create the queue head record for an item
    pub async fn get_or_create_queue(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item_id: i32,
    ) -> AppResult<HoldQueue> {
        let queue = sqlx::query_as::<_, HoldQueue>(
            r#"
            INSERT INTO hold_queues (item_id) VALUES ($1)
            ON CONFLICT (item_id) DO UPDATE SET item_id = EXCLUDED.item_id
            RETURNING *
            "#,
        )
        .bind(item_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(queue)
    }

    /// Insert a member at its rank (`priority DESC, request_date ASC`),
    /// shifting everyone behind it one position back.
    pub async fn insert_member_ranked(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        queue_id: i32,
        user_id: i32,
        hold_request_id: i32,
        priority: i16,
        request_date: DateTime<Utc>,
    ) -> AppResult<QueueMember> {
        let ahead: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM queue_members qm
            JOIN hold_requests hr ON hr.id = qm.hold_request_id
            WHERE qm.queue_id = $1
              AND (hr.priority > $2
                   OR (hr.priority = $2 AND hr.request_date <= $3))
            "#,
        )
        .bind(queue_id)
        .bind(priority)
        .bind(request_date)
        .fetch_one(&mut **tx)
        .await?;

        let position = (ahead + 1) as i16;

        sqlx::query(
            "UPDATE queue_members SET position = position + 1
             WHERE queue_id = $1 AND position >= $2",
        )
        .bind(queue_id)
        .bind(position)
        .execute(&mut **tx)
        .await?;

        let member = sqlx::query_as::<_, QueueMember>(
            r#"
            INSERT INTO queue_members (queue_id, user_id, hold_request_id, position)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(queue_id)
        .bind(user_id)
        .bind(hold_request_id)
        .bind(position)
        .fetch_one(&mut **tx)
        .await?;

        Ok(member)
    }

    /// List members in serving order
    pub async fn list_members(&self, queue_id: i32) -> AppResult<Vec<QueueMember>> {
        let members = sqlx::query_as::<_, QueueMember>(
            "SELECT * FROM queue_members WHERE queue_id = $1 ORDER BY position",
        )
        .bind(queue_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    /// Get a queue member by ID
    pub async fn get_member(&self, member_id: i32) -> AppResult<QueueMember> {
        sqlx::query_as::<_, QueueMember>("SELECT * FROM queue_members WHERE id = $1")
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Queue member with id {} not found", member_id))
            })
    }

    /// Get a member by queue and user
    pub async fn get_member_by_user(
        &self,
        queue_id: i32,
        user_id: i32,
    ) -> AppResult<Option<QueueMember>> {
        let member = sqlx::query_as::<_, QueueMember>(
            "SELECT * FROM queue_members WHERE queue_id = $1 AND user_id = $2",
        )
        .bind(queue_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    /// Remove a member and renumber the tail so positions stay 1..N
    pub async fn remove_member(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        member_id: i32,
    ) -> AppResult<()> {
        let removed = sqlx::query_as::<_, QueueMember>(
            "DELETE FROM queue_members WHERE id = $1 RETURNING *",
        )
        .bind(member_id)
        .fetch_optional(&mut **tx)
        .await?;

        let removed = removed.ok_or_else(|| {
            AppError::NotFound(format!("Queue member with id {} not found", member_id))
        })?;

        sqlx::query(
            "UPDATE queue_members SET position = position - 1
             WHERE queue_id = $1 AND position > $2",
        )
        .bind(removed.queue_id)
        .bind(removed.position)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Clear the in-flight offer when the copy it assigned comes back.
    /// No-op when the queue's offer points at a different copy.
    pub async fn clear_offer_for_copy(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item_id: i32,
        copy_id: i32,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE hold_queues SET current_notified_user = NULL, assigned_copy_id = NULL
             WHERE item_id = $1 AND assigned_copy_id = $2",
        )
        .bind(item_id)
        .bind(copy_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Track the in-flight offer on a queue
    pub async fn set_offer(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        queue_id: i32,
        user_id: i32,
        copy_id: i32,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE hold_queues SET current_notified_user = $1, assigned_copy_id = $2
             WHERE id = $3",
        )
        .bind(user_id)
        .bind(copy_id)
        .bind(queue_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
