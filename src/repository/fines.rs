//! Ledger store: fine records
//!
//! Fine rows are append-mostly; the partial unique index on
//! `(loan_id, reason)` is what makes fine creation idempotent, so inserts
//! go through `ON CONFLICT DO NOTHING` instead of a read-then-write check.

use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::fine::{Fine, FinePayment, FineReason, FineStatus},
};

#[derive(Clone)]
pub struct FinesRepository {
    pool: Pool<Postgres>,
}

impl FinesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get fine by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Fine> {
        sqlx::query_as::<_, Fine>("SELECT * FROM fines WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Fine with id {} not found", id)))
    }

    /// Insert a fine for a loan unless one with the same reason already
    /// exists. Returns `None` when the fine was already there.
    pub async fn create_for_loan_if_absent(
        &self,
        loan_id: i32,
        user_id: i32,
        item_id: i32,
        amount: Decimal,
        reason: FineReason,
    ) -> AppResult<Option<Fine>> {
        let fine = sqlx::query_as::<_, Fine>(
            r#"
            INSERT INTO fines (user_id, item_id, loan_id, amount, reason)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (loan_id, reason) WHERE loan_id IS NOT NULL DO NOTHING
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(item_id)
        .bind(loan_id)
        .bind(amount)
        .bind(reason as i16)
        .fetch_optional(&self.pool)
        .await?;

        Ok(fine)
    }

    /// Append a payment against a fine and roll the fine's status forward
    /// (PartialPaid, then Paid once the payments cover the amount).
    pub async fn record_payment(
        &self,
        fine_id: i32,
        amount: Decimal,
    ) -> AppResult<(Fine, FinePayment)> {
        let mut tx = self.pool.begin().await?;

        let payment = sqlx::query_as::<_, FinePayment>(
            r#"
            INSERT INTO fine_payments (fine_id, amount)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(fine_id)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;

        let paid_total: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM fine_payments WHERE fine_id = $1",
        )
        .bind(fine_id)
        .fetch_one(&mut *tx)
        .await?;

        let fine = sqlx::query_as::<_, Fine>("SELECT * FROM fines WHERE id = $1")
            .bind(fine_id)
            .fetch_one(&mut *tx)
            .await?;

        let new_status = if paid_total >= fine.amount {
            FineStatus::Paid
        } else {
            FineStatus::PartialPaid
        };

        let fine = sqlx::query_as::<_, Fine>(
            "UPDATE fines SET status = $1 WHERE id = $2 RETURNING *",
        )
        .bind(new_status as i16)
        .bind(fine_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((fine, payment))
    }

    /// All fines for a user, newest first
    pub async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<Fine>> {
        let fines = sqlx::query_as::<_, Fine>(
            "SELECT * FROM fines WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(fines)
    }
}
