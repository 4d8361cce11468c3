//! Ledger store: loan records

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::loan::{Loan, LoanStatus},
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Get the active loan for an item held by a user
    pub async fn get_active_by_item_user(&self, item_id: i32, user_id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans
             WHERE item_id = $1 AND user_id = $2 AND returned_date IS NULL",
        )
        .bind(item_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No active loan of item {} for user {}",
                item_id, user_id
            ))
        })
    }

    /// Does the user currently hold a copy of this item?
    pub async fn has_active_loan(&self, user_id: i32, item_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                 SELECT 1 FROM loans
                 WHERE user_id = $1 AND item_id = $2 AND returned_date IS NULL
             )",
        )
        .bind(user_id)
        .bind(item_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Insert a new loan within a transaction
    pub async fn create(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: i32,
        item_id: i32,
        copy_id: i32,
        due_date: DateTime<Utc>,
    ) -> AppResult<Loan> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (user_id, item_id, copy_id, issue_date, due_date)
            VALUES ($1, $2, $3, NOW(), $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(item_id)
        .bind(copy_id)
        .bind(due_date)
        .fetch_one(&mut **tx)
        .await?;

        Ok(loan)
    }

    /// Close a loan within a transaction
    pub async fn mark_returned(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        loan_id: i32,
        returned_date: DateTime<Utc>,
    ) -> AppResult<Loan> {
        let loan = sqlx::query_as::<_, Loan>(
            "UPDATE loans SET returned_date = $1, status = $2
             WHERE id = $3 AND returned_date IS NULL
             RETURNING *",
        )
        .bind(returned_date)
        .bind(LoanStatus::Returned as i16)
        .bind(loan_id)
        .fetch_optional(&mut **tx)
        .await?;

        loan.ok_or_else(|| AppError::Conflict(format!("Loan {} is already returned", loan_id)))
    }

    /// Apply an extension: new due date, bumped extension count
    pub async fn apply_extension(
        &self,
        loan_id: i32,
        new_due_date: DateTime<Utc>,
    ) -> AppResult<Loan> {
        let loan = sqlx::query_as::<_, Loan>(
            "UPDATE loans SET due_date = $1, extension_count = extension_count + 1
             WHERE id = $2
             RETURNING *",
        )
        .bind(new_due_date)
        .bind(loan_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(loan)
    }

    /// Apply an approved renewal within a transaction
    pub async fn apply_renewal(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        loan_id: i32,
        new_due_date: DateTime<Utc>,
    ) -> AppResult<Loan> {
        let loan = sqlx::query_as::<_, Loan>(
            "UPDATE loans SET due_date = $1, renewal_count = renewal_count + 1
             WHERE id = $2
             RETURNING *",
        )
        .bind(new_due_date)
        .bind(loan_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(loan)
    }

    /// Active loans whose due date is before the cutoff (fine-eligible)
    pub async fn find_overdue_candidates(
        &self,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans
             WHERE returned_date IS NULL AND due_date < $1
             ORDER BY due_date",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    /// Flip an active Issued loan to Overdue. Returns false when the loan
    /// was already Overdue (or got returned meanwhile), which keeps the
    /// sweep idempotent.
    pub async fn promote_to_overdue(&self, loan_id: i32) -> AppResult<bool> {
        let updated = sqlx::query(
            "UPDATE loans SET status = $1
             WHERE id = $2 AND returned_date IS NULL AND status = $3",
        )
        .bind(LoanStatus::Overdue as i16)
        .bind(loan_id)
        .bind(LoanStatus::Issued as i16)
        .execute(&self.pool)
        .await?;

        Ok(updated.rows_affected() > 0)
    }

    /// Active, not-yet-overdue loans due within the window
    pub async fn find_due_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans
             WHERE returned_date IS NULL
               AND status = $1
               AND due_date >= $2 AND due_date <= $3
             ORDER BY due_date",
        )
        .bind(LoanStatus::Issued as i16)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    /// Get active loans for a user
    pub async fn get_user_loans(&self, user_id: i32) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans
             WHERE user_id = $1 AND returned_date IS NULL
             ORDER BY issue_date",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }
}
