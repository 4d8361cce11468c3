//! Ledger store: renewal approval requests

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::renewal::{RenewalRequest, RenewalStatus},
};

#[derive(Clone)]
pub struct RenewalsRepository {
    pool: Pool<Postgres>,
}

impl RenewalsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get renewal request by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<RenewalRequest> {
        sqlx::query_as::<_, RenewalRequest>("SELECT * FROM renewal_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Renewal request with id {} not found", id))
            })
    }

    /// Is there already a pending request for this loan?
    pub async fn has_pending(&self, loan_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                 SELECT 1 FROM renewal_requests WHERE loan_id = $1 AND status = $2
             )",
        )
        .bind(loan_id)
        .bind(RenewalStatus::Pending as i16)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Create a pending renewal request
    pub async fn create(
        &self,
        loan_id: i32,
        user_id: i32,
        reason: Option<&str>,
    ) -> AppResult<RenewalRequest> {
        let request = sqlx::query_as::<_, RenewalRequest>(
            r#"
            INSERT INTO renewal_requests (loan_id, user_id, reason)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(loan_id)
        .bind(user_id)
        .bind(reason)
        .fetch_one(&self.pool)
        .await?;

        Ok(request)
    }

    /// Record the terminal decision on a pending request
    pub async fn decide(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i32,
        status: RenewalStatus,
        new_due_date: Option<DateTime<Utc>>,
    ) -> AppResult<RenewalRequest> {
        let request = sqlx::query_as::<_, RenewalRequest>(
            "UPDATE renewal_requests
             SET status = $1, decided_at = NOW(), new_due_date = $2
             WHERE id = $3 AND status = $4
             RETURNING *",
        )
        .bind(status as i16)
        .bind(new_due_date)
        .bind(id)
        .bind(RenewalStatus::Pending as i16)
        .fetch_optional(&mut **tx)
        .await?;

        request.ok_or_else(|| {
            AppError::Conflict(format!("Renewal request {} is already decided", id))
        })
    }
}
