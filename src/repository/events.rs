//! Ledger store: durable circulation events

use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::event::EventType};

#[derive(Clone)]
pub struct EventsRepository {
    pool: Pool<Postgres>,
}

impl EventsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Append an event
    pub async fn record(
        &self,
        event_type: EventType,
        user_id: Option<i32>,
        item_id: Option<i32>,
        loan_id: Option<i32>,
        payload: Option<serde_json::Value>,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO circulation_events (event_type, user_id, item_id, loan_id, payload)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(event_type as i16)
        .bind(user_id)
        .bind(item_id)
        .bind(loan_id)
        .bind(payload)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a due-soon reminder for a loan. The partial unique index on
    /// `(loan_id, event_date)` caps reminders at one per loan per calendar
    /// day; returns false when today's reminder already exists.
    pub async fn record_reminder(
        &self,
        loan_id: i32,
        user_id: i32,
        item_id: i32,
    ) -> AppResult<bool> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO circulation_events (event_type, user_id, item_id, loan_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (loan_id, event_date) WHERE event_type = 1 DO NOTHING
            "#,
        )
        .bind(EventType::DueReminder as i16)
        .bind(user_id)
        .bind(item_id)
        .bind(loan_id)
        .execute(&self.pool)
        .await?;

        Ok(inserted.rows_affected() > 0)
    }
}
