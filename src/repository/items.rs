//! Catalog store: items and their physical copies
//!
//! The `available_copies` counter is only ever touched through conditional
//! UPDATEs so that two concurrent issues cannot both take the last copy.

use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::item::{CreateItem, Item},
};

#[derive(Clone)]
pub struct ItemsRepository {
    pool: Pool<Postgres>,
}

impl ItemsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get item by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Item> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))
    }

    /// Create an item together with its physical copies
    pub async fn create(&self, item: &CreateItem) -> AppResult<Item> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (title, quantity, available_copies, price)
            VALUES ($1, $2, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&item.title)
        .bind(item.quantity)
        .bind(item.price)
        .fetch_one(&mut *tx)
        .await?;

        for n in 1..=item.quantity {
            sqlx::query("INSERT INTO copies (item_id, barcode) VALUES ($1, $2)")
                .bind(created.id)
                .bind(format!("{:06}-{:03}", created.id, n))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    /// Atomically claim one available copy of an item within a transaction.
    ///
    /// The counter decrement is guarded by `available_copies > 0`, then one
    /// Available copy row is flipped to Issued (`FOR UPDATE SKIP LOCKED`
    /// keeps concurrent claimers off the same row). Returns `None` when no
    /// copy is free; the caller decides whether that is a conflict.
    pub async fn claim_available_copy(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item_id: i32,
    ) -> AppResult<Option<i32>> {
        let decremented = sqlx::query(
            "UPDATE items SET available_copies = available_copies - 1
             WHERE id = $1 AND available_copies > 0",
        )
        .bind(item_id)
        .execute(&mut **tx)
        .await?;

        if decremented.rows_affected() == 0 {
            return Ok(None);
        }

        let copy_id = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE copies SET status = 1
            WHERE id = (
                SELECT id FROM copies
                WHERE item_id = $1 AND status = 0
                ORDER BY id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id
            "#,
        )
        .bind(item_id)
        .fetch_optional(&mut **tx)
        .await?;

        match copy_id {
            Some(id) => Ok(Some(id)),
            // Counter said yes but no Available row exists: the counter has
            // drifted. Abort so the rollback restores it.
            None => Err(AppError::Internal(format!(
                "available_copies counter out of sync for item {}",
                item_id
            ))),
        }
    }

    /// Set a copy's status and, when it becomes Available again, put it
    /// back into the availability counter in the same transaction.
    pub async fn release_copy(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        copy_id: i32,
        item_id: i32,
        new_status: i16,
        back_in_circulation: bool,
    ) -> AppResult<()> {
        sqlx::query("UPDATE copies SET status = $1 WHERE id = $2")
            .bind(new_status)
            .bind(copy_id)
            .execute(&mut **tx)
            .await?;

        if back_in_circulation {
            sqlx::query("UPDATE items SET available_copies = available_copies + 1 WHERE id = $1")
                .bind(item_id)
                .execute(&mut **tx)
                .await?;
        }

        Ok(())
    }
}
