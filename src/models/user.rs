//! Borrower model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Active and not locked: allowed to borrow and to be admitted from a queue
    pub fn is_eligible(&self) -> bool {
        self.is_active && !self.is_locked
    }
}

/// Create user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
}
