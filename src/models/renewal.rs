//! Renewal approval workflow model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Renewal request status: `Pending -> {Approved, Rejected}`, both terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
pub enum RenewalStatus {
    Pending = 0,
    Approved = 1,
    Rejected = 2,
}

impl From<i16> for RenewalStatus {
    fn from(v: i16) -> Self {
        match v {
            0 => RenewalStatus::Pending,
            1 => RenewalStatus::Approved,
            _ => RenewalStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RenewalRequest {
    pub id: i32,
    pub loan_id: i32,
    pub user_id: i32,
    pub reason: Option<String>,
    pub status: i16, // 0=Pending, 1=Approved, 2=Rejected
    pub request_date: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    /// Due date applied on approval
    pub new_due_date: Option<DateTime<Utc>>,
}
