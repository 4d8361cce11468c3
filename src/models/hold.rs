//! Hold request and waiting queue models
//!
//! The queue tables are the authoritative aggregate; `hold_requests` is the
//! durable audit projection of the same fact, updated in the same
//! transaction as every queue mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Hold request status
///
/// `Pending` is the only state that may transition; `Fulfilled`,
/// `Rejected` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
pub enum HoldStatus {
    Pending = 0,
    Approved = 1,
    Fulfilled = 2,
    Rejected = 3,
    Cancelled = 4,
}

impl From<i16> for HoldStatus {
    fn from(v: i16) -> Self {
        match v {
            0 => HoldStatus::Pending,
            1 => HoldStatus::Approved,
            2 => HoldStatus::Fulfilled,
            3 => HoldStatus::Rejected,
            _ => HoldStatus::Cancelled,
        }
    }
}

/// One user's wait entry for one item
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct HoldRequest {
    pub id: i32,
    pub user_id: i32,
    pub item_id: i32,
    pub request_type: i16, // 0=Borrow
    pub status: i16,       // 0=Pending, 1=Approved, 2=Fulfilled, 3=Rejected, 4=Cancelled
    pub priority: i16,
    pub request_date: DateTime<Utc>,
    /// Loan that served this hold, set when status becomes Fulfilled
    pub loan_id: Option<i32>,
    /// Why a hold ended up Rejected (e.g. skipped as ineligible)
    pub resolution: Option<String>,
}

/// Per-item waiting list head record
///
/// `current_notified_user`/`assigned_copy_id` track the in-flight
/// admission: set when a waiter is handed a copy, cleared when that copy
/// comes back.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct HoldQueue {
    pub id: i32,
    pub item_id: i32,
    pub current_notified_user: Option<i32>,
    pub assigned_copy_id: Option<i32>,
}

/// Ordered queue entry
///
/// Positions are a contiguous 1..N ranking ordered by
/// `priority DESC, request_date ASC`; removals renumber the tail.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct QueueMember {
    pub id: i32,
    pub queue_id: i32,
    pub user_id: i32,
    pub hold_request_id: i32,
    pub position: i16,
}

/// Join queue request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct JoinQueue {
    pub user_id: i32,
    /// Higher priority is served first; equal priorities by arrival order
    #[validate(range(min = 0, max = 100))]
    #[serde(default)]
    pub priority: i16,
}
