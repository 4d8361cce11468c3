//! Fine (penalty) model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
pub enum FineReason {
    Overdue = 0,
    Damaged = 1,
    Lost = 2,
    Manual = 3,
}

impl From<i16> for FineReason {
    fn from(v: i16) -> Self {
        match v {
            0 => FineReason::Overdue,
            1 => FineReason::Damaged,
            2 => FineReason::Lost,
            _ => FineReason::Manual,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
pub enum FineStatus {
    Outstanding = 0,
    PartialPaid = 1,
    Paid = 2,
    Waived = 3,
}

impl From<i16> for FineStatus {
    fn from(v: i16) -> Self {
        match v {
            0 => FineStatus::Outstanding,
            1 => FineStatus::PartialPaid,
            2 => FineStatus::Paid,
            _ => FineStatus::Waived,
        }
    }
}

/// Fine record, never deleted once created
///
/// Invariant: at most one fine per reason per loan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Fine {
    pub id: i32,
    pub user_id: i32,
    pub item_id: i32,
    /// NULL for manual fines
    pub loan_id: Option<i32>,
    pub amount: Decimal,
    pub reason: i16, // 0=Overdue, 1=Damaged, 2=Lost, 3=Manual
    pub status: i16, // 0=Outstanding, 1=PartialPaid, 2=Paid, 3=Waived
    pub created_at: DateTime<Utc>,
}

/// Append-only payment entry against a fine
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FinePayment {
    pub id: i32,
    pub fine_id: i32,
    pub amount: Decimal,
    pub paid_at: DateTime<Utc>,
}
