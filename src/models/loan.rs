//! Loan (borrowing episode) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::fines::DamageSeverity;

/// Loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
pub enum LoanStatus {
    Issued = 0,
    Overdue = 1,
    Returned = 2,
}

impl From<i16> for LoanStatus {
    fn from(v: i16) -> Self {
        match v {
            0 => LoanStatus::Issued,
            1 => LoanStatus::Overdue,
            _ => LoanStatus::Returned,
        }
    }
}

/// Loan model from database
///
/// Invariant: for a given copy, at most one loan has `returned_date = NULL`.
/// Immutable once `returned_date` is set.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub user_id: i32,
    pub item_id: i32,
    pub copy_id: i32,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_date: Option<DateTime<Utc>>,
    pub status: i16, // 0=Issued, 1=Overdue, 2=Returned
    pub extension_count: i16,
    pub renewal_count: i16,
}

impl Loan {
    pub fn is_returned(&self) -> bool {
        self.returned_date.is_some()
    }
}

/// Issue request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLoan {
    pub item_id: i32,
    pub user_id: i32,
    /// Defaults to now + configured loan duration
    pub due_date: Option<DateTime<Utc>>,
}

/// Condition of the copy reported at return time
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReturnCondition {
    #[serde(default)]
    pub is_damaged: bool,
    pub severity: Option<DamageSeverity>,
    #[serde(default)]
    pub is_lost: bool,
    pub notes: Option<String>,
}
