//! Catalog item and physical copy models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Copy status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
pub enum CopyStatus {
    Available = 0,
    Issued = 1,
    UnderRepair = 2,
    Lost = 3,
}

impl From<i16> for CopyStatus {
    fn from(v: i16) -> Self {
        match v {
            0 => CopyStatus::Available,
            1 => CopyStatus::Issued,
            2 => CopyStatus::UnderRepair,
            _ => CopyStatus::Lost,
        }
    }
}

/// Catalog item with its denormalized availability counter
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Item {
    pub id: i32,
    pub title: String,
    pub quantity: i16,
    /// Must always equal the count of this item's copies with status Available
    pub available_copies: i16,
    pub price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// Create item request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItem {
    #[validate(length(min = 1, max = 512))]
    pub title: String,
    /// Number of physical copies to register
    #[validate(range(min = 0, max = 1000))]
    pub quantity: i16,
    pub price: Option<Decimal>,
}
