//! Durable circulation events
//!
//! Written alongside state transitions so sweeps can deduplicate
//! (one reminder per loan per calendar day) and the notification
//! dispatcher has an audit trail of what was announced.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
pub enum EventType {
    FineApplied = 0,
    DueReminder = 1,
    HoldFulfilled = 2,
    HoldRejected = 3,
    RenewalDecided = 4,
}

impl From<i16> for EventType {
    fn from(v: i16) -> Self {
        match v {
            0 => EventType::FineApplied,
            1 => EventType::DueReminder,
            2 => EventType::HoldFulfilled,
            3 => EventType::HoldRejected,
            _ => EventType::RenewalDecided,
        }
    }
}
