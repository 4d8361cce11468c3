//! Fine amount calculation
//!
//! Pure, deterministic functions shared by the circulation engine (at
//! return time) and the overdue sweep (for loans still out). No I/O here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Damage severity reported at return time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DamageSeverity {
    Minor,
    Moderate,
    Severe,
}

impl DamageSeverity {
    /// Fraction of the item price charged for the damage
    pub fn rate(self) -> Decimal {
        match self {
            DamageSeverity::Minor => Decimal::new(25, 2),
            DamageSeverity::Moderate => Decimal::new(50, 2),
            DamageSeverity::Severe => Decimal::new(75, 2),
        }
    }
}

/// Overdue fine: `max(0, ceil(days_late) - grace_period_days) * daily_rate`.
///
/// Zero when the loan was returned on or before the due date, or within
/// the grace period. Partial late days count as a full day.
pub fn overdue_fine(
    due_date: DateTime<Utc>,
    returned_date: DateTime<Utc>,
    daily_rate: Decimal,
    grace_period_days: i64,
) -> Decimal {
    if returned_date <= due_date {
        return Decimal::ZERO;
    }

    let late_seconds = (returned_date - due_date).num_seconds();
    let days_late = (late_seconds + 86_399) / 86_400;
    let billable_days = (days_late - grace_period_days).max(0);

    daily_rate * Decimal::from(billable_days)
}

/// Damage fine: item price scaled by the severity rate
pub fn damage_fine(price: Decimal, severity: DamageSeverity) -> Decimal {
    price * severity.rate()
}

/// Lost-copy fine: full item price plus a flat processing fee
pub fn lost_fine(price: Decimal, processing_fee: Decimal) -> Decimal {
    price + processing_fee
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn overdue_fine_zero_when_returned_on_time() {
        let due = date(2024, 1, 10);
        assert_eq!(overdue_fine(due, date(2024, 1, 5), dec!(1), 2), Decimal::ZERO);
        assert_eq!(overdue_fine(due, due, dec!(1), 2), Decimal::ZERO);
    }

    #[test]
    fn overdue_fine_zero_within_grace_period() {
        let due = date(2024, 1, 1);
        assert_eq!(overdue_fine(due, date(2024, 1, 3), dec!(1), 2), Decimal::ZERO);
    }

    #[test]
    fn overdue_fine_charges_days_past_grace() {
        // Due 2024-01-01, returned 2024-01-05, grace 2 days, $1/day => $2
        let due = date(2024, 1, 1);
        let returned = date(2024, 1, 5);
        assert_eq!(overdue_fine(due, returned, dec!(1), 2), dec!(2));
    }

    #[test]
    fn overdue_fine_rounds_partial_days_up() {
        let due = date(2024, 1, 1);
        let returned = due + chrono::Duration::days(3) + chrono::Duration::hours(1);
        // 3 days + 1 hour late => 4 billable days before grace
        assert_eq!(overdue_fine(due, returned, dec!(0.50), 0), dec!(2.00));
    }

    #[test]
    fn damage_fine_scales_with_severity() {
        assert_eq!(damage_fine(dec!(20), DamageSeverity::Minor), dec!(5.00));
        assert_eq!(damage_fine(dec!(20), DamageSeverity::Moderate), dec!(10.00));
        assert_eq!(damage_fine(dec!(20), DamageSeverity::Severe), dec!(15.00));
    }

    #[test]
    fn lost_fine_adds_processing_fee() {
        assert_eq!(lost_fine(dec!(18.50), dec!(5)), dec!(23.50));
    }
}
