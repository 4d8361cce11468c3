//! Circulation engine
//!
//! Issues items, processes returns, extends due dates and runs the renewal
//! approval workflow. Copy allocation goes through the atomic conditional
//! counter decrement in the catalog store, so two concurrent issues can
//! never both take the last copy.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    fines,
    models::{
        event::EventType,
        fine::{Fine, FineReason},
        hold::HoldStatus,
        loan::{CreateLoan, Loan, LoanStatus, ReturnCondition},
        renewal::{RenewalRequest, RenewalStatus},
    },
    repository::Repository,
    services::holds::HoldsService,
    services::notifications::{NotificationDispatcher, TemplateType},
};

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
    notifier: NotificationDispatcher,
    holds: HoldsService,
    policy: CirculationConfig,
}

impl CirculationService {
    pub fn new(
        repository: Repository,
        notifier: NotificationDispatcher,
        holds: HoldsService,
        policy: CirculationConfig,
    ) -> Self {
        Self {
            repository,
            notifier,
            holds,
            policy,
        }
    }

    /// Issue one available copy of an item to a user.
    ///
    /// If the user had an open Borrow hold on the item, the hold is marked
    /// Fulfilled and their queue entry removed in the same transaction.
    pub async fn issue_item(&self, request: CreateLoan) -> AppResult<Loan> {
        let user = self.repository.users.get_by_id(request.user_id).await?;
        if !user.is_eligible() {
            return Err(AppError::Conflict(
                "User is not eligible to borrow".to_string(),
            ));
        }
        self.repository.items.get_by_id(request.item_id).await?;

        let now = Utc::now();
        let due_date = request
            .due_date
            .unwrap_or_else(|| now + Duration::days(self.policy.loan_duration_days));
        if due_date <= now {
            return Err(AppError::Validation(
                "Due date must be in the future".to_string(),
            ));
        }

        // Serialize with queue operations on the same item: a fulfilled
        // hold mutates the member list.
        let lock = self.holds.item_lock(request.item_id);
        let _guard = lock.lock().await;

        let mut tx = self.repository.pool.begin().await?;

        let Some(copy_id) = self
            .repository
            .items
            .claim_available_copy(&mut tx, request.item_id)
            .await?
        else {
            return Err(AppError::Conflict(
                "No available copy of this item".to_string(),
            ));
        };

        let loan = self
            .repository
            .loans
            .create(&mut tx, request.user_id, request.item_id, copy_id, due_date)
            .await?;

        if let Some(hold) = self
            .repository
            .holds
            .find_open_hold(&mut tx, request.user_id, request.item_id)
            .await?
        {
            self.repository
                .holds
                .set_hold_status(&mut tx, hold.id, HoldStatus::Fulfilled, Some(loan.id), None)
                .await?;
            if let Some(queue) = self
                .repository
                .holds
                .get_queue_by_item(request.item_id)
                .await?
            {
                if let Some(member) = self
                    .repository
                    .holds
                    .get_member_by_user(queue.id, request.user_id)
                    .await?
                {
                    self.repository.holds.remove_member(&mut tx, member.id).await?;
                }
            }
        }

        tx.commit().await?;

        tracing::info!(
            loan_id = loan.id,
            item_id = request.item_id,
            user_id = request.user_id,
            "Item issued"
        );
        self.notifier
            .notify(
                request.user_id,
                TemplateType::ItemIssued,
                json!({ "item_id": request.item_id, "due_date": loan.due_date }),
            )
            .await;

        Ok(loan)
    }

    /// Process a return.
    ///
    /// The return itself commits first; fine creation and queue admission
    /// run afterwards and their failures never unwind the return (a missed
    /// overdue fine is recreated by the next scheduler sweep).
    pub async fn return_item(
        &self,
        loan_id: i32,
        condition: ReturnCondition,
    ) -> AppResult<(Loan, Option<Fine>)> {
        let loan = self.repository.loans.get_by_id(loan_id).await?;
        if loan.is_returned() {
            return Err(AppError::Conflict(format!(
                "Loan {} is already returned",
                loan_id
            )));
        }
        let item = self.repository.items.get_by_id(loan.item_id).await?;

        let now = Utc::now();
        let (copy_status, back_in_circulation) = if condition.is_lost {
            (crate::models::item::CopyStatus::Lost, false)
        } else if condition.is_damaged {
            (crate::models::item::CopyStatus::UnderRepair, false)
        } else {
            (crate::models::item::CopyStatus::Available, true)
        };

        let mut tx = self.repository.pool.begin().await?;
        let loan = self.repository.loans.mark_returned(&mut tx, loan_id, now).await?;
        self.repository
            .items
            .release_copy(
                &mut tx,
                loan.copy_id,
                loan.item_id,
                copy_status as i16,
                back_in_circulation,
            )
            .await?;
        // If this copy was the one assigned by a queue admission, that
        // admission has now run its course.
        self.repository
            .holds
            .clear_offer_for_copy(&mut tx, loan.item_id, loan.copy_id)
            .await?;
        tx.commit().await?;

        tracing::info!(loan_id, copy_status = ?copy_status, "Item returned");

        let fine = self.apply_return_fines(&loan, &item.price, &condition, now).await;

        // Always attempt an admission, whatever the fine outcome; when the
        // copy did not come back into circulation this is a cheap no-op.
        match self.holds.admit_next(loan.item_id).await {
            Ok(outcome) => tracing::debug!(item_id = loan.item_id, ?outcome, "Post-return admission"),
            Err(e) => tracing::warn!(item_id = loan.item_id, "Post-return admission failed: {}", e),
        }

        self.notifier
            .notify(
                loan.user_id,
                TemplateType::ItemReturned,
                json!({ "item_id": loan.item_id, "loan_id": loan.id }),
            )
            .await;

        Ok((loan, fine))
    }

    /// Resolve the active loan from item + user, then return it
    pub async fn return_item_for_user(
        &self,
        item_id: i32,
        user_id: i32,
        condition: ReturnCondition,
    ) -> AppResult<(Loan, Option<Fine>)> {
        let loan = self
            .repository
            .loans
            .get_active_by_item_user(item_id, user_id)
            .await?;
        self.return_item(loan.id, condition).await
    }

    /// Extend the due date of an active loan.
    ///
    /// Refused outright for overdue loans, so an already-created overdue
    /// fine is never silently voided by an extension.
    pub async fn extend_due_date(
        &self,
        loan_id: i32,
        new_due_date: DateTime<Utc>,
    ) -> AppResult<Loan> {
        let loan = self.repository.loans.get_by_id(loan_id).await?;
        if loan.is_returned() {
            return Err(AppError::Validation(
                "Cannot extend a returned loan".to_string(),
            ));
        }
        let now = Utc::now();
        if LoanStatus::from(loan.status) == LoanStatus::Overdue || loan.due_date < now {
            return Err(AppError::Validation(
                "Cannot extend an overdue loan".to_string(),
            ));
        }
        if new_due_date <= loan.due_date {
            return Err(AppError::Validation(
                "New due date must be after the current due date".to_string(),
            ));
        }
        if loan.extension_count >= self.policy.max_extensions {
            return Err(AppError::LimitExceeded(
                crate::error::ErrorCode::MaxExtensionsReached,
                format!(
                    "Extension limit reached ({}/{})",
                    loan.extension_count, self.policy.max_extensions
                ),
            ));
        }

        let loan = self.repository.loans.apply_extension(loan_id, new_due_date).await?;
        tracing::info!(loan_id, %new_due_date, "Due date extended");
        Ok(loan)
    }

    /// File a renewal request for approval
    pub async fn request_renewal(
        &self,
        loan_id: i32,
        reason: Option<&str>,
    ) -> AppResult<RenewalRequest> {
        let loan = self.repository.loans.get_by_id(loan_id).await?;
        if loan.is_returned() {
            return Err(AppError::Conflict(
                "Cannot renew a returned loan".to_string(),
            ));
        }
        if loan.renewal_count >= self.policy.max_renewals {
            return Err(AppError::LimitExceeded(
                crate::error::ErrorCode::MaxRenewalsReached,
                format!(
                    "Renewal limit reached ({}/{})",
                    loan.renewal_count, self.policy.max_renewals
                ),
            ));
        }
        if self.repository.renewals.has_pending(loan_id).await? {
            return Err(AppError::Conflict(
                "A renewal request is already pending for this loan".to_string(),
            ));
        }

        self.repository
            .renewals
            .create(loan_id, loan.user_id, reason)
            .await
    }

    /// Approve a pending renewal: applies `now + loan duration` as the new
    /// due date and bumps the loan's renewal count.
    pub async fn approve_renewal(&self, renewal_id: i32) -> AppResult<RenewalRequest> {
        let request = self.repository.renewals.get_by_id(renewal_id).await?;
        let loan = self.repository.loans.get_by_id(request.loan_id).await?;
        if loan.is_returned() {
            return Err(AppError::Validation(
                "Loan has already been returned".to_string(),
            ));
        }
        let now = Utc::now();
        if LoanStatus::from(loan.status) == LoanStatus::Overdue || loan.due_date < now {
            return Err(AppError::Validation(
                "Cannot renew an overdue loan".to_string(),
            ));
        }
        if loan.renewal_count >= self.policy.max_renewals {
            return Err(AppError::LimitExceeded(
                crate::error::ErrorCode::MaxRenewalsReached,
                format!(
                    "Renewal limit reached ({}/{})",
                    loan.renewal_count, self.policy.max_renewals
                ),
            ));
        }

        let new_due_date = now + Duration::days(self.policy.loan_duration_days);
        let mut tx = self.repository.pool.begin().await?;
        let request = self
            .repository
            .renewals
            .decide(&mut tx, renewal_id, RenewalStatus::Approved, Some(new_due_date))
            .await?;
        self.repository
            .loans
            .apply_renewal(&mut tx, request.loan_id, new_due_date)
            .await?;
        tx.commit().await?;

        tracing::info!(renewal_id, loan_id = request.loan_id, "Renewal approved");
        if let Err(e) = self
            .repository
            .events
            .record(
                EventType::RenewalDecided,
                Some(request.user_id),
                Some(loan.item_id),
                Some(loan.id),
                Some(json!({ "decision": "approved" })),
            )
            .await
        {
            tracing::warn!("Failed to record renewal event: {}", e);
        }
        self.notifier
            .notify(
                request.user_id,
                TemplateType::RenewalApproved,
                json!({ "loan_id": request.loan_id, "new_due_date": new_due_date }),
            )
            .await;

        Ok(request)
    }

    /// Reject a pending renewal
    pub async fn reject_renewal(&self, renewal_id: i32) -> AppResult<RenewalRequest> {
        let mut tx = self.repository.pool.begin().await?;
        let request = self
            .repository
            .renewals
            .decide(&mut tx, renewal_id, RenewalStatus::Rejected, None)
            .await?;
        tx.commit().await?;

        tracing::info!(renewal_id, loan_id = request.loan_id, "Renewal rejected");
        if let Err(e) = self
            .repository
            .events
            .record(
                EventType::RenewalDecided,
                Some(request.user_id),
                None,
                Some(request.loan_id),
                Some(json!({ "decision": "rejected" })),
            )
            .await
        {
            tracing::warn!("Failed to record renewal event: {}", e);
        }
        self.notifier
            .notify(
                request.user_id,
                TemplateType::RenewalRejected,
                json!({ "loan_id": request.loan_id }),
            )
            .await;

        Ok(request)
    }

    /// Record a payment against an outstanding fine
    pub async fn pay_fine(
        &self,
        fine_id: i32,
        amount: rust_decimal::Decimal,
    ) -> AppResult<Fine> {
        if amount <= rust_decimal::Decimal::ZERO {
            return Err(AppError::Validation(
                "Payment amount must be positive".to_string(),
            ));
        }

        let fine = self.repository.fines.get_by_id(fine_id).await?;
        match crate::models::fine::FineStatus::from(fine.status) {
            crate::models::fine::FineStatus::Paid => {
                return Err(AppError::Conflict("Fine is already paid".to_string()));
            }
            crate::models::fine::FineStatus::Waived => {
                return Err(AppError::Conflict("Fine has been waived".to_string()));
            }
            _ => {}
        }

        let (fine, payment) = self.repository.fines.record_payment(fine_id, amount).await?;
        tracing::info!(fine_id, payment_id = payment.id, %amount, "Fine payment recorded");
        Ok(fine)
    }

    /// Active loans for a user
    pub async fn get_user_loans(&self, user_id: i32) -> AppResult<Vec<Loan>> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.loans.get_user_loans(user_id).await
    }

    /// All fines for a user
    pub async fn get_user_fines(&self, user_id: i32) -> AppResult<Vec<Fine>> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.fines.list_for_user(user_id).await
    }

    /// Create the fines a return calls for, at most one per reason per
    /// loan. Runs after the return committed; errors are logged, not
    /// propagated. Returns the most significant fine for the response.
    async fn apply_return_fines(
        &self,
        loan: &Loan,
        price: &Option<rust_decimal::Decimal>,
        condition: &ReturnCondition,
        returned_at: DateTime<Utc>,
    ) -> Option<Fine> {
        let price = price.unwrap_or_default();
        let mut created: Option<Fine> = None;

        let overdue_amount = fines::overdue_fine(
            loan.due_date,
            returned_at,
            self.policy.daily_fine_rate,
            self.policy.grace_period_days,
        );
        if overdue_amount > rust_decimal::Decimal::ZERO {
            created = self
                .create_fine(loan, overdue_amount, FineReason::Overdue)
                .await
                .or(created);
        }

        if condition.is_damaged && !condition.is_lost {
            let severity = condition
                .severity
                .unwrap_or(crate::fines::DamageSeverity::Moderate);
            let amount = fines::damage_fine(price, severity);
            created = self
                .create_fine(loan, amount, FineReason::Damaged)
                .await
                .or(created);
        }

        if condition.is_lost {
            let amount = fines::lost_fine(price, self.policy.lost_processing_fee);
            created = self
                .create_fine(loan, amount, FineReason::Lost)
                .await
                .or(created);
        }

        created
    }

    async fn create_fine(
        &self,
        loan: &Loan,
        amount: rust_decimal::Decimal,
        reason: FineReason,
    ) -> Option<Fine> {
        match self
            .repository
            .fines
            .create_for_loan_if_absent(loan.id, loan.user_id, loan.item_id, amount, reason)
            .await
        {
            Ok(Some(fine)) => {
                tracing::info!(loan_id = loan.id, ?reason, %amount, "Fine created");
                if let Err(e) = self
                    .repository
                    .events
                    .record(
                        EventType::FineApplied,
                        Some(loan.user_id),
                        Some(loan.item_id),
                        Some(loan.id),
                        Some(json!({ "reason": reason as i16, "amount": amount })),
                    )
                    .await
                {
                    tracing::warn!("Failed to record fine event: {}", e);
                }
                self.notifier
                    .notify(
                        loan.user_id,
                        TemplateType::FineApplied,
                        json!({ "loan_id": loan.id, "amount": amount }),
                    )
                    .await;
                Some(fine)
            }
            // Fine already existed (e.g. the overdue sweep beat us to it).
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(
                    loan_id = loan.id,
                    ?reason,
                    "Fine creation failed, deferring to the next sweep: {}",
                    e
                );
                None
            }
        }
    }
}
