//! Circulation endpoints: issue, return, extend, renew

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        fine::Fine,
        loan::{CreateLoan, Loan, ReturnCondition},
        renewal::RenewalRequest,
    },
    AppState,
};

/// Issue request
#[derive(Deserialize, ToSchema)]
pub struct IssueRequest {
    /// Item to borrow
    pub item_id: i32,
    /// Borrowing user
    pub user_id: i32,
    /// Optional due date; defaults to now + configured loan duration
    pub due_date: Option<DateTime<Utc>>,
}

/// Extend request
#[derive(Deserialize, ToSchema)]
pub struct ExtendRequest {
    pub new_due_date: DateTime<Utc>,
}

/// Renewal request body
#[derive(Deserialize, ToSchema)]
pub struct RenewalRequestBody {
    pub reason: Option<String>,
}

/// Return response: closed loan plus the fine the return produced, if any
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    pub loan: Loan,
    pub fine: Option<Fine>,
}

/// Fine payment request
#[derive(Deserialize, ToSchema)]
pub struct PaymentRequest {
    pub amount: rust_decimal::Decimal,
}

/// Issue an item to a user
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = IssueRequest,
    responses(
        (status = 201, description = "Loan created", body = Loan),
        (status = 400, description = "Invalid due date"),
        (status = 404, description = "Item or user not found"),
        (status = 409, description = "No available copy or user not eligible")
    )
)]
pub async fn issue_item(
    State(state): State<AppState>,
    Json(request): Json<IssueRequest>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    let loan = state
        .services
        .circulation
        .issue_item(CreateLoan {
            item_id: request.item_id,
            user_id: request.user_id,
            due_date: request.due_date,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(loan)))
}

/// Return a borrowed item
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = ReturnCondition,
    responses(
        (status = 200, description = "Item returned", body = ReturnResponse),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_item(
    State(state): State<AppState>,
    Path(loan_id): Path<i32>,
    Json(condition): Json<ReturnCondition>,
) -> AppResult<Json<ReturnResponse>> {
    let (loan, fine) = state.services.circulation.return_item(loan_id, condition).await?;

    Ok(Json(ReturnResponse { loan, fine }))
}

/// Return an item identified by item + user
#[utoipa::path(
    post,
    path = "/items/{item_id}/return/{user_id}",
    tag = "loans",
    params(
        ("item_id" = i32, Path, description = "Item ID"),
        ("user_id" = i32, Path, description = "User ID")
    ),
    request_body = ReturnCondition,
    responses(
        (status = 200, description = "Item returned", body = ReturnResponse),
        (status = 404, description = "No active loan for item and user")
    )
)]
pub async fn return_item_for_user(
    State(state): State<AppState>,
    Path((item_id, user_id)): Path<(i32, i32)>,
    Json(condition): Json<ReturnCondition>,
) -> AppResult<Json<ReturnResponse>> {
    let (loan, fine) = state
        .services
        .circulation
        .return_item_for_user(item_id, user_id, condition)
        .await?;

    Ok(Json(ReturnResponse { loan, fine }))
}

/// Extend the due date of a loan
#[utoipa::path(
    post,
    path = "/loans/{id}/extend",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = ExtendRequest,
    responses(
        (status = 200, description = "Due date extended", body = Loan),
        (status = 400, description = "Loan returned, overdue, or bad due date"),
        (status = 404, description = "Loan not found"),
        (status = 422, description = "Extension limit reached")
    )
)]
pub async fn extend_due_date(
    State(state): State<AppState>,
    Path(loan_id): Path<i32>,
    Json(request): Json<ExtendRequest>,
) -> AppResult<Json<Loan>> {
    let loan = state
        .services
        .circulation
        .extend_due_date(loan_id, request.new_due_date)
        .await?;

    Ok(Json(loan))
}

/// File a renewal request for approval
#[utoipa::path(
    post,
    path = "/loans/{id}/renewals",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = RenewalRequestBody,
    responses(
        (status = 201, description = "Renewal request filed", body = RenewalRequest),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Already pending or loan returned"),
        (status = 422, description = "Renewal limit reached")
    )
)]
pub async fn request_renewal(
    State(state): State<AppState>,
    Path(loan_id): Path<i32>,
    Json(body): Json<RenewalRequestBody>,
) -> AppResult<(StatusCode, Json<RenewalRequest>)> {
    let request = state
        .services
        .circulation
        .request_renewal(loan_id, body.reason.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(request)))
}

/// Approve a pending renewal
#[utoipa::path(
    post,
    path = "/renewals/{id}/approve",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Renewal request ID")
    ),
    responses(
        (status = 200, description = "Renewal approved", body = RenewalRequest),
        (status = 400, description = "Loan returned or overdue"),
        (status = 404, description = "Renewal request not found"),
        (status = 409, description = "Already decided")
    )
)]
pub async fn approve_renewal(
    State(state): State<AppState>,
    Path(renewal_id): Path<i32>,
) -> AppResult<Json<RenewalRequest>> {
    let request = state.services.circulation.approve_renewal(renewal_id).await?;
    Ok(Json(request))
}

/// Reject a pending renewal
#[utoipa::path(
    post,
    path = "/renewals/{id}/reject",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Renewal request ID")
    ),
    responses(
        (status = 200, description = "Renewal rejected", body = RenewalRequest),
        (status = 404, description = "Renewal request not found"),
        (status = 409, description = "Already decided")
    )
)]
pub async fn reject_renewal(
    State(state): State<AppState>,
    Path(renewal_id): Path<i32>,
) -> AppResult<Json<RenewalRequest>> {
    let request = state.services.circulation.reject_renewal(renewal_id).await?;
    Ok(Json(request))
}

/// Get active loans for a user
#[utoipa::path(
    get,
    path = "/users/{id}/loans",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's active loans", body = Vec<Loan>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_loans(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<Loan>>> {
    let loans = state.services.circulation.get_user_loans(user_id).await?;
    Ok(Json(loans))
}

/// Record a payment against a fine
#[utoipa::path(
    post,
    path = "/fines/{id}/payments",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Fine ID")
    ),
    request_body = PaymentRequest,
    responses(
        (status = 200, description = "Payment recorded, updated fine returned", body = Fine),
        (status = 400, description = "Non-positive amount"),
        (status = 404, description = "Fine not found"),
        (status = 409, description = "Fine already paid or waived")
    )
)]
pub async fn pay_fine(
    State(state): State<AppState>,
    Path(fine_id): Path<i32>,
    Json(request): Json<PaymentRequest>,
) -> AppResult<Json<Fine>> {
    let fine = state
        .services
        .circulation
        .pay_fine(fine_id, request.amount)
        .await?;

    Ok(Json(fine))
}

/// Get all fines for a user
#[utoipa::path(
    get,
    path = "/users/{id}/fines",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's fines", body = Vec<Fine>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_fines(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<Fine>>> {
    let fines = state.services.circulation.get_user_fines(user_id).await?;
    Ok(Json(fines))
}
