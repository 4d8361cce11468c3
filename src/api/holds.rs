//! Holds queue endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        hold::{HoldRequest, JoinQueue, QueueMember},
        loan::Loan,
    },
    services::holds::AdmitOutcome,
    AppState,
};

#[derive(Deserialize, IntoParams)]
pub struct WithdrawParams {
    /// User withdrawing their own entry
    pub user_id: i32,
}

#[derive(Deserialize, ToSchema)]
pub struct AllocateRequest {
    pub user_id: i32,
}

/// Join the wait queue for an item
#[utoipa::path(
    post,
    path = "/items/{id}/queue",
    tag = "holds",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    request_body = JoinQueue,
    responses(
        (status = 201, description = "Hold request created", body = HoldRequest),
        (status = 404, description = "Item or user not found"),
        (status = 409, description = "Already queued or already holding the item")
    )
)]
pub async fn join_queue(
    State(state): State<AppState>,
    Path(item_id): Path<i32>,
    Json(request): Json<JoinQueue>,
) -> AppResult<(StatusCode, Json<HoldRequest>)> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let hold = state
        .services
        .holds
        .join_queue(item_id, request.user_id, request.priority)
        .await?;

    Ok((StatusCode::CREATED, Json(hold)))
}

/// List the wait queue of an item in serving order
#[utoipa::path(
    get,
    path = "/items/{id}/queue",
    tag = "holds",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Queue members", body = Vec<QueueMember>)
    )
)]
pub async fn list_queue(
    State(state): State<AppState>,
    Path(item_id): Path<i32>,
) -> AppResult<Json<Vec<QueueMember>>> {
    let members = state.services.holds.list_queue(item_id).await?;
    Ok(Json(members))
}

/// Admit the next eligible waiter (administrative)
#[utoipa::path(
    post,
    path = "/items/{id}/queue/admit",
    tag = "holds",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Admission outcome", body = AdmitOutcome)
    )
)]
pub async fn admit_next(
    State(state): State<AppState>,
    Path(item_id): Path<i32>,
) -> AppResult<Json<AdmitOutcome>> {
    let outcome = state.services.holds.admit_next(item_id).await?;
    Ok(Json(outcome))
}

/// Allocate a copy to a specific queued user (administrative override)
#[utoipa::path(
    post,
    path = "/items/{id}/queue/allocate",
    tag = "holds",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    request_body = AllocateRequest,
    responses(
        (status = 201, description = "Loan created for the waiter", body = Loan),
        (status = 404, description = "Item, queue, or queued user not found"),
        (status = 409, description = "No available copy or user not eligible")
    )
)]
pub async fn allocate_direct(
    State(state): State<AppState>,
    Path(item_id): Path<i32>,
    Json(request): Json<AllocateRequest>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    let loan = state
        .services
        .holds
        .allocate_direct(item_id, request.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(loan)))
}

/// Withdraw from a queue (own entry only)
#[utoipa::path(
    delete,
    path = "/queue/members/{id}",
    tag = "holds",
    params(
        ("id" = i32, Path, description = "Queue member ID"),
        WithdrawParams
    ),
    responses(
        (status = 204, description = "Withdrawn"),
        (status = 403, description = "Entry belongs to another user"),
        (status = 404, description = "Queue member not found")
    )
)]
pub async fn withdraw(
    State(state): State<AppState>,
    Path(member_id): Path<i32>,
    Query(params): Query<WithdrawParams>,
) -> AppResult<StatusCode> {
    state.services.holds.withdraw(member_id, params.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
