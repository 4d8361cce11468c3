//! Administrative endpoints: manual sweep invocation
//!
//! The scheduler runs these on a timer; exposing them keeps the sweeps
//! callable on demand and directly exercisable from integration tests.

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppResult, AppState};

#[derive(Serialize, ToSchema)]
pub struct SweepResponse {
    /// Number of fines or reminders produced by this run
    pub produced: u64,
}

/// Run the overdue sweep now
#[utoipa::path(
    post,
    path = "/admin/sweeps/overdue",
    tag = "admin",
    responses(
        (status = 200, description = "Sweep finished", body = SweepResponse)
    )
)]
pub async fn run_overdue_sweep(State(state): State<AppState>) -> AppResult<Json<SweepResponse>> {
    let produced = state.services.scheduler.run_overdue_sweep().await?;
    Ok(Json(SweepResponse { produced }))
}

/// Run the due-soon reminder sweep now
#[utoipa::path(
    post,
    path = "/admin/sweeps/reminders",
    tag = "admin",
    responses(
        (status = 200, description = "Sweep finished", body = SweepResponse)
    )
)]
pub async fn run_reminder_sweep(State(state): State<AppState>) -> AppResult<Json<SweepResponse>> {
    let produced = state.services.scheduler.run_reminder_sweep().await?;
    Ok(Json(SweepResponse { produced }))
}
