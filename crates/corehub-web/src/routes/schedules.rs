//! OPS schedule endpoints.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Extension;
use corehub_core::access::Principal;
use corehub_core::schedule::model::{NewOpsSchedule, ScheduleStatus};
use corehub_core::schedule::ops::{self, ScheduleFilter};
use corehub_core::schedule::AvailabilityQuery;
use serde::Deserialize;

use crate::error::{created, ok, ok_with, ApiJson, ApiQuery, ApiResult};
use crate::state::AppState;

pub async fn create_schedule(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(new): ApiJson<NewOpsSchedule>,
) -> ApiResult<impl IntoResponse> {
    let schedule = ops::create_schedule(&state.db, &principal, new).await?;
    Ok(created("Schedule created", schedule))
}

pub async fn list_schedules(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(filter): ApiQuery<ScheduleFilter>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(ops::list_schedules(&state.db, &principal, filter).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ScheduleStatus,
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let schedule = ops::update_schedule_status(&state.db, &principal, &id, req.status).await?;
    Ok(ok_with("Schedule status updated", schedule))
}

pub async fn check_availability(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(query): ApiJson<AvailabilityQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(ops::check_schedule_availability(&state.db, &principal, query).await?))
}
