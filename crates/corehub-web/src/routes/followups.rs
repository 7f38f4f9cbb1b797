//! Counselor follow-up endpoints.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Extension;
use corehub_core::access::Principal;
use corehub_core::schedule::followup;
use corehub_core::schedule::model::{FollowUpStatusUpdate, NewFollowUp};
use corehub_core::schedule::AvailabilityQuery;
use serde::Deserialize;

use crate::error::{created, ok, ok_with, ApiJson, ApiQuery, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpFilter {
    pub lead_id: Option<String>,
}

pub async fn create_follow_up(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(new): ApiJson<NewFollowUp>,
) -> ApiResult<impl IntoResponse> {
    let follow_up = followup::create_follow_up(&state.db, &principal, new).await?;
    Ok(created("Follow-up scheduled", follow_up))
}

pub async fn list_follow_ups(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(filter): ApiQuery<FollowUpFilter>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(followup::list_follow_ups(&state.db, &principal, filter.lead_id.as_deref()).await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<FollowUpStatusUpdate>,
) -> ApiResult<impl IntoResponse> {
    let outcome = followup::update_follow_up_status(&state.db, &principal, &id, update).await?;
    Ok(ok_with("Follow-up updated", outcome))
}

pub async fn check_availability(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(query): ApiJson<AvailabilityQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(followup::check_follow_up_availability(&state.db, &principal, query).await?))
}
