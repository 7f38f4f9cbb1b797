//! Leads and lead-to-student conversions.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Extension;
use corehub_core::access::Principal;
use corehub_core::lead::model::{ConversionStatus, LeadStage};
use corehub_core::lead::{self, StageUpdate};
use serde::Deserialize;

use super::RejectRequest;
use crate::error::{created, ok, ok_with, ApiJson, ApiQuery, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LeadFilter {
    pub stage: Option<LeadStage>,
}

pub async fn list_leads(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(filter): ApiQuery<LeadFilter>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(lead::list_leads(&state.db, &principal, filter.stage).await?))
}

pub async fn get_lead(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(lead::get_lead(&state.db, &principal, &id).await?))
}

pub async fn update_stage(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<StageUpdate>,
) -> ApiResult<impl IntoResponse> {
    let lead = lead::update_lead_stage(&state.db, &principal, &id, update).await?;
    Ok(ok_with("Lead stage updated", lead))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignCounselorRequest {
    pub counselor_id: String,
}

pub async fn assign_counselor(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<AssignCounselorRequest>,
) -> ApiResult<impl IntoResponse> {
    let lead = lead::assign_lead_counselor(&state.db, &principal, &id, &req.counselor_id).await?;
    Ok(ok_with("Counselor assigned", lead))
}

pub async fn request_conversion(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let conversion = lead::request_conversion(&state.db, &principal, &id).await?;
    Ok(created("Conversion requested", conversion))
}

#[derive(Debug, Default, Deserialize)]
pub struct ConversionFilter {
    pub status: Option<ConversionStatus>,
}

pub async fn list_conversions(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(filter): ApiQuery<ConversionFilter>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(lead::list_conversions(&state.db, &principal, filter.status).await?))
}

pub async fn approve_conversion(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let approved = lead::approve_conversion(&state.db, state.mailer.as_ref(), &principal, &id).await?;
    Ok(ok_with("Lead converted to student", approved))
}

pub async fn reject_conversion(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<RejectRequest>,
) -> ApiResult<impl IntoResponse> {
    let conversion = lead::reject_conversion(&state.db, &principal, &id, &req.message).await?;
    Ok(ok_with("Conversion rejected", conversion))
}
