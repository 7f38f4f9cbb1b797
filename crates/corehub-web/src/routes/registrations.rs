//! Registrations, OPS ownership and form answers.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Extension;
use corehub_core::access::Principal;
use corehub_core::form::aggregate::FieldChange;
use corehub_core::form::model::PartKey;
use corehub_core::registration::answers::{self, SavePart};
use corehub_core::registration::model::{NewRegistration, OpsAssignment, RegistrationStatus};
use corehub_core::registration;
use serde::Deserialize;

use crate::error::{created, ok, ok_with, ApiError, ApiJson, ApiResult};
use crate::state::AppState;

fn part_key(raw: &str) -> Result<PartKey, ApiError> {
    PartKey::parse(raw).ok_or_else(|| ApiError::BadRequest(format!("Unknown form part: {}", raw)))
}

pub async fn list_registrations(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(registration::list_registrations(&state.db, &principal).await?))
}

pub async fn get_registration(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(registration::get_registration(&state.db, &principal, &id).await?))
}

pub async fn create_registration(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(new): ApiJson<NewRegistration>,
) -> ApiResult<impl IntoResponse> {
    let registration = registration::create_registration(&state.db, &principal, new).await?;
    Ok(created("Registration created", registration))
}

pub async fn assign_ops(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(assignment): ApiJson<OpsAssignment>,
) -> ApiResult<impl IntoResponse> {
    let registration = registration::assign_ops(&state.db, &principal, &id, assignment).await?;
    Ok(ok_with("OPS assigned", registration))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveOpsRequest {
    pub active_ops_id: String,
}

pub async fn switch_active_ops(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ActiveOpsRequest>,
) -> ApiResult<impl IntoResponse> {
    let registration =
        registration::switch_active_ops(&state.db, &principal, &id, &req.active_ops_id).await?;
    Ok(ok_with("Active OPS switched", registration))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: RegistrationStatus,
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let registration = registration::update_status(&state.db, &principal, &id, req.status).await?;
    Ok(ok_with("Registration status updated", registration))
}

pub async fn get_answers(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(answers::get_answers(&state.db, &principal, &id).await?))
}

pub async fn save_part(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((id, part)): Path<(String, String)>,
    ApiJson(input): ApiJson<SavePart>,
) -> ApiResult<impl IntoResponse> {
    let part = part_key(&part)?;
    let saved = answers::save_part(&state.db, &principal, &id, part, input).await?;
    Ok(ok_with("Answers saved", saved))
}

pub async fn update_field(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((id, part)): Path<(String, String)>,
    ApiJson(change): ApiJson<FieldChange>,
) -> ApiResult<impl IntoResponse> {
    let part = part_key(&part)?;
    Ok(ok(answers::update_field(&state.db, &principal, &id, part, change).await?))
}
