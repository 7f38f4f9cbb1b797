//! TeamMeet endpoints shared by admins, OPS and counselors.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Extension;
use corehub_core::access::Principal;
use corehub_core::schedule::model::NewTeamMeet;
use corehub_core::schedule::{teammeet, AvailabilityQuery};

use super::RejectRequest;
use crate::error::{created, ok, ok_with, ApiJson, ApiResult};
use crate::state::AppState;

pub async fn request_team_meet(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(new): ApiJson<NewTeamMeet>,
) -> ApiResult<impl IntoResponse> {
    let meet = teammeet::request_team_meet(
        &state.db,
        state.mailer.as_ref(),
        state.meetings(),
        &principal,
        new,
    )
    .await?;
    Ok(created("Meeting requested", meet))
}

pub async fn list_team_meets(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(teammeet::list_team_meets(&state.db, &principal).await?))
}

pub async fn get_team_meet(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(teammeet::get_team_meet(&state.db, &principal, &id).await?))
}

pub async fn check_availability(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(query): ApiJson<AvailabilityQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(teammeet::check_team_meet_availability(&state.db, &principal, query).await?))
}

pub async fn accept(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let meet = teammeet::accept_team_meet(&state.db, state.mailer.as_ref(), &principal, &id).await?;
    Ok(ok_with("Meeting accepted", meet))
}

pub async fn reject(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<RejectRequest>,
) -> ApiResult<impl IntoResponse> {
    let meet = teammeet::reject_team_meet(
        &state.db,
        state.mailer.as_ref(),
        state.meetings(),
        &principal,
        &id,
        &req.message,
    )
    .await?;
    Ok(ok_with("Meeting rejected", meet))
}

pub async fn cancel(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let meet = teammeet::cancel_team_meet(
        &state.db,
        state.mailer.as_ref(),
        state.meetings(),
        &principal,
        &id,
    )
    .await?;
    Ok(ok_with("Meeting cancelled", meet))
}

pub async fn complete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let meet = teammeet::complete_team_meet(&state.db, &principal, &id).await?;
    Ok(ok_with("Meeting completed", meet))
}
