//! Service catalogue and form authoring.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Extension;
use corehub_core::access::Principal;
use corehub_core::form::{self, NewField, NewPart, NewSection, NewSubSection};
use corehub_core::service::{self, NewService};

use crate::error::{created, ok, ApiJson, ApiResult};
use crate::state::AppState;

pub async fn list_services(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(ok(service::list_services(&state.db).await?))
}

pub async fn create_service(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(new): ApiJson<NewService>,
) -> ApiResult<impl IntoResponse> {
    let service = service::create_service(&state.db, &principal, new).await?;
    Ok(created("Service created", service))
}

pub async fn form_structure(
    State(state): State<AppState>,
    Path(service_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(form::get_form_structure(&state.db, &service_id).await?))
}

pub async fn create_part(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(new): ApiJson<NewPart>,
) -> ApiResult<impl IntoResponse> {
    Ok(created("Form part created", form::create_part(&state.db, &principal, new).await?))
}

pub async fn create_section(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(new): ApiJson<NewSection>,
) -> ApiResult<impl IntoResponse> {
    Ok(created("Form section created", form::create_section(&state.db, &principal, new).await?))
}

pub async fn create_sub_section(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(new): ApiJson<NewSubSection>,
) -> ApiResult<impl IntoResponse> {
    Ok(created(
        "Form sub-section created",
        form::create_sub_section(&state.db, &principal, new).await?,
    ))
}

pub async fn create_field(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(new): ApiJson<NewField>,
) -> ApiResult<impl IntoResponse> {
    Ok(created("Form field created", form::create_field(&state.db, &principal, new).await?))
}
