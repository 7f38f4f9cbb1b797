//! Document fields, uploads and review.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Extension;
use corehub_core::access::Principal;
use corehub_core::document::{
    self,
    model::{NewDocumentField, NewUpload},
};
use serde::Deserialize;

use super::RejectRequest;
use crate::error::{created, ok, ok_with, ApiJson, ApiQuery, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFilter {
    #[serde(default)]
    pub all_versions: bool,
}

pub async fn list_documents(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(registration_id): Path<String>,
    ApiQuery(filter): ApiQuery<DocumentFilter>,
) -> ApiResult<impl IntoResponse> {
    let documents =
        document::list_documents(&state.db, &principal, &registration_id, filter.all_versions).await?;
    Ok(ok(documents))
}

pub async fn upload_document(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(registration_id): Path<String>,
    ApiJson(upload): ApiJson<NewUpload>,
) -> ApiResult<impl IntoResponse> {
    let document = document::upload_document(&state.db, &principal, &registration_id, upload).await?;
    Ok(created("Document uploaded", document))
}

pub async fn registration_document_fields(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(registration_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(document::registration_document_fields(&state.db, &principal, &registration_id).await?))
}

pub async fn create_document_field(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(new): ApiJson<NewDocumentField>,
) -> ApiResult<impl IntoResponse> {
    let field = document::create_document_field(&state.db, &principal, new).await?;
    Ok(created("Document field created", field))
}

pub async fn list_document_fields(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(document::list_document_fields(&state.db, &principal).await?))
}

pub async fn approve_document(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let document = document::approve_document(&state.db, &principal, &id).await?;
    Ok(ok_with("Document approved", document))
}

pub async fn reject_document(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<RejectRequest>,
) -> ApiResult<impl IntoResponse> {
    let document =
        document::reject_document(&state.db, state.mailer.as_ref(), &principal, &id, &req.message).await?;
    Ok(ok_with("Document rejected", document))
}
