//! Public enquiry endpoints, reachable without a token.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use corehub_core::lead::{self, model::EnquiryForm};

use crate::error::{created, ok, ApiJson, ApiResult};
use crate::state::AppState;

pub async fn enquiry_info(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(lead::enquiry_info(&state.db, &slug).await?))
}

pub async fn submit_enquiry(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    ApiJson(form): ApiJson<EnquiryForm>,
) -> ApiResult<impl IntoResponse> {
    let lead = lead::submit_enquiry(&state.db, &slug, form).await?;
    Ok(created("Enquiry submitted", lead))
}
