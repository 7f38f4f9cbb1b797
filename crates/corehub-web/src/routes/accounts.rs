//! Users, admins and student profiles.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Extension;
use corehub_core::access::{Principal, Role};
use corehub_core::account::{
    self,
    model::{NewStudent, NewUser},
};
use serde::Deserialize;

use crate::error::{created, ok, ApiJson, ApiQuery, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<Role>,
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(new): ApiJson<NewUser>,
) -> ApiResult<impl IntoResponse> {
    let user = account::create_user(&state.db, &principal, new).await?;
    Ok(created("User created", user))
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(filter): ApiQuery<UserFilter>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(account::list_users(&state.db, &principal, filter.role).await?))
}

pub async fn create_admin(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(mut new): ApiJson<NewUser>,
) -> ApiResult<impl IntoResponse> {
    new.role = Role::Admin;
    let admin = account::create_user(&state.db, &principal, new).await?;
    Ok(created("Admin created", admin))
}

pub async fn list_admins(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(account::list_admins(&state.db, &principal).await?))
}

pub async fn create_student(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(new): ApiJson<NewStudent>,
) -> ApiResult<impl IntoResponse> {
    let student = account::create_student(&state.db, &principal, new).await?;
    Ok(created("Student created", student))
}

pub async fn list_students(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(account::list_students(&state.db, &principal).await?))
}

pub async fn get_student(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(account::get_student(&state.db, &principal, &id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounselorRequest {
    pub counselor_id: Option<String>,
}

pub async fn assign_student_counselor(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<CounselorRequest>,
) -> ApiResult<impl IntoResponse> {
    let student =
        account::assign_student_counselor(&state.db, &principal, &id, req.counselor_id.as_deref()).await?;
    Ok(ok(student))
}
