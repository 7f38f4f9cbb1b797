//! Student service registration queries (Redis).

use crate::client::{
    claim_unique, get_doc, get_docs, index_add, index_members, index_remove, now_stamp, put_doc,
    release_unique, RedisError, RedisPool, RedisResult,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRow {
    pub id: String,
    pub student_id: String,
    pub service_id: String,
    pub admin_id: String,
    pub primary_ops_id: Option<String>,
    pub secondary_ops_id: Option<String>,
    pub active_ops_id: Option<String>,
    pub status: String,
    pub registered_at: String,
    pub updated_at: String,
}

fn registration_key(id: &str) -> String {
    format!("core:registration:{}", id)
}

fn enrollment_key(student_id: &str, service_id: &str) -> String {
    format!("core:registrations:student:{}:service:{}", student_id, service_id)
}

fn ops_index(ops_id: &str) -> String {
    format!("core:registrations:ops:{}", ops_id)
}

/// Insert a registration. A student holds one live registration per service.
pub async fn insert_registration(pool: &RedisPool, row: &RegistrationRow) -> RedisResult<()> {
    if !claim_unique(pool, &enrollment_key(&row.student_id, &row.service_id), &row.id).await? {
        return Err(RedisError::Conflict(format!(
            "Student {} is already registered for service {}",
            row.student_id, row.service_id
        )));
    }

    put_doc(pool, &registration_key(&row.id), row).await?;

    let (_, score) = now_stamp();
    index_add(pool, "core:registrations:all", &row.id, score).await?;
    index_add(pool, &format!("core:registrations:admin:{}", row.admin_id), &row.id, score).await?;
    index_add(pool, &format!("core:registrations:student:{}", row.student_id), &row.id, score).await?;
    if let Some(ref ops_id) = row.active_ops_id {
        index_add(pool, &ops_index(ops_id), &row.id, score).await?;
    }
    Ok(())
}

pub async fn get_registration(pool: &RedisPool, id: &str) -> RedisResult<RegistrationRow> {
    get_doc(pool, &registration_key(id))
        .await?
        .ok_or_else(|| RedisError::NotFound(format!("Registration not found: {}", id)))
}

pub async fn list_registrations(pool: &RedisPool) -> RedisResult<Vec<RegistrationRow>> {
    let ids = index_members(pool, "core:registrations:all").await?;
    get_docs(pool, ids.iter().map(|id| registration_key(id)).collect()).await
}

pub async fn list_registrations_by_admin(
    pool: &RedisPool,
    admin_id: &str,
) -> RedisResult<Vec<RegistrationRow>> {
    let ids = index_members(pool, &format!("core:registrations:admin:{}", admin_id)).await?;
    get_docs(pool, ids.iter().map(|id| registration_key(id)).collect()).await
}

pub async fn list_registrations_by_student(
    pool: &RedisPool,
    student_id: &str,
) -> RedisResult<Vec<RegistrationRow>> {
    let ids = index_members(pool, &format!("core:registrations:student:{}", student_id)).await?;
    get_docs(pool, ids.iter().map(|id| registration_key(id)).collect()).await
}

/// Registrations currently owned by an OPS user (`active_ops_id`).
pub async fn list_registrations_by_active_ops(
    pool: &RedisPool,
    ops_id: &str,
) -> RedisResult<Vec<RegistrationRow>> {
    let ids = index_members(pool, &ops_index(ops_id)).await?;
    get_docs(pool, ids.iter().map(|id| registration_key(id)).collect()).await
}

/// Overwrite a registration, moving the active-OPS index when ownership
/// changed and freeing the enrollment slot once cancelled.
pub async fn update_registration(
    pool: &RedisPool,
    previous: &RegistrationRow,
    row: &RegistrationRow,
) -> RedisResult<()> {
    let (now, score) = now_stamp();
    let mut updated = row.clone();
    updated.updated_at = now;
    put_doc(pool, &registration_key(&row.id), &updated).await?;

    if previous.active_ops_id != row.active_ops_id {
        if let Some(ref old) = previous.active_ops_id {
            index_remove(pool, &ops_index(old), &row.id).await?;
        }
        if let Some(ref new) = row.active_ops_id {
            index_add(pool, &ops_index(new), &row.id, score).await?;
        }
    }

    if row.status == "CANCELLED" && previous.status != "CANCELLED" {
        release_unique(pool, &enrollment_key(&row.student_id, &row.service_id)).await?;
    }
    Ok(())
}
