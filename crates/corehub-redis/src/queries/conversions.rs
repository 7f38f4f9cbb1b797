//! Lead → student conversion request queries (Redis).

use crate::client::{
    claim_unique, get_doc, get_docs, index_add, index_members, now_stamp, put_doc, release_unique,
    RedisError, RedisPool, RedisResult,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRow {
    pub id: String,
    pub lead_id: String,
    pub admin_id: String,
    pub requested_by: String,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub resolved_by: Option<String>,
    pub student_id: Option<String>,
    pub created_at: String,
    pub resolved_at: Option<String>,
}

fn conversion_key(id: &str) -> String {
    format!("core:conversion:{}", id)
}

fn pending_key(lead_id: &str) -> String {
    format!("core:conversions:lead:{}:pending", lead_id)
}

/// Insert a pending conversion request. A lead has at most one pending request.
pub async fn insert_conversion(pool: &RedisPool, row: &ConversionRow) -> RedisResult<()> {
    if !claim_unique(pool, &pending_key(&row.lead_id), &row.id).await? {
        return Err(RedisError::Conflict(format!(
            "Lead {} already has a pending conversion request",
            row.lead_id
        )));
    }
    put_doc(pool, &conversion_key(&row.id), row).await?;

    let (_, score) = now_stamp();
    index_add(pool, "core:conversions:all", &row.id, score).await?;
    index_add(pool, &format!("core:conversions:admin:{}", row.admin_id), &row.id, score).await
}

pub async fn get_conversion(pool: &RedisPool, id: &str) -> RedisResult<ConversionRow> {
    get_doc(pool, &conversion_key(id))
        .await?
        .ok_or_else(|| RedisError::NotFound(format!("Conversion request not found: {}", id)))
}

pub async fn list_conversions(pool: &RedisPool) -> RedisResult<Vec<ConversionRow>> {
    let ids = index_members(pool, "core:conversions:all").await?;
    get_docs(pool, ids.iter().map(|id| conversion_key(id)).collect()).await
}

pub async fn list_conversions_by_admin(pool: &RedisPool, admin_id: &str) -> RedisResult<Vec<ConversionRow>> {
    let ids = index_members(pool, &format!("core:conversions:admin:{}", admin_id)).await?;
    get_docs(pool, ids.iter().map(|id| conversion_key(id)).collect()).await
}

/// Overwrite a conversion; resolving it frees the lead for a new request.
pub async fn update_conversion(pool: &RedisPool, row: &ConversionRow) -> RedisResult<()> {
    put_doc(pool, &conversion_key(&row.id), row).await?;
    if row.status != "PENDING" {
        release_unique(pool, &pending_key(&row.lead_id)).await?;
    }
    Ok(())
}
