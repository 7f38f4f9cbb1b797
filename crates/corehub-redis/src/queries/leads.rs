//! Lead queries (Redis).

use crate::client::{
    get_doc, get_docs, index_add, index_members, index_remove, now_stamp, put_doc, RedisError,
    RedisPool, RedisResult,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadRow {
    pub id: String,
    pub admin_id: String,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub city: Option<String>,
    #[serde(default)]
    pub service_types: Vec<String>,
    pub stage: String,
    pub assigned_counselor_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

fn lead_key(id: &str) -> String {
    format!("core:lead:{}", id)
}

fn counselor_index(counselor_id: &str) -> String {
    format!("core:leads:counselor:{}", counselor_id)
}

pub async fn insert_lead(pool: &RedisPool, row: &LeadRow) -> RedisResult<()> {
    put_doc(pool, &lead_key(&row.id), row).await?;

    let (_, score) = now_stamp();
    index_add(pool, "core:leads:all", &row.id, score).await?;
    index_add(pool, &format!("core:leads:admin:{}", row.admin_id), &row.id, score).await?;
    if let Some(ref counselor_id) = row.assigned_counselor_id {
        index_add(pool, &counselor_index(counselor_id), &row.id, score).await?;
    }
    Ok(())
}

pub async fn get_lead(pool: &RedisPool, id: &str) -> RedisResult<LeadRow> {
    get_doc(pool, &lead_key(id))
        .await?
        .ok_or_else(|| RedisError::NotFound(format!("Lead not found: {}", id)))
}

pub async fn list_leads(pool: &RedisPool) -> RedisResult<Vec<LeadRow>> {
    let ids = index_members(pool, "core:leads:all").await?;
    get_docs(pool, ids.iter().map(|id| lead_key(id)).collect()).await
}

pub async fn list_leads_by_admin(pool: &RedisPool, admin_id: &str) -> RedisResult<Vec<LeadRow>> {
    let ids = index_members(pool, &format!("core:leads:admin:{}", admin_id)).await?;
    get_docs(pool, ids.iter().map(|id| lead_key(id)).collect()).await
}

pub async fn list_leads_by_counselor(pool: &RedisPool, counselor_id: &str) -> RedisResult<Vec<LeadRow>> {
    let ids = index_members(pool, &counselor_index(counselor_id)).await?;
    get_docs(pool, ids.iter().map(|id| lead_key(id)).collect()).await
}

/// Overwrite a lead, moving the counselor index when the assignment changed.
pub async fn update_lead(pool: &RedisPool, previous: &LeadRow, row: &LeadRow) -> RedisResult<()> {
    let (now, score) = now_stamp();
    let mut updated = row.clone();
    updated.updated_at = now;
    put_doc(pool, &lead_key(&row.id), &updated).await?;

    if previous.assigned_counselor_id != row.assigned_counselor_id {
        if let Some(ref old) = previous.assigned_counselor_id {
            index_remove(pool, &counselor_index(old), &row.id).await?;
        }
        if let Some(ref new) = row.assigned_counselor_id {
            index_add(pool, &counselor_index(new), &row.id, score).await?;
        }
    }
    Ok(())
}
