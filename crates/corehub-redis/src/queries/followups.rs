//! Counselor follow-up queries (Redis).

use crate::client::{
    get_doc, get_docs, index_add, index_members, now_stamp, put_doc, RedisError, RedisPool,
    RedisResult,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpRow {
    pub id: String,
    pub counselor_id: String,
    pub admin_id: String,
    pub lead_id: String,
    pub date: String,
    pub start_time: String,
    pub duration_minutes: u32,
    pub status: String,
    pub stage_at_follow_up: String,
    pub notes: Option<String>,
    pub rescheduled_to: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

fn follow_up_key(id: &str) -> String {
    format!("core:followup:{}", id)
}

pub async fn insert_follow_up(pool: &RedisPool, row: &FollowUpRow) -> RedisResult<()> {
    put_doc(pool, &follow_up_key(&row.id), row).await?;

    let (_, score) = now_stamp();
    index_add(pool, &format!("core:followups:counselor:{}", row.counselor_id), &row.id, score).await?;
    index_add(pool, &format!("core:followups:lead:{}", row.lead_id), &row.id, score).await?;
    index_add(pool, &format!("core:followups:admin:{}", row.admin_id), &row.id, score).await
}

pub async fn get_follow_up(pool: &RedisPool, id: &str) -> RedisResult<FollowUpRow> {
    get_doc(pool, &follow_up_key(id))
        .await?
        .ok_or_else(|| RedisError::NotFound(format!("Follow-up not found: {}", id)))
}

pub async fn list_follow_ups_by_counselor(
    pool: &RedisPool,
    counselor_id: &str,
) -> RedisResult<Vec<FollowUpRow>> {
    let ids = index_members(pool, &format!("core:followups:counselor:{}", counselor_id)).await?;
    get_docs(pool, ids.iter().map(|id| follow_up_key(id)).collect()).await
}

pub async fn list_follow_ups_by_lead(pool: &RedisPool, lead_id: &str) -> RedisResult<Vec<FollowUpRow>> {
    let ids = index_members(pool, &format!("core:followups:lead:{}", lead_id)).await?;
    get_docs(pool, ids.iter().map(|id| follow_up_key(id)).collect()).await
}

pub async fn list_follow_ups_by_admin(pool: &RedisPool, admin_id: &str) -> RedisResult<Vec<FollowUpRow>> {
    let ids = index_members(pool, &format!("core:followups:admin:{}", admin_id)).await?;
    get_docs(pool, ids.iter().map(|id| follow_up_key(id)).collect()).await
}

pub async fn update_follow_up(pool: &RedisPool, row: &FollowUpRow) -> RedisResult<()> {
    let mut updated = row.clone();
    updated.updated_at = now_stamp().0;
    put_doc(pool, &follow_up_key(&row.id), &updated).await
}
