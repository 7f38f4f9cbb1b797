//! OPS schedule queries (Redis).

use crate::client::{
    get_doc, get_docs, index_add, index_members, now_stamp, put_doc, RedisError, RedisPool,
    RedisResult,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsScheduleRow {
    pub id: String,
    pub ops_id: String,
    pub admin_id: String,
    pub student_id: Option<String>,
    pub registration_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub date: String,
    pub start_time: String,
    pub duration_minutes: u32,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

fn schedule_key(id: &str) -> String {
    format!("core:opsschedule:{}", id)
}

pub async fn insert_schedule(pool: &RedisPool, row: &OpsScheduleRow) -> RedisResult<()> {
    put_doc(pool, &schedule_key(&row.id), row).await?;

    let (_, score) = now_stamp();
    index_add(pool, &format!("core:opsschedules:ops:{}", row.ops_id), &row.id, score).await?;
    index_add(pool, &format!("core:opsschedules:admin:{}", row.admin_id), &row.id, score).await
}

pub async fn get_schedule(pool: &RedisPool, id: &str) -> RedisResult<OpsScheduleRow> {
    get_doc(pool, &schedule_key(id))
        .await?
        .ok_or_else(|| RedisError::NotFound(format!("OPS schedule not found: {}", id)))
}

pub async fn list_schedules_by_ops(pool: &RedisPool, ops_id: &str) -> RedisResult<Vec<OpsScheduleRow>> {
    let ids = index_members(pool, &format!("core:opsschedules:ops:{}", ops_id)).await?;
    get_docs(pool, ids.iter().map(|id| schedule_key(id)).collect()).await
}

pub async fn list_schedules_by_admin(pool: &RedisPool, admin_id: &str) -> RedisResult<Vec<OpsScheduleRow>> {
    let ids = index_members(pool, &format!("core:opsschedules:admin:{}", admin_id)).await?;
    get_docs(pool, ids.iter().map(|id| schedule_key(id)).collect()).await
}

pub async fn update_schedule(pool: &RedisPool, row: &OpsScheduleRow) -> RedisResult<()> {
    let mut updated = row.clone();
    updated.updated_at = now_stamp().0;
    put_doc(pool, &schedule_key(&row.id), &updated).await
}
