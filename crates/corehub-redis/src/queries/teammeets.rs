//! TeamMeet queries (Redis).

use crate::client::{
    get_doc, get_docs, index_add, index_members, now_stamp, put_doc, RedisError, RedisPool,
    RedisResult,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMeetRow {
    pub id: String,
    pub admin_id: String,
    pub subject: String,
    pub description: Option<String>,
    pub date: String,
    pub start_time: String,
    pub duration_minutes: u32,
    pub meeting_type: String,
    pub location: Option<String>,
    pub requested_by: String,
    pub requested_to: String,
    pub status: String,
    pub rejection_message: Option<String>,
    pub meeting_key: Option<String>,
    pub meeting_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

fn meet_key(id: &str) -> String {
    format!("core:teammeet:{}", id)
}

pub async fn insert_team_meet(pool: &RedisPool, row: &TeamMeetRow) -> RedisResult<()> {
    put_doc(pool, &meet_key(&row.id), row).await?;

    let (_, score) = now_stamp();
    index_add(pool, &format!("core:teammeets:user:{}", row.requested_by), &row.id, score).await?;
    index_add(pool, &format!("core:teammeets:user:{}", row.requested_to), &row.id, score).await?;
    index_add(pool, &format!("core:teammeets:admin:{}", row.admin_id), &row.id, score).await
}

pub async fn get_team_meet(pool: &RedisPool, id: &str) -> RedisResult<TeamMeetRow> {
    get_doc(pool, &meet_key(id))
        .await?
        .ok_or_else(|| RedisError::NotFound(format!("TeamMeet not found: {}", id)))
}

/// Meetings where the user is requester or invitee.
pub async fn list_team_meets_for_user(pool: &RedisPool, user_id: &str) -> RedisResult<Vec<TeamMeetRow>> {
    let ids = index_members(pool, &format!("core:teammeets:user:{}", user_id)).await?;
    get_docs(pool, ids.iter().map(|id| meet_key(id)).collect()).await
}

pub async fn list_team_meets_by_admin(pool: &RedisPool, admin_id: &str) -> RedisResult<Vec<TeamMeetRow>> {
    let ids = index_members(pool, &format!("core:teammeets:admin:{}", admin_id)).await?;
    get_docs(pool, ids.iter().map(|id| meet_key(id)).collect()).await
}

pub async fn update_team_meet(pool: &RedisPool, row: &TeamMeetRow) -> RedisResult<()> {
    let mut updated = row.clone();
    updated.updated_at = now_stamp().0;
    put_doc(pool, &meet_key(&row.id), &updated).await
}
