//! Service catalogue queries (Redis).

use crate::client::{
    claim_unique, get_doc, get_docs, index_add, index_members, lookup_unique, now_stamp, put_doc,
    RedisError, RedisPool, RedisResult,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRow {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

fn service_key(id: &str) -> String {
    format!("core:service:{}", id)
}

pub async fn insert_service(pool: &RedisPool, row: &ServiceRow) -> RedisResult<()> {
    let slug_key = format!("core:services:slug:{}", row.slug);
    if !claim_unique(pool, &slug_key, &row.id).await? {
        return Err(RedisError::Conflict(format!("Service slug already exists: {}", row.slug)));
    }
    put_doc(pool, &service_key(&row.id), row).await?;
    index_add(pool, "core:services:all", &row.id, now_stamp().1).await
}

pub async fn get_service(pool: &RedisPool, id: &str) -> RedisResult<ServiceRow> {
    get_doc(pool, &service_key(id))
        .await?
        .ok_or_else(|| RedisError::NotFound(format!("Service not found: {}", id)))
}

pub async fn find_service_by_slug(pool: &RedisPool, slug: &str) -> RedisResult<Option<ServiceRow>> {
    match lookup_unique(pool, &format!("core:services:slug:{}", slug)).await? {
        Some(id) => get_doc(pool, &service_key(&id)).await,
        None => Ok(None),
    }
}

pub async fn list_services(pool: &RedisPool) -> RedisResult<Vec<ServiceRow>> {
    let ids = index_members(pool, "core:services:all").await?;
    get_docs(pool, ids.iter().map(|id| service_key(id)).collect()).await
}
