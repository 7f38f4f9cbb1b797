//! Document field and uploaded document queries (Redis).

use crate::client::{
    claim_unique, get_doc, get_docs, index_add, index_members, lookup_unique, now_stamp, put_doc,
    RedisError, RedisPool, RedisResult,
};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFieldRow {
    pub id: String,
    pub document_name: String,
    pub document_key: String,
    pub document_type: String,
    pub category: Option<String>,
    pub required: bool,
    pub service_id: Option<String>,
    pub registration_id: Option<String>,
    pub created_by: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentDocumentRow {
    pub id: String,
    pub registration_id: String,
    pub document_key: String,
    pub document_name: String,
    pub file_name: String,
    pub file_url: String,
    pub status: String,
    pub rejection_message: Option<String>,
    pub version: i64,
    pub uploaded_by: String,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<String>,
    pub uploaded_at: String,
}

fn field_key(id: &str) -> String {
    format!("core:docfield:{}", id)
}

fn document_key(id: &str) -> String {
    format!("core:document:{}", id)
}

pub async fn insert_document_field(pool: &RedisPool, row: &DocumentFieldRow) -> RedisResult<()> {
    let unique = format!("core:docfields:key:{}", row.document_key);
    if !claim_unique(pool, &unique, &row.id).await? {
        return Err(RedisError::Conflict(format!(
            "Document key already exists: {}",
            row.document_key
        )));
    }
    put_doc(pool, &field_key(&row.id), row).await?;

    let (_, score) = now_stamp();
    let index = match row.registration_id {
        Some(ref rid) => format!("core:docfields:registration:{}", rid),
        None => "core:docfields:all".to_string(),
    };
    index_add(pool, &index, &row.id, score).await
}

pub async fn find_document_field_by_key(
    pool: &RedisPool,
    document_key: &str,
) -> RedisResult<Option<DocumentFieldRow>> {
    match lookup_unique(pool, &format!("core:docfields:key:{}", document_key)).await? {
        Some(id) => get_doc(pool, &field_key(&id)).await,
        None => Ok(None),
    }
}

/// Document fields shared by every registration (not tied to one registration).
pub async fn list_document_fields(pool: &RedisPool) -> RedisResult<Vec<DocumentFieldRow>> {
    let ids = index_members(pool, "core:docfields:all").await?;
    get_docs(pool, ids.iter().map(|id| field_key(id)).collect()).await
}

/// Document fields requested for one registration only.
pub async fn list_registration_document_fields(
    pool: &RedisPool,
    registration_id: &str,
) -> RedisResult<Vec<DocumentFieldRow>> {
    let ids = index_members(pool, &format!("core:docfields:registration:{}", registration_id)).await?;
    get_docs(pool, ids.iter().map(|id| field_key(id)).collect()).await
}

/// Atomically allocate the next upload version for a document key.
pub async fn next_version(
    pool: &RedisPool,
    registration_id: &str,
    document_key: &str,
) -> RedisResult<i64> {
    let mut conn = pool.clone();
    let key = format!("core:documents:registration:{}:versions", registration_id);
    let version: i64 = conn.hincr(&key, document_key, 1).await?;
    Ok(version)
}

pub async fn insert_document(pool: &RedisPool, row: &StudentDocumentRow) -> RedisResult<()> {
    put_doc(pool, &document_key(&row.id), row).await?;

    let mut conn = pool.clone();
    let latest = format!("core:documents:registration:{}:latest", row.registration_id);
    conn.hset::<_, _, _, ()>(&latest, &row.document_key, &row.id).await?;

    let index = format!("core:documents:registration:{}", row.registration_id);
    index_add(pool, &index, &row.id, now_stamp().1).await
}

pub async fn get_document(pool: &RedisPool, id: &str) -> RedisResult<StudentDocumentRow> {
    get_doc(pool, &document_key(id))
        .await?
        .ok_or_else(|| RedisError::NotFound(format!("Document not found: {}", id)))
}

/// Every uploaded version for a registration, oldest first.
pub async fn list_documents(
    pool: &RedisPool,
    registration_id: &str,
) -> RedisResult<Vec<StudentDocumentRow>> {
    let ids = index_members(pool, &format!("core:documents:registration:{}", registration_id)).await?;
    get_docs(pool, ids.iter().map(|id| document_key(id)).collect()).await
}

/// Latest version per document key for a registration.
pub async fn list_latest_documents(
    pool: &RedisPool,
    registration_id: &str,
) -> RedisResult<Vec<StudentDocumentRow>> {
    let mut conn = pool.clone();
    let latest = format!("core:documents:registration:{}:latest", registration_id);
    let map: std::collections::HashMap<String, String> = conn.hgetall(&latest).await?;
    let mut docs: Vec<StudentDocumentRow> = get_docs(pool, map.values().map(|id| document_key(id)).collect()).await?;
    docs.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
    Ok(docs)
}

pub async fn update_document(pool: &RedisPool, row: &StudentDocumentRow) -> RedisResult<()> {
    put_doc(pool, &document_key(&row.id), row).await
}
