//! User account queries (Redis).

use crate::client::{
    claim_unique, get_doc, get_docs, index_add, index_members, lookup_unique, now_stamp, put_doc,
    release_unique, RedisError, RedisPool, RedisResult,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub role: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub admin_id: Option<String>,
    pub super_admin_id: Option<String>,
    pub company_name: Option<String>,
    pub enquiry_slug: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

fn user_key(id: &str) -> String {
    format!("core:user:{}", id)
}

fn email_key(email: &str) -> String {
    format!("core:users:email:{}", email.trim().to_lowercase())
}

fn slug_key(slug: &str) -> String {
    format!("core:admins:slug:{}", slug)
}

/// Insert a user, claiming its email (and enquiry slug for admins).
pub async fn insert_user(pool: &RedisPool, row: &UserRow) -> RedisResult<()> {
    if !claim_unique(pool, &email_key(&row.email), &row.id).await? {
        return Err(RedisError::Conflict(format!("Email already registered: {}", row.email)));
    }
    if let Some(ref slug) = row.enquiry_slug {
        if !claim_unique(pool, &slug_key(slug), &row.id).await? {
            release_unique(pool, &email_key(&row.email)).await?;
            return Err(RedisError::Conflict(format!("Enquiry slug already taken: {}", slug)));
        }
    }

    put_doc(pool, &user_key(&row.id), row).await?;

    let (_, score) = now_stamp();
    index_add(pool, "core:users:all", &row.id, score).await?;
    index_add(pool, &format!("core:users:role:{}", row.role), &row.id, score).await?;
    if let Some(ref admin_id) = row.admin_id {
        index_add(pool, &format!("core:users:admin:{}", admin_id), &row.id, score).await?;
    }
    Ok(())
}

pub async fn get_user(pool: &RedisPool, id: &str) -> RedisResult<UserRow> {
    get_doc(pool, &user_key(id))
        .await?
        .ok_or_else(|| RedisError::NotFound(format!("User not found: {}", id)))
}

pub async fn find_user_by_email(pool: &RedisPool, email: &str) -> RedisResult<Option<UserRow>> {
    match lookup_unique(pool, &email_key(email)).await? {
        Some(id) => get_doc(pool, &user_key(&id)).await,
        None => Ok(None),
    }
}

pub async fn find_admin_by_slug(pool: &RedisPool, slug: &str) -> RedisResult<Option<UserRow>> {
    match lookup_unique(pool, &slug_key(slug)).await? {
        Some(id) => get_doc(pool, &user_key(&id)).await,
        None => Ok(None),
    }
}

pub async fn list_users(pool: &RedisPool) -> RedisResult<Vec<UserRow>> {
    let ids = index_members(pool, "core:users:all").await?;
    get_docs(pool, ids.iter().map(|id| user_key(id)).collect()).await
}

pub async fn list_users_by_role(pool: &RedisPool, role: &str) -> RedisResult<Vec<UserRow>> {
    let ids = index_members(pool, &format!("core:users:role:{}", role)).await?;
    get_docs(pool, ids.iter().map(|id| user_key(id)).collect()).await
}

pub async fn list_users_by_admin(pool: &RedisPool, admin_id: &str) -> RedisResult<Vec<UserRow>> {
    let ids = index_members(pool, &format!("core:users:admin:{}", admin_id)).await?;
    get_docs(pool, ids.iter().map(|id| user_key(id)).collect()).await
}

/// Overwrite a user document. Email, role and tenant are immutable.
pub async fn update_user(pool: &RedisPool, row: &UserRow) -> RedisResult<()> {
    let mut updated = row.clone();
    updated.updated_at = now_stamp().0;
    put_doc(pool, &user_key(&row.id), &updated).await
}
