//! Student profile queries (Redis).

use crate::client::{
    get_doc, get_docs, index_add, index_members, index_remove, lookup_unique, now_stamp, put_doc,
    RedisError, RedisPool, RedisResult,
};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentRow {
    pub id: String,
    pub user_id: String,
    pub admin_id: String,
    pub counselor_id: Option<String>,
    pub lead_id: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

fn student_key(id: &str) -> String {
    format!("core:student:{}", id)
}

pub async fn insert_student(pool: &RedisPool, row: &StudentRow) -> RedisResult<()> {
    put_doc(pool, &student_key(&row.id), row).await?;

    let mut conn = pool.clone();
    conn.set::<_, _, ()>(format!("core:students:user:{}", row.user_id), &row.id).await?;

    let (_, score) = now_stamp();
    index_add(pool, "core:students:all", &row.id, score).await?;
    index_add(pool, &format!("core:students:admin:{}", row.admin_id), &row.id, score).await?;
    if let Some(ref counselor_id) = row.counselor_id {
        index_add(pool, &format!("core:students:counselor:{}", counselor_id), &row.id, score).await?;
    }
    Ok(())
}

pub async fn get_student(pool: &RedisPool, id: &str) -> RedisResult<StudentRow> {
    get_doc(pool, &student_key(id))
        .await?
        .ok_or_else(|| RedisError::NotFound(format!("Student not found: {}", id)))
}

pub async fn find_student_by_user(pool: &RedisPool, user_id: &str) -> RedisResult<Option<StudentRow>> {
    match lookup_unique(pool, &format!("core:students:user:{}", user_id)).await? {
        Some(id) => get_doc(pool, &student_key(&id)).await,
        None => Ok(None),
    }
}

pub async fn list_students(pool: &RedisPool) -> RedisResult<Vec<StudentRow>> {
    let ids = index_members(pool, "core:students:all").await?;
    get_docs(pool, ids.iter().map(|id| student_key(id)).collect()).await
}

pub async fn list_students_by_admin(pool: &RedisPool, admin_id: &str) -> RedisResult<Vec<StudentRow>> {
    let ids = index_members(pool, &format!("core:students:admin:{}", admin_id)).await?;
    get_docs(pool, ids.iter().map(|id| student_key(id)).collect()).await
}

pub async fn list_students_by_counselor(
    pool: &RedisPool,
    counselor_id: &str,
) -> RedisResult<Vec<StudentRow>> {
    let ids = index_members(pool, &format!("core:students:counselor:{}", counselor_id)).await?;
    get_docs(pool, ids.iter().map(|id| student_key(id)).collect()).await
}

/// Move a student to another counselor, keeping the counselor index in sync.
pub async fn assign_counselor(
    pool: &RedisPool,
    student_id: &str,
    counselor_id: Option<&str>,
) -> RedisResult<StudentRow> {
    let mut row = get_student(pool, student_id).await?;
    if let Some(ref old) = row.counselor_id {
        index_remove(pool, &format!("core:students:counselor:{}", old), student_id).await?;
    }

    let (now, score) = now_stamp();
    row.counselor_id = counselor_id.map(str::to_string);
    row.updated_at = now;
    put_doc(pool, &student_key(student_id), &row).await?;

    if let Some(new) = counselor_id {
        index_add(pool, &format!("core:students:counselor:{}", new), student_id, score).await?;
    }
    Ok(row)
}
