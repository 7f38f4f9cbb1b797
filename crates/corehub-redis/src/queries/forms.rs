//! Form definition queries (Redis).
//!
//! Layout: each node of the Part → Section → SubSection → Field hierarchy is
//! its own document; children are listed through a sorted set scored by the
//! child's display order.

use crate::client::{
    claim_unique, get_doc, get_docs, index_add, index_members, put_doc, RedisError, RedisPool,
    RedisResult,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormPartRow {
    pub id: String,
    pub service_id: String,
    pub key: String,
    pub title: String,
    pub order: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSectionRow {
    pub id: String,
    pub part_id: String,
    pub service_id: String,
    pub title: String,
    pub order: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSubSectionRow {
    pub id: String,
    pub section_id: String,
    pub title: String,
    pub order: i64,
    pub is_repeatable: bool,
    pub max_repeat: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormFieldRow {
    pub id: String,
    pub sub_section_id: String,
    pub label: String,
    pub key: String,
    pub field_type: String,
    pub required: bool,
    pub order: i64,
    pub placeholder: Option<String>,
    pub validation: Option<Value>,
    pub options: Option<Value>,
    pub default_value: Option<Value>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub copy_from: Option<Value>,
}

fn part_key(id: &str) -> String {
    format!("core:form:part:{}", id)
}

fn section_key(id: &str) -> String {
    format!("core:form:section:{}", id)
}

fn sub_section_key(id: &str) -> String {
    format!("core:form:subsection:{}", id)
}

fn field_key(id: &str) -> String {
    format!("core:form:field:{}", id)
}

/// Insert a part. A service carries at most one part per part key.
pub async fn insert_part(pool: &RedisPool, row: &FormPartRow) -> RedisResult<()> {
    let unique = format!("core:form:service:{}:partkey:{}", row.service_id, row.key);
    if !claim_unique(pool, &unique, &row.id).await? {
        return Err(RedisError::Conflict(format!(
            "Service {} already has a {} part",
            row.service_id, row.key
        )));
    }
    put_doc(pool, &part_key(&row.id), row).await?;
    index_add(pool, &format!("core:form:service:{}:parts", row.service_id), &row.id, row.order).await
}

pub async fn get_part(pool: &RedisPool, id: &str) -> RedisResult<FormPartRow> {
    get_doc(pool, &part_key(id))
        .await?
        .ok_or_else(|| RedisError::NotFound(format!("Form part not found: {}", id)))
}

pub async fn list_parts(pool: &RedisPool, service_id: &str) -> RedisResult<Vec<FormPartRow>> {
    let ids = index_members(pool, &format!("core:form:service:{}:parts", service_id)).await?;
    get_docs(pool, ids.iter().map(|id| part_key(id)).collect()).await
}

pub async fn insert_section(pool: &RedisPool, row: &FormSectionRow) -> RedisResult<()> {
    put_doc(pool, &section_key(&row.id), row).await?;
    index_add(pool, &format!("core:form:part:{}:sections", row.part_id), &row.id, row.order).await
}

pub async fn get_section(pool: &RedisPool, id: &str) -> RedisResult<FormSectionRow> {
    get_doc(pool, &section_key(id))
        .await?
        .ok_or_else(|| RedisError::NotFound(format!("Form section not found: {}", id)))
}

pub async fn list_sections(pool: &RedisPool, part_id: &str) -> RedisResult<Vec<FormSectionRow>> {
    let ids = index_members(pool, &format!("core:form:part:{}:sections", part_id)).await?;
    get_docs(pool, ids.iter().map(|id| section_key(id)).collect()).await
}

pub async fn insert_sub_section(pool: &RedisPool, row: &FormSubSectionRow) -> RedisResult<()> {
    put_doc(pool, &sub_section_key(&row.id), row).await?;
    index_add(
        pool,
        &format!("core:form:section:{}:subsections", row.section_id),
        &row.id,
        row.order,
    )
    .await
}

pub async fn get_sub_section(pool: &RedisPool, id: &str) -> RedisResult<FormSubSectionRow> {
    get_doc(pool, &sub_section_key(id))
        .await?
        .ok_or_else(|| RedisError::NotFound(format!("Form sub-section not found: {}", id)))
}

pub async fn list_sub_sections(
    pool: &RedisPool,
    section_id: &str,
) -> RedisResult<Vec<FormSubSectionRow>> {
    let ids = index_members(pool, &format!("core:form:section:{}:subsections", section_id)).await?;
    get_docs(pool, ids.iter().map(|id| sub_section_key(id)).collect()).await
}

/// Insert a field. The field key is claimed within its sub-section so two
/// fields can never write into the same answer slot.
pub async fn insert_field(pool: &RedisPool, row: &FormFieldRow) -> RedisResult<()> {
    let unique = format!("core:form:subsection:{}:fieldkey:{}", row.sub_section_id, row.key);
    if !claim_unique(pool, &unique, &row.id).await? {
        return Err(RedisError::Conflict(format!(
            "Field key '{}' already exists in sub-section {}",
            row.key, row.sub_section_id
        )));
    }
    put_doc(pool, &field_key(&row.id), row).await?;
    index_add(
        pool,
        &format!("core:form:subsection:{}:fields", row.sub_section_id),
        &row.id,
        row.order,
    )
    .await
}

pub async fn list_fields(pool: &RedisPool, sub_section_id: &str) -> RedisResult<Vec<FormFieldRow>> {
    let ids = index_members(pool, &format!("core:form:subsection:{}:fields", sub_section_id)).await?;
    get_docs(pool, ids.iter().map(|id| field_key(id)).collect()).await
}
