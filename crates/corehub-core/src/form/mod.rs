//! Dynamic service forms: definition storage, authoring and templates.

pub mod aggregate;
pub mod model;
pub mod template;
pub mod validate;

use crate::access::{require_role, Principal, Role};
use crate::error::{require, CoreError, CoreResult};
use corehub_redis::queries::forms::{self as queries, FormSectionRow};
use corehub_redis::queries::services as service_queries;
use corehub_redis::RedisPool as DbPool;
use model::{
    CopySource, FieldOption, FieldType, FieldValidation, FormField, FormPart, FormSection,
    FormStructure, FormSubSection, PartKey,
};
use serde::Deserialize;
use serde_json::Value;
use template::FormTemplate;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Load the full form of a service, ordered for display.
pub async fn get_form_structure(pool: &DbPool, service_id: &str) -> CoreResult<FormStructure> {
    let part_rows = queries::list_parts(pool, service_id).await?;
    if part_rows.is_empty() {
        return Err(CoreError::not_found(format!("No form structure for service {}", service_id)));
    }

    let mut parts = Vec::with_capacity(part_rows.len());
    for part_row in part_rows {
        let mut sections = Vec::new();
        for section_row in queries::list_sections(pool, &part_row.id).await? {
            sections.push(load_section(pool, section_row).await?);
        }
        let key = part_row.key.clone();
        match FormPart::from_row(part_row, sections) {
            Some(part) => parts.push(part),
            None => warn!(service_id = %service_id, key = %key, "Skipping part with unknown key"),
        }
    }

    debug!(service_id = %service_id, parts = parts.len(), "Form structure loaded");
    Ok(FormStructure { service_id: service_id.to_string(), parts })
}

async fn load_section(pool: &DbPool, row: FormSectionRow) -> CoreResult<FormSection> {
    let mut sub_sections = Vec::new();
    for sub_row in queries::list_sub_sections(pool, &row.id).await? {
        let fields = queries::list_fields(pool, &sub_row.id)
            .await?
            .into_iter()
            .map(FormField::from_row)
            .collect();
        sub_sections.push(FormSubSection::from_row(sub_row, fields));
    }
    Ok(FormSection::from_row(row, sub_sections))
}

/// Persist a built structure node by node.
pub async fn install_structure(pool: &DbPool, structure: &FormStructure) -> CoreResult<()> {
    for part in &structure.parts {
        queries::insert_part(pool, &part.to_row()).await?;
        for section in &part.sections {
            queries::insert_section(pool, &section.to_row()).await?;
            for sub in &section.sub_sections {
                queries::insert_sub_section(pool, &sub.to_row()).await?;
                for field in &sub.fields {
                    queries::insert_field(pool, &field.to_row()).await?;
                }
            }
        }
    }
    Ok(())
}

/// Install a template as the form of a service that has none yet.
pub async fn install_template(
    pool: &DbPool,
    service_id: &str,
    template: &FormTemplate,
) -> CoreResult<FormStructure> {
    service_queries::get_service(pool, service_id).await?;
    if !queries::list_parts(pool, service_id).await?.is_empty() {
        return Err(CoreError::Conflict(format!("Service {} already has a form", service_id)));
    }

    let structure = template.build(service_id)?;
    install_structure(pool, &structure).await?;
    info!(service_id = %service_id, parts = structure.parts.len(), "Form template installed");
    Ok(structure)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPart {
    pub service_id: String,
    pub key: PartKey,
    pub title: String,
    #[serde(default)]
    pub order: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSection {
    pub part_id: String,
    pub title: String,
    #[serde(default)]
    pub order: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubSection {
    pub section_id: String,
    pub title: String,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub is_repeatable: bool,
    #[serde(default)]
    pub max_repeat: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewField {
    pub sub_section_id: String,
    pub label: String,
    pub key: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub validation: Option<FieldValidation>,
    #[serde(default)]
    pub options: Vec<FieldOption>,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub copy_from: Option<CopySource>,
}

const AUTHORS: [Role; 2] = [Role::Admin, Role::SuperAdmin];

pub async fn create_part(pool: &DbPool, principal: &Principal, new: NewPart) -> CoreResult<FormPart> {
    require_role(principal, &AUTHORS)?;
    require(&new.title, "Part title")?;
    service_queries::get_service(pool, &new.service_id).await?;

    let existing = queries::list_parts(pool, &new.service_id).await?;
    let part = FormPart {
        id: Uuid::new_v4().to_string(),
        service_id: new.service_id,
        key: new.key,
        title: new.title.trim().to_string(),
        order: new.order.unwrap_or(existing.len() as i64 + 1),
        is_active: true,
        sections: Vec::new(),
    };
    queries::insert_part(pool, &part.to_row()).await?;

    info!(part_id = %part.id, key = part.key.as_str(), "Form part created");
    Ok(part)
}

pub async fn create_section(pool: &DbPool, principal: &Principal, new: NewSection) -> CoreResult<FormSection> {
    require_role(principal, &AUTHORS)?;
    require(&new.title, "Section title")?;
    let part = queries::get_part(pool, &new.part_id).await?;

    let existing = queries::list_sections(pool, &part.id).await?;
    let section = FormSection {
        id: Uuid::new_v4().to_string(),
        part_id: part.id,
        service_id: part.service_id,
        title: new.title.trim().to_string(),
        order: new.order.unwrap_or(existing.len() as i64 + 1),
        is_active: true,
        sub_sections: Vec::new(),
    };
    queries::insert_section(pool, &section.to_row()).await?;

    info!(section_id = %section.id, "Form section created");
    Ok(section)
}

pub async fn create_sub_section(
    pool: &DbPool,
    principal: &Principal,
    new: NewSubSection,
) -> CoreResult<FormSubSection> {
    require_role(principal, &AUTHORS)?;
    require(&new.title, "Sub-section title")?;
    let section = queries::get_section(pool, &new.section_id).await?;

    let existing = queries::list_sub_sections(pool, &section.id).await?;
    let sub = FormSubSection {
        id: Uuid::new_v4().to_string(),
        section_id: section.id,
        title: new.title.trim().to_string(),
        order: new.order.unwrap_or(existing.len() as i64 + 1),
        is_repeatable: new.is_repeatable,
        max_repeat: if new.is_repeatable { new.max_repeat } else { 0 },
        fields: Vec::new(),
    };
    queries::insert_sub_section(pool, &sub.to_row()).await?;

    info!(sub_section_id = %sub.id, "Form sub-section created");
    Ok(sub)
}

/// Add a field. Keys are unique within the sub-section and rules must point
/// at fields that already exist in the same section.
pub async fn create_field(pool: &DbPool, principal: &Principal, new: NewField) -> CoreResult<FormField> {
    require_role(principal, &AUTHORS)?;
    let sub_row = queries::get_sub_section(pool, &new.sub_section_id).await?;
    let section = load_section(pool, queries::get_section(pool, &sub_row.section_id).await?).await?;
    let sibling_count = section
        .sub_section(&sub_row.id)
        .map(|s| s.fields.len())
        .unwrap_or_default();

    let field = FormField {
        id: Uuid::new_v4().to_string(),
        sub_section_id: sub_row.id.clone(),
        label: new.label.trim().to_string(),
        key: new.key.trim().to_string(),
        field_type: new.field_type,
        required: new.required,
        order: new.order.unwrap_or(sibling_count as i64 + 1),
        placeholder: new.placeholder,
        validation: new.validation,
        options: new.options,
        default_value: new.default_value,
        depends_on: new.depends_on,
        copy_from: new.copy_from,
    };
    validate::check_definition(&section, &field)?;
    queries::insert_field(pool, &field.to_row()).await?;

    info!(field_id = %field.id, key = %field.key, "Form field created");
    Ok(field)
}
