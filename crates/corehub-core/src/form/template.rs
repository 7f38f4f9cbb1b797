//! Form templates written in TOML.
//!
//! A template describes a whole form without ids. Building it for a service
//! assigns fresh ids and resolves sub-section refs used by `copy_from`.

use super::model::{
    CopySource, FieldOption, FieldType, FieldValidation, FormField, FormPart, FormSection,
    FormStructure, FormSubSection, PartKey,
};
use super::validate::check_definition;
use crate::error::{CoreError, CoreResult};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

const DEFAULT_FORM: &str = include_str!("../../templates/default_form.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct FormTemplate {
    pub parts: Vec<PartTemplate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartTemplate {
    pub key: String,
    pub title: String,
    pub order: i64,
    #[serde(default)]
    pub sections: Vec<SectionTemplate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectionTemplate {
    pub title: String,
    pub order: i64,
    #[serde(default)]
    pub sub_sections: Vec<SubSectionTemplate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubSectionTemplate {
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub title: String,
    pub order: i64,
    #[serde(default)]
    pub is_repeatable: bool,
    #[serde(default)]
    pub max_repeat: u32,
    #[serde(default)]
    pub fields: Vec<FieldTemplate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldTemplate {
    pub label: String,
    pub key: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    pub placeholder: Option<String>,
    pub validation: Option<FieldValidation>,
    #[serde(default)]
    pub options: Vec<FieldOption>,
    pub default_value: Option<Value>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub copy_from: Option<CopyTemplate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CopyTemplate {
    pub sub_section: String,
    pub field: String,
    pub trigger: String,
}

impl FormTemplate {
    pub fn parse(raw: &str) -> CoreResult<Self> {
        toml::from_str(raw).map_err(|e| CoreError::validation(format!("Invalid form template: {}", e)))
    }

    /// The bundled registration form.
    pub fn bundled() -> CoreResult<Self> {
        Self::parse(DEFAULT_FORM)
    }

    /// Materialize the template for one service, checking every field rule.
    pub fn build(&self, service_id: &str) -> CoreResult<FormStructure> {
        let mut seen_parts = HashSet::new();
        let mut parts = Vec::with_capacity(self.parts.len());

        for part_template in &self.parts {
            let key = PartKey::parse(&part_template.key).ok_or_else(|| {
                CoreError::validation(format!("Unknown part key: {}", part_template.key))
            })?;
            if !seen_parts.insert(key) {
                return Err(CoreError::validation(format!("Duplicate part: {}", key.as_str())));
            }

            let part_id = Uuid::new_v4().to_string();
            let mut sections = Vec::with_capacity(part_template.sections.len());
            for section_template in &part_template.sections {
                sections.push(build_section(section_template, &part_id, service_id)?);
            }

            parts.push(FormPart {
                id: part_id,
                service_id: service_id.to_string(),
                key,
                title: part_template.title.clone(),
                order: part_template.order,
                is_active: true,
                sections,
            });
        }

        parts.sort_by_key(|p| p.order);
        Ok(FormStructure { service_id: service_id.to_string(), parts })
    }
}

fn build_section(template: &SectionTemplate, part_id: &str, service_id: &str) -> CoreResult<FormSection> {
    let section_id = Uuid::new_v4().to_string();
    let mut section = FormSection {
        id: section_id.clone(),
        part_id: part_id.to_string(),
        service_id: service_id.to_string(),
        title: template.title.clone(),
        order: template.order,
        is_active: true,
        sub_sections: Vec::new(),
    };

    let refs: HashMap<&str, String> = template
        .sub_sections
        .iter()
        .filter_map(|s| s.reference.as_deref())
        .map(|r| (r, Uuid::new_v4().to_string()))
        .collect();

    for sub_template in &template.sub_sections {
        let sub_id = sub_template
            .reference
            .as_deref()
            .and_then(|r| refs.get(r).cloned())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        section.sub_sections.push(FormSubSection {
            id: sub_id,
            section_id: section_id.clone(),
            title: sub_template.title.clone(),
            order: sub_template.order,
            is_repeatable: sub_template.is_repeatable,
            max_repeat: sub_template.max_repeat,
            fields: Vec::new(),
        });
    }

    // Fields are added one at a time so each rule is checked against the
    // fields declared before it.
    for (position, sub_template) in template.sub_sections.iter().enumerate() {
        for (order, field_template) in sub_template.fields.iter().enumerate() {
            let sub_id = section.sub_sections[position].id.clone();
            let field = build_field(field_template, &sub_id, order as i64 + 1, &refs)?;
            check_definition(&section, &field)?;
            section.sub_sections[position].fields.push(field);
        }
    }

    section.sub_sections.sort_by_key(|s| s.order);
    Ok(section)
}

fn build_field(
    template: &FieldTemplate,
    sub_section_id: &str,
    order: i64,
    refs: &HashMap<&str, String>,
) -> CoreResult<FormField> {
    let field_type = FieldType::parse(&template.field_type).ok_or_else(|| {
        CoreError::validation(format!(
            "Field '{}' has unknown type {}",
            template.key, template.field_type
        ))
    })?;

    let copy_from = match template.copy_from {
        Some(ref copy) => {
            let sub_section_id = refs.get(copy.sub_section.as_str()).ok_or_else(|| {
                CoreError::validation(format!(
                    "Field '{}' copies from unknown sub-section ref '{}'",
                    template.key, copy.sub_section
                ))
            })?;
            Some(CopySource {
                sub_section_id: sub_section_id.clone(),
                field_key: copy.field.clone(),
                trigger: copy.trigger.clone(),
            })
        }
        None => None,
    };

    Ok(FormField {
        id: Uuid::new_v4().to_string(),
        sub_section_id: sub_section_id.to_string(),
        label: template.label.clone(),
        key: template.key.clone(),
        field_type,
        required: template.required,
        order,
        placeholder: template.placeholder.clone(),
        validation: template.validation.clone(),
        options: template.options.clone(),
        default_value: template.default_value.clone(),
        depends_on: template.depends_on.clone(),
        copy_from,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::aggregate::{apply_part_change, hydrate_part, FieldChange};
    use crate::form::validate::validate_part;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn profile() -> (FormStructure, FormPart) {
        let structure = FormTemplate::bundled().unwrap().build("svc-1").unwrap();
        let part = structure.part(PartKey::Profile).unwrap().clone();
        (structure, part)
    }

    fn sub_id(part: &FormPart, title: &str) -> (String, String) {
        for section in &part.sections {
            if let Some(sub) = section.sub_sections.iter().find(|s| s.title == title) {
                return (section.id.clone(), sub.id.clone());
            }
        }
        panic!("no sub-section titled {}", title);
    }

    #[test]
    fn test_bundled_template_builds_all_parts() {
        let (structure, _) = profile();
        let keys: Vec<_> = structure.parts.iter().map(|p| p.key).collect();
        assert_eq!(
            keys,
            vec![PartKey::Profile, PartKey::Application, PartKey::Document, PartKey::Payment]
        );
        assert!(structure.parts.iter().all(|p| p.service_id == "svc-1"));
    }

    #[test]
    fn test_permanent_address_copies_mailing_fields() {
        let (_, part) = profile();
        let (_, mailing) = sub_id(&part, "Mailing Address");
        let (_, permanent) = sub_id(&part, "Permanent Address");

        let section = part.sections.iter().find(|s| s.title == "Address Details").unwrap();
        let copied: Vec<_> = section
            .sub_section(&permanent)
            .unwrap()
            .fields
            .iter()
            .filter_map(|f| f.copy_from.as_ref())
            .collect();
        assert_eq!(copied.len(), 6);
        assert!(copied.iter().all(|c| c.sub_section_id == mailing && c.trigger == "sameAsMailingAddress"));
    }

    #[test]
    fn test_bundled_form_end_to_end_rules() {
        let (_, part) = profile();
        let (section_id, mailing) = sub_id(&part, "Mailing Address");
        let (_, permanent) = sub_id(&part, "Permanent Address");
        let mut answers = hydrate_part(&part, None);

        for (key, value) in [
            ("mailingAddress1", "1 Infinite Loop"),
            ("mailingCountry", "United States"),
            ("mailingState", "California"),
            ("mailingCity", "Cupertino"),
            ("mailingPostalCode", "95014"),
        ] {
            let change = FieldChange {
                section_id: section_id.clone(),
                sub_section_id: mailing.clone(),
                index: 0,
                key: key.into(),
                value: json!(value),
            };
            apply_part_change(&part, &mut answers, &change).unwrap();
        }

        let effects = apply_part_change(
            &part,
            &mut answers,
            &FieldChange {
                section_id: section_id.clone(),
                sub_section_id: permanent.clone(),
                index: 0,
                key: "sameAsMailingAddress".into(),
                value: json!(true),
            },
        )
        .unwrap();
        assert_eq!(effects.copied.len(), 6);
        assert_eq!(answers[&section_id][&permanent][0]["permanentCity"], json!("Cupertino"));
        assert_eq!(answers[&section_id][&permanent][0]["permanentAddress2"], json!(""));

        let effects = apply_part_change(
            &part,
            &mut answers,
            &FieldChange {
                section_id: section_id.clone(),
                sub_section_id: mailing.clone(),
                index: 0,
                key: "mailingCountry".into(),
                value: json!("Canada"),
            },
        )
        .unwrap();
        assert_eq!(effects.reset, vec!["mailingState", "mailingCity"]);
        assert_eq!(answers[&section_id][&mailing][0]["mailingState"], json!(""));
        assert_eq!(answers[&section_id][&mailing][0]["mailingCity"], json!(""));

        assert!(validate_part(&part, &answers, false).is_empty());
        assert!(!validate_part(&part, &answers, true).is_empty());
    }

    #[test]
    fn test_rejects_broken_templates() {
        let duplicate = r#"
            [[parts]]
            key = "PROFILE"
            title = "Profile"
            order = 1
            [[parts.sections]]
            title = "S"
            order = 1
            [[parts.sections.sub_sections]]
            title = "Sub"
            order = 1
            [[parts.sections.sub_sections.fields]]
            label = "A"
            key = "city"
            type = "CITY"
            [[parts.sections.sub_sections.fields]]
            label = "B"
            key = "city"
            type = "TEXT"
        "#;
        assert!(FormTemplate::parse(duplicate).unwrap().build("svc").is_err());

        let bad_part = r#"
            [[parts]]
            key = "EXTRAS"
            title = "Extras"
            order = 1
        "#;
        assert!(FormTemplate::parse(bad_part).unwrap().build("svc").is_err());

        let dangling_ref = r#"
            [[parts]]
            key = "PROFILE"
            title = "Profile"
            order = 1
            [[parts.sections]]
            title = "S"
            order = 1
            [[parts.sections.sub_sections]]
            title = "Sub"
            order = 1
            [[parts.sections.sub_sections.fields]]
            label = "Same"
            key = "same"
            type = "CHECKBOX"
            [[parts.sections.sub_sections.fields]]
            label = "Copy"
            key = "copy"
            type = "TEXT"
            copy_from = { sub_section = "nowhere", field = "x", trigger = "same" }
        "#;
        assert!(FormTemplate::parse(dangling_ref).unwrap().build("svc").is_err());
    }
}
