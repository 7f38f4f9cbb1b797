//! Answer and definition validation.

use super::model::{FieldType, FieldValues, FormField, FormPart, FormSection, PartAnswers};
use crate::error::{CoreError, CoreResult};
use crate::text::{is_valid_email, is_valid_phone};
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// A problem with one submitted value (or with the answer layout).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub section_id: String,
    pub sub_section_id: Option<String>,
    pub index: Option<usize>,
    pub key: Option<String>,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.section_id)?;
        if let Some(ref sub) = self.sub_section_id {
            write!(f, "/{}", sub)?;
        }
        if let Some(index) = self.index {
            write!(f, "[{}]", index)?;
        }
        if let Some(ref key) = self.key {
            write!(f, ".{}", key)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Validate a part's answers against its definition.
///
/// Layout and value types are always checked; required fields only once the
/// part is submitted as `completed`.
pub fn validate_part(part: &FormPart, answers: &PartAnswers, completed: bool) -> Vec<FieldError> {
    let mut errors = Vec::new();

    for (section_id, section_answers) in answers {
        let Some(section) = part.section(section_id) else {
            errors.push(error(section_id, None, None, None, "Unknown section"));
            continue;
        };
        for (sub_id, instances) in section_answers {
            let Some(sub) = section.sub_section(sub_id) else {
                errors.push(error(section_id, Some(sub_id), None, None, "Unknown sub-section"));
                continue;
            };
            if instances.len() > sub.instance_limit() {
                errors.push(error(
                    section_id,
                    Some(sub_id),
                    None,
                    None,
                    &format!("At most {} entries allowed", sub.instance_limit()),
                ));
            }
            for (index, instance) in instances.iter().enumerate() {
                for (key, value) in instance {
                    let Some(field) = sub.field(key) else {
                        errors.push(error(section_id, Some(sub_id), Some(index), Some(key), "Unknown field"));
                        continue;
                    };
                    if is_blank(value) {
                        continue;
                    }
                    if let Err(message) = check_value(field, value) {
                        errors.push(error(section_id, Some(sub_id), Some(index), Some(key), &message));
                    }
                }
            }
        }
    }

    if completed {
        let empty = [FieldValues::new()];
        for section in part.active_sections() {
            for sub in &section.sub_sections {
                let instances = answers
                    .get(&section.id)
                    .and_then(|s| s.get(&sub.id))
                    .filter(|i| !i.is_empty())
                    .map(Vec::as_slice)
                    .unwrap_or(&empty);
                for (index, instance) in instances.iter().enumerate() {
                    for field in sub.fields.iter().filter(|f| f.required) {
                        if instance.get(&field.key).is_none_or(is_blank) {
                            errors.push(error(
                                &section.id,
                                Some(&sub.id),
                                Some(index),
                                Some(&field.key),
                                &format!("{} is required", field.label),
                            ));
                        }
                    }
                }
            }
        }
    }

    errors
}

/// Collapse field errors into one validation error.
pub fn into_result(errors: Vec<FieldError>) -> CoreResult<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(CoreError::validation(errors[0].to_string())),
        n => {
            let listed: Vec<String> = errors.iter().take(5).map(ToString::to_string).collect();
            Err(CoreError::validation(format!("{} invalid answers: {}", n, listed.join("; "))))
        }
    }
}

fn error(
    section_id: &str,
    sub_section_id: Option<&str>,
    index: Option<usize>,
    key: Option<&str>,
    message: &str,
) -> FieldError {
    FieldError {
        section_id: section_id.to_string(),
        sub_section_id: sub_section_id.map(str::to_string),
        index,
        key: key.map(str::to_string),
        message: message.to_string(),
    }
}

pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Check a non-blank value against the field's type and bounds.
pub fn check_value(field: &FormField, value: &Value) -> Result<(), String> {
    let bounds = field.validation.clone().unwrap_or_default();

    match field.field_type {
        FieldType::Number => {
            let n = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }
            .ok_or("must be a number")?;
            if let Some(min) = bounds.min {
                if n < min {
                    return Err(format!("must be at least {}", min));
                }
            }
            if let Some(max) = bounds.max {
                if n > max {
                    return Err(format!("must be at most {}", max));
                }
            }
            Ok(())
        }
        FieldType::Checkbox => match value {
            Value::Bool(_) => Ok(()),
            Value::String(s) if matches!(s.as_str(), "true" | "false") => Ok(()),
            Value::Array(items) => {
                for item in items {
                    let choice = item.as_str().ok_or("must contain option values")?;
                    if !field.options.is_empty() && !field.options.iter().any(|o| o.value == choice) {
                        return Err(format!("'{}' is not one of the listed options", choice));
                    }
                }
                Ok(())
            }
            _ => Err("must be true, false or a list of options".to_string()),
        },
        _ => {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return Err("must be text".to_string()),
            };

            match field.field_type {
                FieldType::Email if !is_valid_email(&text) => {
                    return Err("must be a valid email address".to_string())
                }
                FieldType::Phone if !is_valid_phone(&text) => {
                    return Err("must be a valid phone number".to_string())
                }
                FieldType::Date if NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").is_err() => {
                    return Err("must be a date (YYYY-MM-DD)".to_string())
                }
                FieldType::Select | FieldType::Radio
                    if !field.options.is_empty() && !field.options.iter().any(|o| o.value == text) =>
                {
                    return Err("must be one of the listed options".to_string())
                }
                _ => {}
            }

            if !matches!(field.field_type, FieldType::Date | FieldType::Select | FieldType::Radio) {
                let length = text.chars().count() as f64;
                if let Some(min) = bounds.min {
                    if length < min {
                        return Err(format!("must be at least {} characters", min));
                    }
                }
                if let Some(max) = bounds.max {
                    if length > max {
                        return Err(format!("must be at most {} characters", max));
                    }
                }
            }

            if let Some(ref pattern) = bounds.pattern {
                let re = Regex::new(pattern).map_err(|_| "has an invalid validation pattern".to_string())?;
                if !re.is_match(&text) {
                    return Err("has an invalid format".to_string());
                }
            }
            Ok(())
        }
    }
}

/// Check a field definition before it is stored.
///
/// `section` is the section the field will live in; its rules may only point
/// at fields that already exist there.
pub fn check_definition(section: &FormSection, field: &FormField) -> CoreResult<()> {
    let key_ok = field.key.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && field.key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !key_ok {
        return Err(CoreError::validation(format!(
            "Field key '{}' must start with a letter and use letters, digits or '_'",
            field.key
        )));
    }
    if field.label.trim().is_empty() {
        return Err(CoreError::validation("Field label is required"));
    }

    if let Some(ref bounds) = field.validation {
        if let (Some(min), Some(max)) = (bounds.min, bounds.max) {
            if min > max {
                return Err(CoreError::validation(format!("Field '{}': min exceeds max", field.key)));
            }
        }
        if let Some(ref pattern) = bounds.pattern {
            Regex::new(pattern).map_err(|e| {
                CoreError::validation(format!("Field '{}': invalid pattern: {}", field.key, e))
            })?;
        }
    }

    let sub = section.sub_section(&field.sub_section_id).ok_or_else(|| {
        CoreError::validation(format!("Unknown sub-section: {}", field.sub_section_id))
    })?;
    let siblings: HashSet<&str> = sub
        .fields
        .iter()
        .filter(|f| f.id != field.id)
        .map(|f| f.key.as_str())
        .collect();
    if siblings.contains(field.key.as_str()) {
        return Err(CoreError::validation(format!(
            "Field key '{}' already exists in '{}'",
            field.key, sub.title
        )));
    }
    for dependency in &field.depends_on {
        if dependency == &field.key || !siblings.contains(dependency.as_str()) {
            return Err(CoreError::validation(format!(
                "Field '{}' depends on unknown field '{}'",
                field.key, dependency
            )));
        }
    }

    if let Some(ref rule) = field.copy_from {
        let source = section
            .sub_section(&rule.sub_section_id)
            .and_then(|s| s.field(&rule.field_key))
            .filter(|f| f.id != field.id);
        if source.is_none() {
            return Err(CoreError::validation(format!(
                "Field '{}' copies unknown field '{}'",
                field.key, rule.field_key
            )));
        }
        let trigger = section
            .sub_sections
            .iter()
            .flat_map(|s| s.fields.iter())
            .find(|f| f.key == rule.trigger && f.field_type == FieldType::Checkbox);
        if trigger.is_none() {
            return Err(CoreError::validation(format!(
                "Field '{}' is copied on unknown checkbox '{}'",
                field.key, rule.trigger
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::model::{CopySource, FieldOption, FieldValidation, FormSubSection, PartKey};
    use serde_json::json;

    fn field(key: &str, field_type: FieldType) -> FormField {
        FormField {
            id: key.to_string(),
            sub_section_id: "contact".into(),
            label: key.to_string(),
            key: key.to_string(),
            field_type,
            required: false,
            order: 0,
            placeholder: None,
            validation: None,
            options: vec![],
            default_value: None,
            depends_on: vec![],
            copy_from: None,
        }
    }

    fn section(fields: Vec<FormField>) -> FormSection {
        FormSection {
            id: "personal".into(),
            part_id: "p".into(),
            service_id: "svc".into(),
            title: "Personal".into(),
            order: 1,
            is_active: true,
            sub_sections: vec![FormSubSection {
                id: "contact".into(),
                section_id: "personal".into(),
                title: "Contact".into(),
                order: 1,
                is_repeatable: false,
                max_repeat: 0,
                fields,
            }],
        }
    }

    fn part(fields: Vec<FormField>) -> FormPart {
        FormPart {
            id: "p".into(),
            service_id: "svc".into(),
            key: PartKey::Profile,
            title: "Profile".into(),
            order: 1,
            is_active: true,
            sections: vec![section(fields)],
        }
    }

    fn answers(value: Value) -> PartAnswers {
        serde_json::from_value(json!({ "personal": { "contact": [value] } })).unwrap()
    }

    #[test]
    fn test_required_only_when_completed() {
        let mut email = field("email", FieldType::Email);
        email.required = true;
        let part = part(vec![email, field("phone", FieldType::Phone)]);
        let draft = answers(json!({ "phone": "" }));

        assert!(validate_part(&part, &draft, false).is_empty());

        let errors = validate_part(&part, &draft, true);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].key.as_deref(), Some("email"));
        assert_eq!(errors[0].to_string(), "personal/contact[0].email: email is required");
    }

    #[test]
    fn test_required_checked_without_any_saved_instance() {
        let mut name = field("fullName", FieldType::Text);
        name.required = true;
        let errors = validate_part(&part(vec![name]), &PartAnswers::new(), true);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_typed_values() {
        let mut age = field("age", FieldType::Number);
        age.validation = Some(FieldValidation { min: Some(16.0), max: Some(99.0), pattern: None });
        let mut level = field("level", FieldType::Select);
        level.options = vec![
            FieldOption { label: "Bachelor".into(), value: "UG".into() },
            FieldOption { label: "Master".into(), value: "PG".into() },
        ];
        let mut code = field("postalCode", FieldType::Text);
        code.validation = Some(FieldValidation { min: None, max: None, pattern: Some(r"^\d{6}$".into()) });

        let part = part(vec![
            field("email", FieldType::Email),
            field("dob", FieldType::Date),
            age,
            level,
            code,
        ]);

        let good = answers(json!({
            "email": "asha@example.com",
            "dob": "2004-02-29",
            "age": 21,
            "level": "PG",
            "postalCode": 700016
        }));
        assert!(validate_part(&part, &good, true).is_empty());

        let bad = answers(json!({
            "email": "asha",
            "dob": "29/02/2004",
            "age": "12",
            "level": "PHD",
            "postalCode": "7000"
        }));
        let keys: Vec<_> = validate_part(&part, &bad, false)
            .into_iter()
            .filter_map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["email", "dob", "age", "level", "postalCode"]);
    }

    #[test]
    fn test_unknown_layout_reported() {
        let part = part(vec![field("email", FieldType::Email)]);
        let stray: PartAnswers = serde_json::from_value(json!({
            "personal": { "contact": [{ "nickname": "A" }], "ghost": [{}] },
            "elsewhere": {}
        }))
        .unwrap();
        let messages: Vec<_> = validate_part(&part, &stray, false)
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["Unknown field", "Unknown sub-section", "Unknown section"]);
    }

    #[test]
    fn test_instance_limit_enforced() {
        let part = part(vec![field("email", FieldType::Email)]);
        let doubled: PartAnswers =
            serde_json::from_value(json!({ "personal": { "contact": [{}, {}] } })).unwrap();
        assert_eq!(validate_part(&part, &doubled, false).len(), 1);
    }

    #[test]
    fn test_into_result_summarises() {
        assert!(into_result(vec![]).is_ok());
        let err = into_result(vec![error("s", None, None, None, "bad"), error("t", None, None, None, "worse")])
            .unwrap_err();
        assert_eq!(err.to_string(), "2 invalid answers: s: bad; t: worse");
    }

    #[test]
    fn test_definition_rules_must_resolve() {
        let section = section(vec![
            field("mailingCountry", FieldType::Country),
            field("sameAsMailing", FieldType::Checkbox),
        ]);

        let mut state = field("mailingState", FieldType::State);
        state.depends_on = vec!["mailingCountry".into()];
        assert!(check_definition(&section, &state).is_ok());

        state.depends_on = vec!["mailingRegion".into()];
        assert!(check_definition(&section, &state).is_err());

        let mut copy = field("permanentCountry", FieldType::Country);
        copy.copy_from = Some(CopySource {
            sub_section_id: "contact".into(),
            field_key: "mailingCountry".into(),
            trigger: "sameAsMailing".into(),
        });
        assert!(check_definition(&section, &copy).is_ok());

        copy.copy_from = Some(CopySource {
            sub_section_id: "contact".into(),
            field_key: "mailingCountry".into(),
            trigger: "mailingCountry".into(),
        });
        assert!(check_definition(&section, &copy).is_err());

        let duplicate = field("mailingCountry", FieldType::Text);
        let mut duplicate = duplicate;
        duplicate.id = "other".into();
        assert!(check_definition(&section, &duplicate).is_err());

        assert!(check_definition(&section, &field("9lives", FieldType::Text)).is_err());
    }
}
