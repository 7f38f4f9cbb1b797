//! Merging saved answers with a form definition.
//!
//! `hydrate` produces one renderable entry for every part, section and
//! sub-section. `apply_field_change` edits one value and applies the field
//! rules declared on the definition: `dependsOn` resets and `copyFrom` copies.

use super::model::{
    FieldType, FieldValues, FormPart, FormSection, FormStructure, PartAnswers, PartKey,
    SectionAnswers, StudentFormAnswer,
};
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One part as presented to a client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HydratedPart {
    pub key: PartKey,
    pub title: String,
    pub completed: bool,
    pub last_saved_at: Option<String>,
    pub answers: PartAnswers,
}

/// A single edited value.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub section_id: String,
    pub sub_section_id: String,
    #[serde(default)]
    pub index: usize,
    pub key: String,
    pub value: Value,
}

/// What a change did besides setting its own value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEffects {
    pub appended: bool,
    pub reset: Vec<String>,
    pub copied: Vec<String>,
}

/// Hydrate every active part of `structure` with whatever has been saved.
pub fn hydrate(structure: &FormStructure, saved: &[StudentFormAnswer]) -> Vec<HydratedPart> {
    structure
        .parts
        .iter()
        .filter(|part| part.is_active)
        .map(|part| {
            let stored = saved.iter().find(|a| a.part_key == part.key);
            HydratedPart {
                key: part.key,
                title: part.title.clone(),
                completed: stored.is_some_and(|a| a.completed),
                last_saved_at: stored.map(|a| a.last_saved_at.clone()),
                answers: hydrate_part(part, stored.map(|a| &a.answers)),
            }
        })
        .collect()
}

/// Shape one part's answers after its definition.
///
/// Every active section gets an entry and every sub-section at least one
/// instance. Stored instances beyond the sub-section's limit are dropped, so a
/// non-repeatable sub-section always hydrates to exactly one.
pub fn hydrate_part(part: &FormPart, saved: Option<&PartAnswers>) -> PartAnswers {
    let mut hydrated = PartAnswers::new();
    for section in part.active_sections() {
        let stored = saved.and_then(|answers| answers.get(&section.id));
        let mut section_answers = SectionAnswers::new();
        for sub in &section.sub_sections {
            let mut instances = stored
                .and_then(|s| s.get(&sub.id))
                .cloned()
                .unwrap_or_default();
            instances.truncate(sub.instance_limit());
            if instances.is_empty() {
                instances.push(FieldValues::new());
            }
            section_answers.insert(sub.id.clone(), instances);
        }
        hydrated.insert(section.id.clone(), section_answers);
    }
    hydrated
}

/// Apply one edit to a part's answers.
pub fn apply_part_change(
    part: &FormPart,
    answers: &mut PartAnswers,
    change: &FieldChange,
) -> CoreResult<ChangeEffects> {
    let section = part
        .section(&change.section_id)
        .filter(|s| s.is_active)
        .ok_or_else(|| CoreError::validation(format!("Unknown section: {}", change.section_id)))?;
    let section_answers = answers.entry(section.id.clone()).or_default();
    apply_field_change(section, section_answers, change)
}

/// Set `change.key` on instance `change.index` of its sub-section.
///
/// Index equal to the instance count appends a new instance seeded with
/// default values, within the sub-section's limit. Fields whose `dependsOn`
/// names the changed key are reset to `""`, transitively. Switching a
/// checkbox on copies every field of the section whose `copyFrom.trigger` is
/// that checkbox.
pub fn apply_field_change(
    section: &FormSection,
    answers: &mut SectionAnswers,
    change: &FieldChange,
) -> CoreResult<ChangeEffects> {
    let sub = section.sub_section(&change.sub_section_id).ok_or_else(|| {
        CoreError::validation(format!("Unknown sub-section: {}", change.sub_section_id))
    })?;
    let field = sub.field(&change.key).ok_or_else(|| {
        CoreError::validation(format!("Unknown field '{}' in sub-section {}", change.key, sub.title))
    })?;

    let mut effects = ChangeEffects::default();

    {
        let instances = answers.entry(sub.id.clone()).or_default();
        if instances.is_empty() {
            instances.push(FieldValues::new());
        }
        if change.index == instances.len() {
            if instances.len() >= sub.instance_limit() {
                return Err(CoreError::validation(format!(
                    "'{}' allows at most {} entr{}",
                    sub.title,
                    sub.instance_limit(),
                    if sub.instance_limit() == 1 { "y" } else { "ies" }
                )));
            }
            instances.push(sub.new_instance());
            effects.appended = true;
        } else if change.index > instances.len() {
            return Err(CoreError::validation(format!(
                "Entry {} does not exist in '{}'",
                change.index, sub.title
            )));
        }

        let instance = &mut instances[change.index];
        instance.insert(field.key.clone(), change.value.clone());

        let mut pending = vec![field.key.as_str()];
        while let Some(changed) = pending.pop() {
            for dependent in sub.fields.iter().filter(|f| f.depends_on.iter().any(|d| d == changed)) {
                if dependent.key == field.key || effects.reset.contains(&dependent.key) {
                    continue;
                }
                instance.insert(dependent.key.clone(), Value::String(String::new()));
                effects.reset.push(dependent.key.clone());
                pending.push(&dependent.key);
            }
        }
    }

    if field.field_type == FieldType::Checkbox && is_checked(&change.value) {
        let mut copies = Vec::new();
        for target_sub in &section.sub_sections {
            for target in &target_sub.fields {
                let Some(ref rule) = target.copy_from else { continue };
                if rule.trigger != field.key {
                    continue;
                }
                let value = answers
                    .get(&rule.sub_section_id)
                    .and_then(|instances| instances.first())
                    .and_then(|instance| instance.get(&rule.field_key))
                    .cloned()
                    .unwrap_or_else(|| Value::String(String::new()));
                copies.push((target_sub.id.clone(), target.key.clone(), value));
            }
        }

        for (sub_id, key, value) in copies {
            let instances = answers.entry(sub_id.clone()).or_default();
            if instances.is_empty() {
                instances.push(FieldValues::new());
            }
            let index = if sub_id == sub.id { change.index } else { 0 };
            instances[index].insert(key.clone(), value);
            effects.copied.push(key);
        }
    }

    Ok(effects)
}

/// Whether a checkbox value means "on".
pub fn is_checked(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "on" | "1"),
        Value::Number(n) => n.as_i64() == Some(1),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::model::{CopySource, FormField, FormSubSection};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn field(sub: &str, key: &str, field_type: FieldType) -> FormField {
        FormField {
            id: format!("{}-{}", sub, key),
            sub_section_id: sub.to_string(),
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

    fn depends(mut f: FormField, on: &str) -> FormField {
        f.depends_on = vec![on.to_string()];
        f
    }

    fn copies(mut f: FormField, source: &str) -> FormField {
        f.copy_from = Some(CopySource {
            sub_section_id: "mailing".into(),
            field_key: source.into(),
            trigger: "sameAsMailingAddress".into(),
        });
        f
    }

    fn sub_section(id: &str, repeatable: bool, max: u32, fields: Vec<FormField>) -> FormSubSection {
        FormSubSection {
            id: id.into(),
            section_id: "address".into(),
            title: id.into(),
            order: 0,
            is_repeatable: repeatable,
            max_repeat: max,
            fields,
        }
    }

    fn address_section() -> FormSection {
        let mailing = sub_section(
            "mailing",
            false,
            0,
            vec![
                field("mailing", "mailingAddress1", FieldType::Text),
                field("mailing", "mailingAddress2", FieldType::Text),
                field("mailing", "mailingCountry", FieldType::Country),
                depends(field("mailing", "mailingState", FieldType::State), "mailingCountry"),
                depends(field("mailing", "mailingCity", FieldType::City), "mailingState"),
                field("mailing", "mailingPostalCode", FieldType::Text),
            ],
        );
        let permanent = sub_section(
            "permanent",
            false,
            0,
            vec![
                field("permanent", "sameAsMailingAddress", FieldType::Checkbox),
                copies(field("permanent", "permanentAddress1", FieldType::Text), "mailingAddress1"),
                copies(field("permanent", "permanentAddress2", FieldType::Text), "mailingAddress2"),
                copies(field("permanent", "permanentCountry", FieldType::Country), "mailingCountry"),
                copies(
                    depends(field("permanent", "permanentState", FieldType::State), "permanentCountry"),
                    "mailingState",
                ),
                copies(
                    depends(field("permanent", "permanentCity", FieldType::City), "permanentState"),
                    "mailingCity",
                ),
                copies(field("permanent", "permanentPostalCode", FieldType::Text), "mailingPostalCode"),
                field("permanent", "permanentLandmark", FieldType::Text),
            ],
        );
        let mut education = field("education", "institution", FieldType::Text);
        education.default_value = Some(json!("Unknown"));
        let education = sub_section("education", true, 2, vec![education]);

        FormSection {
            id: "address".into(),
            part_id: "profile".into(),
            service_id: "svc".into(),
            title: "Address".into(),
            order: 1,
            is_active: true,
            sub_sections: vec![mailing, permanent, education],
        }
    }

    fn part() -> FormPart {
        FormPart {
            id: "profile".into(),
            service_id: "svc".into(),
            key: PartKey::Profile,
            title: "Profile".into(),
            order: 1,
            is_active: true,
            sections: vec![address_section()],
        }
    }

    fn change(sub: &str, index: usize, key: &str, value: Value) -> FieldChange {
        FieldChange {
            section_id: "address".into(),
            sub_section_id: sub.into(),
            index,
            key: key.into(),
            value,
        }
    }

    fn mailing_answers() -> SectionAnswers {
        serde_json::from_value(json!({
            "mailing": [{
                "mailingAddress1": "12 Park Street",
                "mailingAddress2": "Flat 4",
                "mailingCountry": "India",
                "mailingState": "West Bengal",
                "mailingCity": "Kolkata",
                "mailingPostalCode": "700016"
            }],
            "permanent": [{ "permanentLandmark": "Near the lake" }]
        }))
        .unwrap()
    }

    #[test]
    fn test_hydrate_fills_every_level() {
        let structure = FormStructure { service_id: "svc".into(), parts: vec![part()] };
        let hydrated = hydrate(&structure, &[]);

        assert_eq!(hydrated.len(), 1);
        assert!(!hydrated[0].completed);
        assert_eq!(hydrated[0].last_saved_at, None);
        let section = &hydrated[0].answers["address"];
        assert_eq!(section.len(), 3);
        for instances in section.values() {
            assert_eq!(instances, &vec![FieldValues::new()]);
        }
    }

    #[test]
    fn test_non_repeatable_hydrates_to_one_instance() {
        let saved: PartAnswers = serde_json::from_value(json!({
            "address": {
                "mailing": [{"mailingCity": "Pune"}, {"mailingCity": "Delhi"}, {}],
                "education": [{"institution": "A"}, {"institution": "B"}, {"institution": "C"}]
            }
        }))
        .unwrap();

        let hydrated = hydrate_part(&part(), Some(&saved));
        assert_eq!(hydrated["address"]["mailing"].len(), 1);
        assert_eq!(hydrated["address"]["mailing"][0]["mailingCity"], json!("Pune"));
        assert_eq!(hydrated["address"]["permanent"].len(), 1);
        assert_eq!(hydrated["address"]["education"].len(), 2);
    }

    #[test]
    fn test_same_as_mailing_copies_six_fields() {
        let section = address_section();
        let mut answers = mailing_answers();
        let before_mailing = answers["mailing"].clone();

        let effects = apply_field_change(
            &section,
            &mut answers,
            &change("permanent", 0, "sameAsMailingAddress", json!(true)),
        )
        .unwrap();

        assert_eq!(
            effects.copied,
            vec![
                "permanentAddress1",
                "permanentAddress2",
                "permanentCountry",
                "permanentState",
                "permanentCity",
                "permanentPostalCode",
            ]
        );
        assert!(effects.reset.is_empty());

        let permanent = &answers["permanent"][0];
        assert_eq!(permanent["permanentAddress1"], json!("12 Park Street"));
        assert_eq!(permanent["permanentAddress2"], json!("Flat 4"));
        assert_eq!(permanent["permanentCountry"], json!("India"));
        assert_eq!(permanent["permanentState"], json!("West Bengal"));
        assert_eq!(permanent["permanentCity"], json!("Kolkata"));
        assert_eq!(permanent["permanentPostalCode"], json!("700016"));
        assert_eq!(permanent["permanentLandmark"], json!("Near the lake"));
        assert_eq!(permanent["sameAsMailingAddress"], json!(true));
        assert_eq!(permanent.len(), 8);
        assert_eq!(answers["mailing"], before_mailing);
    }

    #[test]
    fn test_unchecking_copies_nothing() {
        let section = address_section();
        let mut answers = mailing_answers();
        let effects = apply_field_change(
            &section,
            &mut answers,
            &change("permanent", 0, "sameAsMailingAddress", json!(false)),
        )
        .unwrap();

        assert!(effects.copied.is_empty());
        assert!(answers["permanent"][0].get("permanentCity").is_none());
    }

    #[test]
    fn test_country_change_resets_state_and_city() {
        let section = address_section();
        let mut answers = mailing_answers();

        let effects = apply_field_change(
            &section,
            &mut answers,
            &change("mailing", 0, "mailingCountry", json!("Canada")),
        )
        .unwrap();

        assert_eq!(effects.reset, vec!["mailingState", "mailingCity"]);
        let mailing = &answers["mailing"][0];
        assert_eq!(mailing["mailingCountry"], json!("Canada"));
        assert_eq!(mailing["mailingState"], json!(""));
        assert_eq!(mailing["mailingCity"], json!(""));
        assert_eq!(mailing["mailingPostalCode"], json!("700016"));
    }

    #[test]
    fn test_state_change_resets_only_city() {
        let section = address_section();
        let mut answers = mailing_answers();
        let effects = apply_field_change(
            &section,
            &mut answers,
            &change("mailing", 0, "mailingState", json!("Kerala")),
        )
        .unwrap();
        assert_eq!(effects.reset, vec!["mailingCity"]);
        assert_eq!(answers["mailing"][0]["mailingCountry"], json!("India"));
    }

    #[test]
    fn test_append_repeatable_instance_within_limit() {
        let section = address_section();
        let mut answers = SectionAnswers::new();

        let first = apply_field_change(
            &section,
            &mut answers,
            &change("education", 0, "institution", json!("IIT Delhi")),
        )
        .unwrap();
        assert!(!first.appended);

        let second = apply_field_change(
            &section,
            &mut answers,
            &change("education", 1, "institution", json!("MIT")),
        )
        .unwrap();
        assert!(second.appended);
        assert_eq!(answers["education"].len(), 2);

        let err = apply_field_change(
            &section,
            &mut answers,
            &change("education", 2, "institution", json!("ETH")),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_non_repeatable_rejects_second_instance() {
        let section = address_section();
        let mut answers = mailing_answers();
        let err = apply_field_change(
            &section,
            &mut answers,
            &change("mailing", 1, "mailingCity", json!("Delhi")),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(answers["mailing"].len(), 1);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let section = address_section();
        let mut answers = SectionAnswers::new();
        let err = apply_field_change(&section, &mut answers, &change("mailing", 0, "nickname", json!("x")))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let mut part_answers = PartAnswers::new();
        let mut bad = change("mailing", 0, "mailingCity", json!("x"));
        bad.section_id = "nowhere".into();
        assert!(apply_part_change(&part(), &mut part_answers, &bad).is_err());
    }

    #[test]
    fn test_checkbox_truthiness() {
        assert!(is_checked(&json!(true)));
        assert!(is_checked(&json!("yes")));
        assert!(is_checked(&json!(1)));
        assert!(!is_checked(&json!("false")));
        assert!(!is_checked(&Value::Null));
    }
}
