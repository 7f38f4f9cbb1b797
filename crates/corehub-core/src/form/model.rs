//! Form definition and answer types.
//!
//! A service's form is a four-level tree: Part → Section → SubSection → Field.
//! Answers mirror the tree below the part: `sectionId → subSectionId →
//! [instance]`, where each instance maps field keys to values.

use corehub_redis::queries::forms::{FormFieldRow, FormPartRow, FormSectionRow, FormSubSectionRow};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One repeatable instance: field key → value.
pub type FieldValues = serde_json::Map<String, Value>;
/// subSectionId → instances.
pub type SectionAnswers = IndexMap<String, Vec<FieldValues>>;
/// sectionId → sub-section answers. One document per part.
pub type PartAnswers = IndexMap<String, SectionAnswers>;

/// The four fixed parts of every service form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartKey {
    Profile,
    Application,
    Document,
    Payment,
}

impl PartKey {
    pub const ALL: [PartKey; 4] = [Self::Profile, Self::Application, Self::Document, Self::Payment];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PROFILE" => Some(Self::Profile),
            "APPLICATION" => Some(Self::Application),
            "DOCUMENT" => Some(Self::Document),
            "PAYMENT" => Some(Self::Payment),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profile => "PROFILE",
            Self::Application => "APPLICATION",
            Self::Document => "DOCUMENT",
            Self::Payment => "PAYMENT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Text,
    Email,
    Number,
    Date,
    Phone,
    Textarea,
    Select,
    Radio,
    Checkbox,
    File,
    Country,
    State,
    City,
}

impl FieldType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "TEXT" => Some(Self::Text),
            "EMAIL" => Some(Self::Email),
            "NUMBER" => Some(Self::Number),
            "DATE" => Some(Self::Date),
            "PHONE" => Some(Self::Phone),
            "TEXTAREA" => Some(Self::Textarea),
            "SELECT" => Some(Self::Select),
            "RADIO" => Some(Self::Radio),
            "CHECKBOX" => Some(Self::Checkbox),
            "FILE" => Some(Self::File),
            "COUNTRY" => Some(Self::Country),
            "STATE" => Some(Self::State),
            "CITY" => Some(Self::City),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Email => "EMAIL",
            Self::Number => "NUMBER",
            Self::Date => "DATE",
            Self::Phone => "PHONE",
            Self::Textarea => "TEXTAREA",
            Self::Select => "SELECT",
            Self::Radio => "RADIO",
            Self::Checkbox => "CHECKBOX",
            Self::File => "FILE",
            Self::Country => "COUNTRY",
            Self::State => "STATE",
            Self::City => "CITY",
        }
    }
}

/// Value bounds: length for text, magnitude for numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub label: String,
    pub value: String,
}

/// Copy `field_key` from the first instance of `sub_section_id` whenever the
/// checkbox `trigger` is switched on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopySource {
    pub sub_section_id: String,
    pub field_key: String,
    pub trigger: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub id: String,
    pub sub_section_id: String,
    pub label: String,
    pub key: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub order: i64,
    pub placeholder: Option<String>,
    pub validation: Option<FieldValidation>,
    pub options: Vec<FieldOption>,
    pub default_value: Option<Value>,
    pub depends_on: Vec<String>,
    pub copy_from: Option<CopySource>,
}

impl FormField {
    /// Create from database row. Malformed rule payloads are dropped.
    pub fn from_row(row: FormFieldRow) -> Self {
        Self {
            field_type: FieldType::parse(&row.field_type).unwrap_or(FieldType::Text),
            validation: row.validation.and_then(|v| serde_json::from_value(v).ok()),
            options: row
                .options
                .and_then(|v| serde_json::from_value(v).ok())
                .unwrap_or_default(),
            copy_from: row.copy_from.and_then(|v| serde_json::from_value(v).ok()),
            id: row.id,
            sub_section_id: row.sub_section_id,
            label: row.label,
            key: row.key,
            required: row.required,
            order: row.order,
            placeholder: row.placeholder,
            default_value: row.default_value,
            depends_on: row.depends_on,
        }
    }

    pub fn to_row(&self) -> FormFieldRow {
        FormFieldRow {
            id: self.id.clone(),
            sub_section_id: self.sub_section_id.clone(),
            label: self.label.clone(),
            key: self.key.clone(),
            field_type: self.field_type.as_str().to_string(),
            required: self.required,
            order: self.order,
            placeholder: self.placeholder.clone(),
            validation: self.validation.as_ref().and_then(|v| serde_json::to_value(v).ok()),
            options: (!self.options.is_empty())
                .then(|| serde_json::to_value(&self.options).ok())
                .flatten(),
            default_value: self.default_value.clone(),
            depends_on: self.depends_on.clone(),
            copy_from: self.copy_from.as_ref().and_then(|c| serde_json::to_value(c).ok()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSubSection {
    pub id: String,
    pub section_id: String,
    pub title: String,
    pub order: i64,
    pub is_repeatable: bool,
    pub max_repeat: u32,
    pub fields: Vec<FormField>,
}

impl FormSubSection {
    pub fn from_row(row: FormSubSectionRow, fields: Vec<FormField>) -> Self {
        Self {
            id: row.id,
            section_id: row.section_id,
            title: row.title,
            order: row.order,
            is_repeatable: row.is_repeatable,
            max_repeat: row.max_repeat,
            fields,
        }
    }

    pub fn to_row(&self) -> FormSubSectionRow {
        FormSubSectionRow {
            id: self.id.clone(),
            section_id: self.section_id.clone(),
            title: self.title.clone(),
            order: self.order,
            is_repeatable: self.is_repeatable,
            max_repeat: self.max_repeat,
        }
    }

    pub fn field(&self, key: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// How many instances the sub-section may hold.
    pub fn instance_limit(&self) -> usize {
        match (self.is_repeatable, self.max_repeat) {
            (false, _) => 1,
            (true, 0) => usize::MAX,
            (true, max) => max as usize,
        }
    }

    /// A fresh instance seeded with the fields' default values.
    pub fn new_instance(&self) -> FieldValues {
        self.fields
            .iter()
            .filter_map(|f| f.default_value.clone().map(|v| (f.key.clone(), v)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSection {
    pub id: String,
    pub part_id: String,
    pub service_id: String,
    pub title: String,
    pub order: i64,
    pub is_active: bool,
    pub sub_sections: Vec<FormSubSection>,
}

impl FormSection {
    pub fn from_row(row: FormSectionRow, sub_sections: Vec<FormSubSection>) -> Self {
        Self {
            id: row.id,
            part_id: row.part_id,
            service_id: row.service_id,
            title: row.title,
            order: row.order,
            is_active: row.is_active,
            sub_sections,
        }
    }

    pub fn to_row(&self) -> FormSectionRow {
        FormSectionRow {
            id: self.id.clone(),
            part_id: self.part_id.clone(),
            service_id: self.service_id.clone(),
            title: self.title.clone(),
            order: self.order,
            is_active: self.is_active,
        }
    }

    pub fn sub_section(&self, id: &str) -> Option<&FormSubSection> {
        self.sub_sections.iter().find(|s| s.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormPart {
    pub id: String,
    pub service_id: String,
    pub key: PartKey,
    pub title: String,
    pub order: i64,
    pub is_active: bool,
    pub sections: Vec<FormSection>,
}

impl FormPart {
    /// Create from database row; `None` for a part key this build does not know.
    pub fn from_row(row: FormPartRow, sections: Vec<FormSection>) -> Option<Self> {
        Some(Self {
            key: PartKey::parse(&row.key)?,
            id: row.id,
            service_id: row.service_id,
            title: row.title,
            order: row.order,
            is_active: row.is_active,
            sections,
        })
    }

    pub fn to_row(&self) -> FormPartRow {
        FormPartRow {
            id: self.id.clone(),
            service_id: self.service_id.clone(),
            key: self.key.as_str().to_string(),
            title: self.title.clone(),
            order: self.order,
            is_active: self.is_active,
        }
    }

    pub fn section(&self, id: &str) -> Option<&FormSection> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Sections a student fills in.
    pub fn active_sections(&self) -> impl Iterator<Item = &FormSection> {
        self.sections.iter().filter(|s| s.is_active)
    }
}

/// The complete form of one service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormStructure {
    pub service_id: String,
    pub parts: Vec<FormPart>,
}

impl FormStructure {
    pub fn part(&self, key: PartKey) -> Option<&FormPart> {
        self.parts.iter().find(|p| p.key == key)
    }
}

/// Saved answers of one part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFormAnswer {
    pub registration_id: String,
    pub part_key: PartKey,
    pub answers: PartAnswers,
    pub completed: bool,
    pub last_saved_at: String,
    pub created_at: String,
}

impl StudentFormAnswer {
    /// Decode a stored answer document. `None` for unknown part keys.
    pub fn from_row(
        row: corehub_redis::queries::answers::StudentFormAnswerRow,
    ) -> Result<Option<Self>, serde_json::Error> {
        let Some(part_key) = PartKey::parse(&row.part_key) else {
            return Ok(None);
        };
        Ok(Some(Self {
            registration_id: row.registration_id,
            part_key,
            answers: serde_json::from_value(row.answers)?,
            completed: row.completed,
            last_saved_at: row.last_saved_at,
            created_at: row.created_at,
        }))
    }

    pub fn to_row(&self) -> Result<corehub_redis::queries::answers::StudentFormAnswerRow, serde_json::Error> {
        Ok(corehub_redis::queries::answers::StudentFormAnswerRow {
            registration_id: self.registration_id.clone(),
            part_key: self.part_key.as_str().to_string(),
            answers: serde_json::to_value(&self.answers)?,
            completed: self.completed,
            last_saved_at: self.last_saved_at.clone(),
            created_at: self.created_at.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sub_section(repeatable: bool, max: u32) -> FormSubSection {
        FormSubSection {
            id: "sub".into(),
            section_id: "sec".into(),
            title: "Sub".into(),
            order: 1,
            is_repeatable: repeatable,
            max_repeat: max,
            fields: vec![],
        }
    }

    #[test]
    fn test_instance_limit() {
        assert_eq!(sub_section(false, 5).instance_limit(), 1);
        assert_eq!(sub_section(true, 3).instance_limit(), 3);
        assert_eq!(sub_section(true, 0).instance_limit(), usize::MAX);
    }

    #[test]
    fn test_field_row_round_trip_keeps_rules() {
        let row = FormFieldRow {
            id: "f1".into(),
            sub_section_id: "sub".into(),
            label: "Country".into(),
            key: "permanentCountry".into(),
            field_type: "COUNTRY".into(),
            required: true,
            order: 3,
            placeholder: None,
            validation: Some(json!({"max": 60.0})),
            options: None,
            default_value: None,
            depends_on: vec![],
            copy_from: Some(json!({
                "subSectionId": "mailing",
                "fieldKey": "mailingCountry",
                "trigger": "sameAsMailingAddress"
            })),
        };
        let field = FormField::from_row(row);
        assert_eq!(field.field_type, FieldType::Country);
        assert_eq!(
            field.copy_from,
            Some(CopySource {
                sub_section_id: "mailing".into(),
                field_key: "mailingCountry".into(),
                trigger: "sameAsMailingAddress".into(),
            })
        );

        let back = FormField::from_row(field.to_row());
        assert_eq!(back, field);
    }

    #[test]
    fn test_answer_document_keeps_key_order() {
        let raw = r#"{"sec-b":{"sub-1":[{"zeta":"1","alpha":"2"}]},"sec-a":{"sub-2":[{}]}}"#;
        let answers: PartAnswers = serde_json::from_str(raw).unwrap();
        assert_eq!(serde_json::to_string(&answers).unwrap(), raw);
    }

    #[test]
    fn test_part_key_wire_format() {
        assert_eq!(serde_json::to_value(PartKey::Application).unwrap(), json!("APPLICATION"));
        assert_eq!(PartKey::parse("payment"), Some(PartKey::Payment));
        assert_eq!(PartKey::parse("extras"), None);
    }
}
