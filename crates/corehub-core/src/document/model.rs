//! Document field and upload types.

use corehub_redis::queries::documents::{DocumentFieldRow, StudentDocumentRow};
use serde::{Deserialize, Serialize};

/// CORE documents apply to every registration; EXTRA ones are requested for
/// one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    #[default]
    Core,
    Extra,
}

impl DocumentType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CORE" => Some(Self::Core),
            "EXTRA" => Some(Self::Extra),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Core => "CORE",
            Self::Extra => "EXTRA",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentField {
    pub id: String,
    pub document_name: String,
    pub document_key: String,
    pub document_type: DocumentType,
    pub category: Option<String>,
    pub required: bool,
    pub service_id: Option<String>,
    pub registration_id: Option<String>,
    pub created_by: String,
    pub created_at: String,
}

impl DocumentField {
    pub fn from_row(row: DocumentFieldRow) -> Self {
        Self {
            document_type: DocumentType::parse(&row.document_type).unwrap_or_default(),
            id: row.id,
            document_name: row.document_name,
            document_key: row.document_key,
            category: row.category,
            required: row.required,
            service_id: row.service_id,
            registration_id: row.registration_id,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }

    pub fn to_row(&self) -> DocumentFieldRow {
        DocumentFieldRow {
            id: self.id.clone(),
            document_name: self.document_name.clone(),
            document_key: self.document_key.clone(),
            document_type: self.document_type.as_str().to_string(),
            category: self.category.clone(),
            required: self.required,
            service_id: self.service_id.clone(),
            registration_id: self.registration_id.clone(),
            created_by: self.created_by.clone(),
            created_at: self.created_at.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Pending,
    Approved,
    Rejected,
}

impl DocumentStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Only pending uploads are reviewed; a decision is final for that version.
    pub fn can_transition_to(&self, target: &Self) -> bool {
        matches!((self, target), (Self::Pending, Self::Approved) | (Self::Pending, Self::Rejected))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDocument {
    pub id: String,
    pub registration_id: String,
    pub document_key: String,
    pub document_name: String,
    pub file_name: String,
    pub file_url: String,
    pub status: DocumentStatus,
    pub rejection_message: Option<String>,
    pub version: i64,
    pub uploaded_by: String,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<String>,
    pub uploaded_at: String,
}

impl StudentDocument {
    pub fn from_row(row: StudentDocumentRow) -> Self {
        Self {
            status: DocumentStatus::parse(&row.status).unwrap_or(DocumentStatus::Pending),
            id: row.id,
            registration_id: row.registration_id,
            document_key: row.document_key,
            document_name: row.document_name,
            file_name: row.file_name,
            file_url: row.file_url,
            rejection_message: row.rejection_message,
            version: row.version,
            uploaded_by: row.uploaded_by,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
            uploaded_at: row.uploaded_at,
        }
    }

    pub fn to_row(&self) -> StudentDocumentRow {
        StudentDocumentRow {
            id: self.id.clone(),
            registration_id: self.registration_id.clone(),
            document_key: self.document_key.clone(),
            document_name: self.document_name.clone(),
            file_name: self.file_name.clone(),
            file_url: self.file_url.clone(),
            status: self.status.as_str().to_string(),
            rejection_message: self.rejection_message.clone(),
            version: self.version,
            uploaded_by: self.uploaded_by.clone(),
            reviewed_by: self.reviewed_by.clone(),
            reviewed_at: self.reviewed_at.clone(),
            uploaded_at: self.uploaded_at.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocumentField {
    pub document_name: String,
    #[serde(default)]
    pub document_key: Option<String>,
    #[serde(default)]
    pub document_type: Option<DocumentType>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub registration_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUpload {
    pub document_key: String,
    pub file_name: String,
    pub file_url: String,
}
