//! Document checklist and upload review.

pub mod model;

use crate::access::{require_role, Action, Principal, Role};
use crate::error::{require, CoreError, CoreResult};
use crate::notify::{send_logged, templates, Mailer};
use crate::registration::{load_context, RegistrationContext};
use crate::text::{now_rfc3339, slugify};
use chrono::Utc;
use corehub_redis::queries::documents as queries;
use corehub_redis::queries::services as service_queries;
use corehub_redis::RedisPool as DbPool;
use model::{DocumentField, DocumentStatus, DocumentType, NewDocumentField, NewUpload, StudentDocument};
use tracing::info;
use uuid::Uuid;

/// `<type>_<slug of name>_<unix millis>`, e.g. `core_passport_1718000000000`.
/// Names with no ASCII letters or digits use `document` as the slug.
pub fn generate_document_key(document_type: DocumentType, document_name: &str, millis: i64) -> String {
    let slug = slugify(document_name, '_');
    format!(
        "{}_{}_{}",
        document_type.as_str().to_lowercase(),
        if slug.is_empty() { "document" } else { slug.as_str() },
        millis
    )
}

/// Define a document students must upload.
///
/// CORE fields are managed by admins; EXTRA fields may also be requested by
/// the registration's active OPS.
pub async fn create_document_field(
    pool: &DbPool,
    principal: &Principal,
    new: NewDocumentField,
) -> CoreResult<DocumentField> {
    require(&new.document_name, "Document name")?;
    let document_type = new.document_type.unwrap_or_default();

    let (service_id, registration_id) = match document_type {
        DocumentType::Core => {
            require_role(principal, &[Role::Admin, Role::SuperAdmin])?;
            if new.registration_id.is_some() {
                return Err(CoreError::validation("CORE documents cannot target one registration"));
            }
            if let Some(ref service_id) = new.service_id {
                service_queries::get_service(pool, service_id).await?;
            }
            (new.service_id, None)
        }
        DocumentType::Extra => {
            let registration_id = new
                .registration_id
                .ok_or_else(|| CoreError::validation("EXTRA documents need a registrationId"))?;
            let context = load_context(pool, principal, &registration_id, Action::Review).await?;
            (Some(context.registration.service_id), Some(registration_id))
        }
    };

    let document_key = match new.document_key {
        Some(key) => {
            let key = key.trim().to_string();
            if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
                return Err(CoreError::validation(format!("Invalid document key: {}", key)));
            }
            key
        }
        None => generate_document_key(document_type, &new.document_name, Utc::now().timestamp_millis()),
    };

    let field = DocumentField {
        id: Uuid::new_v4().to_string(),
        document_name: new.document_name.trim().to_string(),
        document_key,
        document_type,
        category: new.category,
        required: new.required,
        service_id,
        registration_id,
        created_by: principal.user_id.clone(),
        created_at: now_rfc3339(),
    };
    queries::insert_document_field(pool, &field.to_row()).await?;

    info!(document_key = %field.document_key, document_type = field.document_type.as_str(), "Document field created");
    Ok(field)
}

/// CORE document fields shared by all registrations.
pub async fn list_document_fields(pool: &DbPool, principal: &Principal) -> CoreResult<Vec<DocumentField>> {
    require_role(principal, &[Role::Admin, Role::SuperAdmin, Role::Ops, Role::Counselor])?;
    let rows = queries::list_document_fields(pool).await?;
    Ok(rows.into_iter().map(DocumentField::from_row).collect())
}

/// Fields that apply to one registration: CORE fields for its service plus
/// the EXTRA fields requested for it.
pub async fn registration_document_fields(
    pool: &DbPool,
    principal: &Principal,
    registration_id: &str,
) -> CoreResult<Vec<DocumentField>> {
    let context = load_context(pool, principal, registration_id, Action::Read).await?;
    applicable_fields(pool, &context).await
}

async fn applicable_fields(pool: &DbPool, context: &RegistrationContext) -> CoreResult<Vec<DocumentField>> {
    let service_id = &context.registration.service_id;
    let mut fields: Vec<DocumentField> = queries::list_document_fields(pool)
        .await?
        .into_iter()
        .map(DocumentField::from_row)
        .filter(|f| f.service_id.as_ref().is_none_or(|s| s == service_id))
        .collect();
    fields.extend(
        queries::list_registration_document_fields(pool, &context.registration.id)
            .await?
            .into_iter()
            .map(DocumentField::from_row),
    );
    Ok(fields)
}

/// Record an upload. Every upload of the same key is a new version awaiting
/// review.
pub async fn upload_document(
    pool: &DbPool,
    principal: &Principal,
    registration_id: &str,
    upload: NewUpload,
) -> CoreResult<StudentDocument> {
    require(&upload.file_name, "File name")?;
    require(&upload.file_url, "File URL")?;
    let context = load_context(pool, principal, registration_id, Action::Write).await?;
    if context.registration.status.is_closed() {
        return Err(CoreError::validation(format!(
            "Registration is {} and no longer accepts documents",
            context.registration.status.as_str()
        )));
    }

    let field = applicable_fields(pool, &context)
        .await?
        .into_iter()
        .find(|f| f.document_key == upload.document_key)
        .ok_or_else(|| {
            CoreError::validation(format!("Unknown document key for this registration: {}", upload.document_key))
        })?;

    let version = queries::next_version(pool, registration_id, &field.document_key).await?;
    let document = StudentDocument {
        id: Uuid::new_v4().to_string(),
        registration_id: registration_id.to_string(),
        document_key: field.document_key,
        document_name: field.document_name,
        file_name: upload.file_name.trim().to_string(),
        file_url: upload.file_url.trim().to_string(),
        status: DocumentStatus::Pending,
        rejection_message: None,
        version,
        uploaded_by: principal.user_id.clone(),
        reviewed_by: None,
        reviewed_at: None,
        uploaded_at: now_rfc3339(),
    };
    queries::insert_document(pool, &document.to_row()).await?;

    info!(
        registration_id = %registration_id,
        document_key = %document.document_key,
        version = document.version,
        "Document uploaded"
    );
    Ok(document)
}

/// Documents of a registration: the latest version per key, or every version.
pub async fn list_documents(
    pool: &DbPool,
    principal: &Principal,
    registration_id: &str,
    all_versions: bool,
) -> CoreResult<Vec<StudentDocument>> {
    load_context(pool, principal, registration_id, Action::Read).await?;
    let rows = if all_versions {
        queries::list_documents(pool, registration_id).await?
    } else {
        queries::list_latest_documents(pool, registration_id).await?
    };
    Ok(rows.into_iter().map(StudentDocument::from_row).collect())
}

pub async fn approve_document(pool: &DbPool, principal: &Principal, document_id: &str) -> CoreResult<StudentDocument> {
    let (document, _) = review(pool, principal, document_id, DocumentStatus::Approved, None).await?;
    Ok(document)
}

/// Reject with a message and email it to the student. Delivery failures are
/// logged and do not undo the rejection.
pub async fn reject_document(
    pool: &DbPool,
    mailer: &dyn Mailer,
    principal: &Principal,
    document_id: &str,
    message: &str,
) -> CoreResult<StudentDocument> {
    require(message, "Rejection message")?;
    let (document, context) =
        review(pool, principal, document_id, DocumentStatus::Rejected, Some(message.trim())).await?;

    let email = templates::document_rejected(
        &context.student.email,
        &templates::DocumentRejected {
            student_name: &context.student.name,
            document_name: &document.document_name,
            message: message.trim(),
        },
    )?;
    send_logged(mailer, email).await;
    Ok(document)
}

async fn review(
    pool: &DbPool,
    principal: &Principal,
    document_id: &str,
    status: DocumentStatus,
    message: Option<&str>,
) -> CoreResult<(StudentDocument, RegistrationContext)> {
    let mut document = StudentDocument::from_row(queries::get_document(pool, document_id).await?);
    let context = load_context(pool, principal, &document.registration_id, Action::Review).await?;
    if !document.status.can_transition_to(&status) {
        return Err(CoreError::transition(document.status.as_str(), status.as_str()));
    }

    document.status = status;
    document.rejection_message = message.map(str::to_string);
    document.reviewed_by = Some(principal.user_id.clone());
    document.reviewed_at = Some(now_rfc3339());
    queries::update_document(pool, &document.to_row()).await?;

    info!(document_id = %document_id, status = status.as_str(), reviewer = %principal.user_id, "Document reviewed");
    Ok((document, context))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_for_core_passport() {
        assert_eq!(
            generate_document_key(DocumentType::default(), "Passport", 1_718_000_000_000),
            "core_passport_1718000000000"
        );
    }

    #[test]
    fn test_generated_key_slugs_name() {
        assert_eq!(
            generate_document_key(DocumentType::Extra, "Bank Statement (6 months)", 42),
            "extra_bank_statement_6_months_42"
        );
    }

    #[test]
    fn test_generated_key_without_ascii_name() {
        assert_eq!(
            generate_document_key(DocumentType::Core, "पासपोर्ट", 7),
            "core_document_7"
        );
        assert_eq!(generate_document_key(DocumentType::Extra, "***", 7), "extra_document_7");
    }

    #[test]
    fn test_review_transitions() {
        assert!(DocumentStatus::Pending.can_transition_to(&DocumentStatus::Rejected));
        assert!(DocumentStatus::Pending.can_transition_to(&DocumentStatus::Approved));
        assert!(!DocumentStatus::Approved.can_transition_to(&DocumentStatus::Rejected));
        assert!(!DocumentStatus::Rejected.can_transition_to(&DocumentStatus::Approved));
    }

    #[test]
    fn test_new_field_defaults_to_core() {
        let new: NewDocumentField = serde_json::from_str(r#"{"documentName": "Passport"}"#).unwrap();
        assert_eq!(new.document_type.unwrap_or_default(), DocumentType::Core);
    }
}
