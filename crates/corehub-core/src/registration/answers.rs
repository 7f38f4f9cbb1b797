//! Reading and writing a registration's form answers.
//!
//! Each part is stored as its own document, created on first save and
//! replaced wholesale afterwards.

use super::{load_context, mark_in_progress, RegistrationContext};
use crate::access::{Action, Principal};
use crate::error::{CoreError, CoreResult};
use crate::form::aggregate::{apply_part_change, hydrate, hydrate_part, ChangeEffects, FieldChange, HydratedPart};
use crate::form::get_form_structure;
use crate::form::model::{FormPart, FormStructure, PartAnswers, PartKey, StudentFormAnswer};
use crate::form::validate::{into_result, validate_part};
use crate::text::now_rfc3339;
use corehub_redis::queries::answers as queries;
use corehub_redis::RedisPool as DbPool;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// The form of a registration's service merged with its saved answers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormAnswers {
    pub registration_id: String,
    pub structure: FormStructure,
    pub parts: Vec<HydratedPart>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePart {
    pub answers: PartAnswers,
    #[serde(default)]
    pub completed: bool,
}

/// Result of a single-field edit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldUpdate {
    pub part: HydratedPart,
    pub effects: ChangeEffects,
}

pub async fn get_answers(pool: &DbPool, principal: &Principal, registration_id: &str) -> CoreResult<FormAnswers> {
    let context = load_context(pool, principal, registration_id, Action::Read).await?;
    let structure = get_form_structure(pool, &context.registration.service_id).await?;
    let saved = saved_answers(pool, registration_id).await?;
    let parts = hydrate(&structure, &saved);

    debug!(registration_id = %registration_id, saved = saved.len(), "Answers hydrated");
    Ok(FormAnswers { registration_id: registration_id.to_string(), structure, parts })
}

/// Replace the answers of one part.
pub async fn save_part(
    pool: &DbPool,
    principal: &Principal,
    registration_id: &str,
    part_key: PartKey,
    input: SavePart,
) -> CoreResult<StudentFormAnswer> {
    let context = editable_context(pool, principal, registration_id).await?;
    let structure = get_form_structure(pool, &context.registration.service_id).await?;
    let part = find_part(&structure, part_key)?;
    into_result(validate_part(part, &input.answers, input.completed))?;

    let existing = stored_answer(pool, registration_id, part_key).await?;
    let answer = write_answer(pool, &context, part_key, input.answers, input.completed, existing).await?;

    info!(
        registration_id = %registration_id,
        part = part_key.as_str(),
        completed = answer.completed,
        "Part answers saved"
    );
    Ok(answer)
}

/// Apply one field edit with its dependency and copy rules, then save the part.
pub async fn update_field(
    pool: &DbPool,
    principal: &Principal,
    registration_id: &str,
    part_key: PartKey,
    change: FieldChange,
) -> CoreResult<FieldUpdate> {
    let context = editable_context(pool, principal, registration_id).await?;
    let structure = get_form_structure(pool, &context.registration.service_id).await?;
    let part = find_part(&structure, part_key)?;

    let existing = stored_answer(pool, registration_id, part_key).await?;
    let completed = existing.as_ref().is_some_and(|a| a.completed);
    let mut answers = existing.as_ref().map(|a| a.answers.clone()).unwrap_or_default();

    let effects = apply_part_change(part, &mut answers, &change)?;
    into_result(validate_part(part, &answers, completed))?;

    let answer = write_answer(pool, &context, part_key, answers, completed, existing).await?;
    debug!(
        registration_id = %registration_id,
        key = %change.key,
        reset = effects.reset.len(),
        copied = effects.copied.len(),
        "Field updated"
    );

    Ok(FieldUpdate {
        part: HydratedPart {
            key: part.key,
            title: part.title.clone(),
            completed: answer.completed,
            last_saved_at: Some(answer.last_saved_at.clone()),
            answers: hydrate_part(part, Some(&answer.answers)),
        },
        effects,
    })
}

async fn editable_context(
    pool: &DbPool,
    principal: &Principal,
    registration_id: &str,
) -> CoreResult<RegistrationContext> {
    let context = load_context(pool, principal, registration_id, Action::Write).await?;
    if context.registration.status.is_closed() {
        return Err(CoreError::validation(format!(
            "Registration is {} and can no longer be edited",
            context.registration.status.as_str()
        )));
    }
    Ok(context)
}

fn find_part(structure: &FormStructure, key: PartKey) -> CoreResult<&FormPart> {
    structure
        .part(key)
        .filter(|p| p.is_active)
        .ok_or_else(|| CoreError::not_found(format!("Part {} is not in this service's form", key.as_str())))
}

async fn write_answer(
    pool: &DbPool,
    context: &RegistrationContext,
    part_key: PartKey,
    answers: PartAnswers,
    completed: bool,
    existing: Option<StudentFormAnswer>,
) -> CoreResult<StudentFormAnswer> {
    let now = now_rfc3339();
    let answer = StudentFormAnswer {
        registration_id: context.registration.id.clone(),
        part_key,
        answers,
        completed,
        last_saved_at: now.clone(),
        created_at: existing.map(|a| a.created_at).unwrap_or(now),
    };
    queries::save_answer(pool, &answer.to_row()?).await?;
    mark_in_progress(pool, &context.registration).await?;
    Ok(answer)
}

async fn stored_answer(
    pool: &DbPool,
    registration_id: &str,
    part_key: PartKey,
) -> CoreResult<Option<StudentFormAnswer>> {
    match queries::get_answer(pool, registration_id, part_key.as_str()).await? {
        Some(row) => Ok(StudentFormAnswer::from_row(row)?),
        None => Ok(None),
    }
}

async fn saved_answers(pool: &DbPool, registration_id: &str) -> CoreResult<Vec<StudentFormAnswer>> {
    let mut saved = Vec::new();
    for row in queries::list_answers(pool, registration_id).await? {
        if let Some(answer) = StudentFormAnswer::from_row(row)? {
            saved.push(answer);
        }
    }
    Ok(saved)
}
