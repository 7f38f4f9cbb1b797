//! Student service registrations and OPS ownership.

pub mod answers;
pub mod model;

use crate::access::{authorize, can, require_role, Action, Principal, Resource, Role};
use crate::account::model::Student;
use crate::account::{find_student_for_user, tenant_member};
use crate::error::{CoreError, CoreResult};
use crate::service::{get_service, Service};
use crate::text::now_rfc3339;
use corehub_redis::queries::registrations::{self as queries, RegistrationRow};
use corehub_redis::queries::students as student_queries;
use corehub_redis::RedisPool as DbPool;
use model::{NewRegistration, OpsAssignment, Registration, RegistrationStatus};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

/// A registration with the student it belongs to; the unit access is
/// decided on.
#[derive(Debug, Clone)]
pub struct RegistrationContext {
    pub registration: Registration,
    pub student: Student,
}

impl RegistrationContext {
    pub fn resource(&self) -> Resource<'_> {
        Resource::Registration {
            admin_id: &self.registration.admin_id,
            active_ops_id: self.registration.active_ops_id.as_deref(),
            counselor_id: self.student.counselor_id.as_deref(),
            student_user_id: &self.student.user_id,
        }
    }
}

/// Registration details returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDetail {
    #[serde(flatten)]
    pub registration: Registration,
    pub student: Student,
    pub service: Service,
}

/// Load a registration and require `action` on it.
pub async fn load_context(
    pool: &DbPool,
    principal: &Principal,
    registration_id: &str,
    action: Action,
) -> CoreResult<RegistrationContext> {
    let registration = Registration::from_row(queries::get_registration(pool, registration_id).await?);
    let student = Student::from_row(student_queries::get_student(pool, &registration.student_id).await?);
    let context = RegistrationContext { registration, student };
    authorize(principal, action, &context.resource())?;
    Ok(context)
}

/// Register a student for a service.
pub async fn create_registration(
    pool: &DbPool,
    principal: &Principal,
    new: NewRegistration,
) -> CoreResult<Registration> {
    require_role(principal, &[Role::Admin, Role::SuperAdmin])?;
    let student = Student::from_row(student_queries::get_student(pool, &new.student_id).await?);
    authorize(principal, Action::Write, &Resource::Tenant { admin_id: &student.admin_id })?;

    let service = get_service(pool, &new.service_id).await?;
    if !service.is_active {
        return Err(CoreError::validation(format!("Service {} is not active", service.name)));
    }
    check_ops_pair(pool, &student.admin_id, new.primary_ops_id.as_deref(), new.secondary_ops_id.as_deref())
        .await?;

    let now = now_rfc3339();
    let registration = Registration {
        id: Uuid::new_v4().to_string(),
        student_id: student.id,
        service_id: service.id,
        admin_id: student.admin_id,
        active_ops_id: new.primary_ops_id.clone(),
        primary_ops_id: new.primary_ops_id,
        secondary_ops_id: new.secondary_ops_id,
        status: RegistrationStatus::Registered,
        registered_at: now.clone(),
        updated_at: now,
    };
    queries::insert_registration(pool, &registration.to_row()).await?;

    info!(
        registration_id = %registration.id,
        student_id = %registration.student_id,
        service_id = %registration.service_id,
        "Registration created"
    );
    Ok(registration)
}

pub async fn get_registration(
    pool: &DbPool,
    principal: &Principal,
    registration_id: &str,
) -> CoreResult<RegistrationDetail> {
    let context = load_context(pool, principal, registration_id, Action::Read).await?;
    let service = get_service(pool, &context.registration.service_id).await?;
    Ok(RegistrationDetail {
        registration: context.registration,
        student: context.student,
        service,
    })
}

/// Registrations visible to the caller, newest first.
pub async fn list_registrations(pool: &DbPool, principal: &Principal) -> CoreResult<Vec<Registration>> {
    let rows: Vec<RegistrationRow> = match principal.role {
        Role::SuperAdmin => queries::list_registrations(pool).await?,
        Role::Admin => queries::list_registrations_by_admin(pool, &principal.user_id).await?,
        Role::Ops => queries::list_registrations_by_active_ops(pool, &principal.user_id).await?,
        Role::Counselor => {
            let mut rows = Vec::new();
            for student in student_queries::list_students_by_counselor(pool, &principal.user_id).await? {
                rows.extend(queries::list_registrations_by_student(pool, &student.id).await?);
            }
            rows
        }
        Role::Student => {
            let student = find_student_for_user(pool, &principal.user_id).await?;
            queries::list_registrations_by_student(pool, &student.id).await?
        }
    };

    let mut students: HashMap<String, Student> = HashMap::new();
    let mut visible = Vec::with_capacity(rows.len());
    for row in rows {
        let registration = Registration::from_row(row);
        if !students.contains_key(&registration.student_id) {
            let student = Student::from_row(student_queries::get_student(pool, &registration.student_id).await?);
            students.insert(student.id.clone(), student);
        }
        let Some(student) = students.get(&registration.student_id) else { continue };
        let context = RegistrationContext { registration, student: student.clone() };
        if can(principal, Action::Read, &context.resource()) {
            visible.push(context.registration);
        }
    }

    visible.sort_by(|a, b| b.registered_at.cmp(&a.registered_at));
    Ok(visible)
}

/// Set the primary and secondary OPS of a registration.
///
/// The active OPS is kept when still assigned, otherwise it falls back to the
/// new primary.
pub async fn assign_ops(
    pool: &DbPool,
    principal: &Principal,
    registration_id: &str,
    assignment: OpsAssignment,
) -> CoreResult<Registration> {
    require_role(principal, &[Role::Admin, Role::SuperAdmin])?;
    let context = load_context(pool, principal, registration_id, Action::Assign).await?;
    let previous = context.registration;
    check_ops_pair(
        pool,
        &previous.admin_id,
        assignment.primary_ops_id.as_deref(),
        assignment.secondary_ops_id.as_deref(),
    )
    .await?;

    let mut updated = previous.clone();
    updated.primary_ops_id = assignment.primary_ops_id;
    updated.secondary_ops_id = assignment.secondary_ops_id;
    let still_assigned = previous
        .active_ops_id
        .as_deref()
        .is_some_and(|active| updated.is_assigned_ops(active));
    if !still_assigned {
        updated.active_ops_id = updated.primary_ops_id.clone();
    }

    save(pool, &previous, &mut updated).await?;
    info!(
        registration_id = %registration_id,
        active_ops_id = ?updated.active_ops_id,
        "Registration OPS assigned"
    );
    Ok(updated)
}

/// Hand the registration to the other assigned OPS user.
pub async fn switch_active_ops(
    pool: &DbPool,
    principal: &Principal,
    registration_id: &str,
    active_ops_id: &str,
) -> CoreResult<Registration> {
    let context = load_context(pool, principal, registration_id, Action::Assign).await?;
    let previous = context.registration;
    if !previous.is_assigned_ops(active_ops_id) {
        return Err(CoreError::validation(format!(
            "User {} is not an assigned OPS of this registration",
            active_ops_id
        )));
    }

    let mut updated = previous.clone();
    updated.active_ops_id = Some(active_ops_id.to_string());
    save(pool, &previous, &mut updated).await?;

    info!(registration_id = %registration_id, active_ops_id = %active_ops_id, "Active OPS switched");
    Ok(updated)
}

pub async fn update_status(
    pool: &DbPool,
    principal: &Principal,
    registration_id: &str,
    status: RegistrationStatus,
) -> CoreResult<Registration> {
    require_role(principal, &[Role::Admin, Role::SuperAdmin, Role::Ops])?;
    let context = load_context(pool, principal, registration_id, Action::Write).await?;
    let previous = context.registration;
    if !previous.status.can_transition_to(&status) {
        return Err(CoreError::transition(previous.status.as_str(), status.as_str()));
    }

    let mut updated = previous.clone();
    updated.status = status;
    save(pool, &previous, &mut updated).await?;

    info!(registration_id = %registration_id, status = status.as_str(), "Registration status updated");
    Ok(updated)
}

/// First save of answers starts the registration.
pub(crate) async fn mark_in_progress(pool: &DbPool, registration: &Registration) -> CoreResult<()> {
    if registration.status != RegistrationStatus::Registered {
        return Ok(());
    }
    let mut updated = registration.clone();
    updated.status = RegistrationStatus::InProgress;
    save(pool, registration, &mut updated).await?;
    info!(registration_id = %registration.id, "Registration moved to IN_PROGRESS");
    Ok(())
}

async fn save(pool: &DbPool, previous: &Registration, updated: &mut Registration) -> CoreResult<()> {
    updated.updated_at = now_rfc3339();
    queries::update_registration(pool, &previous.to_row(), &updated.to_row()).await?;
    Ok(())
}

async fn check_ops_pair(
    pool: &DbPool,
    admin_id: &str,
    primary: Option<&str>,
    secondary: Option<&str>,
) -> CoreResult<()> {
    if secondary.is_some() && primary.is_none() {
        return Err(CoreError::validation("A secondary OPS needs a primary OPS"));
    }
    if primary.is_some() && primary == secondary {
        return Err(CoreError::validation("Primary and secondary OPS must differ"));
    }
    for ops_id in primary.into_iter().chain(secondary) {
        tenant_member(pool, admin_id, ops_id, Role::Ops).await?;
    }
    Ok(())
}
