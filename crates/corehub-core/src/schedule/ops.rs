//! OPS work schedules.

use super::model::{NewOpsSchedule, OpsSchedule, ScheduleStatus};
use super::{availability, claim, release, Availability, AvailabilityQuery, CalendarKind, TimeSlot};
use crate::access::{authorize, can, require_role, Action, Principal, Resource, Role};
use crate::account::model::Student;
use crate::account::{student_resource, tenant_member};
use crate::error::{require, CoreError, CoreResult};
use crate::registration::load_context;
use crate::text::now_rfc3339;
use corehub_redis::queries::schedules as queries;
use corehub_redis::queries::students as student_queries;
use corehub_redis::RedisPool as DbPool;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

fn resource(schedule: &OpsSchedule) -> Resource<'_> {
    Resource::Calendar { owner_id: &schedule.ops_id, admin_id: &schedule.admin_id }
}

/// Optional filters for [`list_schedules`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleFilter {
    pub date: Option<String>,
    pub ops_id: Option<String>,
}

/// Resolve whose calendar the caller is acting on: their own as OPS, or an
/// OPS member of their tenant as admin.
async fn target_ops(
    pool: &DbPool,
    principal: &Principal,
    ops_id: Option<&str>,
) -> CoreResult<(String, String)> {
    match principal.role {
        Role::Ops => {
            if ops_id.is_some_and(|id| !principal.is(id)) {
                return Err(CoreError::forbidden("OPS users can only manage their own schedule"));
            }
            let admin_id = principal
                .tenant()
                .ok_or_else(|| CoreError::forbidden("You do not belong to a tenant"))?;
            Ok((principal.user_id.clone(), admin_id.to_string()))
        }
        Role::Admin => {
            let ops_id = ops_id.ok_or_else(|| CoreError::validation("opsId is required"))?;
            let ops = tenant_member(pool, &principal.user_id, ops_id, Role::Ops).await?;
            Ok((ops.id, principal.user_id.clone()))
        }
        _ => Err(CoreError::forbidden("You do not have access to this resource")),
    }
}

pub async fn create_schedule(
    pool: &DbPool,
    principal: &Principal,
    new: NewOpsSchedule,
) -> CoreResult<OpsSchedule> {
    require_role(principal, &[Role::Ops, Role::Admin])?;
    require(&new.title, "Title")?;
    let slot = TimeSlot::parse(&new.date, &new.start_time, new.duration_minutes)?;
    let (ops_id, admin_id) = target_ops(pool, principal, new.ops_id.as_deref()).await?;

    let student_id = match (&new.registration_id, &new.student_id) {
        (Some(registration_id), student_id) => {
            let context = load_context(pool, principal, registration_id, Action::Write).await?;
            if context.registration.admin_id != admin_id {
                return Err(CoreError::validation("Registration belongs to another tenant"));
            }
            if student_id.as_ref().is_some_and(|s| *s != context.student.id) {
                return Err(CoreError::validation("Student does not match the registration"));
            }
            Some(context.student.id)
        }
        (None, Some(student_id)) => {
            let student = Student::from_row(student_queries::get_student(pool, student_id).await?);
            authorize(principal, Action::Read, &student_resource(&student))?;
            if student.admin_id != admin_id {
                return Err(CoreError::validation("Student belongs to another tenant"));
            }
            Some(student.id)
        }
        (None, None) => None,
    };

    let now = now_rfc3339();
    let schedule = OpsSchedule {
        id: Uuid::new_v4().to_string(),
        ops_id,
        admin_id,
        student_id,
        registration_id: new.registration_id,
        title: new.title.trim().to_string(),
        description: new.description,
        date: slot.date_key(),
        start_time: slot.start_label(),
        duration_minutes: slot.duration_minutes,
        status: ScheduleStatus::Scheduled,
        created_at: now.clone(),
        updated_at: now,
    };

    claim(pool, CalendarKind::Ops, &[schedule.ops_id.as_str()], &slot, &schedule.id, None).await?;
    if let Err(e) = queries::insert_schedule(pool, &schedule.to_row()).await {
        super::release_quietly(pool, CalendarKind::Ops, &[schedule.ops_id.as_str()], &slot, &schedule.id)
            .await;
        return Err(e.into());
    }

    info!(
        schedule_id = %schedule.id,
        ops_id = %schedule.ops_id,
        date = %schedule.date,
        start_time = %schedule.start_time,
        "OPS schedule created"
    );
    Ok(schedule)
}

/// Schedules visible to the caller, ordered by time.
pub async fn list_schedules(
    pool: &DbPool,
    principal: &Principal,
    filter: ScheduleFilter,
) -> CoreResult<Vec<OpsSchedule>> {
    require_role(principal, &[Role::Ops, Role::Admin, Role::SuperAdmin])?;
    let rows = match (principal.role, filter.ops_id.as_deref()) {
        (Role::Ops, _) => queries::list_schedules_by_ops(pool, &principal.user_id).await?,
        (Role::Admin, None) => queries::list_schedules_by_admin(pool, &principal.user_id).await?,
        (_, Some(ops_id)) => queries::list_schedules_by_ops(pool, ops_id).await?,
        (_, None) => return Err(CoreError::validation("opsId is required")),
    };

    let mut schedules: Vec<OpsSchedule> = rows
        .into_iter()
        .map(OpsSchedule::from_row)
        .filter(|s| filter.date.as_ref().is_none_or(|d| *d == s.date))
        .filter(|s| filter.ops_id.as_ref().is_none_or(|o| *o == s.ops_id))
        .filter(|s| can(principal, Action::Read, &resource(s)))
        .collect();
    schedules.sort_by(|a, b| (&a.date, &a.start_time).cmp(&(&b.date, &b.start_time)));
    Ok(schedules)
}

pub async fn update_schedule_status(
    pool: &DbPool,
    principal: &Principal,
    id: &str,
    status: ScheduleStatus,
) -> CoreResult<OpsSchedule> {
    let mut schedule = OpsSchedule::from_row(queries::get_schedule(pool, id).await?);
    authorize(principal, Action::Write, &resource(&schedule))?;
    if !schedule.status.can_transition_to(&status) {
        return Err(CoreError::transition(schedule.status.as_str(), status.as_str()));
    }

    let from = schedule.status;
    schedule.status = status;
    schedule.updated_at = now_rfc3339();
    queries::update_schedule(pool, &schedule.to_row()).await?;
    if status.releases_slot() {
        release(pool, CalendarKind::Ops, &[schedule.ops_id.as_str()], &schedule.slot()?, &schedule.id).await?;
    }

    info!(
        schedule_id = %schedule.id,
        from = from.as_str(),
        to = status.as_str(),
        "OPS schedule status changed"
    );
    Ok(schedule)
}

pub async fn check_schedule_availability(
    pool: &DbPool,
    principal: &Principal,
    query: AvailabilityQuery,
) -> CoreResult<Availability> {
    require_role(principal, &[Role::Ops, Role::Admin])?;
    let slot = TimeSlot::parse(&query.date, &query.start_time, query.duration_minutes)?;
    let (ops_id, _) = target_ops(pool, principal, query.participant_id.as_deref()).await?;
    availability(pool, CalendarKind::Ops, &[ops_id.as_str()], &slot, query.ignore_id.as_deref()).await
}
