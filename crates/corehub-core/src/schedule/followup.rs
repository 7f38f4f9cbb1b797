//! Counselor follow-ups on leads.

use super::model::{FollowUp, FollowUpStatus, FollowUpStatusUpdate, NewFollowUp};
use super::{availability, claim, release, release_quietly, Availability, AvailabilityQuery, CalendarKind, TimeSlot};
use crate::access::{authorize, can, require_role, Action, Principal, Resource, Role};
use crate::account::tenant_member;
use crate::error::{CoreError, CoreResult};
use crate::lead::load_lead;
use crate::lead::model::Lead;
use crate::text::now_rfc3339;
use corehub_redis::queries::followups as queries;
use corehub_redis::queries::leads as lead_queries;
use corehub_redis::RedisPool as DbPool;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

fn resource(follow_up: &FollowUp) -> Resource<'_> {
    Resource::Calendar { owner_id: &follow_up.counselor_id, admin_id: &follow_up.admin_id }
}

/// Result of a status change; a reschedule also returns the new follow-up.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpUpdate {
    pub follow_up: FollowUp,
    pub rescheduled: Option<FollowUp>,
}

async fn book(
    pool: &DbPool,
    lead: &Lead,
    counselor_id: &str,
    slot: &TimeSlot,
    notes: Option<String>,
    ignore_event: Option<&str>,
) -> CoreResult<FollowUp> {
    let now = now_rfc3339();
    let follow_up = FollowUp {
        id: Uuid::new_v4().to_string(),
        counselor_id: counselor_id.to_string(),
        admin_id: lead.admin_id.clone(),
        lead_id: lead.id.clone(),
        date: slot.date_key(),
        start_time: slot.start_label(),
        duration_minutes: slot.duration_minutes,
        status: FollowUpStatus::Scheduled,
        stage_at_follow_up: lead.stage.as_str().to_string(),
        notes: notes.filter(|n| !n.trim().is_empty()),
        rescheduled_to: None,
        created_at: now.clone(),
        updated_at: now,
    };

    claim(pool, CalendarKind::FollowUp, &[counselor_id], slot, &follow_up.id, ignore_event).await?;
    if let Err(e) = queries::insert_follow_up(pool, &follow_up.to_row()).await {
        release_quietly(pool, CalendarKind::FollowUp, &[counselor_id], slot, &follow_up.id).await;
        return Err(e.into());
    }
    Ok(follow_up)
}

/// Schedule a follow-up with a lead. Admins book on the lead's counselor.
pub async fn create_follow_up(pool: &DbPool, principal: &Principal, new: NewFollowUp) -> CoreResult<FollowUp> {
    require_role(principal, &[Role::Counselor, Role::Admin])?;
    let slot = TimeSlot::parse(&new.date, &new.start_time, new.duration_minutes)?;
    let lead = load_lead(pool, principal, &new.lead_id, Action::Write).await?;
    if lead.stage.is_terminal() {
        return Err(CoreError::validation(format!(
            "Cannot schedule a follow-up for a {} lead",
            lead.stage.as_str()
        )));
    }

    let counselor_id = match principal.role {
        Role::Counselor => principal.user_id.clone(),
        _ => {
            let id = lead
                .assigned_counselor_id
                .clone()
                .ok_or_else(|| CoreError::validation("Lead has no assigned counselor"))?;
            tenant_member(pool, &lead.admin_id, &id, Role::Counselor).await?;
            id
        }
    };

    let follow_up = book(pool, &lead, &counselor_id, &slot, new.notes, None).await?;
    info!(
        follow_up_id = %follow_up.id,
        lead_id = %follow_up.lead_id,
        counselor_id = %follow_up.counselor_id,
        date = %follow_up.date,
        start_time = %follow_up.start_time,
        "Follow-up scheduled"
    );
    Ok(follow_up)
}

/// Follow-ups visible to the caller, optionally for one lead.
pub async fn list_follow_ups(
    pool: &DbPool,
    principal: &Principal,
    lead_id: Option<&str>,
) -> CoreResult<Vec<FollowUp>> {
    require_role(principal, &[Role::Counselor, Role::Admin, Role::SuperAdmin])?;
    let rows = match (principal.role, lead_id) {
        (_, Some(lead_id)) => {
            load_lead(pool, principal, lead_id, Action::Read).await?;
            queries::list_follow_ups_by_lead(pool, lead_id).await?
        }
        (Role::Counselor, None) => queries::list_follow_ups_by_counselor(pool, &principal.user_id).await?,
        (Role::Admin, None) => queries::list_follow_ups_by_admin(pool, &principal.user_id).await?,
        (_, None) => return Err(CoreError::validation("leadId is required")),
    };

    let mut follow_ups: Vec<FollowUp> = rows
        .into_iter()
        .map(FollowUp::from_row)
        .filter(|f| can(principal, Action::Read, &resource(f)))
        .collect();
    follow_ups.sort_by(|a, b| (&a.date, &a.start_time).cmp(&(&b.date, &b.start_time)));
    Ok(follow_ups)
}

/// Change a follow-up's status. `RESCHEDULED` books a new follow-up at the
/// given time and links the old one to it.
pub async fn update_follow_up_status(
    pool: &DbPool,
    principal: &Principal,
    id: &str,
    update: FollowUpStatusUpdate,
) -> CoreResult<FollowUpUpdate> {
    let mut follow_up = FollowUp::from_row(queries::get_follow_up(pool, id).await?);
    authorize(principal, Action::Write, &resource(&follow_up))?;
    if !follow_up.status.can_transition_to(&update.status) {
        return Err(CoreError::transition(follow_up.status.as_str(), update.status.as_str()));
    }

    let from = follow_up.status;
    let holds_slot = from == FollowUpStatus::Scheduled;
    let old_slot = follow_up.slot()?;

    let rescheduled = if update.status == FollowUpStatus::Rescheduled {
        let (Some(date), Some(start_time)) = (update.date.as_deref(), update.start_time.as_deref()) else {
            return Err(CoreError::validation("date and startTime are required to reschedule"));
        };
        let slot = TimeSlot::parse(
            date,
            start_time,
            update.duration_minutes.unwrap_or(follow_up.duration_minutes),
        )?;
        let lead = Lead::from_row(lead_queries::get_lead(pool, &follow_up.lead_id).await?);
        if lead.stage.is_terminal() {
            return Err(CoreError::validation(format!(
                "Cannot reschedule a follow-up for a {} lead",
                lead.stage.as_str()
            )));
        }
        let next = book(
            pool,
            &lead,
            &follow_up.counselor_id,
            &slot,
            update.notes.clone().or_else(|| follow_up.notes.clone()),
            Some(&follow_up.id),
        )
        .await?;
        follow_up.rescheduled_to = Some(next.id.clone());
        Some(next)
    } else {
        if let Some(notes) = update.notes.filter(|n| !n.trim().is_empty()) {
            follow_up.notes = Some(notes);
        }
        None
    };

    follow_up.status = update.status;
    follow_up.updated_at = now_rfc3339();
    queries::update_follow_up(pool, &follow_up.to_row()).await?;
    if holds_slot && update.status.releases_slot() {
        release(pool, CalendarKind::FollowUp, &[follow_up.counselor_id.as_str()], &old_slot, &follow_up.id)
            .await?;
    }

    info!(
        follow_up_id = %follow_up.id,
        from = from.as_str(),
        to = follow_up.status.as_str(),
        rescheduled_to = ?follow_up.rescheduled_to,
        "Follow-up status changed"
    );
    Ok(FollowUpUpdate { follow_up, rescheduled })
}

pub async fn check_follow_up_availability(
    pool: &DbPool,
    principal: &Principal,
    query: AvailabilityQuery,
) -> CoreResult<Availability> {
    require_role(principal, &[Role::Counselor, Role::Admin])?;
    let slot = TimeSlot::parse(&query.date, &query.start_time, query.duration_minutes)?;
    let counselor_id = match (principal.role, query.participant_id.as_deref()) {
        (Role::Counselor, None) => principal.user_id.clone(),
        (Role::Counselor, Some(id)) if principal.is(id) => principal.user_id.clone(),
        (Role::Admin, Some(id)) => tenant_member(pool, &principal.user_id, id, Role::Counselor).await?.id,
        (Role::Admin, None) => return Err(CoreError::validation("participantId is required")),
        _ => return Err(CoreError::forbidden("You do not have access to this resource")),
    };
    availability(pool, CalendarKind::FollowUp, &[counselor_id.as_str()], &slot, query.ignore_id.as_deref()).await
}
