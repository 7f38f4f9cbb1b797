//! Meetings between staff members of one tenant.

use super::model::{MeetingType, NewTeamMeet, TeamMeet, TeamMeetStatus};
use super::{availability, claim, release, release_quietly, Availability, AvailabilityQuery, CalendarKind, TimeSlot};
use crate::access::{authorize, can, require_role, Action, Principal, Resource, Role};
use crate::account::load_user;
use crate::account::model::User;
use crate::error::{require, CoreError, CoreResult};
use crate::notify::{send_logged, templates, Mailer};
use crate::text::now_rfc3339;
use corehub_meeting::{MeetingLink, MeetingProvider, MeetingRequest};
use corehub_redis::queries::teammeets as queries;
use corehub_redis::RedisPool as DbPool;
use tracing::{info, warn};
use uuid::Uuid;

const STAFF: &[Role] = &[Role::Admin, Role::Ops, Role::Counselor];

fn resource(meet: &TeamMeet) -> Resource<'_> {
    Resource::Meeting {
        requested_by: &meet.requested_by,
        requested_to: &meet.requested_to,
        admin_id: &meet.admin_id,
    }
}

/// Whether `user` can take part in meetings of `admin_id`'s tenant.
fn in_tenant(user: &User, admin_id: &str) -> bool {
    match user.role {
        Role::Admin => user.id == admin_id,
        Role::Ops | Role::Counselor => user.admin_id.as_deref() == Some(admin_id),
        _ => false,
    }
}

async fn load(pool: &DbPool, principal: &Principal, id: &str, action: Action) -> CoreResult<TeamMeet> {
    let meet = TeamMeet::from_row(queries::get_team_meet(pool, id).await?);
    authorize(principal, action, &resource(&meet))?;
    Ok(meet)
}

async fn provision(
    meetings: Option<&dyn MeetingProvider>,
    new: &NewTeamMeet,
    slot: &TimeSlot,
    requester: &User,
    invitee: &User,
) -> CoreResult<MeetingLink> {
    let provider = meetings
        .ok_or_else(|| CoreError::Config("Online meetings need Zoho credentials".to_string()))?;
    let request = MeetingRequest {
        topic: new.subject.trim().to_string(),
        agenda: new.description.clone(),
        start: slot.starts_at(),
        duration_minutes: slot.duration_minutes,
        participants: vec![requester.email.clone(), invitee.email.clone()],
    };
    Ok(provider.create_meeting(&request).await?)
}

/// Best-effort removal of the remote meeting.
async fn drop_remote(meetings: Option<&dyn MeetingProvider>, meet: &TeamMeet) {
    let (Some(provider), Some(key)) = (meetings, meet.meeting_key.as_deref()) else {
        return;
    };
    if let Err(e) = provider.delete_meeting(key).await {
        warn!(team_meet_id = %meet.id, meeting_key = key, error = %e, "Failed to delete remote meeting");
    }
}

/// Ask another staff member for a meeting. Both calendars are claimed
/// before anything is stored.
pub async fn request_team_meet(
    pool: &DbPool,
    mailer: &dyn Mailer,
    meetings: Option<&dyn MeetingProvider>,
    principal: &Principal,
    new: NewTeamMeet,
) -> CoreResult<TeamMeet> {
    require_role(principal, STAFF)?;
    require(&new.subject, "Subject")?;
    require(&new.requested_to, "Invitee")?;
    if principal.is(&new.requested_to) {
        return Err(CoreError::validation("You cannot request a meeting with yourself"));
    }
    if new.meeting_type == MeetingType::Offline && new.location.as_deref().is_none_or(|l| l.trim().is_empty()) {
        return Err(CoreError::validation("Location is required for offline meetings"));
    }
    let slot = TimeSlot::parse(&new.date, &new.start_time, new.duration_minutes)?;

    let admin_id = principal
        .tenant()
        .ok_or_else(|| CoreError::forbidden("You do not belong to a tenant"))?
        .to_string();
    let requester = load_user(pool, &principal.user_id).await?;
    let invitee = load_user(pool, &new.requested_to).await?;
    if !in_tenant(&invitee, &admin_id) || !invitee.is_active {
        return Err(CoreError::validation(format!(
            "User {} cannot be invited to meetings of this tenant",
            invitee.id
        )));
    }

    let id = Uuid::new_v4().to_string();
    let participants = [requester.id.as_str(), invitee.id.as_str()];
    claim(pool, CalendarKind::TeamMeet, &participants, &slot, &id, None).await?;

    let link = match new.meeting_type {
        MeetingType::Online => match provision(meetings, &new, &slot, &requester, &invitee).await {
            Ok(link) => Some(link),
            Err(e) => {
                release_quietly(pool, CalendarKind::TeamMeet, &participants, &slot, &id).await;
                return Err(e);
            }
        },
        MeetingType::Offline => None,
    };

    let now = now_rfc3339();
    let meet = TeamMeet {
        id,
        admin_id,
        subject: new.subject.trim().to_string(),
        description: new.description,
        date: slot.date_key(),
        start_time: slot.start_label(),
        duration_minutes: slot.duration_minutes,
        meeting_type: new.meeting_type,
        location: new.location,
        requested_by: requester.id.clone(),
        requested_to: invitee.id.clone(),
        status: TeamMeetStatus::PendingConfirmation,
        rejection_message: None,
        meeting_key: link.as_ref().map(|l| l.meeting_key.clone()),
        meeting_url: link.map(|l| l.join_url),
        created_at: now.clone(),
        updated_at: now,
    };
    if let Err(e) = queries::insert_team_meet(pool, &meet.to_row()).await {
        release_quietly(pool, CalendarKind::TeamMeet, &participants, &slot, &meet.id).await;
        drop_remote(meetings, &meet).await;
        return Err(e.into());
    }

    info!(
        team_meet_id = %meet.id,
        requested_by = %meet.requested_by,
        requested_to = %meet.requested_to,
        date = %meet.date,
        start_time = %meet.start_time,
        "TeamMeet requested"
    );

    let email = templates::meeting_invitation(
        &invitee.email,
        &templates::MeetingInvitation {
            invitee_name: &invitee.name,
            requester_name: &requester.name,
            subject: &meet.subject,
            description: meet.description.as_deref(),
            date: &meet.date,
            start_time: &meet.start_time,
            duration_minutes: meet.duration_minutes,
            join_url: meet.meeting_url.as_deref(),
            location: meet.location.as_deref(),
        },
    )?;
    send_logged(mailer, email).await;
    Ok(meet)
}

pub async fn get_team_meet(pool: &DbPool, principal: &Principal, id: &str) -> CoreResult<TeamMeet> {
    load(pool, principal, id, Action::Read).await
}

/// Meetings the caller takes part in; admins see their whole tenant.
pub async fn list_team_meets(pool: &DbPool, principal: &Principal) -> CoreResult<Vec<TeamMeet>> {
    require_role(principal, STAFF)?;
    let rows = match principal.role {
        Role::Admin => queries::list_team_meets_by_admin(pool, &principal.user_id).await?,
        _ => queries::list_team_meets_for_user(pool, &principal.user_id).await?,
    };
    let mut meets: Vec<TeamMeet> = rows
        .into_iter()
        .map(TeamMeet::from_row)
        .filter(|m| can(principal, Action::Read, &resource(m)))
        .collect();
    meets.sort_by(|a, b| (&a.date, &a.start_time).cmp(&(&b.date, &b.start_time)));
    Ok(meets)
}

async fn transition(
    pool: &DbPool,
    meet: &mut TeamMeet,
    target: TeamMeetStatus,
) -> CoreResult<()> {
    if !meet.status.can_transition_to(&target) {
        return Err(CoreError::transition(meet.status.as_str(), target.as_str()));
    }
    let from = meet.status;
    meet.status = target;
    meet.updated_at = now_rfc3339();
    queries::update_team_meet(pool, &meet.to_row()).await?;
    info!(
        team_meet_id = %meet.id,
        from = from.as_str(),
        to = target.as_str(),
        "TeamMeet status changed"
    );
    Ok(())
}

async fn respond(
    mailer: &dyn Mailer,
    to: &User,
    from: &User,
    meet: &TeamMeet,
    outcome: &str,
    message: Option<&str>,
) -> CoreResult<()> {
    let email = templates::meeting_response(
        &to.email,
        &templates::MeetingResponse {
            requester_name: &to.name,
            responder_name: &from.name,
            outcome,
            subject: &meet.subject,
            date: &meet.date,
            start_time: &meet.start_time,
            message,
        },
    )?;
    send_logged(mailer, email).await;
    Ok(())
}

fn require_invitee(principal: &Principal, meet: &TeamMeet) -> CoreResult<()> {
    if principal.is(&meet.requested_to) {
        Ok(())
    } else {
        Err(CoreError::forbidden("Only the invited participant can respond to this meeting"))
    }
}

pub async fn accept_team_meet(
    pool: &DbPool,
    mailer: &dyn Mailer,
    principal: &Principal,
    id: &str,
) -> CoreResult<TeamMeet> {
    let mut meet = load(pool, principal, id, Action::Write).await?;
    require_invitee(principal, &meet)?;
    transition(pool, &mut meet, TeamMeetStatus::Confirmed).await?;

    let requester = load_user(pool, &meet.requested_by).await?;
    let invitee = load_user(pool, &meet.requested_to).await?;
    respond(mailer, &requester, &invitee, &meet, "accepted", None).await?;
    Ok(meet)
}

/// Decline with a message. Frees both calendars and the remote meeting.
pub async fn reject_team_meet(
    pool: &DbPool,
    mailer: &dyn Mailer,
    meetings: Option<&dyn MeetingProvider>,
    principal: &Principal,
    id: &str,
    message: &str,
) -> CoreResult<TeamMeet> {
    require(message, "Rejection message")?;
    let mut meet = load(pool, principal, id, Action::Write).await?;
    require_invitee(principal, &meet)?;
    meet.rejection_message = Some(message.trim().to_string());
    transition(pool, &mut meet, TeamMeetStatus::Rejected).await?;

    let slot = meet.slot()?;
    release(pool, CalendarKind::TeamMeet, &meet.participants(), &slot, &meet.id).await?;
    drop_remote(meetings, &meet).await;

    let requester = load_user(pool, &meet.requested_by).await?;
    let invitee = load_user(pool, &meet.requested_to).await?;
    respond(mailer, &requester, &invitee, &meet, "declined", meet.rejection_message.as_deref()).await?;
    Ok(meet)
}

/// Either participant may cancel a pending or confirmed meeting.
pub async fn cancel_team_meet(
    pool: &DbPool,
    mailer: &dyn Mailer,
    meetings: Option<&dyn MeetingProvider>,
    principal: &Principal,
    id: &str,
) -> CoreResult<TeamMeet> {
    let mut meet = load(pool, principal, id, Action::Write).await?;
    if !meet.participants().iter().any(|p| principal.is(p)) {
        return Err(CoreError::forbidden("Only participants can cancel this meeting"));
    }
    transition(pool, &mut meet, TeamMeetStatus::Cancelled).await?;

    let slot = meet.slot()?;
    release(pool, CalendarKind::TeamMeet, &meet.participants(), &slot, &meet.id).await?;
    drop_remote(meetings, &meet).await;

    let other_id = if principal.is(&meet.requested_by) { &meet.requested_to } else { &meet.requested_by };
    let other = load_user(pool, other_id).await?;
    let canceller = load_user(pool, &principal.user_id).await?;
    respond(mailer, &other, &canceller, &meet, "cancelled", None).await?;
    Ok(meet)
}

pub async fn complete_team_meet(pool: &DbPool, principal: &Principal, id: &str) -> CoreResult<TeamMeet> {
    let mut meet = load(pool, principal, id, Action::Write).await?;
    transition(pool, &mut meet, TeamMeetStatus::Completed).await?;
    Ok(meet)
}

/// Check the caller's calendar and, when given, the other participant's.
pub async fn check_team_meet_availability(
    pool: &DbPool,
    principal: &Principal,
    query: AvailabilityQuery,
) -> CoreResult<Availability> {
    require_role(principal, STAFF)?;
    let slot = TimeSlot::parse(&query.date, &query.start_time, query.duration_minutes)?;
    let mut participants = vec![principal.user_id.as_str()];
    if let Some(other) = query.participant_id.as_deref() {
        let admin_id = principal
            .tenant()
            .ok_or_else(|| CoreError::forbidden("You do not belong to a tenant"))?;
        let user = load_user(pool, other).await?;
        if !in_tenant(&user, admin_id) {
            return Err(CoreError::forbidden("You do not have access to this resource"));
        }
        participants.push(other);
    }
    availability(pool, CalendarKind::TeamMeet, &participants, &slot, query.ignore_id.as_deref()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, role: Role, admin_id: Option<&str>) -> User {
        User {
            id: id.into(),
            role,
            name: id.into(),
            email: format!("{}@example.com", id),
            phone: None,
            admin_id: admin_id.map(Into::into),
            super_admin_id: None,
            company_name: None,
            enquiry_slug: None,
            is_active: true,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_tenant_membership() {
        assert!(in_tenant(&user("adm", Role::Admin, None), "adm"));
        assert!(!in_tenant(&user("adm2", Role::Admin, None), "adm"));
        assert!(in_tenant(&user("ops", Role::Ops, Some("adm")), "adm"));
        assert!(!in_tenant(&user("stu", Role::Student, Some("adm")), "adm"));
        assert!(!in_tenant(&user("cns", Role::Counselor, Some("other")), "adm"));
    }

    #[test]
    fn test_only_invitee_responds() {
        let meet = TeamMeet {
            id: "m1".into(),
            admin_id: "adm".into(),
            subject: "Sync".into(),
            description: None,
            date: "2026-03-02".into(),
            start_time: "10:00".into(),
            duration_minutes: 30,
            meeting_type: MeetingType::Offline,
            location: Some("Room 1".into()),
            requested_by: "ops".into(),
            requested_to: "cns".into(),
            status: TeamMeetStatus::PendingConfirmation,
            rejection_message: None,
            meeting_key: None,
            meeting_url: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let invitee = Principal::new("cns", Role::Counselor, Some("adm".into()));
        let requester = Principal::new("ops", Role::Ops, Some("adm".into()));
        assert!(require_invitee(&invitee, &meet).is_ok());
        assert!(matches!(require_invitee(&requester, &meet), Err(CoreError::Forbidden(_))));
    }
}
