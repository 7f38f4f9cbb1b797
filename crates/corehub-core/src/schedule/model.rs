//! Scheduling types: TeamMeet, OPS schedules and counselor follow-ups.

use super::TimeSlot;
use crate::error::CoreResult;
use corehub_redis::queries::followups::FollowUpRow;
use corehub_redis::queries::schedules::OpsScheduleRow;
use corehub_redis::queries::teammeets::TeamMeetRow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeetingType {
    Online,
    Offline,
}

impl MeetingType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ONLINE" => Some(Self::Online),
            "OFFLINE" => Some(Self::Offline),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "ONLINE",
            Self::Offline => "OFFLINE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeamMeetStatus {
    PendingConfirmation,
    Confirmed,
    Rejected,
    Cancelled,
    Completed,
}

impl TeamMeetStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING_CONFIRMATION" => Some(Self::PendingConfirmation),
            "CONFIRMED" => Some(Self::Confirmed),
            "REJECTED" => Some(Self::Rejected),
            "CANCELLED" => Some(Self::Cancelled),
            "COMPLETED" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingConfirmation => "PENDING_CONFIRMATION",
            Self::Confirmed => "CONFIRMED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
            Self::Completed => "COMPLETED",
        }
    }

    pub fn can_transition_to(&self, target: &Self) -> bool {
        matches!(
            (self, target),
            (Self::PendingConfirmation, Self::Confirmed)
                | (Self::PendingConfirmation, Self::Rejected)
                | (Self::PendingConfirmation, Self::Cancelled)
                | (Self::Confirmed, Self::Cancelled)
                | (Self::Confirmed, Self::Completed)
        )
    }

    /// Whether the meeting still holds its calendar slot.
    pub fn holds_slot(&self) -> bool {
        matches!(self, Self::PendingConfirmation | Self::Confirmed | Self::Completed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMeet {
    pub id: String,
    pub admin_id: String,
    pub subject: String,
    pub description: Option<String>,
    pub date: String,
    pub start_time: String,
    pub duration_minutes: u32,
    pub meeting_type: MeetingType,
    pub location: Option<String>,
    pub requested_by: String,
    pub requested_to: String,
    pub status: TeamMeetStatus,
    pub rejection_message: Option<String>,
    pub meeting_key: Option<String>,
    pub meeting_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TeamMeet {
    pub fn from_row(row: TeamMeetRow) -> Self {
        Self {
            meeting_type: MeetingType::parse(&row.meeting_type).unwrap_or(MeetingType::Offline),
            status: TeamMeetStatus::parse(&row.status).unwrap_or(TeamMeetStatus::PendingConfirmation),
            id: row.id,
            admin_id: row.admin_id,
            subject: row.subject,
            description: row.description,
            date: row.date,
            start_time: row.start_time,
            duration_minutes: row.duration_minutes,
            location: row.location,
            requested_by: row.requested_by,
            requested_to: row.requested_to,
            rejection_message: row.rejection_message,
            meeting_key: row.meeting_key,
            meeting_url: row.meeting_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    pub fn to_row(&self) -> TeamMeetRow {
        TeamMeetRow {
            id: self.id.clone(),
            admin_id: self.admin_id.clone(),
            subject: self.subject.clone(),
            description: self.description.clone(),
            date: self.date.clone(),
            start_time: self.start_time.clone(),
            duration_minutes: self.duration_minutes,
            meeting_type: self.meeting_type.as_str().to_string(),
            location: self.location.clone(),
            requested_by: self.requested_by.clone(),
            requested_to: self.requested_to.clone(),
            status: self.status.as_str().to_string(),
            rejection_message: self.rejection_message.clone(),
            meeting_key: self.meeting_key.clone(),
            meeting_url: self.meeting_url.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }

    pub fn slot(&self) -> CoreResult<TimeSlot> {
        TimeSlot::parse(&self.date, &self.start_time, self.duration_minutes)
    }

    pub fn participants(&self) -> [&str; 2] {
        [&self.requested_by, &self.requested_to]
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTeamMeet {
    pub subject: String,
    #[serde(default)]
    pub description: Option<String>,
    pub date: String,
    pub start_time: String,
    pub duration_minutes: u32,
    pub meeting_type: MeetingType,
    #[serde(default)]
    pub location: Option<String>,
    pub requested_to: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    Scheduled,
    Completed,
    Missed,
    Cancelled,
}

impl ScheduleStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SCHEDULED" => Some(Self::Scheduled),
            "COMPLETED" => Some(Self::Completed),
            "MISSED" => Some(Self::Missed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Completed => "COMPLETED",
            Self::Missed => "MISSED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn can_transition_to(&self, target: &Self) -> bool {
        *self == Self::Scheduled && *target != Self::Scheduled
    }

    pub fn releases_slot(&self) -> bool {
        matches!(self, Self::Missed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpsSchedule {
    pub id: String,
    pub ops_id: String,
    pub admin_id: String,
    pub student_id: Option<String>,
    pub registration_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub date: String,
    pub start_time: String,
    pub duration_minutes: u32,
    pub status: ScheduleStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl OpsSchedule {
    pub fn from_row(row: OpsScheduleRow) -> Self {
        Self {
            status: ScheduleStatus::parse(&row.status).unwrap_or(ScheduleStatus::Scheduled),
            id: row.id,
            ops_id: row.ops_id,
            admin_id: row.admin_id,
            student_id: row.student_id,
            registration_id: row.registration_id,
            title: row.title,
            description: row.description,
            date: row.date,
            start_time: row.start_time,
            duration_minutes: row.duration_minutes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    pub fn to_row(&self) -> OpsScheduleRow {
        OpsScheduleRow {
            id: self.id.clone(),
            ops_id: self.ops_id.clone(),
            admin_id: self.admin_id.clone(),
            student_id: self.student_id.clone(),
            registration_id: self.registration_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            date: self.date.clone(),
            start_time: self.start_time.clone(),
            duration_minutes: self.duration_minutes,
            status: self.status.as_str().to_string(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }

    pub fn slot(&self) -> CoreResult<TimeSlot> {
        TimeSlot::parse(&self.date, &self.start_time, self.duration_minutes)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOpsSchedule {
    /// Defaults to the calling OPS user; admins must name one.
    #[serde(default)]
    pub ops_id: Option<String>,
    #[serde(default)]
    pub registration_id: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub date: String,
    pub start_time: String,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FollowUpStatus {
    Scheduled,
    Completed,
    Missed,
    Rescheduled,
    Cancelled,
}

impl FollowUpStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SCHEDULED" => Some(Self::Scheduled),
            "COMPLETED" => Some(Self::Completed),
            "MISSED" => Some(Self::Missed),
            "RESCHEDULED" => Some(Self::Rescheduled),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Completed => "COMPLETED",
            Self::Missed => "MISSED",
            Self::Rescheduled => "RESCHEDULED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// A missed follow-up can still be rescheduled.
    pub fn can_transition_to(&self, target: &Self) -> bool {
        match self {
            Self::Scheduled => *target != Self::Scheduled,
            Self::Missed => *target == Self::Rescheduled,
            _ => false,
        }
    }

    pub fn releases_slot(&self) -> bool {
        matches!(self, Self::Missed | Self::Cancelled | Self::Rescheduled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUp {
    pub id: String,
    pub counselor_id: String,
    pub admin_id: String,
    pub lead_id: String,
    pub date: String,
    pub start_time: String,
    pub duration_minutes: u32,
    pub status: FollowUpStatus,
    pub stage_at_follow_up: String,
    pub notes: Option<String>,
    pub rescheduled_to: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FollowUp {
    pub fn from_row(row: FollowUpRow) -> Self {
        Self {
            status: FollowUpStatus::parse(&row.status).unwrap_or(FollowUpStatus::Scheduled),
            id: row.id,
            counselor_id: row.counselor_id,
            admin_id: row.admin_id,
            lead_id: row.lead_id,
            date: row.date,
            start_time: row.start_time,
            duration_minutes: row.duration_minutes,
            stage_at_follow_up: row.stage_at_follow_up,
            notes: row.notes,
            rescheduled_to: row.rescheduled_to,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    pub fn to_row(&self) -> FollowUpRow {
        FollowUpRow {
            id: self.id.clone(),
            counselor_id: self.counselor_id.clone(),
            admin_id: self.admin_id.clone(),
            lead_id: self.lead_id.clone(),
            date: self.date.clone(),
            start_time: self.start_time.clone(),
            duration_minutes: self.duration_minutes,
            status: self.status.as_str().to_string(),
            stage_at_follow_up: self.stage_at_follow_up.clone(),
            notes: self.notes.clone(),
            rescheduled_to: self.rescheduled_to.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }

    pub fn slot(&self) -> CoreResult<TimeSlot> {
        TimeSlot::parse(&self.date, &self.start_time, self.duration_minutes)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFollowUp {
    pub lead_id: String,
    pub date: String,
    pub start_time: String,
    pub duration_minutes: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Status change of a follow-up. `RESCHEDULED` needs the new time.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpStatusUpdate {
    pub status: FollowUpStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_meet_transitions() {
        use TeamMeetStatus::*;
        assert!(PendingConfirmation.can_transition_to(&Confirmed));
        assert!(PendingConfirmation.can_transition_to(&Rejected));
        assert!(Confirmed.can_transition_to(&Completed));
        assert!(!Confirmed.can_transition_to(&Rejected));
        assert!(!Rejected.can_transition_to(&Confirmed));
        assert!(!Cancelled.holds_slot());
    }

    #[test]
    fn test_follow_up_transitions() {
        use FollowUpStatus::*;
        assert!(Scheduled.can_transition_to(&Rescheduled));
        assert!(Missed.can_transition_to(&Rescheduled));
        assert!(!Missed.can_transition_to(&Completed));
        assert!(!Completed.can_transition_to(&Cancelled));
        assert!(Rescheduled.releases_slot());
        assert!(!Completed.releases_slot());
    }

    #[test]
    fn test_schedule_transitions() {
        assert!(ScheduleStatus::Scheduled.can_transition_to(&ScheduleStatus::Missed));
        assert!(!ScheduleStatus::Scheduled.can_transition_to(&ScheduleStatus::Scheduled));
        assert!(!ScheduleStatus::Completed.can_transition_to(&ScheduleStatus::Cancelled));
    }
}
