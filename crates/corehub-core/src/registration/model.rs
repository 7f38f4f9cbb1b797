//! Registration types.

use corehub_redis::queries::registrations::RegistrationRow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: String,
    pub student_id: String,
    pub service_id: String,
    pub admin_id: String,
    pub primary_ops_id: Option<String>,
    pub secondary_ops_id: Option<String>,
    pub active_ops_id: Option<String>,
    pub status: RegistrationStatus,
    pub registered_at: String,
    pub updated_at: String,
}

impl Registration {
    pub fn from_row(row: RegistrationRow) -> Self {
        Self {
            status: RegistrationStatus::parse(&row.status).unwrap_or(RegistrationStatus::Registered),
            id: row.id,
            student_id: row.student_id,
            service_id: row.service_id,
            admin_id: row.admin_id,
            primary_ops_id: row.primary_ops_id,
            secondary_ops_id: row.secondary_ops_id,
            active_ops_id: row.active_ops_id,
            registered_at: row.registered_at,
            updated_at: row.updated_at,
        }
    }

    pub fn to_row(&self) -> RegistrationRow {
        RegistrationRow {
            id: self.id.clone(),
            student_id: self.student_id.clone(),
            service_id: self.service_id.clone(),
            admin_id: self.admin_id.clone(),
            primary_ops_id: self.primary_ops_id.clone(),
            secondary_ops_id: self.secondary_ops_id.clone(),
            active_ops_id: self.active_ops_id.clone(),
            status: self.status.as_str().to_string(),
            registered_at: self.registered_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }

    /// Whether `ops_id` is one of the two assigned OPS users.
    pub fn is_assigned_ops(&self, ops_id: &str) -> bool {
        self.primary_ops_id.as_deref() == Some(ops_id) || self.secondary_ops_id.as_deref() == Some(ops_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    Registered,
    InProgress,
    Completed,
    Cancelled,
}

impl RegistrationStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "REGISTERED" => Some(Self::Registered),
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "REGISTERED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Check if transition to another status is valid.
    pub fn can_transition_to(&self, target: &Self) -> bool {
        matches!(
            (self, target),
            (Self::Registered, Self::InProgress)
                | (Self::Registered, Self::Cancelled)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Cancelled)
        )
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRegistration {
    pub student_id: String,
    pub service_id: String,
    #[serde(default)]
    pub primary_ops_id: Option<String>,
    #[serde(default)]
    pub secondary_ops_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpsAssignment {
    pub primary_ops_id: Option<String>,
    #[serde(default)]
    pub secondary_ops_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use RegistrationStatus::*;
        assert!(Registered.can_transition_to(&InProgress));
        assert!(InProgress.can_transition_to(&Completed));
        assert!(Registered.can_transition_to(&Cancelled));
        assert!(!Registered.can_transition_to(&Completed));
        assert!(!Completed.can_transition_to(&InProgress));
        assert!(!Cancelled.can_transition_to(&Registered));
        assert!(Completed.is_closed());
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(RegistrationStatus::parse("in_progress"), Some(RegistrationStatus::InProgress));
        assert_eq!(
            serde_json::to_string(&RegistrationStatus::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
    }
}
