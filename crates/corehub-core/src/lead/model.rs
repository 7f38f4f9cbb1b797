//! Lead and conversion types.

use corehub_redis::queries::conversions::ConversionRow;
use corehub_redis::queries::leads::LeadRow;
use serde::{Deserialize, Serialize};

/// Sales stage of a lead.
///
/// `NEW` leads are qualified into `HOT`, `WARM` or `COLD`, which move freely
/// among themselves until the lead is converted or closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStage {
    New,
    Hot,
    Warm,
    Cold,
    Converted,
    Closed,
}

impl LeadStage {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "NEW" => Some(Self::New),
            "HOT" => Some(Self::Hot),
            "WARM" => Some(Self::Warm),
            "COLD" => Some(Self::Cold),
            "CONVERTED" => Some(Self::Converted),
            "CLOSED" => Some(Self::Closed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Hot => "HOT",
            Self::Warm => "WARM",
            Self::Cold => "COLD",
            Self::Converted => "CONVERTED",
            Self::Closed => "CLOSED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Converted | Self::Closed)
    }

    fn is_qualified(&self) -> bool {
        matches!(self, Self::Hot | Self::Warm | Self::Cold)
    }

    pub fn can_transition_to(&self, target: &Self) -> bool {
        match self {
            Self::New => target.is_qualified(),
            Self::Hot | Self::Warm | Self::Cold => *target != Self::New && self != target,
            Self::Converted | Self::Closed => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub admin_id: String,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub city: Option<String>,
    pub service_types: Vec<String>,
    pub stage: LeadStage,
    pub assigned_counselor_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Lead {
    pub fn from_row(row: LeadRow) -> Self {
        Self {
            stage: LeadStage::parse(&row.stage).unwrap_or(LeadStage::New),
            id: row.id,
            admin_id: row.admin_id,
            name: row.name,
            email: row.email,
            mobile: row.mobile,
            city: row.city,
            service_types: row.service_types,
            assigned_counselor_id: row.assigned_counselor_id,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    pub fn to_row(&self) -> LeadRow {
        LeadRow {
            id: self.id.clone(),
            admin_id: self.admin_id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            mobile: self.mobile.clone(),
            city: self.city.clone(),
            service_types: self.service_types.clone(),
            stage: self.stage.as_str().to_string(),
            assigned_counselor_id: self.assigned_counselor_id.clone(),
            notes: self.notes.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}

/// Public enquiry form submitted through an admin's enquiry link.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnquiryForm {
    pub name: String,
    pub email: String,
    pub mobile: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub service_types: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversionStatus {
    Pending,
    Approved,
    Rejected,
}

impl ConversionStatus {
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

    pub fn can_transition_to(&self, target: &Self) -> bool {
        *self == Self::Pending && *target != Self::Pending
    }
}

/// A request to turn a lead into a student.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversion {
    pub id: String,
    pub lead_id: String,
    pub admin_id: String,
    pub requested_by: String,
    pub status: ConversionStatus,
    pub rejection_reason: Option<String>,
    pub resolved_by: Option<String>,
    pub student_id: Option<String>,
    pub created_at: String,
    pub resolved_at: Option<String>,
}

impl Conversion {
    pub fn from_row(row: ConversionRow) -> Self {
        Self {
            status: ConversionStatus::parse(&row.status).unwrap_or(ConversionStatus::Pending),
            id: row.id,
            lead_id: row.lead_id,
            admin_id: row.admin_id,
            requested_by: row.requested_by,
            rejection_reason: row.rejection_reason,
            resolved_by: row.resolved_by,
            student_id: row.student_id,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
        }
    }

    pub fn to_row(&self) -> ConversionRow {
        ConversionRow {
            id: self.id.clone(),
            lead_id: self.lead_id.clone(),
            admin_id: self.admin_id.clone(),
            requested_by: self.requested_by.clone(),
            status: self.status.as_str().to_string(),
            rejection_reason: self.rejection_reason.clone(),
            resolved_by: self.resolved_by.clone(),
            student_id: self.student_id.clone(),
            created_at: self.created_at.clone(),
            resolved_at: self.resolved_at.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_transitions() {
        use LeadStage::*;
        assert!(New.can_transition_to(&Hot));
        assert!(!New.can_transition_to(&Closed));
        assert!(!New.can_transition_to(&Converted));
        assert!(Hot.can_transition_to(&Cold));
        assert!(Cold.can_transition_to(&Warm));
        assert!(Warm.can_transition_to(&Closed));
        assert!(Warm.can_transition_to(&Converted));
        assert!(!Warm.can_transition_to(&Warm));
        assert!(!Hot.can_transition_to(&New));
        assert!(!Cold.can_transition_to(&New));
        assert!(!Converted.can_transition_to(&Hot));
        assert!(!Closed.can_transition_to(&New));
    }

    #[test]
    fn test_stage_parse() {
        assert_eq!(LeadStage::parse("hot"), Some(LeadStage::Hot));
        assert_eq!(LeadStage::parse("LOST"), None);
        assert_eq!(LeadStage::Converted.as_str(), "CONVERTED");
    }

    #[test]
    fn test_conversion_resolves_once() {
        assert!(ConversionStatus::Pending.can_transition_to(&ConversionStatus::Approved));
        assert!(!ConversionStatus::Approved.can_transition_to(&ConversionStatus::Rejected));
        assert!(!ConversionStatus::Pending.can_transition_to(&ConversionStatus::Pending));
    }
}
