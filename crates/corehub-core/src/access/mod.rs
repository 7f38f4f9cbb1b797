//! Role-scoped access policy.
//!
//! Every handler asks [`authorize`] before touching a resource. The rules live
//! in one table-like match so a role's reach can be read in one place.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Platform role carried by every authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Counselor,
    Ops,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "STUDENT" => Some(Self::Student),
            "COUNSELOR" => Some(Self::Counselor),
            "OPS" => Some(Self::Ops),
            "ADMIN" => Some(Self::Admin),
            "SUPER_ADMIN" => Some(Self::SuperAdmin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "STUDENT",
            Self::Counselor => "COUNSELOR",
            Self::Ops => "OPS",
            Self::Admin => "ADMIN",
            Self::SuperAdmin => "SUPER_ADMIN",
        }
    }

    /// Staff roles that belong to an admin tenant.
    pub fn is_tenant_staff(&self) -> bool {
        matches!(self, Self::Counselor | Self::Ops)
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
    /// Tenant of counselors, OPS and students.
    pub admin_id: Option<String>,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: Role, admin_id: Option<String>) -> Self {
        Self { user_id: user_id.into(), role, admin_id }
    }

    /// Admin tenant the caller acts within. An admin is its own tenant.
    pub fn tenant(&self) -> Option<&str> {
        match self.role {
            Role::Admin => Some(&self.user_id),
            Role::SuperAdmin => None,
            _ => self.admin_id.as_deref(),
        }
    }

    pub fn is(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    fn owns_tenant(&self, admin_id: &str) -> bool {
        self.role == Role::Admin && self.user_id == admin_id
    }

    fn in_tenant(&self, admin_id: &str) -> bool {
        self.tenant() == Some(admin_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
    /// Approve or reject submitted work (documents, conversions).
    Review,
    /// Reassign ownership (OPS slots, counselors).
    Assign,
}

/// What is being accessed, reduced to the ids the policy needs.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    /// A registration and everything hanging off it (answers, documents).
    Registration {
        admin_id: &'a str,
        active_ops_id: Option<&'a str>,
        counselor_id: Option<&'a str>,
        student_user_id: &'a str,
    },
    Student {
        admin_id: &'a str,
        counselor_id: Option<&'a str>,
        user_id: &'a str,
    },
    Lead {
        admin_id: &'a str,
        counselor_id: Option<&'a str>,
    },
    /// A personal calendar entry (OPS schedule, follow-up).
    Calendar { owner_id: &'a str, admin_id: &'a str },
    /// A meeting between two staff members.
    Meeting {
        requested_by: &'a str,
        requested_to: &'a str,
        admin_id: &'a str,
    },
    /// Tenant-wide configuration and rosters.
    Tenant { admin_id: &'a str },
    /// Platform-wide configuration (admins, services).
    Platform,
}

/// Decide whether `principal` may perform `action` on `resource`.
pub fn can(principal: &Principal, action: Action, resource: &Resource<'_>) -> bool {
    if principal.role == Role::SuperAdmin {
        return true;
    }

    match *resource {
        Resource::Registration { admin_id, active_ops_id, counselor_id, student_user_id } => {
            match principal.role {
                Role::Admin => principal.owns_tenant(admin_id),
                Role::Ops => active_ops_id.is_some_and(|ops| principal.is(ops)),
                Role::Counselor => {
                    action == Action::Read && counselor_id.is_some_and(|c| principal.is(c))
                }
                Role::Student => {
                    matches!(action, Action::Read | Action::Write) && principal.is(student_user_id)
                }
                Role::SuperAdmin => true,
            }
        }
        Resource::Student { admin_id, counselor_id, user_id } => match principal.role {
            Role::Admin => principal.owns_tenant(admin_id),
            Role::Counselor => {
                action == Action::Read && counselor_id.is_some_and(|c| principal.is(c))
            }
            Role::Ops => action == Action::Read && principal.in_tenant(admin_id),
            Role::Student => action == Action::Read && principal.is(user_id),
            Role::SuperAdmin => true,
        },
        Resource::Lead { admin_id, counselor_id } => match principal.role {
            Role::Admin => principal.owns_tenant(admin_id),
            Role::Counselor => {
                matches!(action, Action::Read | Action::Write)
                    && counselor_id.is_some_and(|c| principal.is(c))
            }
            _ => false,
        },
        Resource::Calendar { owner_id, admin_id } => match principal.role {
            Role::Admin => principal.owns_tenant(admin_id),
            Role::Ops | Role::Counselor => {
                matches!(action, Action::Read | Action::Write) && principal.is(owner_id)
            }
            _ => false,
        },
        Resource::Meeting { requested_by, requested_to, admin_id } => {
            if principal.is(requested_by) || principal.is(requested_to) {
                return matches!(action, Action::Read | Action::Write);
            }
            principal.owns_tenant(admin_id) && action == Action::Read
        }
        Resource::Tenant { admin_id } => match principal.role {
            Role::Admin => principal.owns_tenant(admin_id),
            Role::Ops | Role::Counselor => action == Action::Read && principal.in_tenant(admin_id),
            _ => false,
        },
        Resource::Platform => false,
    }
}

/// Like [`can`] but fails with `Forbidden`.
pub fn authorize(principal: &Principal, action: Action, resource: &Resource<'_>) -> CoreResult<()> {
    if can(principal, action, resource) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %principal.user_id,
            role = principal.role.as_str(),
            ?action,
            "Access denied"
        );
        Err(CoreError::forbidden("You do not have access to this resource"))
    }
}

/// Require one of the given roles.
pub fn require_role(principal: &Principal, roles: &[Role]) -> CoreResult<()> {
    if roles.contains(&principal.role) {
        Ok(())
    } else {
        Err(CoreError::forbidden(format!(
            "Role {} cannot perform this operation",
            principal.role.as_str()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(id: &str, role: Role, admin: Option<&str>) -> Principal {
        Principal::new(id, role, admin.map(str::to_string))
    }

    fn registration<'a>(active_ops: Option<&'a str>) -> Resource<'a> {
        Resource::Registration {
            admin_id: "admin-1",
            active_ops_id: active_ops,
            counselor_id: Some("counselor-1"),
            student_user_id: "student-user-1",
        }
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("super-admin"), Some(Role::SuperAdmin));
        assert_eq!(Role::parse("ops"), Some(Role::Ops));
        assert_eq!(Role::parse("janitor"), None);
        assert_eq!(Role::SuperAdmin.as_str(), "SUPER_ADMIN");
    }

    #[test]
    fn test_super_admin_sees_everything() {
        let p = principal("root", Role::SuperAdmin, None);
        assert!(can(&p, Action::Write, &registration(None)));
        assert!(can(&p, Action::Review, &Resource::Platform));
    }

    #[test]
    fn test_admin_limited_to_own_tenant() {
        let owner = principal("admin-1", Role::Admin, None);
        let other = principal("admin-2", Role::Admin, None);
        assert!(can(&owner, Action::Review, &registration(Some("ops-1"))));
        assert!(!can(&other, Action::Read, &registration(Some("ops-1"))));
        assert!(!can(&owner, Action::Write, &Resource::Platform));
    }

    #[test]
    fn test_inactive_ops_is_forbidden() {
        let active = principal("ops-1", Role::Ops, Some("admin-1"));
        let secondary = principal("ops-2", Role::Ops, Some("admin-1"));
        let resource = registration(Some("ops-1"));

        assert!(can(&active, Action::Read, &resource));
        assert!(can(&active, Action::Review, &resource));

        for action in [Action::Read, Action::Write, Action::Review] {
            let err = authorize(&secondary, action, &resource).unwrap_err();
            assert!(matches!(err, CoreError::Forbidden(_)));
        }
        assert!(!can(&active, Action::Read, &registration(None)));
    }

    #[test]
    fn test_counselor_reads_assigned_students_only() {
        let assigned = principal("counselor-1", Role::Counselor, Some("admin-1"));
        let other = principal("counselor-2", Role::Counselor, Some("admin-1"));
        assert!(can(&assigned, Action::Read, &registration(None)));
        assert!(!can(&assigned, Action::Write, &registration(None)));
        assert!(!can(&other, Action::Read, &registration(None)));
    }

    #[test]
    fn test_student_owns_registration() {
        let me = principal("student-user-1", Role::Student, Some("admin-1"));
        let someone = principal("student-user-2", Role::Student, Some("admin-1"));
        assert!(can(&me, Action::Write, &registration(None)));
        assert!(!can(&me, Action::Review, &registration(None)));
        assert!(!can(&someone, Action::Read, &registration(None)));
    }

    #[test]
    fn test_leads_visible_to_tenant_admin_and_assigned_counselor() {
        let lead = Resource::Lead { admin_id: "admin-1", counselor_id: Some("counselor-1") };
        assert!(can(&principal("admin-1", Role::Admin, None), Action::Review, &lead));
        assert!(can(&principal("counselor-1", Role::Counselor, Some("admin-1")), Action::Write, &lead));
        assert!(!can(&principal("counselor-1", Role::Counselor, Some("admin-1")), Action::Review, &lead));
        assert!(!can(&principal("ops-1", Role::Ops, Some("admin-1")), Action::Read, &lead));
    }

    #[test]
    fn test_calendar_owner_and_tenant_admin() {
        let entry = Resource::Calendar { owner_id: "ops-1", admin_id: "admin-1" };
        assert!(can(&principal("ops-1", Role::Ops, Some("admin-1")), Action::Write, &entry));
        assert!(!can(&principal("ops-2", Role::Ops, Some("admin-1")), Action::Read, &entry));
        assert!(can(&principal("admin-1", Role::Admin, None), Action::Write, &entry));
    }

    #[test]
    fn test_meeting_participants() {
        let meeting = Resource::Meeting {
            requested_by: "ops-1",
            requested_to: "counselor-1",
            admin_id: "admin-1",
        };
        assert!(can(&principal("counselor-1", Role::Counselor, Some("admin-1")), Action::Write, &meeting));
        assert!(can(&principal("admin-1", Role::Admin, None), Action::Read, &meeting));
        assert!(!can(&principal("admin-1", Role::Admin, None), Action::Write, &meeting));
        assert!(!can(&principal("ops-9", Role::Ops, Some("admin-1")), Action::Read, &meeting));
    }

    #[test]
    fn test_tenant_staff_read_only() {
        let tenant = Resource::Tenant { admin_id: "admin-1" };
        assert!(can(&principal("ops-1", Role::Ops, Some("admin-1")), Action::Read, &tenant));
        assert!(!can(&principal("ops-1", Role::Ops, Some("admin-1")), Action::Write, &tenant));
        assert!(!can(&principal("ops-1", Role::Ops, Some("admin-2")), Action::Read, &tenant));
        assert!(!can(&principal("s-1", Role::Student, Some("admin-1")), Action::Read, &tenant));
    }

    #[test]
    fn test_require_role() {
        let p = principal("ops-1", Role::Ops, Some("admin-1"));
        assert!(require_role(&p, &[Role::Ops, Role::Admin]).is_ok());
        assert!(matches!(require_role(&p, &[Role::Admin]), Err(CoreError::Forbidden(_))));
    }
}
