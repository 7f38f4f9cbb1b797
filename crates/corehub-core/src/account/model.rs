//! User and student profile types.

use crate::access::{Principal, Role};
use corehub_redis::queries::students::StudentRow;
use corehub_redis::queries::users::UserRow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub role: Role,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub admin_id: Option<String>,
    pub super_admin_id: Option<String>,
    pub company_name: Option<String>,
    pub enquiry_slug: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Create from database row. Unknown roles degrade to `STUDENT`, the
    /// least privileged role.
    pub fn from_row(row: UserRow) -> Self {
        Self {
            role: Role::parse(&row.role).unwrap_or(Role::Student),
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            admin_id: row.admin_id,
            super_admin_id: row.super_admin_id,
            company_name: row.company_name,
            enquiry_slug: row.enquiry_slug,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    /// The identity this user authenticates as.
    pub fn principal(&self) -> Principal {
        Principal::new(self.id.clone(), self.role, self.admin_id.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub user_id: String,
    pub admin_id: String,
    pub counselor_id: Option<String>,
    pub lead_id: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Student {
    pub fn from_row(row: StudentRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            admin_id: row.admin_id,
            counselor_id: row.counselor_id,
            lead_id: row.lead_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for creating a staff or admin account.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub role: Role,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub admin_id: Option<String>,
    #[serde(default)]
    pub super_admin_id: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub enquiry_slug: Option<String>,
}

/// Input for creating a student account with its profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub counselor_id: Option<String>,
    /// Required when a super-admin creates the student.
    #[serde(default)]
    pub admin_id: Option<String>,
}
