//! User accounts and student profiles.

pub mod model;

use crate::access::{authorize, require_role, Action, Principal, Resource, Role};
use crate::error::{require, CoreError, CoreResult};
use crate::text::{is_valid_email, now_rfc3339, slugify};
use corehub_redis::queries::students::{self as student_queries, StudentRow};
use corehub_redis::queries::users::{self as queries, UserRow};
use corehub_redis::RedisPool as DbPool;
use model::{NewStudent, NewUser, Student, User};
use tracing::info;
use uuid::Uuid;

/// Create an account without a caller check. Used by the CLI bootstrap and by
/// the checked operations below once they have authorized the caller.
pub async fn register_user(pool: &DbPool, new: NewUser) -> CoreResult<User> {
    require(&new.name, "Name")?;
    if !is_valid_email(&new.email) {
        return Err(CoreError::validation(format!("Invalid email address: {}", new.email)));
    }

    let mut admin_id = None;
    let mut super_admin_id = None;
    let mut enquiry_slug = None;

    match new.role {
        Role::SuperAdmin => {}
        Role::Admin => {
            if let Some(ref id) = new.super_admin_id {
                expect_role(pool, id, Role::SuperAdmin).await?;
                super_admin_id = Some(id.clone());
            }
            let base = new
                .enquiry_slug
                .as_deref()
                .or(new.company_name.as_deref())
                .unwrap_or(&new.name);
            let slug = slugify(base, '-');
            if slug.is_empty() {
                return Err(CoreError::validation("Enquiry slug must contain letters or digits"));
            }
            enquiry_slug = Some(slug);
        }
        Role::Counselor | Role::Ops | Role::Student => {
            let id = new.admin_id.as_deref().ok_or_else(|| {
                CoreError::validation(format!("{} accounts need an adminId", new.role.as_str()))
            })?;
            expect_role(pool, id, Role::Admin).await?;
            admin_id = Some(id.to_string());
        }
    }

    let now = now_rfc3339();
    let row = UserRow {
        id: Uuid::new_v4().to_string(),
        role: new.role.as_str().to_string(),
        name: new.name.trim().to_string(),
        email: new.email.trim().to_lowercase(),
        phone: new.phone,
        admin_id,
        super_admin_id,
        company_name: new.company_name,
        enquiry_slug,
        is_active: true,
        created_at: now.clone(),
        updated_at: now,
    };
    queries::insert_user(pool, &row).await?;

    info!(user_id = %row.id, role = %row.role, "User created");
    Ok(User::from_row(row))
}

/// Create a staff or admin account on behalf of `principal`.
///
/// Super-admins create admins (and staff for any tenant); admins create
/// counselors and OPS inside their own tenant.
pub async fn create_user(pool: &DbPool, principal: &Principal, mut new: NewUser) -> CoreResult<User> {
    if new.role == Role::Student {
        return Err(CoreError::validation("Students are created through the students endpoint"));
    }

    match principal.role {
        Role::SuperAdmin => {
            if new.role == Role::Admin && new.super_admin_id.is_none() {
                new.super_admin_id = Some(principal.user_id.clone());
            }
        }
        Role::Admin => {
            if !new.role.is_tenant_staff() {
                return Err(CoreError::forbidden("Admins can only create counselors and OPS users"));
            }
            new.admin_id = Some(principal.user_id.clone());
        }
        _ => return Err(CoreError::forbidden("You cannot create users")),
    }

    register_user(pool, new).await
}

pub async fn get_user(pool: &DbPool, principal: &Principal, id: &str) -> CoreResult<User> {
    let user = User::from_row(queries::get_user(pool, id).await?);
    if principal.is(&user.id) {
        return Ok(user);
    }
    match user.admin_id.as_deref() {
        Some(admin_id) => authorize(principal, Action::Read, &Resource::Tenant { admin_id })?,
        None => authorize(principal, Action::Read, &Resource::Platform)?,
    }
    Ok(user)
}

/// Users visible to the caller, optionally narrowed to one role.
pub async fn list_users(pool: &DbPool, principal: &Principal, role: Option<Role>) -> CoreResult<Vec<User>> {
    let rows = match principal.role {
        Role::SuperAdmin => match role {
            Some(role) => queries::list_users_by_role(pool, role.as_str()).await?,
            None => queries::list_users(pool).await?,
        },
        Role::Admin => queries::list_users_by_admin(pool, &principal.user_id).await?,
        Role::Ops | Role::Counselor => {
            let admin_id = principal.tenant().unwrap_or_default();
            authorize(principal, Action::Read, &Resource::Tenant { admin_id })?;
            queries::list_users_by_admin(pool, admin_id)
                .await?
                .into_iter()
                .filter(|u| u.role != Role::Student.as_str())
                .collect()
        }
        Role::Student => return Err(CoreError::forbidden("You cannot list users")),
    };

    Ok(rows
        .into_iter()
        .map(User::from_row)
        .filter(|u| role.is_none_or(|r| u.role == r))
        .collect())
}

/// Admin accounts, for super-admins.
pub async fn list_admins(pool: &DbPool, principal: &Principal) -> CoreResult<Vec<User>> {
    authorize(principal, Action::Read, &Resource::Platform)?;
    let rows = queries::list_users_by_role(pool, Role::Admin.as_str()).await?;
    Ok(rows.into_iter().map(User::from_row).collect())
}

/// Create a student account and profile inside the caller's tenant.
pub async fn create_student(pool: &DbPool, principal: &Principal, new: NewStudent) -> CoreResult<Student> {
    require_role(principal, &[Role::Admin, Role::SuperAdmin])?;
    let admin_id = match principal.role {
        Role::Admin => principal.user_id.clone(),
        _ => new
            .admin_id
            .clone()
            .ok_or_else(|| CoreError::validation("adminId is required"))?,
    };
    authorize(principal, Action::Write, &Resource::Tenant { admin_id: &admin_id })?;

    let (_, student) = enroll_student(
        pool,
        &admin_id,
        &new.name,
        &new.email,
        new.phone.clone(),
        new.counselor_id.as_deref(),
        None,
    )
    .await?;
    Ok(student)
}

/// Create the student user and its profile. Shared with lead conversion.
pub(crate) async fn enroll_student(
    pool: &DbPool,
    admin_id: &str,
    name: &str,
    email: &str,
    phone: Option<String>,
    counselor_id: Option<&str>,
    lead_id: Option<&str>,
) -> CoreResult<(User, Student)> {
    if let Some(counselor_id) = counselor_id {
        tenant_member(pool, admin_id, counselor_id, Role::Counselor).await?;
    }

    let user = register_user(
        pool,
        NewUser {
            role: Role::Student,
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.clone(),
            admin_id: Some(admin_id.to_string()),
            super_admin_id: None,
            company_name: None,
            enquiry_slug: None,
        },
    )
    .await?;

    let row = StudentRow {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        admin_id: admin_id.to_string(),
        counselor_id: counselor_id.map(str::to_string),
        lead_id: lead_id.map(str::to_string),
        name: user.name.clone(),
        email: user.email.clone(),
        phone,
        created_at: user.created_at.clone(),
        updated_at: user.created_at.clone(),
    };
    student_queries::insert_student(pool, &row).await?;

    info!(student_id = %row.id, admin_id = %admin_id, "Student enrolled");
    Ok((user, Student::from_row(row)))
}

pub async fn get_student(pool: &DbPool, principal: &Principal, id: &str) -> CoreResult<Student> {
    let student = Student::from_row(student_queries::get_student(pool, id).await?);
    authorize(principal, Action::Read, &student_resource(&student))?;
    Ok(student)
}

/// Students visible to the caller.
pub async fn list_students(pool: &DbPool, principal: &Principal) -> CoreResult<Vec<Student>> {
    let rows = match principal.role {
        Role::SuperAdmin => student_queries::list_students(pool).await?,
        Role::Admin => student_queries::list_students_by_admin(pool, &principal.user_id).await?,
        Role::Counselor => student_queries::list_students_by_counselor(pool, &principal.user_id).await?,
        Role::Ops => {
            let admin_id = principal.tenant().unwrap_or_default();
            student_queries::list_students_by_admin(pool, admin_id).await?
        }
        Role::Student => student_queries::find_student_by_user(pool, &principal.user_id)
            .await?
            .into_iter()
            .collect(),
    };

    Ok(rows
        .into_iter()
        .map(Student::from_row)
        .filter(|s| crate::access::can(principal, Action::Read, &student_resource(s)))
        .collect())
}

/// The student profile behind a student user.
pub async fn find_student_for_user(pool: &DbPool, user_id: &str) -> CoreResult<Student> {
    student_queries::find_student_by_user(pool, user_id)
        .await?
        .map(Student::from_row)
        .ok_or_else(|| CoreError::not_found(format!("No student profile for user {}", user_id)))
}

/// Point a student at another counselor of the same tenant, or clear it.
pub async fn assign_student_counselor(
    pool: &DbPool,
    principal: &Principal,
    student_id: &str,
    counselor_id: Option<&str>,
) -> CoreResult<Student> {
    let student = Student::from_row(student_queries::get_student(pool, student_id).await?);
    authorize(principal, Action::Assign, &student_resource(&student))?;
    if let Some(counselor_id) = counselor_id {
        tenant_member(pool, &student.admin_id, counselor_id, Role::Counselor).await?;
    }

    let row = student_queries::assign_counselor(pool, student_id, counselor_id).await?;
    info!(student_id = %student_id, counselor_id = ?counselor_id, "Student counselor assigned");
    Ok(Student::from_row(row))
}

pub(crate) fn student_resource(student: &Student) -> Resource<'_> {
    Resource::Student {
        admin_id: &student.admin_id,
        counselor_id: student.counselor_id.as_deref(),
        user_id: &student.user_id,
    }
}

/// Load a user and require it to hold `role` inside `admin_id`'s tenant.
pub(crate) async fn tenant_member(
    pool: &DbPool,
    admin_id: &str,
    user_id: &str,
    role: Role,
) -> CoreResult<User> {
    let user = load_user(pool, user_id).await?;
    if user.role != role || user.admin_id.as_deref() != Some(admin_id) {
        return Err(CoreError::validation(format!(
            "User {} is not a {} of this tenant",
            user_id,
            role.as_str()
        )));
    }
    if !user.is_active {
        return Err(CoreError::validation(format!("User {} is inactive", user_id)));
    }
    Ok(user)
}

/// Load a user with a validation error for unknown ids.
pub(crate) async fn load_user(pool: &DbPool, user_id: &str) -> CoreResult<User> {
    match queries::get_user(pool, user_id).await {
        Ok(row) => Ok(User::from_row(row)),
        Err(corehub_redis::RedisError::NotFound(_)) => {
            Err(CoreError::validation(format!("Unknown user: {}", user_id)))
        }
        Err(e) => Err(e.into()),
    }
}

async fn expect_role(pool: &DbPool, user_id: &str, role: Role) -> CoreResult<User> {
    let user = load_user(pool, user_id).await?;
    if user.role != role {
        return Err(CoreError::validation(format!(
            "User {} is not a {}",
            user_id,
            role.as_str()
        )));
    }
    Ok(user)
}

/// Look up an account by its email address.
pub async fn find_user_by_email(pool: &DbPool, email: &str) -> CoreResult<Option<User>> {
    Ok(queries::find_user_by_email(pool, email).await?.map(User::from_row))
}

/// Fetch an account without a caller check (token issuing, notifications).
pub async fn get_user_unchecked(pool: &DbPool, id: &str) -> CoreResult<User> {
    Ok(User::from_row(queries::get_user(pool, id).await?))
}
