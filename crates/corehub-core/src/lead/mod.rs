//! Leads from public enquiries and their conversion into students.

pub mod model;

use crate::access::{authorize, can, require_role, Action, Principal, Resource, Role};
use crate::account::model::{Student, User};
use crate::account::{enroll_student, load_user, tenant_member};
use crate::error::{require, CoreError, CoreResult};
use crate::notify::{send_logged, templates, Mailer};
use crate::service::{list_services, Service};
use crate::text::{is_valid_email, is_valid_phone, now_rfc3339};
use corehub_redis::queries::conversions as conversion_queries;
use corehub_redis::queries::leads as queries;
use corehub_redis::queries::students as student_queries;
use corehub_redis::queries::users as user_queries;
use corehub_redis::RedisPool as DbPool;
use model::{Conversion, ConversionStatus, EnquiryForm, Lead, LeadStage};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

pub(crate) fn lead_resource(lead: &Lead) -> Resource<'_> {
    Resource::Lead {
        admin_id: &lead.admin_id,
        counselor_id: lead.assigned_counselor_id.as_deref(),
    }
}

pub(crate) async fn load_lead(
    pool: &DbPool,
    principal: &Principal,
    id: &str,
    action: Action,
) -> CoreResult<Lead> {
    let lead = Lead::from_row(queries::get_lead(pool, id).await?);
    authorize(principal, action, &lead_resource(&lead))?;
    Ok(lead)
}

/// What the public enquiry page shows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnquiryInfo {
    pub company_name: String,
    pub services: Vec<Service>,
}

async fn enquiry_admin(pool: &DbPool, slug: &str) -> CoreResult<User> {
    let admin = user_queries::find_admin_by_slug(pool, slug.trim())
        .await?
        .map(User::from_row)
        .filter(|u| u.is_active)
        .ok_or_else(|| CoreError::not_found(format!("Enquiry page not found: {}", slug)))?;
    Ok(admin)
}

pub async fn enquiry_info(pool: &DbPool, slug: &str) -> CoreResult<EnquiryInfo> {
    let admin = enquiry_admin(pool, slug).await?;
    Ok(EnquiryInfo {
        company_name: admin.company_name.unwrap_or(admin.name),
        services: list_services(pool).await?,
    })
}

/// Record a public enquiry as a `NEW` lead of the admin behind `slug`.
pub async fn submit_enquiry(pool: &DbPool, slug: &str, form: EnquiryForm) -> CoreResult<Lead> {
    require(&form.name, "Name")?;
    require(&form.email, "Email")?;
    require(&form.mobile, "Mobile")?;
    if !is_valid_email(&form.email) {
        return Err(CoreError::validation(format!("Invalid email address: {}", form.email)));
    }
    if !is_valid_phone(&form.mobile) {
        return Err(CoreError::validation(format!("Invalid mobile number: {}", form.mobile)));
    }

    let admin = enquiry_admin(pool, slug).await?;
    let services = list_services(pool).await?;
    let mut service_types = Vec::with_capacity(form.service_types.len());
    for wanted in &form.service_types {
        let service = services
            .iter()
            .find(|s| s.slug == *wanted || s.name.eq_ignore_ascii_case(wanted.trim()))
            .ok_or_else(|| CoreError::validation(format!("Unknown service: {}", wanted)))?;
        if !service_types.contains(&service.slug) {
            service_types.push(service.slug.clone());
        }
    }

    let now = now_rfc3339();
    let lead = Lead {
        id: Uuid::new_v4().to_string(),
        admin_id: admin.id,
        name: form.name.trim().to_string(),
        email: form.email.trim().to_lowercase(),
        mobile: form.mobile.trim().to_string(),
        city: form.city.filter(|c| !c.trim().is_empty()),
        service_types,
        stage: LeadStage::New,
        assigned_counselor_id: None,
        notes: None,
        created_at: now.clone(),
        updated_at: now,
    };
    queries::insert_lead(pool, &lead.to_row()).await?;

    info!(lead_id = %lead.id, admin_id = %lead.admin_id, "Enquiry received");
    Ok(lead)
}

/// Leads visible to the caller, newest first.
pub async fn list_leads(
    pool: &DbPool,
    principal: &Principal,
    stage: Option<LeadStage>,
) -> CoreResult<Vec<Lead>> {
    let rows = match principal.role {
        Role::SuperAdmin => queries::list_leads(pool).await?,
        Role::Admin => queries::list_leads_by_admin(pool, &principal.user_id).await?,
        Role::Counselor => queries::list_leads_by_counselor(pool, &principal.user_id).await?,
        _ => return Err(CoreError::forbidden("You do not have access to this resource")),
    };
    let mut leads: Vec<Lead> = rows
        .into_iter()
        .map(Lead::from_row)
        .filter(|l| stage.is_none_or(|s| s == l.stage))
        .filter(|l| can(principal, Action::Read, &lead_resource(l)))
        .collect();
    leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(leads)
}

pub async fn get_lead(pool: &DbPool, principal: &Principal, id: &str) -> CoreResult<Lead> {
    load_lead(pool, principal, id, Action::Read).await
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageUpdate {
    pub stage: LeadStage,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Move a lead through its stages. `CONVERTED` is only reachable through an
/// approved conversion.
pub async fn update_lead_stage(
    pool: &DbPool,
    principal: &Principal,
    id: &str,
    update: StageUpdate,
) -> CoreResult<Lead> {
    let lead = load_lead(pool, principal, id, Action::Write).await?;
    if update.stage == LeadStage::Converted {
        return Err(CoreError::validation(
            "Leads are converted by approving a conversion request",
        ));
    }
    if !lead.stage.can_transition_to(&update.stage) {
        return Err(CoreError::transition(lead.stage.as_str(), update.stage.as_str()));
    }

    let previous = lead.to_row();
    let mut lead = lead;
    lead.stage = update.stage;
    if let Some(notes) = update.notes.filter(|n| !n.trim().is_empty()) {
        lead.notes = Some(notes);
    }
    lead.updated_at = now_rfc3339();
    queries::update_lead(pool, &previous, &lead.to_row()).await?;

    info!(lead_id = %lead.id, from = %previous.stage, to = lead.stage.as_str(), "Lead stage changed");
    Ok(lead)
}

pub async fn assign_lead_counselor(
    pool: &DbPool,
    principal: &Principal,
    id: &str,
    counselor_id: &str,
) -> CoreResult<Lead> {
    let lead = load_lead(pool, principal, id, Action::Assign).await?;
    if lead.stage.is_terminal() {
        return Err(CoreError::validation(format!("Lead is already {}", lead.stage.as_str())));
    }
    tenant_member(pool, &lead.admin_id, counselor_id, Role::Counselor).await?;

    let previous = lead.to_row();
    let mut lead = lead;
    lead.assigned_counselor_id = Some(counselor_id.to_string());
    lead.updated_at = now_rfc3339();
    queries::update_lead(pool, &previous, &lead.to_row()).await?;

    info!(lead_id = %lead.id, counselor_id, "Lead counselor assigned");
    Ok(lead)
}

/// Ask the admin to turn a lead into a student. One request may be pending
/// per lead.
pub async fn request_conversion(pool: &DbPool, principal: &Principal, lead_id: &str) -> CoreResult<Conversion> {
    require_role(principal, &[Role::Counselor, Role::Admin, Role::SuperAdmin])?;
    let lead = load_lead(pool, principal, lead_id, Action::Write).await?;
    if !lead.stage.can_transition_to(&LeadStage::Converted) {
        return Err(CoreError::transition(lead.stage.as_str(), LeadStage::Converted.as_str()));
    }

    let conversion = Conversion {
        id: Uuid::new_v4().to_string(),
        lead_id: lead.id,
        admin_id: lead.admin_id,
        requested_by: principal.user_id.clone(),
        status: ConversionStatus::Pending,
        rejection_reason: None,
        resolved_by: None,
        student_id: None,
        created_at: now_rfc3339(),
        resolved_at: None,
    };
    conversion_queries::insert_conversion(pool, &conversion.to_row()).await?;

    info!(conversion_id = %conversion.id, lead_id = %conversion.lead_id, "Conversion requested");
    Ok(conversion)
}

pub async fn list_conversions(
    pool: &DbPool,
    principal: &Principal,
    status: Option<ConversionStatus>,
) -> CoreResult<Vec<Conversion>> {
    let rows = match principal.role {
        Role::SuperAdmin => conversion_queries::list_conversions(pool).await?,
        Role::Admin => conversion_queries::list_conversions_by_admin(pool, &principal.user_id).await?,
        _ => return Err(CoreError::forbidden("You do not have access to this resource")),
    };
    let mut conversions: Vec<Conversion> = rows
        .into_iter()
        .map(Conversion::from_row)
        .filter(|c| status.is_none_or(|s| s == c.status))
        .collect();
    conversions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(conversions)
}

async fn load_pending(pool: &DbPool, principal: &Principal, id: &str) -> CoreResult<Conversion> {
    require_role(principal, &[Role::Admin, Role::SuperAdmin])?;
    let conversion = Conversion::from_row(conversion_queries::get_conversion(pool, id).await?);
    authorize(principal, Action::Write, &Resource::Tenant { admin_id: &conversion.admin_id })?;
    if conversion.status != ConversionStatus::Pending {
        return Err(CoreError::transition(conversion.status.as_str(), "resolved"));
    }
    Ok(conversion)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedConversion {
    pub conversion: Conversion,
    pub lead: Lead,
    pub student: Student,
}

/// Approve a pending conversion: enroll the student, keep the lead's
/// counselor, mark the lead converted and notify the super-admin and the
/// new student.
pub async fn approve_conversion(
    pool: &DbPool,
    mailer: &dyn Mailer,
    principal: &Principal,
    id: &str,
) -> CoreResult<ApprovedConversion> {
    let mut conversion = load_pending(pool, principal, id).await?;
    let mut lead = Lead::from_row(queries::get_lead(pool, &conversion.lead_id).await?);
    let resumed = lead.stage == LeadStage::Converted;
    if !resumed && !lead.stage.can_transition_to(&LeadStage::Converted) {
        return Err(CoreError::transition(lead.stage.as_str(), LeadStage::Converted.as_str()));
    }

    let student = match prior_enrollment(pool, &lead).await? {
        Some(student) => {
            info!(lead_id = %lead.id, student_id = %student.id, "Resuming conversion with existing student");
            student
        }
        None => {
            enroll_student(
                pool,
                &lead.admin_id,
                &lead.name,
                &lead.email,
                Some(lead.mobile.clone()),
                lead.assigned_counselor_id.as_deref(),
                Some(&lead.id),
            )
            .await?
            .1
        }
    };

    let now = now_rfc3339();
    if !resumed {
        let previous = lead.to_row();
        lead.stage = LeadStage::Converted;
        lead.updated_at = now.clone();
        queries::update_lead(pool, &previous, &lead.to_row()).await?;
    }

    conversion.status = ConversionStatus::Approved;
    conversion.student_id = Some(student.id.clone());
    conversion.resolved_by = Some(principal.user_id.clone());
    conversion.resolved_at = Some(now);
    conversion_queries::update_conversion(pool, &conversion.to_row()).await?;

    info!(
        conversion_id = %conversion.id,
        lead_id = %lead.id,
        student_id = %student.id,
        "Conversion approved"
    );

    notify_approval(pool, mailer, &lead, &student).await;
    Ok(ApprovedConversion { conversion, lead, student })
}

/// The student an earlier, interrupted approval of this lead already enrolled.
async fn prior_enrollment(pool: &DbPool, lead: &Lead) -> CoreResult<Option<Student>> {
    let Some(user) = user_queries::find_user_by_email(pool, &lead.email).await? else {
        return Ok(None);
    };
    let user = User::from_row(user);
    let student = student_queries::find_student_by_user(pool, &user.id)
        .await?
        .map(Student::from_row);
    Ok(student.filter(|student| enrolled_from(&user, student, lead)))
}

fn enrolled_from(user: &User, student: &Student, lead: &Lead) -> bool {
    user.role == Role::Student
        && user.admin_id.as_deref() == Some(lead.admin_id.as_str())
        && student.user_id == user.id
        && student.lead_id.as_deref() == Some(lead.id.as_str())
}

async fn notify_approval(pool: &DbPool, mailer: &dyn Mailer, lead: &Lead, student: &Student) {
    let admin = match load_user(pool, &lead.admin_id).await {
        Ok(admin) => admin,
        Err(e) => {
            warn!(admin_id = %lead.admin_id, error = %e, "Conversion notifications skipped");
            return;
        }
    };
    let company_name = admin.company_name.as_deref();

    if let Some(super_admin_id) = admin.super_admin_id.as_deref() {
        match load_user(pool, super_admin_id).await {
            Ok(super_admin) => {
                let email = templates::conversion_approved(
                    &super_admin.email,
                    &templates::ConversionApproved {
                        recipient_name: &super_admin.name,
                        admin_name: &admin.name,
                        company_name,
                        lead_name: &lead.name,
                        student_email: &student.email,
                    },
                );
                deliver(mailer, email).await;
            }
            Err(e) => warn!(super_admin_id, error = %e, "Super-admin not found for conversion email"),
        }
    }

    let email = templates::student_welcome(
        &student.email,
        &templates::StudentWelcome {
            student_name: &student.name,
            student_email: &student.email,
            company_name,
        },
    );
    deliver(mailer, email).await;
}

async fn deliver(mailer: &dyn Mailer, rendered: CoreResult<crate::notify::EmailMessage>) {
    match rendered {
        Ok(email) => {
            send_logged(mailer, email).await;
        }
        Err(e) => warn!(error = %e, "Failed to render email"),
    }
}

pub async fn reject_conversion(
    pool: &DbPool,
    principal: &Principal,
    id: &str,
    reason: &str,
) -> CoreResult<Conversion> {
    require(reason, "Rejection reason")?;
    let mut conversion = load_pending(pool, principal, id).await?;
    conversion.status = ConversionStatus::Rejected;
    conversion.rejection_reason = Some(reason.trim().to_string());
    conversion.resolved_by = Some(principal.user_id.clone());
    conversion.resolved_at = Some(now_rfc3339());
    conversion_queries::update_conversion(pool, &conversion.to_row()).await?;

    info!(conversion_id = %conversion.id, lead_id = %conversion.lead_id, "Conversion rejected");
    Ok(conversion)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(counselor: Option<&str>) -> Lead {
        Lead {
            id: "lead-1".into(),
            admin_id: "adm".into(),
            name: "Ravi".into(),
            email: "ravi@example.com".into(),
            mobile: "+91 98765 43210".into(),
            city: None,
            service_types: vec!["study-abroad".into()],
            stage: LeadStage::Hot,
            assigned_counselor_id: counselor.map(Into::into),
            notes: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn enrolled(lead_id: Option<&str>) -> (User, Student) {
        let user = User {
            id: "usr-1".into(),
            role: Role::Student,
            name: "Ravi".into(),
            email: "ravi@example.com".into(),
            phone: None,
            admin_id: Some("adm".into()),
            super_admin_id: None,
            company_name: None,
            enquiry_slug: None,
            is_active: true,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let student = Student {
            id: "stu-1".into(),
            user_id: "usr-1".into(),
            admin_id: "adm".into(),
            counselor_id: None,
            lead_id: lead_id.map(Into::into),
            name: "Ravi".into(),
            email: "ravi@example.com".into(),
            phone: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        (user, student)
    }

    #[test]
    fn test_interrupted_approval_reuses_its_student() {
        let (user, student) = enrolled(Some("lead-1"));
        assert!(enrolled_from(&user, &student, &lead(None)));
    }

    #[test]
    fn test_unrelated_account_blocks_reuse() {
        let (user, student) = enrolled(Some("lead-9"));
        assert!(!enrolled_from(&user, &student, &lead(None)));

        let (user, student) = enrolled(None);
        assert!(!enrolled_from(&user, &student, &lead(None)));

        let (mut user, student) = enrolled(Some("lead-1"));
        user.admin_id = Some("adm-2".into());
        assert!(!enrolled_from(&user, &student, &lead(None)));

        let (mut user, student) = enrolled(Some("lead-1"));
        user.role = Role::Counselor;
        assert!(!enrolled_from(&user, &student, &lead(None)));
    }

    #[test]
    fn test_assigned_counselor_reads_and_writes() {
        let lead = lead(Some("cns"));
        let counselor = Principal::new("cns", Role::Counselor, Some("adm".into()));
        assert!(can(&counselor, Action::Read, &lead_resource(&lead)));
        assert!(can(&counselor, Action::Write, &lead_resource(&lead)));
        assert!(!can(&counselor, Action::Assign, &lead_resource(&lead)));
    }

    #[test]
    fn test_other_counselor_and_ops_are_denied() {
        let lead = lead(Some("cns"));
        let other = Principal::new("cns2", Role::Counselor, Some("adm".into()));
        let ops = Principal::new("ops", Role::Ops, Some("adm".into()));
        assert!(!can(&other, Action::Read, &lead_resource(&lead)));
        assert!(!can(&ops, Action::Read, &lead_resource(&lead)));
    }

    #[test]
    fn test_owning_admin_assigns() {
        let lead = lead(None);
        let admin = Principal::new("adm", Role::Admin, None);
        let stranger = Principal::new("adm2", Role::Admin, None);
        assert!(can(&admin, Action::Assign, &lead_resource(&lead)));
        assert!(!can(&stranger, Action::Read, &lead_resource(&lead)));
    }
}
