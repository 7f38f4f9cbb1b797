//! CORE Web Server
//!
//! Axum REST API. Every route under `/api` except the health check and the
//! public enquiry pages needs a bearer token; each role prefix is gated to
//! its role.

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use corehub_core::access::Role;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use routes::{
    accounts, documents, enquiry, followups, health, leads, registrations, schedules, services,
    teammeets,
};
use state::AppState;

const ADMIN: &[Role] = &[Role::Admin];
const SUPER_ADMIN: &[Role] = &[Role::SuperAdmin];
const OPS: &[Role] = &[Role::Ops];
const COUNSELOR: &[Role] = &[Role::Counselor];
const STUDENT: &[Role] = &[Role::Student];

/// Which write methods a prefix adds to the shared registration paths.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Scope {
    Member,
    Tenant,
    Platform,
}

/// Registration browsing, answers and uploads.
fn registration_routes(router: Router<AppState>, scope: Scope) -> Router<AppState> {
    let registrations = match scope {
        Scope::Member => get(registrations::list_registrations),
        Scope::Tenant | Scope::Platform => {
            get(registrations::list_registrations).post(registrations::create_registration)
        }
    };
    let catalogue = match scope {
        Scope::Platform => get(services::list_services).post(services::create_service),
        Scope::Member | Scope::Tenant => get(services::list_services),
    };
    router
        .route("/services", catalogue)
        .route("/services/{id}/form-structure", get(services::form_structure))
        .route("/registrations", registrations)
        .route("/registrations/{id}", get(registrations::get_registration))
        .route("/registrations/{id}/answers", get(registrations::get_answers))
        .route("/registrations/{id}/answers/{part}", put(registrations::save_part))
        .route("/registrations/{id}/answers/{part}/field", patch(registrations::update_field))
        .route(
            "/registrations/{id}/documents",
            get(documents::list_documents).post(documents::upload_document),
        )
        .route(
            "/registrations/{id}/document-fields",
            get(documents::registration_document_fields),
        )
}

fn review_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/document-fields",
            get(documents::list_document_fields).post(documents::create_document_field),
        )
        .route("/documents/{id}/approve", post(documents::approve_document))
        .route("/documents/{id}/reject", post(documents::reject_document))
}

/// Tenant administration shared by admins and super-admins.
fn management_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/users", get(accounts::list_users).post(accounts::create_user))
        .route("/students", get(accounts::list_students).post(accounts::create_student))
        .route("/students/{id}", get(accounts::get_student))
        .route("/students/{id}/counselor", put(accounts::assign_student_counselor))
        .route("/registrations/{id}/ops", put(registrations::assign_ops))
        .route("/registrations/{id}/status", put(registrations::update_status))
        .route("/forms/parts", post(services::create_part))
        .route("/forms/sections", post(services::create_section))
        .route("/forms/sub-sections", post(services::create_sub_section))
        .route("/forms/fields", post(services::create_field))
        .route("/leads/{id}/counselor", put(leads::assign_counselor))
        .route("/conversions", get(leads::list_conversions))
        .route("/conversions/{id}/approve", post(leads::approve_conversion))
        .route("/conversions/{id}/reject", post(leads::reject_conversion))
}

fn lead_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/leads", get(leads::list_leads))
        .route("/leads/{id}", get(leads::get_lead))
        .route("/leads/{id}/stage", put(leads::update_stage))
        .route("/leads/{id}/conversion", post(leads::request_conversion))
}

fn schedule_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/schedules", get(schedules::list_schedules).post(schedules::create_schedule))
        .route("/schedules/{id}/status", put(schedules::update_status))
        .route("/schedules/check-availability", post(schedules::check_availability))
}

fn follow_up_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/follow-ups", get(followups::list_follow_ups).post(followups::create_follow_up))
        .route("/follow-ups/{id}/status", put(followups::update_status))
        .route("/follow-ups/check-availability", post(followups::check_availability))
}

fn team_meet_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/team-meets", get(teammeets::list_team_meets).post(teammeets::request_team_meet))
        .route("/team-meets/check-availability", post(teammeets::check_availability))
        .route("/team-meets/{id}", get(teammeets::get_team_meet))
        .route("/team-meets/{id}/accept", post(teammeets::accept))
        .route("/team-meets/{id}/reject", post(teammeets::reject))
        .route("/team-meets/{id}/cancel", post(teammeets::cancel))
        .route("/team-meets/{id}/complete", post(teammeets::complete))
}

fn gated(router: Router<AppState>, roles: &'static [Role]) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(roles, auth::require_roles))
}

fn role_routes() -> Router<AppState> {
    let admin = {
        let r = registration_routes(Router::new(), Scope::Tenant);
        let r = review_routes(management_routes(r));
        let r = lead_routes(r);
        let r = schedule_routes(follow_up_routes(r));
        team_meet_routes(r)
    };

    let super_admin = {
        let r = registration_routes(Router::new(), Scope::Platform);
        let r = lead_routes(review_routes(management_routes(r)));
        r.route("/admins", get(accounts::list_admins).post(accounts::create_admin))
            .route("/schedules", get(schedules::list_schedules))
            .route("/follow-ups", get(followups::list_follow_ups))
    };

    let ops = {
        let r = registration_routes(Router::new(), Scope::Member);
        let r = review_routes(r)
            .route("/registrations/{id}/active-ops", put(registrations::switch_active_ops));
        team_meet_routes(schedule_routes(r))
    };

    let counselor = {
        let r = registration_routes(Router::new(), Scope::Member)
            .route("/students", get(accounts::list_students))
            .route("/students/{id}", get(accounts::get_student));
        team_meet_routes(follow_up_routes(lead_routes(r)))
    };

    let student = registration_routes(Router::new(), Scope::Member);

    Router::new()
        .nest("/admin", gated(admin, ADMIN))
        .nest("/super-admin", gated(super_admin, SUPER_ADMIN))
        .nest("/ops", gated(ops, OPS))
        .nest("/counselor", gated(counselor, COUNSELOR))
        .nest("/student", gated(student, STUDENT))
}

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = role_routes()
        .layer(middleware::from_fn_with_state(state.auth.clone(), auth::authenticate));

    let public = Router::new()
        .route("/health", get(health::health))
        .route("/enquiry/{slug}", get(enquiry::enquiry_info).post(enquiry::submit_enquiry));

    Router::new()
        .nest("/api", public.merge(protected))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Run the web server.
pub async fn run_server(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    tracing::info!("CORE API listening on http://{}:{}", host, port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_routes_build_for_every_prefix() {
        // Overlapping paths or methods panic while the table is assembled.
        let _routes: Router<AppState> = role_routes();
    }

    #[test]
    fn test_shared_registration_routes_merge_scopes() {
        for scope in [Scope::Member, Scope::Tenant, Scope::Platform] {
            let _routes: Router<AppState> = registration_routes(Router::new(), scope);
        }
    }
}
