//! Route handlers.

pub mod accounts;
pub mod documents;
pub mod enquiry;
pub mod followups;
pub mod health;
pub mod leads;
pub mod registrations;
pub mod schedules;
pub mod services;
pub mod teammeets;

use serde::Deserialize;

/// Body of reject endpoints.
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    #[serde(default, alias = "reason")]
    pub message: String,
}
