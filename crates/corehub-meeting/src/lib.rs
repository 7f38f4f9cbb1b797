//! Meeting link provisioning.
//!
//! The platform only needs two things from a meeting service: "create a
//! meeting and give me a join URL" and "delete that meeting". The
//! [`MeetingProvider`] trait captures exactly that; [`ZohoMeetingClient`] is
//! the production implementation.

pub mod clock;
pub mod token;
pub mod zoho;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use token::{AccessToken, TokenCache};
pub use zoho::{ZohoConfig, ZohoMeetingClient};

/// Meeting provider errors.
#[derive(Error, Debug)]
pub enum MeetingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Meeting API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Result type for meeting operations.
pub type MeetingResult<T> = Result<T, MeetingError>;

/// What to schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingRequest {
    pub topic: String,
    pub agenda: Option<String>,
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
    pub participants: Vec<String>,
}

/// A provisioned meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingLink {
    pub meeting_key: String,
    pub join_url: String,
}

/// Create/delete meetings on an external service.
#[async_trait]
pub trait MeetingProvider: Send + Sync {
    /// Create a meeting and return its join URL.
    async fn create_meeting(&self, request: &MeetingRequest) -> MeetingResult<MeetingLink>;

    /// Delete a previously created meeting.
    async fn delete_meeting(&self, meeting_key: &str) -> MeetingResult<()>;
}
