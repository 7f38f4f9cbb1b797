//! Application state.

use crate::auth::AuthKeys;
use corehub_core::config::CoreConfig;
use corehub_core::notify::{mailer_from_config, Mailer};
use corehub_core::DbPool;
use corehub_meeting::{MeetingProvider, ZohoMeetingClient};
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub auth: Arc<AuthKeys>,
    pub mailer: Arc<dyn Mailer>,
    pub meetings: Option<Arc<dyn MeetingProvider>>,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: &CoreConfig) -> Self {
        let meetings = match config.zoho.to_zoho() {
            Some(zoho) => Some(Arc::new(ZohoMeetingClient::new(zoho)) as Arc<dyn MeetingProvider>),
            None => {
                tracing::warn!("Zoho credentials not configured; online meetings are disabled");
                None
            }
        };
        Self {
            db,
            auth: Arc::new(AuthKeys::new(&config.auth.jwt_secret, config.auth.token_ttl_hours)),
            mailer: mailer_from_config(&config.mail),
            meetings,
        }
    }

    pub fn meetings(&self) -> Option<&dyn MeetingProvider> {
        self.meetings.as_deref()
    }
}
