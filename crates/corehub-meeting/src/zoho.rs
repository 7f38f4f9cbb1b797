//! Zoho Meeting client.
//!
//! Uses the OAuth2 refresh-token grant for access tokens and the sessions
//! API for meetings. Response shapes vary between API versions, so join URLs
//! and meeting keys are probed under several names.

use crate::clock::{Clock, SystemClock};
use crate::token::TokenCache;
use crate::{MeetingError, MeetingLink, MeetingProvider, MeetingRequest, MeetingResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default accounts (OAuth) URL.
pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.zoho.com";

/// Default Meeting API URL.
pub const DEFAULT_API_URL: &str = "https://meeting.zoho.com";

const JOIN_URL_FIELDS: &[&str] = &["joinLink", "joinUrl", "join_url", "meetingLink", "joinURL"];
const MEETING_KEY_FIELDS: &[&str] = &["meetingKey", "meeting_key", "key", "sessionKey", "meetingId"];

/// Zoho credentials and endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZohoConfig {
    pub accounts_url: String,
    pub api_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub org_id: String,
    pub presenter_id: Option<String>,
    pub timezone: String,
}

/// Zoho Meeting API client.
pub struct ZohoMeetingClient {
    config: ZohoConfig,
    client: reqwest::Client,
    tokens: TokenCache,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    error: Option<String>,
}

impl ZohoMeetingClient {
    pub fn new(config: ZohoConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: ZohoConfig, clock: Arc<dyn Clock>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        let config = ZohoConfig {
            accounts_url: config.accounts_url.trim_end_matches('/').to_string(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            ..config
        };

        Self { config, client, tokens: TokenCache::new(clock) }
    }

    async fn access_token(&self) -> MeetingResult<String> {
        self.tokens.get_or_refresh(|| self.refresh_access_token()).await
    }

    async fn refresh_access_token(&self) -> MeetingResult<(String, i64)> {
        let url = format!("{}/oauth/v2/token", self.config.accounts_url);
        debug!(url = %url, "Refreshing Zoho access token");

        let response = self
            .client
            .post(&url)
            .query(&[
                ("refresh_token", self.config.refresh_token.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MeetingError::Auth(format!("token endpoint returned {}: {}", status, body)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| MeetingError::UnexpectedResponse(e.to_string()))?;

        match token.access_token {
            Some(value) => Ok((value, token.expires_in.unwrap_or(3600))),
            None => Err(MeetingError::Auth(
                token.error.unwrap_or_else(|| "no access_token in response".to_string()),
            )),
        }
    }

    fn session_body(&self, request: &MeetingRequest) -> Value {
        let participants: Vec<Value> = request
            .participants
            .iter()
            .map(|email| json!({ "email": email }))
            .collect();

        let mut session = json!({
            "topic": request.topic,
            "agenda": request.agenda.clone().unwrap_or_default(),
            "startTime": request.start.format("%b %d, %Y %I:%M %p").to_string(),
            "duration": u64::from(request.duration_minutes) * 60 * 1000,
            "timezone": self.config.timezone,
            "participants": participants,
        });
        if let Some(ref presenter) = self.config.presenter_id {
            session["presenter"] = json!(presenter);
        }
        json!({ "session": session })
    }
}

/// Look up the first present field among `names`, at the top level or under
/// the usual wrapper objects. Numbers are accepted and stringified.
pub fn probe_field(body: &Value, names: &[&str]) -> Option<String> {
    let scopes = [Some(body), body.get("session"), body.get("data"), body.get("meeting")];
    for scope in scopes.into_iter().flatten() {
        for name in names {
            match scope.get(*name) {
                Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
                Some(Value::Number(n)) => return Some(n.to_string()),
                _ => {}
            }
        }
    }
    None
}

#[async_trait]
impl MeetingProvider for ZohoMeetingClient {
    async fn create_meeting(&self, request: &MeetingRequest) -> MeetingResult<MeetingLink> {
        let token = self.access_token().await?;
        let url = format!("{}/api/v2/{}/sessions.json", self.config.api_url, self.config.org_id);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Zoho-oauthtoken {}", token))
            .json(&self.session_body(request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            if status == 401 {
                self.tokens.invalidate().await;
            }
            let body = response.text().await.unwrap_or_default();
            return Err(MeetingError::Api { status, body });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| MeetingError::UnexpectedResponse(e.to_string()))?;

        let join_url = probe_field(&body, JOIN_URL_FIELDS)
            .ok_or_else(|| MeetingError::UnexpectedResponse(format!("no join URL in {}", body)))?;
        let meeting_key = probe_field(&body, MEETING_KEY_FIELDS)
            .ok_or_else(|| MeetingError::UnexpectedResponse(format!("no meeting key in {}", body)))?;

        info!(meeting_key = %meeting_key, topic = %request.topic, "Meeting created");
        Ok(MeetingLink { meeting_key, join_url })
    }

    async fn delete_meeting(&self, meeting_key: &str) -> MeetingResult<()> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/api/v2/{}/sessions/{}.json",
            self.config.api_url, self.config.org_id, meeting_key
        );

        let response = self
            .client
            .delete(&url)
            .header("Authorization", format!("Zoho-oauthtoken {}", token))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(meeting_key, status, "Meeting deletion rejected");
            return Err(MeetingError::Api { status, body });
        }

        info!(meeting_key, "Meeting deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_nested_session() {
        let body = json!({ "session": { "joinLink": "https://meet/j/1", "meetingKey": 1044 } });
        assert_eq!(probe_field(&body, JOIN_URL_FIELDS).as_deref(), Some("https://meet/j/1"));
        assert_eq!(probe_field(&body, MEETING_KEY_FIELDS).as_deref(), Some("1044"));
    }

    #[test]
    fn test_probe_alternate_names() {
        let body = json!({ "data": { "join_url": "https://meet/j/2" }, "key": "abc" });
        assert_eq!(probe_field(&body, JOIN_URL_FIELDS).as_deref(), Some("https://meet/j/2"));
        assert_eq!(probe_field(&body, MEETING_KEY_FIELDS).as_deref(), Some("abc"));
    }

    #[test]
    fn test_probe_ignores_empty_strings() {
        let body = json!({ "joinLink": "", "session": { "joinUrl": "https://meet/j/3" } });
        assert_eq!(probe_field(&body, JOIN_URL_FIELDS).as_deref(), Some("https://meet/j/3"));
        assert_eq!(probe_field(&json!({}), JOIN_URL_FIELDS), None);
    }
}
