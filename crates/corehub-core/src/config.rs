//! Runtime configuration.
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables. Missing mail credentials fall back to a logging mailer and
//! missing Zoho credentials disable meeting provisioning.

use crate::error::{CoreError, CoreResult};
use corehub_meeting::ZohoConfig;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_JWT_SECRET: &str = "corehub-dev-secret";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub redis_url: String,
    pub auth: AuthConfig,
    pub mail: MailConfig,
    pub zoho: MeetingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub from: String,
}

/// Zoho Meeting credentials. Every credential must be present for the
/// provider to be enabled.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MeetingConfig {
    pub accounts_url: String,
    pub api_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub org_id: Option<String>,
    pub presenter_id: Option<String>,
    pub timezone: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            auth: AuthConfig::default(),
            mail: MailConfig::default(),
            zoho: MeetingConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { jwt_secret: DEFAULT_JWT_SECRET.to_string(), token_ttl_hours: 24 }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self { api_url: None, api_key: None, from: "no-reply@corehub.local".to_string() }
    }
}

impl Default for MeetingConfig {
    fn default() -> Self {
        Self {
            accounts_url: "https://accounts.zoho.com".to_string(),
            api_url: "https://meeting.zoho.com".to_string(),
            client_id: None,
            client_secret: None,
            refresh_token: None,
            org_id: None,
            presenter_id: None,
            timezone: "UTC".to_string(),
        }
    }
}

impl CoreConfig {
    /// Load from an optional TOML file, then apply the process environment.
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());

        if config.auth.jwt_secret == DEFAULT_JWT_SECRET {
            warn!("CORE_JWT_SECRET not set; using the development secret");
        }
        debug!(
            mail = config.mail.is_configured(),
            meetings = config.zoho.to_zoho().is_some(),
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> CoreResult<Self> {
        toml::from_str(raw).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Override fields from environment-style lookups. Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("REDIS_URL") {
            self.redis_url = v;
        }
        if let Some(v) = get("CORE_JWT_SECRET") {
            self.auth.jwt_secret = v;
        }
        if let Some(v) = get("CORE_JWT_TTL_HOURS") {
            match v.parse() {
                Ok(hours) => self.auth.token_ttl_hours = hours,
                Err(_) => warn!(value = %v, "Ignoring invalid CORE_JWT_TTL_HOURS"),
            }
        }
        if let Some(v) = get("CORE_MAIL_API_URL") {
            self.mail.api_url = Some(v);
        }
        if let Some(v) = get("CORE_MAIL_API_KEY") {
            self.mail.api_key = Some(v);
        }
        if let Some(v) = get("CORE_MAIL_FROM") {
            self.mail.from = v;
        }
        if let Some(v) = get("ZOHO_ACCOUNTS_URL") {
            self.zoho.accounts_url = v;
        }
        if let Some(v) = get("ZOHO_API_URL") {
            self.zoho.api_url = v;
        }
        if let Some(v) = get("ZOHO_CLIENT_ID") {
            self.zoho.client_id = Some(v);
        }
        if let Some(v) = get("ZOHO_CLIENT_SECRET") {
            self.zoho.client_secret = Some(v);
        }
        if let Some(v) = get("ZOHO_REFRESH_TOKEN") {
            self.zoho.refresh_token = Some(v);
        }
        if let Some(v) = get("ZOHO_ORG_ID") {
            self.zoho.org_id = Some(v);
        }
        if let Some(v) = get("ZOHO_PRESENTER_ID") {
            self.zoho.presenter_id = Some(v);
        }
        if let Some(v) = get("ZOHO_TIMEZONE") {
            self.zoho.timezone = v;
        }
    }
}

impl MailConfig {
    pub fn is_configured(&self) -> bool {
        self.api_url.is_some() && self.api_key.is_some()
    }
}

impl MeetingConfig {
    /// Provider settings, or `None` while any credential is missing.
    pub fn to_zoho(&self) -> Option<ZohoConfig> {
        Some(ZohoConfig {
            accounts_url: self.accounts_url.clone(),
            api_url: self.api_url.clone(),
            client_id: self.client_id.clone()?,
            client_secret: self.client_secret.clone()?,
            refresh_token: self.refresh_token.clone()?,
            org_id: self.org_id.clone()?,
            presenter_id: self.presenter_id.clone(),
            timezone: self.timezone.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = CoreConfig::default();
        assert_eq!(config.redis_url, DEFAULT_REDIS_URL);
        assert_eq!(config.auth.token_ttl_hours, 24);
        assert!(!config.mail.is_configured());
        assert!(config.zoho.to_zoho().is_none());
    }

    #[test]
    fn test_toml_then_env_override() {
        let mut config = CoreConfig::from_toml(
            r#"
            redis_url = "redis://cache:6379"

            [mail]
            api_url = "https://mail.example.com/send"
            from = "core@example.com"
            "#,
        )
        .unwrap();
        assert_eq!(config.redis_url, "redis://cache:6379");
        assert_eq!(config.mail.from, "core@example.com");
        assert!(!config.mail.is_configured());

        let env: HashMap<&str, &str> = HashMap::from([
            ("CORE_MAIL_API_KEY", "key-1"),
            ("CORE_JWT_TTL_HOURS", "8"),
            ("REDIS_URL", "  "),
        ]);
        config.apply_env(|name| env.get(name).map(|v| v.to_string()));

        assert!(config.mail.is_configured());
        assert_eq!(config.auth.token_ttl_hours, 8);
        assert_eq!(config.redis_url, "redis://cache:6379");
    }

    #[test]
    fn test_zoho_requires_every_credential() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("ZOHO_CLIENT_ID", "id"),
            ("ZOHO_CLIENT_SECRET", "secret"),
            ("ZOHO_REFRESH_TOKEN", "refresh"),
        ]);
        let mut config = CoreConfig::default();
        config.apply_env(|name| env.get(name).map(|v| v.to_string()));
        assert!(config.zoho.to_zoho().is_none());

        config.apply_env(|name| (name == "ZOHO_ORG_ID").then(|| "org-9".to_string()));
        let zoho = config.zoho.to_zoho().unwrap();
        assert_eq!(zoho.org_id, "org-9");
        assert_eq!(zoho.timezone, "UTC");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = CoreConfig::from_toml("redis_url = [").unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }
}
