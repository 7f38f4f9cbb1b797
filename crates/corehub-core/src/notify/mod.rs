//! Outgoing email.
//!
//! Delivery never decides the outcome of a business operation: callers use
//! [`send_logged`], which reports failures through `tracing` and moves on.

pub mod http;
pub mod templates;

use crate::config::MailConfig;
use crate::error::CoreResult;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

pub use http::HttpMailer;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> CoreResult<()>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> CoreResult<()> {
        info!(to = %message.to, subject = %message.subject, "Email not delivered (mail API not configured)");
        Ok(())
    }
}

/// Send and log the outcome. Returns whether delivery succeeded.
pub async fn send_logged(mailer: &dyn Mailer, message: EmailMessage) -> bool {
    match mailer.send(&message).await {
        Ok(()) => {
            info!(to = %message.to, subject = %message.subject, "Email sent");
            true
        }
        Err(e) => {
            warn!(to = %message.to, subject = %message.subject, error = %e, "Email delivery failed");
            false
        }
    }
}

/// HTTP mailer when credentials are configured, otherwise the log mailer.
pub fn mailer_from_config(config: &MailConfig) -> Arc<dyn Mailer> {
    match (&config.api_url, &config.api_key) {
        (Some(url), Some(key)) => Arc::new(HttpMailer::new(url, key, &config.from)),
        _ => {
            warn!("Mail API not configured; emails will only be logged");
            Arc::new(LogMailer)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Keeps sent messages in memory.
    #[derive(Default)]
    pub struct MemoryMailer {
        pub fail: bool,
        pub sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl Mailer for MemoryMailer {
        async fn send(&self, message: &EmailMessage) -> CoreResult<()> {
            if self.fail {
                return Err(crate::CoreError::Mail("smtp down".into()));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemoryMailer;
    use super::*;

    fn message() -> EmailMessage {
        EmailMessage {
            to: "asha@example.com".into(),
            subject: "Hello".into(),
            html: "<p>Hi</p>".into(),
            text: "Hi".into(),
        }
    }

    #[tokio::test]
    async fn test_send_logged_reports_outcome() {
        let ok = MemoryMailer::default();
        assert!(send_logged(&ok, message()).await);
        assert_eq!(ok.sent.lock().unwrap().len(), 1);

        let failing = MemoryMailer { fail: true, ..Default::default() };
        assert!(!send_logged(&failing, message()).await);
    }

    #[test]
    fn test_mailer_selection() {
        let _log = mailer_from_config(&MailConfig::default());
        let _http = mailer_from_config(&MailConfig {
            api_url: Some("https://mail.example.com/send".into()),
            api_key: Some("key".into()),
            from: "core@example.com".into(),
        });
    }
}
