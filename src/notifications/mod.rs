use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Mail transport error: {0}")]
    Transport(String),
    #[error("Mail delivery rejected: {0}")]
    Rejected(String),
}

/// Outbound mail delivery seam. The only message this system sends is the
/// magic-link sign-in email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_magic_link(&self, recipient: &str, link: &str) -> Result<(), MailerError>;
}

/// Delivers mail by POSTing to an HTTP relay endpoint (the deployment's
/// transactional-mail service).
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    from: String,
}

impl HttpMailer {
    pub fn new(endpoint: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    #[instrument(skip(self, link))]
    async fn send_magic_link(&self, recipient: &str, link: &str) -> Result<(), MailerError> {
        let body = json!({
            "from": self.from,
            "to": recipient,
            "subject": "Sign in to Nubras",
            "text": format!(
                "Open this link to sign in:\n\n{}\n\nThe link expires shortly and can be used once.",
                link
            ),
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| MailerError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MailerError::Rejected(format!(
                "relay returned {}",
                response.status()
            )));
        }

        info!(recipient = %recipient, "Magic link email delivered");
        Ok(())
    }
}

/// Logs the link instead of sending it. Used in development and tests,
/// and as the fallback when no relay endpoint is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_magic_link(&self, recipient: &str, link: &str) -> Result<(), MailerError> {
        info!(recipient = %recipient, link = %link, "Magic link issued (log-only mailer)");
        Ok(())
    }
}

/// Picks the mailer implied by configuration.
pub fn mailer_from_config(cfg: &AppConfig) -> Arc<dyn Mailer> {
    match &cfg.mail_endpoint {
        Some(endpoint) => {
            info!(endpoint = %endpoint, "Outbound mail via HTTP relay");
            Arc::new(HttpMailer::new(endpoint.clone(), cfg.mail_from.clone()))
        }
        None => {
            info!("No mail endpoint configured; magic links will be logged only");
            Arc::new(LogMailer)
        }
    }
}
