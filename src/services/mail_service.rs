// ==================== OUTGOING MAIL ====================
// Verification, invitation and direct-message emails go through a Mailer.
// `outbox` logs and keeps the last messages in memory; `webhook` POSTs them
// as JSON to a relay.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::utils::error::AppError;

const OUTBOX_CAPACITY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MailKind {
    Verification,
    Invitation,
    RecipeInvitation,
    DirectMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingMail {
    pub kind: MailKind,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    pub fn verification(to: &str, link: &str) -> Self {
        OutgoingMail {
            kind: MailKind::Verification,
            to: to.to_string(),
            subject: "Verify your email address".to_string(),
            body: format!(
                "Please confirm your email address to access all features:\n{}",
                link
            ),
        }
    }

    pub fn invitation(to: &str, role: &str, link: &str) -> Self {
        OutgoingMail {
            kind: MailKind::Invitation,
            to: to.to_string(),
            subject: "You're invited to join".to_string(),
            body: format!(
                "You have been invited to join as '{}'. Create your account here:\n{}",
                role, link
            ),
        }
    }

    pub fn recipe_invitation(to: &str, recipe_title: &str, link: &str) -> Self {
        OutgoingMail {
            kind: MailKind::RecipeInvitation,
            to: to.to_string(),
            subject: format!("You're invited to \"{}\"", recipe_title),
            body: format!("Open the recipe and accept the invitation:\n{}", link),
        }
    }

    pub fn direct_message(to: &str, subject: &str, body: &str) -> Self {
        OutgoingMail {
            kind: MailKind::DirectMessage,
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), AppError>;
}

/// Logs each message and retains the most recent ones
#[derive(Default)]
pub struct OutboxMailer {
    sent: Mutex<VecDeque<OutgoingMail>>,
}

impl OutboxMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent
            .lock()
            .map(|sent| sent.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn count(&self, kind: MailKind) -> usize {
        self.sent
            .lock()
            .map(|sent| sent.iter().filter(|m| m.kind == kind).count())
            .unwrap_or(0)
    }

    pub fn count_to(&self, kind: MailKind, to: &str) -> usize {
        self.sent
            .lock()
            .map(|sent| sent.iter().filter(|m| m.kind == kind && m.to == to).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), AppError> {
        log::info!("📧 [{:?}] to={} subject=\"{}\"", mail.kind, mail.to, mail.subject);

        let mut sent = self
            .sent
            .lock()
            .map_err(|_| AppError::Upstream("outbox lock poisoned".to_string()))?;
        if sent.len() == OUTBOX_CAPACITY {
            sent.pop_front();
        }
        sent.push_back(mail.clone());
        Ok(())
    }
}

/// Relays mail as JSON to an HTTP endpoint
pub struct WebhookMailer {
    client: reqwest::Client,
    url: String,
}

impl WebhookMailer {
    pub fn new(url: &str) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Upstream(format!("Failed to build HTTP client: {}", e)))?;

        Ok(WebhookMailer {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), AppError> {
        let response = self
            .client
            .post(&self.url)
            .json(mail)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Mail relay unreachable: {}", e)))?;

        if !response.status().is_success() {
            log::error!("❌ Mail relay returned {} for {}", response.status(), mail.to);
            return Err(AppError::Upstream(format!(
                "Mail relay returned {}",
                response.status()
            )));
        }

        log::info!("📧 Relayed [{:?}] mail to {}", mail.kind, mail.to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_outbox_counts_by_kind_and_recipient() {
        let outbox = OutboxMailer::new();
        outbox.send(&OutgoingMail::verification("a@x.io", "http://l")).await.unwrap();
        outbox.send(&OutgoingMail::verification("a@x.io", "http://l")).await.unwrap();
        outbox.send(&OutgoingMail::direct_message("b@x.io", "Hi", "there")).await.unwrap();

        assert_eq!(outbox.count(MailKind::Verification), 2);
        assert_eq!(outbox.count_to(MailKind::Verification, "b@x.io"), 0);
        assert_eq!(outbox.count_to(MailKind::DirectMessage, "b@x.io"), 1);
        assert_eq!(outbox.sent().len(), 3);
    }

    #[test]
    fn test_invitation_body_mentions_role() {
        let mail = OutgoingMail::invitation("c@x.io", "admin", "http://join");
        assert!(mail.body.contains("'admin'"));
        assert!(mail.body.contains("http://join"));
    }
}
