use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::{body_with_links, AlertSink};
use crate::{lib::errors::AlertError, models::AlertPayload};

const SUBJECT_PREFIX: &str = "[Verefy Infra Alert]";

/// SMTP account used for fallback delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSettings {
    pub address: String,
    pub app_password: String,
    pub recipients: Vec<String>,
    pub smtp_host: String,
    pub smtp_port: u16,
}

/// Sends alerts over SMTP with implicit TLS.
pub struct EmailClient {
    sender: Mailbox,
    recipients: Vec<Mailbox>,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

fn mailbox(address: &str) -> Result<Mailbox, AlertError> {
    address
        .parse::<Mailbox>()
        .map_err(|err| AlertError::EmailAddress {
            address: address.to_string(),
            message: err.to_string(),
        })
}

impl EmailClient {
    pub fn new(settings: &EmailSettings) -> Result<Self, AlertError> {
        let sender = mailbox(&settings.address)?;
        let recipients = settings
            .recipients
            .iter()
            .map(|recipient| mailbox(recipient))
            .collect::<Result<Vec<_>, _>>()?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host)
            .map_err(|err| AlertError::Smtp {
                message: err.to_string(),
            })?
            .port(settings.smtp_port)
            .credentials(Credentials::new(
                settings.address.clone(),
                settings.app_password.clone(),
            ))
            .build();
        Ok(Self {
            sender,
            recipients,
            transport,
        })
    }

    fn compose(&self, payload: &AlertPayload) -> Result<Message, AlertError> {
        let mut builder = Message::builder()
            .from(self.sender.clone())
            .subject(format!(
                "{SUBJECT_PREFIX} {}: {}",
                payload.level.as_str(),
                payload.title
            ))
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }
        builder
            .body(body_with_links(payload))
            .map_err(|err| AlertError::EmailBuild {
                message: err.to_string(),
            })
    }
}

#[async_trait]
impl AlertSink for EmailClient {
    fn channel(&self) -> &'static str {
        "email"
    }

    async fn send(&self, payload: &AlertPayload) -> Result<(), AlertError> {
        let message = self.compose(payload)?;
        self.transport
            .send(message)
            .await
            .map_err(|err| AlertError::Smtp {
                message: err.to_string(),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::AlertLevel;

    fn settings(recipients: &[&str]) -> EmailSettings {
        EmailSettings {
            address: "alerts@example.com".into(),
            app_password: "app-password".into(),
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
            smtp_host: "smtp.example.com".into(),
            smtp_port: 465,
        }
    }

    #[test]
    fn compose_sets_subject_recipients_and_links() {
        let client = EmailClient::new(&settings(&["ops@example.com", "oncall@example.com"]))
            .expect("client");
        let payload = AlertPayload {
            alert_id: "a1".into(),
            source: "watchdog".into(),
            level: AlertLevel::Warning,
            title: "Monitor watchdog".into(),
            body: "No successful run".into(),
            links: vec!["https://status.example.com".into()],
            created_at: Utc.with_ymd_and_hms(2026, 2, 7, 10, 0, 0).unwrap(),
            tags: Vec::new(),
        };

        let formatted = String::from_utf8(client.compose(&payload).expect("message").formatted())
            .expect("utf-8 message");

        assert!(formatted.contains("Subject: [Verefy Infra Alert] warning: Monitor watchdog"));
        assert!(formatted.contains("ops@example.com"));
        assert!(formatted.contains("oncall@example.com"));
        assert!(formatted.contains("No successful run"));
        assert!(formatted.contains("https://status.example.com"));
    }

    #[test]
    fn invalid_recipient_is_rejected() {
        let err = EmailClient::new(&settings(&["not an address"])).err();
        assert!(matches!(err, Some(AlertError::EmailAddress { .. })));
    }
}
