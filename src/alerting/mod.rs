//! Alert delivery channels and the retry schedule for failed deliveries.

use async_trait::async_trait;

use crate::{lib::errors::AlertError, models::AlertPayload};

pub mod delivery;
pub mod email;
pub mod slack;

pub use delivery::{deliver_alert, RetryPlan};
pub use email::{EmailClient, EmailSettings};
pub use slack::SlackClient;

/// A destination that accepts alerts.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Short channel name used in logs.
    fn channel(&self) -> &'static str;

    async fn send(&self, payload: &AlertPayload) -> Result<(), AlertError>;
}

/// Alert body followed by its links, separated by a blank line.
pub(crate) fn body_with_links(payload: &AlertPayload) -> String {
    let parts = [payload.body.clone(), payload.links.join("\n")];
    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
