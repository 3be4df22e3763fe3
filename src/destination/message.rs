//! Channel types and the message envelope routed by the registry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::email::EmailMessage;
use super::webhook::{CustomWebhookMessage, WebhookMessage};

/// Notification channel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationType {
    /// Amazon Chime incoming webhook.
    Chime,
    /// Slack incoming webhook.
    Slack,
    /// Arbitrary HTTP endpoint.
    CustomWebhook,
    /// SMTP email.
    Email,
}

impl DestinationType {
    /// All channel types.
    pub const ALL: [Self; 4] = [Self::Chime, Self::Slack, Self::CustomWebhook, Self::Email];

    /// Wire name of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chime => "chime",
            Self::Slack => "slack",
            Self::CustomWebhook => "custom_webhook",
            Self::Email => "email",
        }
    }

    /// True for channels delivered over HTTP.
    #[must_use]
    pub const fn is_webhook(self) -> bool {
        !matches!(self, Self::Email)
    }
}

impl fmt::Display for DestinationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DestinationType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::UnknownDestinationType {
                value: s.to_string(),
            })
    }
}

/// A validated message for any channel.
///
/// Built from the per-channel builders; immutable afterwards.
#[derive(Debug)]
pub enum DestinationMessage {
    /// SMTP email.
    Email(EmailMessage),
    /// Slack or Chime webhook.
    Webhook(WebhookMessage),
    /// Custom HTTP endpoint.
    CustomWebhook(CustomWebhookMessage),
}

impl DestinationMessage {
    /// Channel type used for factory lookup.
    #[must_use]
    pub fn destination_type(&self) -> DestinationType {
        match self {
            Self::Email(_) => DestinationType::Email,
            Self::Webhook(m) => m.destination_type(),
            Self::CustomWebhook(_) => DestinationType::CustomWebhook,
        }
    }

    /// Channel (destination) name.
    #[must_use]
    pub fn channel_name(&self) -> &str {
        match self {
            Self::Email(m) => m.channel_name(),
            Self::Webhook(m) => m.channel_name(),
            Self::CustomWebhook(m) => m.channel_name(),
        }
    }

    /// Message body.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Email(m) => m.message(),
            Self::Webhook(m) => m.message(),
            Self::CustomWebhook(m) => m.message(),
        }
    }
}

impl From<EmailMessage> for DestinationMessage {
    fn from(message: EmailMessage) -> Self {
        Self::Email(message)
    }
}

impl From<WebhookMessage> for DestinationMessage {
    fn from(message: WebhookMessage) -> Self {
        Self::Webhook(message)
    }
}

impl From<CustomWebhookMessage> for DestinationMessage {
    fn from(message: CustomWebhookMessage) -> Self {
        Self::CustomWebhook(message)
    }
}

/// Trims `value` and drops it if nothing is left.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Shared check for the channel name and body, in that order.
pub(crate) fn validate_common(
    channel_name: &str,
    message: Option<String>,
) -> Result<(String, String), ValidationError> {
    let channel_name = channel_name.trim();
    if channel_name.is_empty() {
        return Err(ValidationError::MissingChannelName);
    }
    let message = message
        .filter(|m| !m.trim().is_empty())
        .ok_or(ValidationError::MissingMessage)?;
    Ok((channel_name.to_string(), message))
}
