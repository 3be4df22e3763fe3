//! Per-channel factories that own a client and publish messages.

use std::sync::Arc;

use crate::config::NotificationConfig;
use crate::error::{AlertingResult, ConfigurationError};

use super::client::{DestinationEmailClient, DestinationHttpClient};
use super::message::{DestinationMessage, DestinationType};
use super::response::DestinationResponse;

/// Publishes messages of one channel type.
///
/// Transport failures are reported as a failed [`DestinationResponse`],
/// never as `Err`. `Err` is reserved for routing mistakes, such as a
/// message of the wrong type.
pub trait DestinationFactory: Send + Sync {
    /// Channel type this factory handles.
    fn destination_type(&self) -> DestinationType;

    /// Sends `message` through this factory's client.
    fn publish(&self, message: &DestinationMessage) -> AlertingResult<DestinationResponse>;
}

fn mismatch(expected: DestinationType, message: &DestinationMessage) -> ConfigurationError {
    ConfigurationError::MessageTypeMismatch {
        expected,
        actual: message.destination_type(),
    }
}

/// Factory for email destinations.
#[derive(Debug, Clone)]
pub struct EmailDestinationFactory {
    client: Arc<DestinationEmailClient>,
}

impl EmailDestinationFactory {
    /// Creates a factory sharing `client` across sends.
    #[must_use]
    pub fn new(client: DestinationEmailClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Factory backed by SMTP.
    #[must_use]
    pub fn smtp(config: &NotificationConfig) -> Self {
        Self::new(DestinationEmailClient::smtp(config))
    }

    /// Shared client.
    #[must_use]
    pub fn client(&self) -> &DestinationEmailClient {
        &self.client
    }
}

impl DestinationFactory for EmailDestinationFactory {
    fn destination_type(&self) -> DestinationType {
        DestinationType::Email
    }

    fn publish(&self, message: &DestinationMessage) -> AlertingResult<DestinationResponse> {
        let DestinationMessage::Email(email) = message else {
            return Err(mismatch(DestinationType::Email, message).into());
        };

        match self.client.execute(email) {
            Ok(content) => {
                tracing::info!(
                    channel = email.channel_name(),
                    recipients = email.recipients().len(),
                    "email sent"
                );
                Ok(DestinationResponse::success(content))
            }
            Err(err) => {
                tracing::warn!(channel = email.channel_name(), error = %err, "email send failed");
                Ok(DestinationResponse::transport_failure(&err))
            }
        }
    }
}

/// Factory for one webhook channel type (Slack, Chime or custom).
#[derive(Debug, Clone)]
pub struct WebhookDestinationFactory {
    destination_type: DestinationType,
    client: Arc<DestinationHttpClient>,
}

impl WebhookDestinationFactory {
    /// Creates a factory for `destination_type`, which must be a webhook type.
    pub fn new(
        destination_type: DestinationType,
        client: DestinationHttpClient,
    ) -> Result<Self, ConfigurationError> {
        Self::shared(destination_type, Arc::new(client))
    }

    /// Like [`new`](Self::new) but shares an existing client.
    pub fn shared(
        destination_type: DestinationType,
        client: Arc<DestinationHttpClient>,
    ) -> Result<Self, ConfigurationError> {
        if !destination_type.is_webhook() {
            return Err(ConfigurationError::Invalid {
                reason: format!("{destination_type} is not a webhook destination"),
            });
        }
        Ok(Self {
            destination_type,
            client,
        })
    }

    /// Shared client.
    #[must_use]
    pub fn client(&self) -> &DestinationHttpClient {
        &self.client
    }
}

impl DestinationFactory for WebhookDestinationFactory {
    fn destination_type(&self) -> DestinationType {
        self.destination_type
    }

    fn publish(&self, message: &DestinationMessage) -> AlertingResult<DestinationResponse> {
        if message.destination_type() != self.destination_type {
            return Err(mismatch(self.destination_type, message).into());
        }

        match self.client.execute(message) {
            Ok(resp) => {
                let response = DestinationResponse::new(i32::from(resp.status), resp.body);
                if response.is_success() {
                    tracing::info!(
                        channel = message.channel_name(),
                        destination_type = %self.destination_type,
                        status = resp.status,
                        "webhook delivered"
                    );
                } else {
                    tracing::warn!(
                        channel = message.channel_name(),
                        destination_type = %self.destination_type,
                        status = resp.status,
                        "webhook returned error status"
                    );
                }
                Ok(response)
            }
            Err(err) => {
                tracing::warn!(
                    channel = message.channel_name(),
                    destination_type = %self.destination_type,
                    error = %err,
                    "webhook send failed"
                );
                Ok(DestinationResponse::transport_failure(&err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::client::{HttpRequest, HttpResponse, HttpTransport, MailTransport};
    use crate::destination::email::EmailMessage;
    use crate::destination::response::STATUS_TRANSPORT_FAILURE;
    use crate::destination::webhook::WebhookMessage;
    use crate::error::{AlertingError, TransportError};

    struct OkMail;
    impl MailTransport for OkMail {
        fn send_message(&self, _: &EmailMessage) -> Result<(), TransportError> {
            Ok(())
        }
    }

    struct Status(u16);
    impl HttpTransport for Status {
        fn execute(&self, _: &HttpRequest) -> Result<HttpResponse, TransportError> {
            Ok(HttpResponse {
                status: self.0,
                body: "body".to_string(),
            })
        }
    }

    struct Unreachable;
    impl HttpTransport for Unreachable {
        fn execute(&self, _: &HttpRequest) -> Result<HttpResponse, TransportError> {
            Err(TransportError::connection("connection refused"))
        }
    }

    fn email() -> DestinationMessage {
        EmailMessage::builder("abc")
            .host("abc.com")
            .from("test@abc.com")
            .recipients(["test@abc.com"])
            .message("Test alert")
            .build()
            .unwrap()
            .into()
    }

    fn slack() -> DestinationMessage {
        WebhookMessage::slack("ops")
            .url("https://hooks.slack.com/services/x")
            .message("hi")
            .build()
            .unwrap()
            .into()
    }

    #[test]
    fn test_email_factory_success() {
        let factory = EmailDestinationFactory::new(DestinationEmailClient::new(Arc::new(OkMail)));
        let resp = factory.publish(&email()).unwrap();
        assert_eq!(resp.status_code(), 0);
        assert_eq!(resp.response_content(), "Sent");
    }

    #[test]
    fn test_email_factory_rejects_webhook_message() {
        let factory = EmailDestinationFactory::new(DestinationEmailClient::new(Arc::new(OkMail)));
        let err = factory.publish(&slack()).unwrap_err();
        assert!(matches!(
            err,
            AlertingError::Configuration(ConfigurationError::MessageTypeMismatch {
                expected: DestinationType::Email,
                actual: DestinationType::Slack,
            })
        ));
    }

    #[test]
    fn test_webhook_factory_maps_http_status() {
        let client = DestinationHttpClient::new(Arc::new(Status(503)));
        let factory = WebhookDestinationFactory::new(DestinationType::Slack, client).unwrap();
        let resp = factory.publish(&slack()).unwrap();
        assert_eq!(resp.status_code(), 503);
        assert_eq!(resp.response_content(), "body");
        assert!(!resp.is_success());
    }

    #[test]
    fn test_webhook_factory_normalizes_transport_error() {
        let client = DestinationHttpClient::new(Arc::new(Unreachable));
        let factory = WebhookDestinationFactory::new(DestinationType::Slack, client).unwrap();
        let resp = factory.publish(&slack()).unwrap();
        assert_eq!(resp.status_code(), STATUS_TRANSPORT_FAILURE);
        assert_eq!(resp.response_content(), "connection refused");
    }

    #[test]
    fn test_webhook_factory_rejects_other_webhook_type() {
        let client = DestinationHttpClient::new(Arc::new(Status(200)));
        let factory = WebhookDestinationFactory::new(DestinationType::Chime, client).unwrap();
        assert!(factory.publish(&slack()).unwrap_err().is_configuration());
    }

    #[test]
    fn test_webhook_factory_requires_webhook_type() {
        let client = DestinationHttpClient::new(Arc::new(Status(200)));
        assert!(WebhookDestinationFactory::new(DestinationType::Email, client).is_err());
    }
}
