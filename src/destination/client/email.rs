//! Email client: message conversion and SMTP delivery.

use std::sync::Arc;
use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;

use crate::config::NotificationConfig;
use crate::destination::email::{EmailMessage, EmailMethod};
use crate::error::TransportError;

/// Content reported for a successful email send.
pub const SENT: &str = "Sent";

/// Low-level capability to hand an email to a mail server.
///
/// Implemented over SMTP by [`SmtpMailTransport`]; tests substitute their own.
pub trait MailTransport: Send + Sync {
    /// Deliver `message`, returning the transport's error on failure.
    fn send_message(&self, message: &EmailMessage) -> Result<(), TransportError>;
}

/// Client used by the email factory.
#[derive(Clone)]
pub struct DestinationEmailClient {
    transport: Arc<dyn MailTransport>,
}

impl std::fmt::Debug for DestinationEmailClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DestinationEmailClient").finish_non_exhaustive()
    }
}

impl DestinationEmailClient {
    /// Wraps a mail transport.
    #[must_use]
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }

    /// Client backed by SMTP with timeouts from `config`.
    #[must_use]
    pub fn smtp(config: &NotificationConfig) -> Self {
        Self::new(Arc::new(SmtpMailTransport::new(config)))
    }

    /// Sends `message`, returning [`SENT`] on success.
    pub fn execute(&self, message: &EmailMessage) -> Result<String, TransportError> {
        self.transport.send_message(message)?;
        Ok(SENT.to_string())
    }
}

/// SMTP delivery through `lettre`.
///
/// A connection is opened per send; the method picks implicit TLS,
/// STARTTLS or plain SMTP.
#[derive(Debug, Clone)]
pub struct SmtpMailTransport {
    timeout: Option<Duration>,
}

impl SmtpMailTransport {
    /// Creates a transport with timeouts from `config`.
    ///
    /// `lettre` applies one timeout to connect and socket I/O alike, so the
    /// shorter of the two configured values is used.
    #[must_use]
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            timeout: Some(config.connect_timeout().min(config.socket_timeout())),
        }
    }

    /// Timeout handed to the SMTP connection.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn mailer(&self, message: &EmailMessage) -> Result<SmtpTransport, TransportError> {
        let host = message.host();
        let builder = match message.method() {
            EmailMethod::Ssl => SmtpTransport::relay(host)
                .map_err(|e| TransportError::connection(e.to_string()))?,
            EmailMethod::StartTls => SmtpTransport::starttls_relay(host)
                .map_err(|e| TransportError::connection(e.to_string()))?,
            EmailMethod::None => SmtpTransport::builder_dangerous(host),
        };

        let mut builder = builder.port(message.port()).timeout(self.timeout);
        if let Some((username, password)) = message.credentials() {
            builder = builder.credentials(Credentials::new(
                username.expose_secret().to_owned(),
                password.expose_secret().to_owned(),
            ));
        }
        Ok(builder.build())
    }
}

fn mailbox(address: &str) -> Result<Mailbox, TransportError> {
    address.parse::<Mailbox>().map_err(|e| TransportError::MessageBuild {
        message: format!("invalid address '{address}': {e}"),
    })
}

/// Converts a validated message into a MIME message.
pub(crate) fn to_mime(message: &EmailMessage) -> Result<Message, TransportError> {
    let mut builder = Message::builder()
        .from(mailbox(message.from())?)
        .subject(message.subject());
    for recipient in message.recipients() {
        builder = builder.to(mailbox(recipient)?);
    }
    builder
        .header(ContentType::TEXT_PLAIN)
        .body(message.message().to_string())
        .map_err(|e| TransportError::MessageBuild {
            message: e.to_string(),
        })
}

impl MailTransport for SmtpMailTransport {
    fn send_message(&self, message: &EmailMessage) -> Result<(), TransportError> {
        let mime = to_mime(message)?;
        let mailer = self.mailer(message)?;
        tracing::debug!(
            host = message.host(),
            port = message.port(),
            method = %message.method(),
            recipients = message.recipients().len(),
            "sending email over SMTP"
        );
        mailer
            .send(&mime)
            .map_err(|e| TransportError::connection(e.to_string()))?;
        Ok(())
    }
}
