//! Email destination message and builder.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::message::non_blank;

/// Standard port used when none is configured.
pub const DEFAULT_EMAIL_PORT: u16 = 465;

// HTML living standard "valid e-mail address".
const EMAIL_PATTERN: &str = r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$";

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex"))
}

/// Returns true if `address` is a syntactically valid email address.
#[must_use]
pub fn is_valid_email(address: &str) -> bool {
    email_regex().is_match(address)
}

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailMethod {
    /// Plain SMTP, no TLS.
    #[default]
    #[serde(alias = "plain")]
    None,
    /// Implicit TLS (SMTPS).
    Ssl,
    /// STARTTLS upgrade.
    #[serde(rename = "starttls", alias = "start_tls")]
    StartTls,
}

impl EmailMethod {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Ssl => "ssl",
            Self::StartTls => "starttls",
        }
    }
}

impl fmt::Display for EmailMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmailMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "plain" => Ok(Self::None),
            "ssl" => Ok(Self::Ssl),
            "starttls" | "start_tls" => Ok(Self::StartTls),
            _ => Err(ValidationError::UnsupportedMethod {
                method: s.to_string(),
            }),
        }
    }
}

/// A validated email notification.
///
/// The `Debug` output never reveals credentials.
#[derive(Debug)]
pub struct EmailMessage {
    channel_name: String,
    message: String,
    host: String,
    port: u16,
    method: EmailMethod,
    from: String,
    recipients: Vec<String>,
    subject: Option<String>,
    username: Option<SecretString>,
    password: Option<SecretString>,
}

impl EmailMessage {
    /// Starts a builder for the channel `channel_name`.
    #[must_use]
    pub fn builder(channel_name: impl Into<String>) -> EmailMessageBuilder {
        EmailMessageBuilder::new(channel_name)
    }

    /// Channel name.
    #[must_use]
    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    /// Message body.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// SMTP host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// SMTP port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Connection security.
    #[must_use]
    pub const fn method(&self) -> EmailMethod {
        self.method
    }

    /// Sender address.
    #[must_use]
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Recipient addresses.
    #[must_use]
    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Subject line; falls back to the channel name.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_deref().unwrap_or(&self.channel_name)
    }

    /// Username and password, present only as a pair.
    #[must_use]
    pub fn credentials(&self) -> Option<(&SecretString, &SecretString)> {
        self.username.as_ref().zip(self.password.as_ref())
    }
}

/// Builder for [`EmailMessage`].
///
/// # Example
/// ```rust,ignore
/// let message = EmailMessage::builder("ops-mail")
///     .host("smtp.example.com")
///     .method(EmailMethod::Ssl)
///     .from("alerts@example.com")
///     .recipients(["oncall@example.com"])
///     .subject("Disk usage")
///     .message("Disk usage above 90%")
///     .build()?;
/// ```
#[derive(Debug)]
pub struct EmailMessageBuilder {
    channel_name: String,
    message: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    method: EmailMethod,
    from: Option<String>,
    recipients: Vec<String>,
    subject: Option<String>,
    username: Option<SecretString>,
    password: Option<SecretString>,
}

impl EmailMessageBuilder {
    /// Creates a builder for `channel_name`.
    #[must_use]
    pub fn new(channel_name: impl Into<String>) -> Self {
        Self {
            channel_name: channel_name.into(),
            message: None,
            host: None,
            port: None,
            method: EmailMethod::default(),
            from: None,
            recipients: Vec::new(),
            subject: None,
            username: None,
            password: None,
        }
    }

    /// Set the message body (required). A later call replaces an earlier one.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set the SMTP host (required).
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the SMTP port (default: 465).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set connection security (default: none).
    #[must_use]
    pub fn method(mut self, method: EmailMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the sender address (required).
    #[must_use]
    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Replace the recipient list (required, non-empty).
    #[must_use]
    pub fn recipients<I, S>(mut self, recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recipients = recipients.into_iter().map(Into::into).collect();
        self
    }

    /// Append one recipient.
    #[must_use]
    pub fn recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipients.push(recipient.into());
        self
    }

    /// Set the subject (optional).
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the SMTP username (optional, requires a password).
    #[must_use]
    pub fn username(mut self, username: SecretString) -> Self {
        self.username = Some(username);
        self
    }

    /// Set the SMTP password (optional, requires a username).
    #[must_use]
    pub fn password(mut self, password: SecretString) -> Self {
        self.password = Some(password);
        self
    }

    /// Validate and build the message.
    ///
    /// Required fields are checked in a fixed order: channel name, host,
    /// message body, from-address, recipients. Address syntax, port and
    /// credential pairing are checked afterwards.
    pub fn build(self) -> Result<EmailMessage, ValidationError> {
        let channel_name = self.channel_name.trim().to_string();
        if channel_name.is_empty() {
            return Err(ValidationError::MissingChannelName);
        }

        let host = non_blank(self.host).ok_or(ValidationError::MissingHost)?;

        let message = self
            .message
            .filter(|m| !m.trim().is_empty())
            .ok_or(ValidationError::MissingMessage)?;

        let from = non_blank(self.from).ok_or(ValidationError::MissingFrom)?;

        let recipients: Vec<String> = self
            .recipients
            .into_iter()
            .filter_map(|r| non_blank(Some(r)))
            .collect();
        if recipients.is_empty() {
            return Err(ValidationError::MissingRecipients);
        }

        if !is_valid_email(&from) {
            return Err(ValidationError::InvalidEmailAddress { address: from });
        }
        if let Some(bad) = recipients.iter().find(|r| !is_valid_email(r)) {
            return Err(ValidationError::InvalidEmailAddress {
                address: bad.clone(),
            });
        }

        let port = self.port.unwrap_or(DEFAULT_EMAIL_PORT);
        if port == 0 {
            return Err(ValidationError::InvalidPort { port });
        }

        if self.username.is_some() != self.password.is_some() {
            return Err(ValidationError::IncompleteCredentials);
        }

        Ok(EmailMessage {
            channel_name,
            message,
            host,
            port,
            method: self.method,
            from,
            recipients,
            subject: non_blank(self.subject),
            username: self.username,
            password: self.password,
        })
    }
}
