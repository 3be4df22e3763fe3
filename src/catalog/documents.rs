//! Catalog documents: email accounts and email groups.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::destination::email::{is_valid_email, EmailMessageBuilder, EmailMethod, DEFAULT_EMAIL_PORT};
use crate::error::ValidationError;

/// Maximum length of an account or group name.
pub const MAX_NAME_LENGTH: usize = 50;

fn name_regex() -> &'static Regex {
    static NAME_RE: OnceLock<Regex> = OnceLock::new();
    NAME_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("name pattern is a valid regex"))
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::MissingField {
            field: "name".to_string(),
        });
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::FieldTooLong {
            field: "name".to_string(),
            max_length: MAX_NAME_LENGTH,
        });
    }
    if !name_regex().is_match(name) {
        return Err(ValidationError::InvalidName { name: name.to_string() });
    }
    Ok(())
}

fn validate_email(address: &str) -> Result<(), ValidationError> {
    if is_valid_email(address) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmailAddress {
            address: address.to_string(),
        })
    }
}

fn default_port() -> u16 {
    DEFAULT_EMAIL_PORT
}

/// A sender account: the SMTP server and the address mail is sent from.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAccount {
    pub name: String,
    pub email: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub method: EmailMethod,
}

impl EmailAccount {
    /// Account with the default port and no transport security.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            host: host.into(),
            port: DEFAULT_EMAIL_PORT,
            method: EmailMethod::default(),
        }
    }

    /// Checks name, address, host and port.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        validate_email(&self.email)?;
        if self.host.trim().is_empty() {
            return Err(ValidationError::MissingHost);
        }
        if self.port == 0 {
            return Err(ValidationError::InvalidPort { port: self.port });
        }
        Ok(())
    }

    /// Starts an email message sent from this account.
    #[must_use]
    pub fn message_builder(&self, channel_name: impl Into<String>) -> EmailMessageBuilder {
        EmailMessageBuilder::new(channel_name)
            .host(self.host.clone())
            .port(self.port)
            .method(self.method)
            .from(self.email.clone())
    }
}

/// A named list of addresses.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailGroup {
    pub name: String,
    #[serde(default)]
    pub emails: Vec<String>,
}

impl EmailGroup {
    /// Creates a group.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            emails: emails.into_iter().map(Into::into).collect(),
        }
    }

    /// Checks the name and every member address.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        self.emails.iter().try_for_each(|e| validate_email(e))
    }
}

/// Any document stored in the configuration index.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConfigDocument {
    EmailAccount(EmailAccount),
    EmailGroup(EmailGroup),
}

impl ConfigDocument {
    /// Document kind as stored.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EmailAccount(_) => "email_account",
            Self::EmailGroup(_) => "email_group",
        }
    }

    /// Account or group name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::EmailAccount(a) => &a.name,
            Self::EmailGroup(g) => &g.name,
        }
    }

    /// Validates the wrapped document.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::EmailAccount(a) => a.validate(),
            Self::EmailGroup(g) => g.validate(),
        }
    }
}

impl From<EmailAccount> for ConfigDocument {
    fn from(value: EmailAccount) -> Self {
        Self::EmailAccount(value)
    }
}

impl From<EmailGroup> for ConfigDocument {
    fn from(value: EmailGroup) -> Self {
        Self::EmailGroup(value)
    }
}

/// A notification recipient: a literal address or a stored group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Recipient {
    /// Single address.
    Email(String),
    /// Id of an [`EmailGroup`] document.
    EmailGroup(String),
}
