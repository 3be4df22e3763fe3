//! Error types for KyroAlert.
//!
//! All errors are strongly typed using thiserror. Parse and validation
//! errors are raised before any I/O happens; transport errors only ever
//! come back from a send attempt.

use std::fmt;

use thiserror::Error;

use crate::catalog::StorageError;
use crate::destination::DestinationType;

/// Category of a trigger-expression parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The expression contained no tokens.
    EmptyExpression,
    /// A token appeared where the grammar does not allow it.
    UnexpectedToken {
        /// Text of the offending token.
        found: String,
    },
    /// The expression ended while an operand was still expected.
    UnexpectedEnd,
    /// An opening parenthesis was never closed, or a closing one has no opener.
    UnbalancedParens,
    /// A query name that the trigger does not declare.
    UnknownQuery {
        /// Referenced query name.
        name: String,
    },
    /// A character that cannot start any token.
    InvalidCharacter {
        /// The character.
        found: char,
    },
    /// A query name that is not a plain identifier, or is a keyword.
    InvalidQueryName {
        /// Offending name.
        name: String,
    },
    /// An AND or OR node with fewer than two operands.
    TooFewOperands {
        /// `AND` or `OR`.
        operator: &'static str,
        /// Number of operands supplied.
        found: usize,
    },
    /// Parentheses or NOT operators nested beyond the parser's limit.
    NestingTooDeep {
        /// Maximum supported depth.
        max_depth: usize,
    },
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyExpression => write!(f, "expression is empty"),
            Self::UnexpectedToken { found } => write!(f, "unexpected token '{found}'"),
            Self::UnexpectedEnd => write!(f, "unexpected end of expression"),
            Self::UnbalancedParens => write!(f, "unbalanced parentheses"),
            Self::UnknownQuery { name } => write!(f, "unknown query '{name}'"),
            Self::InvalidCharacter { found } => write!(f, "invalid character '{found}'"),
            Self::InvalidQueryName { name } => write!(f, "invalid query name '{name}'"),
            Self::TooFewOperands { operator, found } => {
                write!(f, "{operator} needs at least 2 operands, got {found}")
            }
            Self::NestingTooDeep { max_depth } => {
                write!(f, "expression nested deeper than {max_depth} levels")
            }
        }
    }
}

/// A malformed trigger condition.
///
/// `position` is the byte offset into the source where the problem was found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Parse error at position {position}: {kind}")]
pub struct ParseError {
    /// What went wrong.
    pub kind: ParseErrorKind,
    /// Byte offset into the source expression.
    pub position: usize,
}

impl ParseError {
    /// Creates a parse error at `position`.
    #[must_use]
    pub const fn new(kind: ParseErrorKind, position: usize) -> Self {
        Self { kind, position }
    }
}

/// Validation errors raised while building messages and documents.
///
/// The email messages are matched verbatim by existing callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Channel name must be defined")]
    MissingChannelName,

    #[error("Host name should be provided")]
    MissingHost,

    #[error("Message content is missing")]
    MissingMessage,

    #[error("From address should be provided")]
    MissingFrom,

    #[error("List of recipients should be provided")]
    MissingRecipients,

    #[error("Invalid email address: {address}")]
    InvalidEmailAddress { address: String },

    #[error("Port should be a positive number, got {port}")]
    InvalidPort { port: u16 },

    #[error("Username and password should be provided together")]
    IncompleteCredentials,

    #[error("Unsupported email method: {method}")]
    UnsupportedMethod { method: String },

    #[error("Unknown destination type: {value}")]
    UnknownDestinationType { value: String },

    #[error("Fully qualified URL is missing/invalid: {url}")]
    InvalidUrl { url: String },

    #[error("Either fully qualified URL or host name should be provided")]
    MissingUrlOrHost,

    #[error("Invalid header '{name}'")]
    InvalidHeader { name: String },

    #[error("Required field '{field}' is missing")]
    MissingField { field: String },

    #[error("Invalid name '{name}': only letters, digits, '-' and '_' are allowed")]
    InvalidName { name: String },

    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    FieldTooLong { field: String, max_length: usize },

    #[error("Severity must be between 1 and 5, got {value}")]
    InvalidSeverity { value: u8 },
}

/// Wiring errors: the registry cannot route a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("No destination factory registered for type {destination_type}")]
    FactoryNotRegistered { destination_type: DestinationType },

    #[error("Factory for {expected} cannot publish a {actual} message")]
    MessageTypeMismatch {
        expected: DestinationType,
        actual: DestinationType,
    },

    #[error("Destination registry is unavailable: {reason}")]
    RegistryUnavailable { reason: String },

    #[error("Invalid configuration: {reason}")]
    Invalid { reason: String },
}

/// Failures reported by a mail or HTTP transport during a send.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("{message}")]
    ConnectionFailed { message: String },

    #[error("{message}")]
    Rejected { message: String },

    #[error("Failed to build outgoing message: {message}")]
    MessageBuild { message: String },
}

impl TransportError {
    /// Creates a connection failure carrying the transport's own text.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    /// Creates a rejection (auth, protocol or remote refusal).
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

/// Errors from the background dispatch worker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("Channel disconnected: {path}")]
    Disconnected { path: String },

    #[error("Dispatch queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },
}

/// Top-level error type for KyroAlert.
#[derive(Debug, Error)]
pub enum AlertingError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AlertingError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a parse error.
    #[must_use]
    pub const fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns true if this is a transport error.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if this error is retryable.
    ///
    /// Sends are not idempotent, so transport failures are never retryable
    /// here. Only a dispatcher timeout (nothing observed yet) qualifies.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::Timeout { .. }))
    }
}

/// Result type alias for KyroAlert operations.
pub type AlertingResult<T> = Result<T, AlertingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation_messages_are_verbatim() {
        assert_eq!(ValidationError::MissingHost.to_string(), "Host name should be provided");
        assert_eq!(ValidationError::MissingMessage.to_string(), "Message content is missing");
        assert_eq!(ValidationError::MissingFrom.to_string(), "From address should be provided");
        assert_eq!(
            ValidationError::MissingRecipients.to_string(),
            "List of recipients should be provided"
        );
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new(ParseErrorKind::UnexpectedEnd, 5);
        let msg = format!("{err}");
        assert!(msg.contains("position 5"));
        assert!(msg.contains("unexpected end"));

        let err = ParseError::new(
            ParseErrorKind::UnknownQuery {
                name: "q9".to_string(),
            },
            0,
        );
        assert!(err.to_string().contains("unknown query 'q9'"));
    }

    #[test]
    fn test_transport_error_keeps_transport_text() {
        let err = TransportError::connection("Couldn't connect to host, port: localhost, 55555; timeout -1");
        assert_eq!(
            err.to_string(),
            "Couldn't connect to host, port: localhost, 55555; timeout -1"
        );
    }

    #[test]
    fn test_configuration_error_names_type() {
        let err = ConfigurationError::FactoryNotRegistered {
            destination_type: DestinationType::Slack,
        };
        assert!(err.to_string().contains("slack"));
    }

    #[test]
    fn test_alerting_error_from_validation() {
        let err: AlertingError = ValidationError::MissingHost.into();
        assert!(err.is_validation());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_alerting_error_from_transport_is_not_retryable() {
        let err: AlertingError = TransportError::connection("refused").into();
        assert!(err.is_transport());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_alerting_error_timeout_is_retryable() {
        let err: AlertingError = ExecutionError::Timeout { duration_ms: 100 }.into();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_alerting_error_internal() {
        let err = AlertingError::internal("unexpected state");
        assert!(err.is_internal());
        assert!(err.to_string().contains("unexpected state"));
    }
}
