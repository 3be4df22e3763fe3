//! Destination clients and the transports they drive.

/// SMTP client.
pub mod email;
/// HTTP client for webhooks.
pub mod http;

pub use email::{DestinationEmailClient, MailTransport, SmtpMailTransport, SENT};
pub use http::{DestinationHttpClient, HttpRequest, HttpResponse, HttpTransport, ReqwestHttpTransport};
