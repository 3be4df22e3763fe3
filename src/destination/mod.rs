//! Notification destinations.
//!
//! Messages are built and validated per channel (email, Slack, Chime,
//! custom webhook), routed through a [`FactoryRegistry`] and published by
//! [`Notification`], directly or via the background
//! [`NotificationDispatcher`].

/// Destination clients and transports.
pub mod client;
/// Background dispatch worker.
pub mod dispatcher;
/// Email message and builder.
pub mod email;
/// Per-channel factories.
pub mod factory;
/// Message envelope and channel types.
pub mod message;
/// Factory registry and publisher.
pub mod registry;
/// Send outcome.
pub mod response;
/// Webhook messages.
pub mod webhook;

pub use client::{
    DestinationEmailClient, DestinationHttpClient, HttpRequest, HttpResponse, HttpTransport, MailTransport,
    ReqwestHttpTransport, SmtpMailTransport, SENT,
};
pub use dispatcher::{DispatcherConfig, NotificationDispatcher, PendingDelivery};
pub use email::{is_valid_email, EmailMessage, EmailMessageBuilder, EmailMethod, DEFAULT_EMAIL_PORT};
pub use factory::{DestinationFactory, EmailDestinationFactory, WebhookDestinationFactory};
pub use message::{DestinationMessage, DestinationType};
pub use registry::{FactoryRegistry, Notification};
pub use response::{DestinationResponse, STATUS_SUCCESS, STATUS_TRANSPORT_FAILURE};
pub use webhook::{
    CustomWebhookMessage, CustomWebhookMessageBuilder, HttpMethod, WebhookMessage, WebhookMessageBuilder,
    DEFAULT_CONTENT_TYPE,
};
