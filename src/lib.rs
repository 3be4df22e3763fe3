//! # KyroAlert - trigger evaluation and notification dispatch
//!
//! KyroAlert evaluates boolean trigger conditions over the results of named
//! queries and delivers notifications to email and webhook channels.
//!
//! ## Core Concepts
//!
//! - **TriggerExpression**: A parsed condition such as `(errors AND prod) OR NOT healthy`
//! - **QueryMatchMap**: The document ids each query matched in one evaluation cycle
//! - **DestinationMessage**: A fully validated message for one channel
//! - **Notification**: Routes a message to the factory registered for its channel
//!
//! ## Usage
//!
//! ```rust
//! use kyroalert::{parse, QueryMatchMap};
//!
//! let expr = parse("errors AND NOT maintenance").unwrap();
//!
//! let mut matches = QueryMatchMap::new();
//! matches.insert("errors", ["doc-1", "doc-2"]);
//! matches.insert("maintenance", ["doc-2"]);
//!
//! let hits = expr.evaluate(&matches);
//! assert_eq!(hits.into_iter().collect::<Vec<_>>(), vec!["doc-1".to_string()]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod config;
pub mod destination;
pub mod error;
pub mod trigger;

// Re-export primary types at crate root for convenience
pub use catalog::{
    resolve_recipients, ConfigDocument, ConfigIndex, ConfigIndexer, EmailAccount, EmailGroup, InMemoryConfigIndex,
    IndexRequest, IndexResponse, IndexStep, Recipient, StorageError,
};
pub use config::NotificationConfig;
pub use destination::{
    CustomWebhookMessage, DestinationEmailClient, DestinationFactory, DestinationHttpClient, DestinationMessage,
    DestinationResponse, DestinationType, DispatcherConfig, EmailDestinationFactory, EmailMessage, EmailMethod,
    FactoryRegistry, HttpMethod, MailTransport, Notification, NotificationDispatcher, PendingDelivery,
    WebhookDestinationFactory, WebhookMessage,
};
pub use error::{
    AlertingError, AlertingResult, ConfigurationError, ExecutionError, ParseError, ParseErrorKind, TransportError,
    ValidationError,
};
pub use trigger::{parse, run_triggers, DocumentTrigger, QueryMatchMap, Severity, TriggerExpression, TriggerRunResult};
