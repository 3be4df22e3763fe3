//! Factory registry and the `Notification` entry point.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::config::NotificationConfig;
use crate::error::{AlertingResult, ConfigurationError};

use super::client::{DestinationEmailClient, DestinationHttpClient};
use super::factory::{DestinationFactory, EmailDestinationFactory, WebhookDestinationFactory};
use super::message::{DestinationMessage, DestinationType};
use super::response::DestinationResponse;

/// Map from channel type to the factory that publishes it.
///
/// Reads are concurrent; `set_factory` takes a short write lock and
/// replaces any existing entry.
#[derive(Default)]
pub struct FactoryRegistry {
    factories: RwLock<HashMap<DestinationType, Arc<dyn DestinationFactory>>>,
}

impl std::fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = f.debug_struct("FactoryRegistry");
        match self.registered_types() {
            Ok(types) => out.field("registered", &types),
            Err(_) => out.field("registered", &"<poisoned>"),
        };
        out.finish()
    }
}

fn poisoned() -> ConfigurationError {
    ConfigurationError::RegistryUnavailable {
        reason: "lock poisoned".to_string(),
    }
}

impl FactoryRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with SMTP email and reqwest-backed webhook factories.
    pub fn with_defaults(config: &NotificationConfig) -> AlertingResult<Self> {
        config.validate()?;
        let registry = Self::new();

        registry.set_factory(
            DestinationType::Email,
            Arc::new(EmailDestinationFactory::new(DestinationEmailClient::smtp(config))),
        )?;

        let http = Arc::new(DestinationHttpClient::reqwest(config)?);
        for destination_type in DestinationType::ALL.into_iter().filter(|t| t.is_webhook()) {
            let factory = WebhookDestinationFactory::shared(destination_type, Arc::clone(&http))?;
            registry.set_factory(destination_type, Arc::new(factory))?;
        }

        Ok(registry)
    }

    /// Registers `factory` for `destination_type`, replacing any previous one.
    pub fn set_factory(
        &self,
        destination_type: DestinationType,
        factory: Arc<dyn DestinationFactory>,
    ) -> Result<(), ConfigurationError> {
        if factory.destination_type() != destination_type {
            return Err(ConfigurationError::Invalid {
                reason: format!(
                    "factory for {} cannot be registered as {destination_type}",
                    factory.destination_type()
                ),
            });
        }

        let mut guard = self.factories.write().map_err(|_| poisoned())?;
        if guard.insert(destination_type, factory).is_some() {
            tracing::debug!(%destination_type, "replaced destination factory");
        }
        Ok(())
    }

    /// Looks up the factory for `destination_type`.
    pub fn get_factory(
        &self,
        destination_type: DestinationType,
    ) -> Result<Arc<dyn DestinationFactory>, ConfigurationError> {
        let guard = self.factories.read().map_err(|_| poisoned())?;
        guard
            .get(&destination_type)
            .cloned()
            .ok_or(ConfigurationError::FactoryNotRegistered { destination_type })
    }

    /// Registered channel types in stable order.
    pub fn registered_types(&self) -> Result<Vec<DestinationType>, ConfigurationError> {
        let guard = self.factories.read().map_err(|_| poisoned())?;
        let mut types: Vec<DestinationType> = guard.keys().copied().collect();
        types.sort();
        Ok(types)
    }
}

/// Publishes messages through the factory registered for their type.
#[derive(Debug, Clone)]
pub struct Notification {
    registry: Arc<FactoryRegistry>,
}

impl Notification {
    /// Creates a publisher over `registry`.
    #[must_use]
    pub fn new(registry: Arc<FactoryRegistry>) -> Self {
        Self { registry }
    }

    /// Publisher with the default factories.
    pub fn with_defaults(config: &NotificationConfig) -> AlertingResult<Self> {
        Ok(Self::new(Arc::new(FactoryRegistry::with_defaults(config)?)))
    }

    /// Underlying registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<FactoryRegistry> {
        &self.registry
    }

    /// Sends `message` and returns the channel's response.
    ///
    /// Transport failures come back as a response with a non-zero status.
    /// `Err` means no factory could handle the message.
    pub fn publish(&self, message: &DestinationMessage) -> AlertingResult<DestinationResponse> {
        let destination_type = message.destination_type();
        let factory = self.registry.get_factory(destination_type).map_err(|e| {
            tracing::error!(%destination_type, channel = message.channel_name(), error = %e, "no factory for message");
            e
        })?;

        let response = factory.publish(message)?;
        tracing::debug!(
            %destination_type,
            channel = message.channel_name(),
            status = response.status_code(),
            "published notification"
        );
        Ok(response)
    }
}
