//! Runtime configuration for notification transports and dispatch.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::destination::DispatcherConfig;
use crate::error::ConfigurationError;

/// Transport and dispatch settings.
///
/// Every field has a default, so partial JSON documents are accepted.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Connect timeout for SMTP and HTTP transports.
    ///
    /// SMTP has a single timeout, which takes the smaller of this and
    /// `socket_timeout_ms`.
    pub connect_timeout_ms: u64,
    /// Read/write timeout for SMTP and HTTP transports.
    pub socket_timeout_ms: u64,
    /// Max queued messages in the background dispatcher.
    pub dispatch_queue_capacity: usize,
    pub user_agent: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            socket_timeout_ms: 50_000,
            dispatch_queue_capacity: 1024,
            user_agent: concat!("kyroalert/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl NotificationConfig {
    /// Parses and validates a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let cfg: Self = serde_json::from_str(json).map_err(|e| ConfigurationError::Invalid {
            reason: format!("invalid notification config: {e}"),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects zero timeouts.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.connect_timeout_ms == 0 {
            return Err(ConfigurationError::Invalid {
                reason: "connect_timeout_ms must be positive".to_string(),
            });
        }
        if self.socket_timeout_ms == 0 {
            return Err(ConfigurationError::Invalid {
                reason: "socket_timeout_ms must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Connect timeout as a `Duration`.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Socket timeout as a `Duration`.
    #[must_use]
    pub const fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }

    /// Dispatcher settings derived from this config.
    #[must_use]
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            queue_capacity: self.dispatch_queue_capacity,
        }
    }
}
