//! Webhook destination messages: Slack, Chime and custom HTTP endpoints.

use std::collections::BTreeMap;
use std::fmt;

use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ValidationError;

use super::message::{non_blank, validate_common, DestinationType};

/// Header added to custom webhooks that do not set a content type.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

fn parse_http_url(raw: &str) -> Result<Url, ValidationError> {
    let invalid = || ValidationError::InvalidUrl {
        url: raw.to_string(),
    };
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }
    Ok(url)
}

/// HTTP verb for custom webhooks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// POST (default).
    #[default]
    Post,
    /// PUT.
    Put,
    /// PATCH.
    Patch,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post => f.write_str("POST"),
            Self::Put => f.write_str("PUT"),
            Self::Patch => f.write_str("PATCH"),
        }
    }
}

/// A Slack or Chime incoming-webhook message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookMessage {
    destination_type: DestinationType,
    channel_name: String,
    url: Url,
    message: String,
}

impl WebhookMessage {
    /// Starts a Slack message builder.
    #[must_use]
    pub fn slack(channel_name: impl Into<String>) -> WebhookMessageBuilder {
        WebhookMessageBuilder::new(DestinationType::Slack, channel_name)
    }

    /// Starts a Chime message builder.
    #[must_use]
    pub fn chime(channel_name: impl Into<String>) -> WebhookMessageBuilder {
        WebhookMessageBuilder::new(DestinationType::Chime, channel_name)
    }

    /// Slack or Chime.
    #[must_use]
    pub const fn destination_type(&self) -> DestinationType {
        self.destination_type
    }

    /// Channel name.
    #[must_use]
    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    /// Incoming webhook URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Message body.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// JSON payload expected by the channel.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        match self.destination_type {
            DestinationType::Chime => json!({ "Content": self.message }),
            _ => json!({ "text": self.message }),
        }
    }
}

/// Builder for [`WebhookMessage`].
#[derive(Debug, Clone)]
pub struct WebhookMessageBuilder {
    destination_type: DestinationType,
    channel_name: String,
    url: Option<String>,
    message: Option<String>,
}

impl WebhookMessageBuilder {
    fn new(destination_type: DestinationType, channel_name: impl Into<String>) -> Self {
        Self {
            destination_type,
            channel_name: channel_name.into(),
            url: None,
            message: None,
        }
    }

    /// Set the webhook URL (required).
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the message body (required).
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Validate channel name, body and URL, in that order.
    pub fn build(self) -> Result<WebhookMessage, ValidationError> {
        let (channel_name, message) = validate_common(&self.channel_name, self.message)?;
        let raw_url = self.url.unwrap_or_default();
        let url = parse_http_url(&raw_url)?;
        Ok(WebhookMessage {
            destination_type: self.destination_type,
            channel_name,
            url,
            message,
        })
    }
}

/// A message for an arbitrary HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomWebhookMessage {
    channel_name: String,
    message: String,
    url: Url,
    method: HttpMethod,
    headers: BTreeMap<String, String>,
}

impl CustomWebhookMessage {
    /// Starts a builder for `channel_name`.
    #[must_use]
    pub fn builder(channel_name: impl Into<String>) -> CustomWebhookMessageBuilder {
        CustomWebhookMessageBuilder::new(channel_name)
    }

    /// Channel name.
    #[must_use]
    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    /// Message body, sent verbatim.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Fully resolved target URL including query parameters.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// HTTP verb.
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// Request headers.
    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }
}

/// Builder for [`CustomWebhookMessage`].
///
/// Either a full URL or a host (with optional scheme, port and path) must
/// be given. Query parameters are appended to whichever is used.
#[derive(Debug, Clone, Default)]
pub struct CustomWebhookMessageBuilder {
    channel_name: String,
    message: Option<String>,
    url: Option<String>,
    scheme: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    path: Option<String>,
    method: HttpMethod,
    query_params: Vec<(String, String)>,
    headers: BTreeMap<String, String>,
}

impl CustomWebhookMessageBuilder {
    /// Creates a builder for `channel_name`.
    #[must_use]
    pub fn new(channel_name: impl Into<String>) -> Self {
        Self {
            channel_name: channel_name.into(),
            ..Self::default()
        }
    }

    /// Set the message body (required).
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set a fully qualified URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the scheme used with [`host`](Self::host) (default: https).
    #[must_use]
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Set the host, used when no URL is given.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the port used with the host.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the path used with the host.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the HTTP verb (default: POST).
    #[must_use]
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Append a query parameter.
    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    /// Set a request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Validate and build the message.
    pub fn build(self) -> Result<CustomWebhookMessage, ValidationError> {
        let (channel_name, message) = validate_common(&self.channel_name, self.message)?;

        let mut url = if let Some(raw) = non_blank(self.url) {
            parse_http_url(&raw)?
        } else if let Some(host) = non_blank(self.host) {
            let scheme = non_blank(self.scheme).unwrap_or_else(|| "https".to_string());
            let raw = format!("{scheme}://{host}");
            let mut url = parse_http_url(&raw)?;
            if let Some(port) = self.port {
                url.set_port(Some(port))
                    .map_err(|()| ValidationError::InvalidUrl { url: raw.clone() })?;
            }
            if let Some(path) = non_blank(self.path) {
                url.set_path(&path);
            }
            url
        } else {
            return Err(ValidationError::MissingUrlOrHost);
        };

        if !self.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query_params {
                pairs.append_pair(key, value);
            }
        }

        let mut headers = BTreeMap::new();
        for (name, value) in self.headers {
            let valid = HeaderName::from_bytes(name.trim().as_bytes()).is_ok()
                && HeaderValue::from_str(&value).is_ok();
            if !valid {
                return Err(ValidationError::InvalidHeader { name });
            }
            headers.insert(name.trim().to_string(), value);
        }
        if !headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
            headers.insert("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string());
        }

        Ok(CustomWebhookMessage {
            channel_name,
            message,
            url,
            method: self.method,
            headers,
        })
    }
}
